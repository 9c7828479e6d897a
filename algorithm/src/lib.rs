use common::progress::UpdateStrategy;
use common::race::RaceRules;
use tracing::{info, warn};

/// Waypoint gap tolerance near the start/finish seam.
///
/// A raw index jump larger than `waypoints_per_lap - WRAP_TOLERANCE` is a
/// seam crossing; anything smaller is genuine directional travel.
const WRAP_TOLERANCE: i32 = 12;

/// Observability sink for lap transitions.
///
/// The tracker reports every transition through this trait instead of
/// logging directly, so it stays a pure state machine. Implementations
/// forward to a logging backend or republish onto an event bus.
pub trait ProgressObserver {
    /// The lap counter advanced to `lap`.
    fn lap_increased(&self, lap: i32);

    /// The lap counter dropped to `lap` after a backward seam crossing.
    fn lap_decreased(&self, lap: i32);

    /// The racer completed its final lap. Reported once, after
    /// [`lap_increased`](Self::lap_increased) for the same transition.
    fn finished(&self, lap: i32);

    /// A lap increase was attempted after the race was already finished
    /// and has been rejected.
    fn already_finished(&self);
}

/// Default observer that reports transitions through [`tracing`].
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn lap_increased(&self, lap: i32) {
        info!("Lap increased to {}", lap);
    }

    fn lap_decreased(&self, lap: i32) {
        info!("Lap decreased to {}", lap);
    }

    fn finished(&self, lap: i32) {
        info!("Finished after lap {}", lap);
    }

    fn already_finished(&self) {
        warn!("Already finished, lap increase rejected");
    }
}

/// Tracks one racer's lap count and waypoint progress around a circular,
/// waypoint-segmented track.
///
/// The tracker reconciles two position streams into a single consistent
/// lap/waypoint state: the locally simulated waypoint index
/// ([`update_local_waypoint`](Self::update_local_waypoint)) and the
/// periodically replicated remote `(lap, waypoint)` pair
/// ([`update_remote_progress`](Self::update_remote_progress)). Which
/// stream is authoritative is selected with
/// [`set_strategy`](Self::set_strategy); the remote pair is recorded in
/// either case and serves as a tie-breaker while the local stream drives
/// the state.
///
/// All operations are synchronous and non-blocking. The caller is
/// responsible for serializing local and remote updates onto one
/// sequence; the tracker itself holds no locks.
///
/// # Type Parameters
/// - `O`: The observability sink receiving lap transitions. Defaults to
///   [`TracingObserver`].
#[derive(Debug)]
pub struct LapTracker<O: ProgressObserver = TracingObserver> {
    rules: RaceRules,
    strategy: UpdateStrategy,
    current_lap: i32,
    current_waypoint: i32,
    last_remote_lap: i32,
    last_remote_waypoint: i32,
    is_finished: bool,
    observer: O,
}

impl LapTracker<TracingObserver> {
    /// Creates a new tracker that reports transitions through the default
    /// [`TracingObserver`].
    pub fn new(rules: RaceRules) -> Self {
        LapTracker::new_with_observer(rules, TracingObserver)
    }
}

impl<O: ProgressObserver> LapTracker<O> {
    /// Creates a new tracker with a custom observability sink.
    ///
    /// The tracker starts on lap 0, waypoint 0, preferring the local
    /// update stream. `rules` must carry positive lap and waypoint
    /// counts; they are not validated here.
    pub fn new_with_observer(rules: RaceRules, observer: O) -> Self {
        LapTracker {
            rules,
            strategy: UpdateStrategy::PreferLocal,
            current_lap: 0,
            current_waypoint: 0,
            last_remote_lap: 0,
            last_remote_waypoint: 0,
            is_finished: false,
            observer,
        }
    }

    /// Selects which update stream drives the authoritative state.
    ///
    /// Takes effect for subsequent updates only; the current state is not
    /// recomputed.
    pub fn set_strategy(&mut self, strategy: UpdateStrategy) {
        self.strategy = strategy;
    }

    /// Feeds a waypoint index predicted by the local movement simulation.
    ///
    /// Ignored unless the tracker prefers the local stream. A raw index
    /// jump across the seam larger than the wrap tolerance is counted as
    /// a lap crossing: a large decrease is forward travel that wrapped
    /// (lap increase), a large increase is backward travel across the
    /// seam (lap decrease). A small decrease consults the last observed
    /// remote state to catch lap completions the local prediction has
    /// already passed but the replication stream has not yet confirmed.
    pub fn update_local_waypoint(&mut self, new_idx: i32) {
        if self.strategy != UpdateStrategy::PreferLocal {
            return;
        }

        let prev = self.current_waypoint;
        let wrap_gap = self.rules.waypoints_per_lap - WRAP_TOLERANCE;
        if new_idx < prev {
            if prev - new_idx > wrap_gap {
                // Forward travel that wrapped past the seam.
                self.increase_lap();
            } else if self.last_remote_lap > self.current_lap {
                // Remote already counted the crossing the local stream is
                // catching up to.
                self.increase_lap();
            } else if self.last_remote_waypoint - new_idx > wrap_gap {
                // Local prediction crossed the seam before the remote lap
                // counter was observed to move.
                self.increase_lap();
            }
            // Anything else is plain reverse travel.
        } else if new_idx - prev > wrap_gap {
            // Backward travel across the seam.
            self.decrease_lap();
        }

        // The branches never store the index themselves; this terminal
        // write is the only store and must stay unconditional.
        self.current_waypoint = new_idx;
    }

    /// Feeds a replicated `(lap, waypoint)` pair from the remote
    /// authority.
    ///
    /// The pair is recorded unconditionally as the reconciliation oracle
    /// for later local updates. Under [`UpdateStrategy::PreferRemote`]
    /// it additionally overwrites the authoritative state verbatim,
    /// bypassing all tolerance logic; values are trusted as sent,
    /// including out-of-range ones.
    pub fn update_remote_progress(&mut self, lap: i32, waypoint: i32) {
        self.last_remote_lap = lap;
        self.last_remote_waypoint = waypoint;

        if self.strategy == UpdateStrategy::PreferRemote {
            self.current_lap = lap;
            self.current_waypoint = waypoint;
        }
    }

    /// Overwrites lap and waypoint unconditionally, bypassing all
    /// reconciliation.
    ///
    /// Meant for reconnect resynchronization only. The finish state and
    /// the recorded remote pair are left untouched.
    pub fn reset(&mut self, lap: i32, waypoint: i32) {
        self.current_lap = lap;
        self.current_waypoint = waypoint;
    }

    /// Returns the authoritative lap count.
    pub fn current_lap(&self) -> i32 {
        self.current_lap
    }

    /// Returns the authoritative waypoint index.
    pub fn current_waypoint(&self) -> i32 {
        self.current_waypoint
    }

    /// Returns `true` once the racer completed its final lap. Never
    /// resets for the lifetime of the tracker.
    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Returns the currently selected update strategy.
    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    /// Combined progress value, `lap * waypoints_per_lap + waypoint`.
    ///
    /// Monotonic along the direction of travel; rank consumers may use it
    /// as an ordering key across racers.
    pub fn progress_score(&self) -> i32 {
        self.current_lap * self.rules.waypoints_per_lap + self.current_waypoint
    }

    fn increase_lap(&mut self) {
        if self.is_finished {
            self.observer.already_finished();
            return;
        }
        self.current_lap += 1;
        self.observer.lap_increased(self.current_lap);
        if self.current_lap >= self.rules.total_laps {
            self.is_finished = true;
            self.observer.finished(self.current_lap);
        }
    }

    fn decrease_lap(&mut self) {
        self.current_lap = (self.current_lap - 1).max(0);
        self.observer.lap_decreased(self.current_lap);
    }
}

#[cfg(test)]
mod tests;
