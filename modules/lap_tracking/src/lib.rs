// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use algorithm::{LapTracker, ProgressObserver};
use async_trait::async_trait;
use common::progress::{LapChange, LocalWaypoint, ProgressResync, RemoteProgress, StrategyChange};
use common::race::{RaceRules, RacerId};
use module_core::{Event, EventKind, LapChangePtr, Module, ModuleCtx};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Republishes one racer's lap transitions onto the event bus.
///
/// Installed as the observability sink of the racer's [`LapTracker`], so
/// every transition the reconciliation detects becomes a bus event for
/// rank/HUD consumers, in addition to a log record.
struct BusNotifier {
    racer: RacerId,
    sender: tokio::sync::broadcast::Sender<Event>,
}

impl BusNotifier {
    fn publish(&self, kind: EventKind) {
        let _ = self.sender.send(Event { kind });
    }

    fn lap_change(&self, lap: i32) -> LapChangePtr {
        LapChangePtr::new(LapChange {
            racer: self.racer,
            lap,
        })
    }
}

impl ProgressObserver for BusNotifier {
    fn lap_increased(&self, lap: i32) {
        info!("Racer {} lap increased to {}", self.racer, lap);
        self.publish(EventKind::LapIncreasedEvent(self.lap_change(lap)));
    }

    fn lap_decreased(&self, lap: i32) {
        info!("Racer {} lap decreased to {}", self.racer, lap);
        self.publish(EventKind::LapDecreasedEvent(self.lap_change(lap)));
    }

    fn finished(&self, lap: i32) {
        info!("Racer {} finished the race", self.racer);
        self.publish(EventKind::RacerFinishedEvent(self.lap_change(lap)));
    }

    fn already_finished(&self) {
        warn!("Racer {} already finished, lap increase rejected", self.racer);
    }
}

/// The `LapTracking` module owns one [`LapTracker`] per racer and feeds
/// it from the events on the bus.
///
/// Trackers are created when a racer joins and dropped when it leaves.
/// Local waypoint predictions, replicated remote progress, strategy
/// switches and reconnect resyncs are dispatched to the racer's tracker;
/// detected lap transitions flow back onto the bus through the
/// [`BusNotifier`]. The module's single event loop is also the sequence
/// the two update streams are serialized onto, which the tracker
/// requires.
pub struct LapTracking {
    ctx: ModuleCtx,
    rules: RaceRules,
    trackers: HashMap<RacerId, LapTracker<BusNotifier>>,
}

impl LapTracking {
    /// Creates the module for a race with the given rules and an empty
    /// racer registry.
    pub fn new(rules: RaceRules, ctx: ModuleCtx) -> Self {
        LapTracking {
            ctx,
            rules,
            trackers: HashMap::new(),
        }
    }

    fn on_racer_joined(&mut self, racer: RacerId) {
        let notifier = BusNotifier {
            racer,
            sender: self.ctx.sender.clone(),
        };
        // A re-join replaces the tracker, the racer starts from fresh state.
        self.trackers
            .insert(racer, LapTracker::new_with_observer(self.rules, notifier));
        info!("Racer {} joined, progress tracking started", racer);
    }

    fn on_racer_left(&mut self, racer: RacerId) {
        if self.trackers.remove(&racer).is_some() {
            info!("Racer {} left, progress tracking stopped", racer);
        }
    }

    fn tracker_mut(&mut self, racer: RacerId) -> Option<&mut LapTracker<BusNotifier>> {
        let tracker = self.trackers.get_mut(&racer);
        if tracker.is_none() {
            error!("Progress update for unknown racer {}", racer);
        }
        tracker
    }

    fn on_local_waypoint(&mut self, update: &LocalWaypoint) {
        if let Some(tracker) = self.tracker_mut(update.racer) {
            tracker.update_local_waypoint(update.waypoint);
        }
    }

    fn on_remote_progress(&mut self, update: &RemoteProgress) {
        if let Some(tracker) = self.tracker_mut(update.racer) {
            tracker.update_remote_progress(update.lap, update.waypoint);
        }
    }

    fn on_strategy_changed(&mut self, change: &StrategyChange) {
        if let Some(tracker) = self.tracker_mut(change.racer) {
            tracker.set_strategy(change.strategy);
            debug!("Racer {} strategy changed to {:?}", change.racer, change.strategy);
        }
    }

    fn on_resync(&mut self, resync: &ProgressResync) {
        if let Some(tracker) = self.tracker_mut(resync.racer) {
            tracker.reset(resync.lap, resync.waypoint);
            info!(
                "Racer {} resynced to lap {}, waypoint {}",
                resync.racer, resync.lap, resync.waypoint
            );
        }
    }
}

#[async_trait]
impl Module for LapTracking {
    async fn run(&mut self) -> Result<(), ()> {
        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            match event.kind {
                                EventKind::QuitEvent => run = false,
                                EventKind::RacerJoinedEvent(racer) => self.on_racer_joined(racer),
                                EventKind::RacerLeftEvent(racer) => self.on_racer_left(racer),
                                EventKind::LocalWaypointEvent(update) => self.on_local_waypoint(&update),
                                EventKind::RemoteProgressEvent(update) => self.on_remote_progress(&update),
                                EventKind::StrategyChangedEvent(change) => self.on_strategy_changed(&change),
                                EventKind::ProgressResyncEvent(resync) => self.on_resync(&resync),
                                _ => (),
                            }
                        },
                        Err(e) => {
                            error!("Failed to receive event in module LapTracking. Error:{e}");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
