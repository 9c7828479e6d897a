use clap::{CommandFactory, Parser};
use common::progress::{
    LocalWaypoint, ProgressResync, RemoteProgress, StrategyChange, UpdateStrategy,
};
use common::race::{RaceRules, RacerId};
use lap_tracking::LapTracking;
use module_core::{
    Event, EventBus, EventKind, LocalWaypointPtr, Module, ProgressResyncPtr, RemoteProgressPtr,
    StrategyChangePtr,
};
use replay::ReplayFeed;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Update script that is replayed onto the event bus
    #[arg(short, long)]
    script: Option<String>,
    /// Race rules as a JSON file, overrides --laps and --waypoints-per-lap
    #[arg(short, long)]
    rules: Option<String>,
    #[arg(long, default_value_t = 3)]
    laps: i32,
    #[arg(long, default_value_t = 100)]
    waypoints_per_lap: i32,
    /// Milliseconds between two replayed events
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
}

/// Builds one bus event from a script record.
///
/// A record consists of `kind,racer,lap,waypoint`; the lap and waypoint
/// columns are ignored for kinds that do not carry them.
fn parse_script_record(record: &csv::StringRecord) -> Result<Event, ()> {
    let kind = record.get(0).unwrap().trim();
    let racer: RacerId = record.get(1).unwrap().trim().parse().unwrap();
    let lap: i32 = record.get(2).unwrap().trim().parse().unwrap();
    let waypoint: i32 = record.get(3).unwrap().trim().parse().unwrap();
    let kind = match kind {
        "join" => EventKind::RacerJoinedEvent(racer),
        "leave" => EventKind::RacerLeftEvent(racer),
        "local" => EventKind::LocalWaypointEvent(LocalWaypointPtr::new(LocalWaypoint {
            racer,
            waypoint,
        })),
        "remote" => EventKind::RemoteProgressEvent(RemoteProgressPtr::new(RemoteProgress {
            racer,
            lap,
            waypoint,
        })),
        "resync" => EventKind::ProgressResyncEvent(ProgressResyncPtr::new(ProgressResync {
            racer,
            lap,
            waypoint,
        })),
        "prefer_local" => EventKind::StrategyChangedEvent(StrategyChangePtr::new(StrategyChange {
            racer,
            strategy: UpdateStrategy::PreferLocal,
        })),
        "prefer_remote" => EventKind::StrategyChangedEvent(StrategyChangePtr::new(StrategyChange {
            racer,
            strategy: UpdateStrategy::PreferRemote,
        })),
        unknown => {
            error!("Unknown script entry kind {}", unknown);
            return Err(());
        }
    };
    Ok(Event { kind })
}

fn read_script_from_file(file_path: &str) -> Result<Vec<Event>, ()> {
    let mut rdr = csv::Reader::from_path(file_path).map_err(|e| {
        error!("Failed to open script file {}. Error: {}", file_path, e);
    })?;
    let mut events = Vec::new();
    for result in rdr.records() {
        let record = result.unwrap();
        events.push(parse_script_record(&record)?);
    }
    debug!("length of script: {}", events.len());
    Ok(events)
}

fn load_rules(cli: &Cli) -> Result<RaceRules, ()> {
    if let Some(rules_file) = &cli.rules {
        let json = std::fs::read_to_string(rules_file).map_err(|e| {
            error!("Failed to read rules file {}. Error: {}", rules_file, e);
        })?;
        RaceRules::from_json(&json).map_err(|e| {
            error!("Failed to parse rules file {}. Error: {}", rules_file, e);
        })
    } else {
        Ok(RaceRules {
            total_laps: cli.laps,
            waypoints_per_lap: cli.waypoints_per_lap,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Some(script_file) = &cli.script else {
        error!("No update script specified. Use --script");
        Cli::command().print_help().unwrap();
        return Err(());
    };
    let events = read_script_from_file(script_file)?;
    let rules = load_rules(&cli)?;
    info!(
        "Race configured with {} laps, {} waypoints per lap",
        rules.total_laps, rules.waypoints_per_lap
    );

    let eb = EventBus::default();
    let quit_ctx = eb.context();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = quit_ctx.sender.send(Event {
            kind: EventKind::QuitEvent,
        });
    }) {
        error!("Failed to install the ctrl-c handler. Error: {}", e);
    }

    let mut replay = ReplayFeed::new(eb.context(), events, Duration::from_millis(cli.tick_ms));
    let mut lap_tracking = LapTracking::new(rules, eb.context());

    info!("Starting modules...");
    tokio::join!(replay.run(), lap_tracking.run()).0
}
