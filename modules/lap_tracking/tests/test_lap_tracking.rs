use common::progress::{LocalWaypoint, ProgressResync, RemoteProgress, StrategyChange, UpdateStrategy};
use common::race::RacerId;
use common::test_helper::rules::get_rules;
use lap_tracking::LapTracking;
use module_core::test_helper::{stop_module, wait_for_event};
use module_core::{
    Event, EventBus, EventKind, EventKindType, LocalWaypointPtr, Module, ProgressResyncPtr,
    RemoteProgressPtr, StrategyChangePtr,
};
use std::time::Duration;

fn create_lap_tracking(event_bus: &EventBus) -> tokio::task::JoinHandle<Result<(), ()>> {
    let module = LapTracking::new(get_rules(), event_bus.context());
    tokio::spawn(async move {
        let mut module = module;
        module.run().await
    })
}

fn publish_join(event_bus: &EventBus, racer: RacerId) {
    event_bus.publish(&Event {
        kind: EventKind::RacerJoinedEvent(racer),
    });
}

fn publish_local(event_bus: &EventBus, racer: RacerId, waypoint: i32) {
    event_bus.publish(&Event {
        kind: EventKind::LocalWaypointEvent(LocalWaypointPtr::new(LocalWaypoint {
            racer,
            waypoint,
        })),
    });
}

fn publish_remote(event_bus: &EventBus, racer: RacerId, lap: i32, waypoint: i32) {
    event_bus.publish(&Event {
        kind: EventKind::RemoteProgressEvent(RemoteProgressPtr::new(RemoteProgress {
            racer,
            lap,
            waypoint,
        })),
    });
}

fn publish_strategy(event_bus: &EventBus, racer: RacerId, strategy: UpdateStrategy) {
    event_bus.publish(&Event {
        kind: EventKind::StrategyChangedEvent(StrategyChangePtr::new(StrategyChange {
            racer,
            strategy,
        })),
    });
}

fn publish_resync(event_bus: &EventBus, racer: RacerId, lap: i32, waypoint: i32) {
    event_bus.publish(&Event {
        kind: EventKind::ProgressResyncEvent(ProgressResyncPtr::new(ProgressResync {
            racer,
            lap,
            waypoint,
        })),
    });
}

fn assert_lap_change(event: Event, exp_racer: RacerId, exp_lap: i32) {
    match event.kind {
        EventKind::LapIncreasedEvent(change)
        | EventKind::LapDecreasedEvent(change)
        | EventKind::RacerFinishedEvent(change) => {
            assert_eq!(change.racer, exp_racer);
            assert_eq!(change.lap, exp_lap);
        }
        kind => panic!("Event {:?} carries no lap change", kind),
    }
}

#[tokio::test]
#[test_log::test]
pub async fn local_drive_completes_laps() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut handle = create_lap_tracking(&event_bus);

    {
        // First seam crossing
        publish_join(&event_bus, 7);
        publish_local(&event_bus, 7, 50);
        publish_local(&event_bus, 7, 95);
        publish_local(&event_bus, 7, 0);
        let event = wait_for_event(
            &mut receiver,
            Duration::from_millis(100),
            EventKindType::LapIncreasedEvent,
        )
        .await;
        assert_lap_change(event, 7, 1);
    }

    {
        // Final lap
        publish_local(&event_bus, 7, 50);
        publish_local(&event_bus, 7, 95);
        publish_local(&event_bus, 7, 2);
        let event = wait_for_event(
            &mut receiver,
            Duration::from_millis(100),
            EventKindType::LapIncreasedEvent,
        )
        .await;
        assert_lap_change(event, 7, 2);
        let event = wait_for_event(
            &mut receiver,
            Duration::from_millis(100),
            EventKindType::RacerFinishedEvent,
        )
        .await;
        assert_lap_change(event, 7, 2);
    }

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
pub async fn remote_progress_applied_while_remote_preferred() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut handle = create_lap_tracking(&event_bus);

    publish_join(&event_bus, 3);
    publish_strategy(&event_bus, 3, UpdateStrategy::PreferRemote);
    publish_remote(&event_bus, 3, 1, 10);

    // The overwrite itself emits no transition; hand authority back to the
    // local stream and complete the final lap from the replicated state.
    publish_strategy(&event_bus, 3, UpdateStrategy::PreferLocal);
    publish_local(&event_bus, 3, 50);
    publish_local(&event_bus, 3, 95);
    publish_local(&event_bus, 3, 0);
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LapIncreasedEvent,
    )
    .await;
    assert_lap_change(event, 3, 2);
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::RacerFinishedEvent,
    )
    .await;
    assert_lap_change(event, 3, 2);

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
pub async fn resync_overwrites_progress() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut handle = create_lap_tracking(&event_bus);

    publish_join(&event_bus, 5);
    publish_local(&event_bus, 5, 50);
    publish_local(&event_bus, 5, 95);
    publish_local(&event_bus, 5, 0);
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LapIncreasedEvent,
    )
    .await;
    assert_lap_change(event, 5, 1);

    // Reconnect resync back to the first lap.
    publish_resync(&event_bus, 5, 0, 8);
    publish_local(&event_bus, 5, 10);
    publish_local(&event_bus, 5, 50);
    publish_local(&event_bus, 5, 95);
    publish_local(&event_bus, 5, 2);
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LapIncreasedEvent,
    )
    .await;
    assert_lap_change(event, 5, 1);

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
pub async fn updates_for_unknown_racer_dropped() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut handle = create_lap_tracking(&event_bus);

    // Never joined, must not produce any transition.
    publish_local(&event_bus, 99, 95);

    publish_join(&event_bus, 1);
    publish_local(&event_bus, 1, 50);
    publish_local(&event_bus, 1, 95);
    publish_local(&event_bus, 1, 0);
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LapIncreasedEvent,
    )
    .await;
    assert_lap_change(event, 1, 1);

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
pub async fn rejoin_restarts_progress() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut handle = create_lap_tracking(&event_bus);

    publish_join(&event_bus, 2);
    publish_local(&event_bus, 2, 50);
    publish_local(&event_bus, 2, 95);
    publish_local(&event_bus, 2, 0);
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LapIncreasedEvent,
    )
    .await;
    assert_lap_change(event, 2, 1);

    // A re-join replaces the tracker; the next seam crossing counts from
    // a fresh lap 0 instead of finishing the race.
    publish_join(&event_bus, 2);
    publish_local(&event_bus, 2, 50);
    publish_local(&event_bus, 2, 95);
    publish_local(&event_bus, 2, 0);
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LapIncreasedEvent,
    )
    .await;
    assert_lap_change(event, 2, 1);

    stop_module(&event_bus, &mut handle).await;
}
