// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use async_trait::async_trait;
use module_core::{Event, EventKind, Module, ModuleCtx};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{error, info};

/// The `ReplayFeed` module publishes a recorded sequence of events onto
/// the bus at a constant cadence, one event per tick.
///
/// It stands in for the movement simulation and the replication layer
/// when driving the progress tracking from a recorded script, e.g. in
/// headless runs. Once the script is exhausted the module stays idle
/// until it receives a quit event.
pub struct ReplayFeed {
    ctx: ModuleCtx,
    events: Vec<Event>,
    interval: Duration,
}

impl ReplayFeed {
    /// Creates a feed that replays `events` in order, spaced by
    /// `interval`.
    pub fn new(ctx: ModuleCtx, events: Vec<Event>, interval: Duration) -> Self {
        ReplayFeed {
            ctx,
            events,
            interval,
        }
    }
}

#[async_trait]
impl Module for ReplayFeed {
    async fn run(&mut self) -> Result<(), ()> {
        let sender = self.ctx.sender.clone();
        let events = std::mem::take(&mut self.events);
        let interval = self.interval;
        let feed_task_handle = tokio::spawn(async move {
            replay_feed_task(sender, events, interval).await;
        });

        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                feed_task_handle.abort();
                                run = false;
                            }
                        }
                        Err(e) => error!("Failed to receive event in module ReplayFeed. Error: {}", e),
                    }
                }
            }
        }
        Ok(())
    }
}

async fn replay_feed_task(
    sender: tokio::sync::broadcast::Sender<Event>,
    events: Vec<Event>,
    interval: Duration,
) {
    let mut timer = tokio::time::interval(interval);
    let mut pending: VecDeque<Event> = events.into();
    while let Some(event) = pending.pop_front() {
        timer.tick().await;
        let _ = sender.send(event);
    }
    info!("Replay script exhausted");
}
