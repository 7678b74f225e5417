//! The 3-2-1 countdown between pressing record and capture start.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::command::StudioCommand;

pub const COUNTDOWN_FROM: u8 = 3;
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Sends `CountdownTick(n)` for n = from-1 .. 1, one per `tick`, then
/// `CountdownElapsed` one tick later. The caller shows `from` immediately.
pub fn spawn_countdown(
    events: mpsc::Sender<StudioCommand>,
    from: u8,
    tick: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        for remaining in (0..from).rev() {
            ticker.tick().await;
            let event = if remaining == 0 {
                StudioCommand::CountdownElapsed
            } else {
                StudioCommand::CountdownTick(remaining)
            };
            debug!("Countdown: {:?}", event);
            if events.send(event).await.is_err() {
                return;
            }
        }
    })
}
