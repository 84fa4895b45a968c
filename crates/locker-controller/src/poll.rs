//! Polling until a bay reaches a state.
//!
//! Used after opening a bay to wait for the door to be shut again. The
//! controller itself never retries; this loop belongs to the caller.

use std::time::Duration;

use locker_core::constants::DEFAULT_POLL_INTERVAL_MS;
use locker_core::{Bay, LockState};
use locker_hardware::Transport;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::debug;

use crate::reporter::StatusReporter;

/// Timing of a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between status checks. The first check is immediate.
    pub interval: Duration,
    /// Give up after this long.
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Result of [`wait_for_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The bay reported the target state after `attempts` checks.
    Reached { attempts: u32 },
    /// Time ran out; `last` is the final state seen.
    TimedOut { last: LockState },
}

impl PollOutcome {
    pub fn is_reached(&self) -> bool {
        matches!(self, PollOutcome::Reached { .. })
    }
}

/// Check `bay` every `options.interval` until it reports `target` or
/// `options.timeout` passes.
pub async fn wait_for_state<T: Transport>(
    reporter: &StatusReporter<T>,
    bay: Bay,
    target: LockState,
    options: PollOptions,
) -> PollOutcome {
    let mut last = LockState::Unknown;
    let mut attempts = 0u32;

    let polled = timeout(options.timeout, async {
        let mut ticker = interval(options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            attempts += 1;
            last = reporter.check(bay).await;
            debug!(bay = %bay, state = %last, attempt = attempts, "Polled bay");
            if last == target {
                return;
            }
        }
    })
    .await;

    match polled {
        Ok(()) => PollOutcome::Reached { attempts },
        Err(_) => PollOutcome::TimedOut { last },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::LockController;
    use locker_hardware::{BoardOptions, SimulatedBoard, SimulatedBoardHandle};
    use locker_protocol::AnyCodec;
    use std::sync::Arc;

    fn bay(id: u8) -> Bay {
        Bay::new(id).unwrap()
    }

    fn reporter(options: BoardOptions) -> (StatusReporter<SimulatedBoard>, SimulatedBoardHandle) {
        let codec = AnyCodec::default();
        let (board, handle) = SimulatedBoard::new(codec.clone(), options);
        (
            StatusReporter::new(Arc::new(LockController::new(board, codec))),
            handle,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_in_state() {
        let (reporter, _handle) = reporter(BoardOptions::default());

        let outcome = wait_for_state(&reporter, bay(1), LockState::Locked, PollOptions::default()).await;

        assert_eq!(outcome, PollOutcome::Reached { attempts: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_door_closes_after_open() {
        let (reporter, _handle) = reporter(BoardOptions::default());
        reporter.controller().open(bay(4)).await.unwrap();

        let outcome = wait_for_state(&reporter, bay(4), LockState::Locked, PollOptions::default()).await;

        // Two polls see the door open, the third sees it shut
        assert_eq!(outcome, PollOutcome::Reached { attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_last_state() {
        let options = BoardOptions {
            auto_close_after: None,
            ..BoardOptions::default()
        };
        let (reporter, _handle) = reporter(options);
        reporter.controller().open(bay(2)).await.unwrap();

        let poll = PollOptions {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(7),
        };
        let start = tokio::time::Instant::now();
        let outcome = wait_for_state(&reporter, bay(2), LockState::Locked, poll).await;

        assert_eq!(outcome, PollOutcome::TimedOut { last: LockState::Unlocked });
        assert!(!outcome.is_reached());
        assert!(start.elapsed() >= Duration::from_secs(7));
    }
}
