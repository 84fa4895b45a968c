//! Lock control for a single locker board.
//!
//! This crate turns bay-level requests into exchanges on the board's line:
//!
//! - [`LockController`]: `open`, `query_status` and `query_all`, serialized on
//!   one exclusive transport.
//! - [`StatusReporter`]: fresh status checks with the latest observation per
//!   bay kept for display.
//! - [`wait_for_state`]: caller-side polling until a bay reaches a state.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use locker_controller::{LockController, StatusReporter};
//! use locker_core::{Bay, LockState};
//! use locker_hardware::{AnyTransport, BoardOptions, SimulatedBoard};
//! use locker_protocol::AnyCodec;
//!
//! #[tokio::main]
//! async fn main() {
//!     let codec = AnyCodec::default();
//!     let (board, _handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
//!     let controller = Arc::new(LockController::new(AnyTransport::from(board), codec));
//!     let reporter = StatusReporter::new(Arc::clone(&controller));
//!
//!     let statuses = reporter.check_all().await;
//!     assert!(statuses.iter().all(|s| s.state == LockState::Locked));
//!     assert!(reporter.last_known(Bay::new(1).unwrap()).await.is_some());
//! }
//! ```

pub mod controller;
pub mod poll;
pub mod reporter;

pub use controller::{Delivery, LockController};
pub use poll::{PollOptions, PollOutcome, wait_for_state};
pub use reporter::{Observation, StatusReporter};
