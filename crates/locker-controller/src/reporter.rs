//! Status reporter.
//!
//! Every check goes to the board; the reporter only remembers what it saw and
//! when. Remembered observations are for display and diagnostics and never
//! stand in for a fresh query.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use locker_core::constants::BAY_COUNT;
use locker_core::{Bay, BayStatus, LockState};
use locker_hardware::Transport;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::controller::LockController;

/// State of a bay as read from the board at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub state: LockState,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Observation of `state` stamped with the current time.
    pub fn now(state: LockState) -> Self {
        Self {
            state,
            observed_at: Utc::now(),
        }
    }
}

/// Reads lock states through a shared controller and keeps the latest
/// observation per bay.
#[derive(Debug)]
pub struct StatusReporter<T> {
    controller: Arc<LockController<T>>,
    observations: RwLock<[Option<Observation>; BAY_COUNT]>,
}

impl<T: Transport> StatusReporter<T> {
    pub fn new(controller: Arc<LockController<T>>) -> Self {
        Self {
            controller,
            observations: RwLock::new([None; BAY_COUNT]),
        }
    }

    pub fn controller(&self) -> &Arc<LockController<T>> {
        &self.controller
    }

    /// Query `bay` and record the result.
    pub async fn check(&self, bay: Bay) -> LockState {
        let obs = self.controller.observe(bay).await;
        self.record(bay, obs).await;
        obs.state
    }

    /// Query every bay in order and record the results.
    pub async fn check_all(&self) -> Vec<BayStatus> {
        let observed = self.controller.observe_all().await;

        let mut observations = self.observations.write().await;
        for &(bay, obs) in &observed {
            keep_newer(&mut observations[bay.index()], obs);
        }
        observed
            .into_iter()
            .map(|(bay, obs)| BayStatus::new(bay, obs.state))
            .collect()
    }

    /// Most recent observation of `bay`, if it was ever checked.
    pub async fn last_known(&self, bay: Bay) -> Option<Observation> {
        self.observations.read().await[bay.index()]
    }

    /// Most recent observations of all bays that were checked, by bay.
    pub async fn snapshot(&self) -> Vec<(Bay, Observation)> {
        let observations = self.observations.read().await;
        Bay::all()
            .filter_map(|bay| observations[bay.index()].map(|obs| (bay, obs)))
            .collect()
    }

    async fn record(&self, bay: Bay, obs: Observation) {
        keep_newer(&mut self.observations.write().await[bay.index()], obs);
    }
}

/// Stamps are taken while the line is held, so a reading that finished
/// before the stored one never replaces it.
fn keep_newer(slot: &mut Option<Observation>, obs: Observation) {
    if slot.is_none_or(|current| current.observed_at <= obs.observed_at) {
        *slot = Some(obs);
    }
}
