//! Concurrent execution of all slots under one shared deadline.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use super::slot::{Slot, SlotFailure, SlotOutcome};

/// Runs every configured slot concurrently.
#[derive(Debug, Clone)]
pub struct FanOut {
    slots: Vec<Arc<Slot>>,
    wait_budget: Duration,
}

impl FanOut {
    /// Create a fan-out over `slots` with an overall `wait_budget`.
    pub fn new(slots: Vec<Slot>, wait_budget: Duration) -> Self {
        Self {
            slots: slots.into_iter().map(Arc::new).collect(),
            wait_budget,
        }
    }

    /// Labels of the configured slots, in order.
    pub fn labels(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.label()).collect()
    }

    /// The overall deadline applied to each run.
    pub fn wait_budget(&self) -> Duration {
        self.wait_budget
    }

    /// Run all slots and return one outcome per slot, in slot order.
    ///
    /// Each slot runs as its own task. A slot still pending when the
    /// budget elapses yields an empty outcome tagged
    /// [`SlotFailure::TimedOut`]; its task is left to finish in the
    /// background and the result is discarded.
    pub async fn run(&self, query: &str, limit: usize) -> Vec<SlotOutcome> {
        let deadline = Instant::now() + self.wait_budget;

        let pending = self.slots.iter().map(|slot| {
            let task_slot = Arc::clone(slot);
            let query = query.to_string();
            let label = slot.label().to_string();
            let handle = tokio::spawn(async move { task_slot.run(&query, limit).await });

            async move {
                match tokio::time::timeout_at(deadline, handle).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(join_err)) => {
                        tracing::warn!(slot = %label, error = %join_err, "slot task aborted");
                        SlotOutcome::empty(label, SlotFailure::Aborted(join_err.to_string()))
                    }
                    Err(_) => {
                        tracing::warn!(slot = %label, "slot exceeded wait budget");
                        SlotOutcome::empty(label, SlotFailure::TimedOut)
                    }
                }
            }
        });

        let outcomes = join_all(pending).await;
        for outcome in &outcomes {
            tracing::debug!(slot = %outcome.label, count = outcome.results.len(), "slot finished");
        }
        outcomes
    }
}
