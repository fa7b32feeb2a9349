//! Run status poller.
//!
//! Owns the polling loop for one run: fetch, deliver the snapshot to the
//! single subscriber, then either sleep one interval or stop on a terminal
//! phase. Exactly one fetch is in flight at a time, so deliveries follow
//! fetch completion order.
//!
//! Cancellation bumps a generation counter. The polling task re-checks its
//! generation under the gate before every effect, so a fetch that resolves
//! after [`RunPoller::stop`] changes nothing and notifies no one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::adapters::StatusSource;
use crate::domain::{RunId, RunPhase, RunSnapshot};

/// Timing policy for one run subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between the end of one fetch and the start of the next
    pub interval: Duration,

    /// Grace period between success and navigation to the results view
    pub settle_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            settle_delay: Duration::from_millis(1500),
        }
    }
}

/// Lifecycle of a poller. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Active,
    Succeeded,
    Failed,
    Cancelled,
}

impl PollerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// State the poller moves to after delivering a snapshot in `phase`
    fn after(phase: RunPhase) -> Self {
        match phase {
            RunPhase::Idle | RunPhase::Running => Self::Active,
            RunPhase::Success => Self::Succeeded,
            RunPhase::Error => Self::Failed,
            RunPhase::Cancelled => Self::Cancelled,
        }
    }
}

/// Errors from poller control calls
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollerError {
    #[error("Poller already started (state: {0:?})")]
    AlreadyStarted(PollerState),
}

/// Receiver of run snapshots.
///
/// Called on the polling task while the poller's gate is held; it must not
/// call back into the poller.
pub trait SnapshotSubscriber: Send + 'static {
    fn on_snapshot(&mut self, snapshot: &RunSnapshot);
}

impl<F> SnapshotSubscriber for F
where
    F: FnMut(&RunSnapshot) + Send + 'static,
{
    fn on_snapshot(&mut self, snapshot: &RunSnapshot) {
        self(snapshot)
    }
}

/// State shared between the poller handle and its task
struct Gate {
    state: PollerState,
    generation: u64,
    fetches: u32,
    subscriber: Option<Box<dyn SnapshotSubscriber>>,
}

impl Gate {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state == PollerState::Active
    }
}

fn lock(gate: &Mutex<Gate>) -> MutexGuard<'_, Gate> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Polls the status of one run and feeds one subscriber
pub struct RunPoller {
    source: Arc<dyn StatusSource>,
    config: PollConfig,
    run_id: Option<RunId>,
    gate: Arc<Mutex<Gate>>,
    handle: Option<JoinHandle<()>>,
}

impl RunPoller {
    /// Create an idle poller
    pub fn new(source: Arc<dyn StatusSource>, config: PollConfig) -> Self {
        Self {
            source,
            config,
            run_id: None,
            gate: Arc::new(Mutex::new(Gate {
                state: PollerState::Idle,
                generation: 0,
                fetches: 0,
                subscriber: None,
            })),
            handle: None,
        }
    }

    /// Start polling `run_id`. The first fetch is issued immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        &mut self,
        run_id: RunId,
        subscriber: impl SnapshotSubscriber,
    ) -> Result<(), PollerError> {
        let generation = {
            let mut gate = lock(&self.gate);
            if gate.state != PollerState::Idle {
                return Err(PollerError::AlreadyStarted(gate.state));
            }
            gate.state = PollerState::Active;
            gate.subscriber = Some(Box::new(subscriber));
            gate.generation
        };

        info!(%run_id, interval_ms = self.config.interval.as_millis() as u64, "Starting run poller");

        let task = PollTask {
            run_id: run_id.clone(),
            source: Arc::clone(&self.source),
            interval: self.config.interval,
            gate: Arc::clone(&self.gate),
            generation,
        };
        self.run_id = Some(run_id);
        self.handle = Some(tokio::spawn(task.run()));

        Ok(())
    }

    /// Stop polling. Idempotent; safe in any state.
    ///
    /// Once this returns no subscriber notification fires, even for a fetch
    /// that is still in flight.
    pub fn stop(&mut self) {
        let was_active = {
            let mut gate = lock(&self.gate);
            gate.generation += 1;
            gate.subscriber = None;
            if gate.state == PollerState::Active {
                gate.state = PollerState::Cancelled;
                true
            } else {
                false
            }
        };

        if let Some(handle) = self.handle.take() {
            handle.abort();
        }

        if was_active {
            if let Some(ref run_id) = self.run_id {
                info!(%run_id, "Run poller stopped");
            }
        }
    }

    /// Stop and wait for the polling task to finish
    pub async fn shutdown(mut self) {
        let handle = self.handle.take();
        self.stop();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }

    pub fn state(&self) -> PollerState {
        lock(&self.gate).state
    }

    /// Number of status requests issued so far
    pub fn fetch_count(&self) -> u32 {
        lock(&self.gate).fetches
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }
}

impl Drop for RunPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The polling loop itself, one per started poller
struct PollTask {
    run_id: RunId,
    source: Arc<dyn StatusSource>,
    interval: Duration,
    gate: Arc<Mutex<Gate>>,
    generation: u64,
}

impl PollTask {
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    async fn run(self) {
        loop {
            {
                let mut gate = lock(&self.gate);
                if !gate.is_current(self.generation) {
                    return;
                }
                gate.fetches += 1;
                debug!(fetch = gate.fetches, "Fetching run status");
            }

            let snapshot = self.fetch().await;

            let next = {
                let mut gate = lock(&self.gate);
                if !gate.is_current(self.generation) {
                    debug!("Discarding status fetched after cancellation");
                    return;
                }

                let next = PollerState::after(snapshot.phase);
                gate.state = next;
                if let Some(subscriber) = gate.subscriber.as_mut() {
                    subscriber.on_snapshot(&snapshot);
                }
                if next.is_terminal() {
                    gate.subscriber = None;
                }
                next
            };

            if next.is_terminal() {
                info!(phase = %snapshot.phase, state = ?next, "Run reached a terminal phase, polling stopped");
                return;
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    /// One status request; failures become a synthetic error snapshot
    async fn fetch(&self) -> RunSnapshot {
        match self.source.fetch_status(&self.run_id).await {
            Ok(response) if response.run_id != self.run_id => {
                warn!(reported = %response.run_id, "Status response is for a different run");
                RunSnapshot::transport_failure(
                    self.run_id.clone(),
                    format!(
                        "Malformed response: status for run {} returned for {}",
                        response.run_id, self.run_id
                    ),
                )
            }
            Ok(response) => RunSnapshot::from_response(response),
            Err(err) => {
                warn!(error = %err, "Status request failed");
                RunSnapshot::transport_failure(
                    self.run_id.clone(),
                    format!("Failed to fetch status: {}", err),
                )
            }
        }
    }
}
