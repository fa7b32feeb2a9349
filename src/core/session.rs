//! Run session: one poller, projector and completion router per view.
//!
//! Both UI surfaces (full page and modal dialog) drive a run through this
//! type, so interval, settle delay and cancellation behave identically.
//! Sessions share nothing: each owns its own timer, gate and status table.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::poller::{PollConfig, PollerError, PollerState, RunPoller};
use super::projector::{RunStatusProjector, RunView};
use super::router::{CompletionRouter, Navigator, RouterOutcome, Surface};
use crate::adapters::StatusSource;
use crate::domain::RunId;
use crate::graph::PipelineGraph;

/// Live subscription to one run
pub struct RunSession {
    source: Arc<dyn StatusSource>,
    navigator: Arc<dyn Navigator>,
    config: PollConfig,
    surface: Surface,
    projector: RunStatusProjector,
    poller: Option<RunPoller>,
    router: Option<JoinHandle<RouterOutcome>>,
}

impl RunSession {
    /// Open a session and start polling `run_id` immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(
        run_id: RunId,
        source: Arc<dyn StatusSource>,
        navigator: Arc<dyn Navigator>,
        config: PollConfig,
        surface: Surface,
    ) -> Result<Self, PollerError> {
        let mut session = Self {
            source,
            navigator,
            config,
            surface,
            projector: RunStatusProjector::new(PipelineGraph::reference()),
            poller: None,
            router: None,
        };
        session.subscribe(run_id)?;
        Ok(session)
    }

    fn subscribe(&mut self, run_id: RunId) -> Result<(), PollerError> {
        info!(%run_id, surface = ?self.surface, "Opening run session");
        self.projector.reset(run_id.clone());

        let router = CompletionRouter::new(self.config.settle_delay, self.surface);
        let views = self.projector.subscribe();
        let navigator = Arc::clone(&self.navigator);
        self.router = Some(tokio::spawn(router.drive(views, navigator)));

        let mut poller = RunPoller::new(Arc::clone(&self.source), self.config);
        poller.start(run_id, self.projector.clone())?;
        self.poller = Some(poller);

        Ok(())
    }

    /// Reader of the projected view
    pub fn view(&self) -> watch::Receiver<RunView> {
        self.projector.subscribe()
    }

    /// Copy of the current view
    pub fn current(&self) -> RunView {
        self.projector.current()
    }

    pub fn projector(&self) -> &RunStatusProjector {
        &self.projector
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.projector.current().run_id
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn poller_state(&self) -> Option<PollerState> {
        self.poller.as_ref().map(RunPoller::state)
    }

    /// Follow a different run; the node table starts over at `initial`
    pub fn switch_run(&mut self, run_id: RunId) -> Result<(), PollerError> {
        self.close();
        self.subscribe(run_id)
    }

    /// Wait for the completion router to finish.
    ///
    /// Returns `None` if the session was already closed or waited on.
    pub async fn wait(&mut self) -> Option<RouterOutcome> {
        let handle = self.router.take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(err) if err.is_cancelled() => Some(RouterOutcome::TornDown),
            Err(err) => {
                warn!(error = %err, "Completion router task failed");
                None
            }
        }
    }

    /// Tear the session down. No notification or navigation fires afterwards.
    pub fn close(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.projector.teardown();
        if let Some(router) = self.router.take() {
            router.abort();
        }
    }
}

impl Drop for RunSession {
    fn drop(&mut self) {
        self.close();
    }
}
