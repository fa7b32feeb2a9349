//! Completion router.
//!
//! Watches the projected run phase and performs the one side effect each
//! terminal phase allows:
//! - `success`: after the settle delay, navigate to the results view (once)
//! - `error`: nothing; the failure stays on screen
//! - `cancelled`: nothing; teardown acknowledgement only

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument};

use super::projector::RunView;
use crate::domain::{RunId, RunPhase};

/// UI surface a run session is displayed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Full-page run view
    Page,
    /// Modal dialog opened from the upload form; dismissed before navigating
    Dialog,
}

/// Collaborator that performs navigation to the results view
pub trait Navigator: Send + Sync {
    fn navigate_to_results(&self, run_id: &RunId, surface: Surface);
}

/// Decision for one observed view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    /// Nothing to do yet
    Wait,
    /// Navigate to the results of `run_id` after `delay`
    ScheduleNavigation { run_id: RunId, delay: Duration },
    /// Run failed; keep the display as is
    Freeze,
    /// View torn down
    Teardown,
}

/// How a router finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterOutcome {
    Navigated(RunId),
    Failed(Option<String>),
    TornDown,
}

/// Phase-transition observer for one session
#[derive(Debug, Clone)]
pub struct CompletionRouter {
    settle_delay: Duration,
    surface: Surface,
    navigated_for: Option<RunId>,
    frozen_for: Option<RunId>,
}

impl CompletionRouter {
    pub fn new(settle_delay: Duration, surface: Surface) -> Self {
        Self {
            settle_delay,
            surface,
            navigated_for: None,
            frozen_for: None,
        }
    }

    /// Decide what a view calls for.
    ///
    /// Idempotent on phase: a second `success` for the same run yields
    /// [`RouterAction::Wait`], however many notifications carry it.
    pub fn observe(&mut self, view: &RunView) -> RouterAction {
        let Some(run_id) = view.run_id.clone() else {
            return RouterAction::Wait;
        };

        match view.phase {
            RunPhase::Success => {
                if self.navigated_for.as_ref() == Some(&run_id) {
                    return RouterAction::Wait;
                }
                self.navigated_for = Some(run_id.clone());
                RouterAction::ScheduleNavigation {
                    run_id,
                    delay: self.settle_delay,
                }
            }
            RunPhase::Error => {
                if self.frozen_for.as_ref() == Some(&run_id) {
                    return RouterAction::Wait;
                }
                self.frozen_for = Some(run_id);
                RouterAction::Freeze
            }
            RunPhase::Cancelled => RouterAction::Teardown,
            RunPhase::Idle | RunPhase::Running => RouterAction::Wait,
        }
    }

    /// Follow `views` until the run settles, navigating on success.
    #[instrument(skip_all)]
    pub async fn drive(
        mut self,
        mut views: watch::Receiver<RunView>,
        navigator: Arc<dyn Navigator>,
    ) -> RouterOutcome {
        loop {
            let view = views.borrow_and_update().clone();

            match self.observe(&view) {
                RouterAction::Wait => {}
                RouterAction::Freeze => {
                    info!(error = ?view.error_message, "Run failed, display frozen");
                    return RouterOutcome::Failed(view.error_message);
                }
                RouterAction::Teardown => {
                    debug!("View torn down");
                    return RouterOutcome::TornDown;
                }
                RouterAction::ScheduleNavigation { run_id, delay } => {
                    return self.navigate_after(run_id, delay, views, navigator).await;
                }
            }

            if views.changed().await.is_err() {
                return RouterOutcome::TornDown;
            }
        }
    }

    /// Wait out the settle delay, then navigate unless torn down meanwhile
    async fn navigate_after(
        self,
        run_id: RunId,
        delay: Duration,
        mut views: watch::Receiver<RunView>,
        navigator: Arc<dyn Navigator>,
    ) -> RouterOutcome {
        debug!(%run_id, delay_ms = delay.as_millis() as u64, "Run succeeded, waiting before navigation");
        let deadline = Instant::now() + delay;

        loop {
            tokio::select! {
                biased;
                changed = views.changed() => {
                    if changed.is_err() || views.borrow().phase == RunPhase::Cancelled {
                        debug!(%run_id, "Torn down during settle delay, navigation skipped");
                        return RouterOutcome::TornDown;
                    }
                }
                _ = sleep_until(deadline) => break,
            }
        }

        if views.borrow().phase == RunPhase::Cancelled {
            return RouterOutcome::TornDown;
        }

        info!(%run_id, surface = ?self.surface, "Navigating to results");
        navigator.navigate_to_results(&run_id, self.surface);
        RouterOutcome::Navigated(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PipelineGraph;

    fn view(run: &str, phase: RunPhase) -> RunView {
        RunView {
            run_id: Some(RunId::new(run)),
            phase,
            nodes: PipelineGraph::reference().initial_table(),
            error_message: None,
            result: None,
            logs: Vec::new(),
            updated_at: None,
        }
    }

    #[test]
    fn test_success_schedules_navigation_once() {
        let mut router = CompletionRouter::new(Duration::from_millis(1500), Surface::Page);

        assert_eq!(
            router.observe(&view("r1", RunPhase::Success)),
            RouterAction::ScheduleNavigation {
                run_id: RunId::new("r1"),
                delay: Duration::from_millis(1500),
            }
        );
        assert_eq!(router.observe(&view("r1", RunPhase::Success)), RouterAction::Wait);
    }

    #[test]
    fn test_new_run_can_navigate_again() {
        let mut router = CompletionRouter::new(Duration::ZERO, Surface::Dialog);
        router.observe(&view("r1", RunPhase::Success));

        assert!(matches!(
            router.observe(&view("r2", RunPhase::Success)),
            RouterAction::ScheduleNavigation { .. }
        ));
    }

    #[test]
    fn test_running_and_idle_wait() {
        let mut router = CompletionRouter::new(Duration::ZERO, Surface::Page);
        assert_eq!(router.observe(&view("r1", RunPhase::Idle)), RouterAction::Wait);
        assert_eq!(router.observe(&view("r1", RunPhase::Running)), RouterAction::Wait);
    }

    #[test]
    fn test_error_freezes_and_cancel_tears_down() {
        let mut router = CompletionRouter::new(Duration::ZERO, Surface::Page);
        assert_eq!(router.observe(&view("r1", RunPhase::Error)), RouterAction::Freeze);
        assert_eq!(router.observe(&view("r1", RunPhase::Error)), RouterAction::Wait);
        assert_eq!(router.observe(&view("r1", RunPhase::Cancelled)), RouterAction::Teardown);
    }

    #[test]
    fn test_view_without_run_waits() {
        let mut router = CompletionRouter::new(Duration::ZERO, Surface::Page);
        let mut unbound = view("r1", RunPhase::Success);
        unbound.run_id = None;
        assert_eq!(router.observe(&unbound), RouterAction::Wait);
    }
}
