//! Shared fixtures for integration tests: a scripted status source and a
//! navigator that records calls.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use ltuas::adapters::{ApiError, StatusSource};
use ltuas::core::{Navigator, Surface};
use ltuas::domain::{BackendNodeState, RunId, RunPhase, StatusResponse};

/// One scripted answer to `fetch_status`
pub enum Reply {
    Status(StatusResponse),
    Fail(String),
    /// Block until the notify fires, then answer
    Held(Arc<Notify>, StatusResponse),
}

/// Status source that plays back a script, then repeats `running`
pub struct ScriptedSource {
    replies: Mutex<VecDeque<Reply>>,
    fetched_at: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fetched_at: Mutex::new(Vec::new()),
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched_at.lock().unwrap().len()
    }

    /// Instants at which each fetch started
    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetched_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_status(&self, run_id: &RunId) -> Result<StatusResponse, ApiError> {
        self.fetched_at.lock().unwrap().push(Instant::now());
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Status(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(ApiError::Transport(message)),
            Some(Reply::Held(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
            None => Ok(status(run_id.as_str(), RunPhase::Running, &[])),
        }
    }
}

/// Build a status response
pub fn status(run_id: &str, phase: RunPhase, nodes: &[(&str, BackendNodeState)]) -> StatusResponse {
    StatusResponse {
        run_id: RunId::new(run_id),
        status: phase,
        nodes: nodes
            .iter()
            .map(|(id, state)| (id.to_string(), *state))
            .collect::<HashMap<_, _>>(),
        result: None,
        error: None,
        logs: Vec::new(),
        created_at: String::new(),
        updated_at: String::new(),
    }
}

/// Navigator that records every call
#[derive(Default)]
pub struct RecordingNavigator {
    calls: Mutex<Vec<(RunId, Surface, Instant)>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(RunId, Surface, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to_results(&self, run_id: &RunId, surface: Surface) {
        self.calls
            .lock()
            .unwrap()
            .push((run_id.clone(), surface, Instant::now()));
    }
}
