//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Error;
use crate::message::Message;
use crate::service::{ChatService, WorkspaceDirectory};
use crate::workspace::{RecentAnalysis, Workspace};

/// A mock chat service that returns pre-configured results.
pub struct MockChatService {
    results: Mutex<Vec<Result<Message, Error>>>,
    /// Captured request texts (for assertion).
    pub captured_requests: Mutex<Vec<String>>,
    pub workspaces: Vec<Workspace>,
    pub analyses: Vec<RecentAnalysis>,
}

impl MockChatService {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            workspaces: Vec::new(),
            analyses: Vec::new(),
        }
    }

    pub fn with_workspaces(mut self, workspaces: Vec<Workspace>) -> Self {
        self.workspaces = workspaces;
        self
    }

    /// Queue a plain assistant reply.
    /// Results are returned in FIFO order (first queued = first returned).
    pub fn queue_reply(&self, content: &str) {
        self.queue_message(Message::assistant(content));
    }

    /// Queue a fully built reply message.
    pub fn queue_message(&self, message: Message) {
        self.results.lock().unwrap().insert(0, Ok(message));
    }

    /// Queue a failure for the next request.
    pub fn queue_error(&self, error: Error) {
        self.results.lock().unwrap().insert(0, Err(error));
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    /// Get the last captured request.
    pub fn last_request(&self) -> Option<String> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockChatService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send_chat_message(&self, text: &str) -> Result<Message, Error> {
        self.captured_requests.lock().unwrap().push(text.to_string());
        self.results
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(Error::Unknown("No mock reply queued".to_string())))
    }
}

#[async_trait]
impl WorkspaceDirectory for MockChatService {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, Error> {
        Ok(self.workspaces.clone())
    }

    async fn recent_analyses(&self) -> Result<Vec<RecentAnalysis>, Error> {
        Ok(self.analyses.clone())
    }
}

/// A chat service whose replies never arrive.
pub struct StalledChatService;

#[async_trait]
impl ChatService for StalledChatService {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn send_chat_message(&self, _text: &str) -> Result<Message, Error> {
        std::future::pending().await
    }
}

#[async_trait]
impl WorkspaceDirectory for StalledChatService {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, Error> {
        Ok(Vec::new())
    }
}
