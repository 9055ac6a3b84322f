use async_trait::async_trait;

use crate::error::Error;
use crate::message::Message;
use crate::workspace::{RecentAnalysis, Workspace};

/// Messaging collaborator: turns a user question into an assistant reply.
#[async_trait]
pub trait ChatService: Send + Sync {
    fn name(&self) -> &str;

    /// Send `text` and wait for the assistant's reply.
    ///
    /// Failures carry no partial reply; callers leave their conversation
    /// unchanged.
    async fn send_chat_message(&self, text: &str) -> Result<Message, Error>;
}

/// Read-only directory of connected knowledge-base workspaces.
#[async_trait]
pub trait WorkspaceDirectory: Send + Sync {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, Error>;

    /// Recently analysed documents. Backends without this feed return nothing.
    async fn recent_analyses(&self) -> Result<Vec<RecentAnalysis>, Error> {
        Ok(Vec::new())
    }
}

/// A backend serving both collaborator roles.
pub trait Backend: ChatService + WorkspaceDirectory {
    fn as_chat(&self) -> &dyn ChatService;
}

impl<T: ChatService + WorkspaceDirectory> Backend for T {
    fn as_chat(&self) -> &dyn ChatService {
        self
    }
}
