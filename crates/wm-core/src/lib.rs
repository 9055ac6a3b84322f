//! wm-core: Core types and state for WorkMate
//!
//! This crate provides the message model, citation-marker annotation,
//! conversation state, and the collaborator traits the WorkMate chat client
//! is built on.

pub mod citation;
pub mod conversation;
pub mod error;
pub mod message;
pub mod service;
pub mod workspace;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use citation::{annotate, references, unresolved_markers, Fragment};
pub use conversation::{fetch_reply, Conversation};
pub use error::Error;
pub use message::{new_message_id, Citation, Message, Role};
pub use service::{Backend, ChatService, WorkspaceDirectory};
pub use workspace::{AnalysisStatus, RecentAnalysis, Workspace};

pub type Result<T> = std::result::Result<T, Error>;
