//! wm-services: Backend implementations for WorkMate
//!
//! `SimulatedBackend` answers offline with canned replies; `HttpBackend`
//! talks to a WorkMate REST server.

pub mod http;
pub mod simulated;

pub use http::{HttpBackend, DEFAULT_BASE_URL};
pub use simulated::{demo_transcript, SimulatedBackend, DEFAULT_LATENCY};
