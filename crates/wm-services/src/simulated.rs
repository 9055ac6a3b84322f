use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::debug;

use wm_core::{
    AnalysisStatus, ChatService, Citation, Error, Message, RecentAnalysis, Workspace,
    WorkspaceDirectory,
};

pub const DEFAULT_LATENCY: Duration = Duration::from_millis(2000);

/// Longest prefix of the question echoed back in a canned reply.
const QUOTE_CHARS: usize = 50;

/// Offline backend with canned replies and a fixed workspace directory.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    latency: Duration,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn quote(question: &str) -> String {
    let mut chars = question.chars();
    let head: String = chars.by_ref().take(QUOTE_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn reply_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    (millis + 1).to_string()
}

fn canned_reply(question: &str) -> String {
    format!(
        "I've analyzed your question about \"{}\".\n\
         \n\
         Based on the information in your connected Notion workspaces, here's what I found:\n\
         \n\
         This is a **simulated response** to demonstrate the chat interface. In a production \
         environment, this would connect to your actual knowledge base and provide contextual \
         answers with proper citations.\n\
         \n\
         Key points:\n\
         - Real-time analysis of workspace data\n\
         - Contextual understanding of your documents\n\
         - Citation-backed responses for transparency",
        quote(question)
    )
}

#[async_trait]
impl ChatService for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn send_chat_message(&self, text: &str) -> Result<Message, Error> {
        debug!(latency_ms = self.latency.as_millis() as u64, "Simulating reply");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(Message::assistant(canned_reply(text)).with_id(reply_id()))
    }
}

#[async_trait]
impl WorkspaceDirectory for SimulatedBackend {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, Error> {
        Ok(vec![
            Workspace::new("1", "Product Requirements", 24),
            Workspace::new("2", "Engineering Docs", 156),
            Workspace::new("3", "Team Wiki", 89),
        ])
    }

    async fn recent_analyses(&self) -> Result<Vec<RecentAnalysis>, Error> {
        let analysis = |id: &str, name: &str, last_analyzed: &str, status| RecentAnalysis {
            id: id.to_string(),
            name: name.to_string(),
            last_analyzed: last_analyzed.to_string(),
            status,
        };
        Ok(vec![
            analysis("1", "Q1 Feature Roadmap", "2 hours ago", AnalysisStatus::Completed),
            analysis("2", "API Documentation Review", "5 hours ago", AnalysisStatus::Completed),
            analysis("3", "Sprint Planning Notes", "1 day ago", AnalysisStatus::InProgress),
        ])
    }
}

/// The example exchange a fresh session opens with.
pub fn demo_transcript() -> Vec<Message> {
    let question = Message::user("Can you summarize the key features from our Q1 product roadmap?")
        .with_id("1");

    let answer = Message::assistant(
        "Based on your Q1 product roadmap, here are the key features planned:\n\
         \n\
         **1. Advanced Analytics Dashboard** [1]\n\
         The team is planning to build a comprehensive analytics dashboard with real-time data \
         visualization and customizable reports.\n\
         \n\
         **2. Mobile App Integration** [2]\n\
         A native mobile application for both iOS and Android is scheduled for development, \
         enabling users to access core features on the go.\n\
         \n\
         **3. API Enhancements** [3]\n\
         Major improvements to the REST API including better rate limiting, webhook support, and \
         enhanced documentation.\n\
         \n\
         These features align with the company's strategic goals of improving user engagement \
         and expanding platform capabilities.",
    )
    .with_id("2")
    .with_citations(vec![
        Citation::new(
            1,
            "Q1 Feature Roadmap - Analytics Section",
            "Priority 1: Develop advanced analytics dashboard with customizable widgets and \
             real-time data streaming capabilities",
        ),
        Citation::new(
            2,
            "Q1 Feature Roadmap - Mobile Strategy",
            "Native mobile apps planned for Q1 release, focusing on core workflow features with \
             offline support",
        ),
        Citation::new(
            3,
            "Engineering Docs - API Specifications",
            "API v2.0 will include webhook subscriptions, improved rate limiting (10k req/hour), \
             and comprehensive OpenAPI documentation",
        ),
    ]);

    vec![question, answer]
}
