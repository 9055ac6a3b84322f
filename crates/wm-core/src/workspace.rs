//! Knowledge-base workspaces and recent analyses shown in the sidebar.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub page_count: u32,
    pub connected: bool,
}

impl Workspace {
    pub fn new(id: impl Into<String>, name: impl Into<String>, page_count: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            page_count,
            connected: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    Completed,
    InProgress,
    Pending,
}

impl AnalysisStatus {
    pub fn glyph(&self) -> &'static str {
        match self {
            AnalysisStatus::Completed => "✓",
            AnalysisStatus::InProgress => "●",
            AnalysisStatus::Pending => "…",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAnalysis {
    pub id: String,
    pub name: String,
    /// Human-readable age such as "2 hours ago".
    pub last_analyzed: String,
    pub status: AnalysisStatus,
}
