//! Shared types between the research backend and the browser client
//!
//! Serializable with serde for JSON over WebSocket/HTTP.
//! Field names follow the backend's snake_case wire format.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Start-job request
// ============================================================================

/// Body of `POST /research`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../research-ui/src/types/generated.ts")]
pub struct StartResearchRequest {
    pub query: String,
    pub model_id: String,
    pub max_slides: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_theme: Option<String>,
}

/// Acknowledgement returned by `POST /research`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../research-ui/src/types/generated.ts")]
pub struct StartResearchAck {
    pub research_id: String,
    pub status: String,
    #[serde(default)]
    pub progress: Option<u8>,
}

// ============================================================================
// Streaming frames
// ============================================================================

/// Job status as reported on the stream.
///
/// The backend uses several names for in-flight phases; they all fold into
/// `Pending` or `Running`. Unknown phases decode as `Running`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../research-ui/src/types/generated.ts")]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl ResearchStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "pending" | "started" => Self::Pending,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl<'de> Deserialize<'de> for ResearchStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}

/// Raw tool activity payload, tagged only by which fields are present
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../research-ui/src/types/generated.ts")]
pub struct ToolActivityFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_timestamp: Option<f64>,
}

/// One frame pushed by the server on the shared `/ws` connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../research-ui/src/types/generated.ts")]
pub struct ResearchUpdateFrame {
    pub research_id: String,
    pub status: ResearchStatus,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    #[ts(type = "unknown")]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub slides_html: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub tool_activity: Option<ToolActivityFrame>,
}

pub const ACTION_SEARCHING: &str = "searching";
pub const ACTION_VISITING: &str = "visiting";

// ============================================================================
// Tests
// ============================================================================
