//! Inbound frames decoded into tagged variants at the connection boundary.
//!
//! The wire format tags a tool activity only by which optional fields are
//! present; everything past `decode_frame` works with [`ToolActivity`].

use shared_types::{
    ResearchStatus, ResearchUpdateFrame, ToolActivityFrame, ACTION_SEARCHING, ACTION_VISITING,
};

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq)]
pub struct ThinkingFragment {
    pub text: String,
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityAction {
    Searching,
    Visiting,
    Other(String),
}

impl ActivityAction {
    fn from_wire(value: &str) -> Self {
        match value {
            ACTION_SEARCHING => Self::Searching,
            ACTION_VISITING => Self::Visiting,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One structured tool step: a search, a page visit, their results or an error
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityRecord {
    pub action: Option<ActivityAction>,
    pub query: Option<String>,
    pub url: Option<String>,
    pub found_urls: Vec<String>,
    pub error: Option<String>,
}

impl ActivityRecord {
    pub fn searching(query: impl Into<String>) -> Self {
        Self {
            action: Some(ActivityAction::Searching),
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn visiting(url: impl Into<String>) -> Self {
        Self {
            action: Some(ActivityAction::Visiting),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.action.is_none()
            && self.query.is_none()
            && self.url.is_none()
            && self.found_urls.is_empty()
            && self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolActivity {
    Thinking(ThinkingFragment),
    Activity(ActivityRecord),
}

impl ToolActivity {
    /// `None` for a payload that carries nothing.
    /// `agent_thinking` wins over every other field.
    pub fn from_frame(frame: ToolActivityFrame) -> Option<Self> {
        if let Some(text) = frame.agent_thinking {
            return Some(Self::Thinking(ThinkingFragment {
                text,
                timestamp: frame.thinking_timestamp,
            }));
        }

        let record = ActivityRecord {
            action: frame.action.as_deref().map(ActivityAction::from_wire),
            query: frame.query,
            url: frame.url,
            found_urls: frame.found_urls.unwrap_or_default(),
            error: frame.error,
        };
        if record.is_empty() {
            None
        } else {
            Some(Self::Activity(record))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub research_id: String,
    pub status: ResearchStatus,
    pub progress: u8,
    pub message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub slides_html: Option<String>,
    pub error: Option<String>,
    pub tool_activity: Option<ToolActivity>,
}

impl From<ResearchUpdateFrame> for InboundMessage {
    fn from(frame: ResearchUpdateFrame) -> Self {
        Self {
            research_id: frame.research_id,
            status: frame.status,
            progress: frame.progress.clamp(0, 100) as u8,
            message: frame.message,
            result: frame.result,
            slides_html: frame.slides_html,
            error: frame.error,
            tool_activity: frame.tool_activity.and_then(ToolActivity::from_frame),
        }
    }
}

pub fn decode_frame(payload: &str) -> Result<InboundMessage, ProtocolError> {
    serde_json::from_str::<ResearchUpdateFrame>(payload)
        .map(InboundMessage::from)
        .map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}
