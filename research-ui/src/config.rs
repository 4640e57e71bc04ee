use std::ops::RangeInclusive;
use std::sync::OnceLock;
use std::time::Duration;

/// Delay before re-establishing a connection that dropped while idle
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Grace period before a job stranded by a dropped connection is failed
pub const STALL_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_SLIDES: u32 = 6;

pub const MODELS: &[(&str, &str)] = &[
    ("gpt-4o", "GPT-4o"),
    ("gpt-4-turbo", "GPT-4 Turbo"),
    ("claude-3-opus", "Claude 3 Opus"),
    ("claude-3-sonnet", "Claude 3 Sonnet"),
];

/// What to do when the connection drops uncleanly while a job is running.
///
/// The job's terminal frame is broadcast once; a new connection will not
/// receive frames sent while it was down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallPolicy {
    /// Keep the session running and flag it as stalled. A new submission
    /// replaces a stalled job instead of being refused.
    MarkStalled,
    /// Flag it as stalled, then fail it once the timeout elapses
    FailAfter(Duration),
    /// Reconnect after the usual delay and keep waiting
    Reconnect,
}

impl Default for StallPolicy {
    fn default() -> Self {
        Self::FailAfter(STALL_TIMEOUT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// HTTP origin of the research API; empty means same origin
    pub api_base: String,
    pub research_path: String,
    pub ws_path: String,
    pub reconnect_delay: Duration,
    pub stall_policy: StallPolicy,
    pub max_slides: RangeInclusive<u32>,
    pub default_model: String,
    pub slide_theme: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            research_path: "/research".to_string(),
            ws_path: "/ws".to_string(),
            reconnect_delay: RECONNECT_DELAY,
            stall_policy: StallPolicy::default(),
            max_slides: 3..=10,
            default_model: DEFAULT_MODEL.to_string(),
            slide_theme: None,
        }
    }
}

impl ClientConfig {
    /// Config for the page currently loaded in the browser
    pub fn from_location() -> Self {
        Self {
            api_base: api_base().to_string(),
            ..Self::default()
        }
    }

    pub fn research_url(&self) -> String {
        format!("{}{}", self.api_base, self.research_path)
    }

    pub fn ws_url(&self) -> String {
        format!("{}{}", http_to_ws_url(&self.api_base), self.ws_path)
    }
}

/// Get the API base URL based on current environment
/// - In development (localhost): use http://localhost:8000
/// - In production: use same origin (API serves static files)
fn get_api_base() -> String {
    let hostname = web_sys::window()
        .and_then(|w| w.location().hostname().ok())
        .unwrap_or_default();

    if hostname == "localhost" || hostname == "127.0.0.1" {
        "http://localhost:8000".to_string()
    } else {
        String::new()
    }
}

static API_BASE_CACHE: OnceLock<String> = OnceLock::new();

/// Get the cached API base URL
pub fn api_base() -> &'static str {
    API_BASE_CACHE.get_or_init(get_api_base).as_str()
}

pub fn http_to_ws_url(http_url: &str) -> String {
    if let Some(rest) = http_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = http_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if http_url.is_empty() {
        let protocol = web_sys::window()
            .and_then(|w| w.location().protocol().ok())
            .unwrap_or_else(|| "http:".to_string());
        let host = web_sys::window()
            .and_then(|w| w.location().host().ok())
            .unwrap_or_else(|| "localhost".to_string());

        if protocol == "https:" {
            format!("wss://{host}")
        } else {
            format!("ws://{host}")
        }
    } else {
        format!("ws://{http_url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.research_url(), "http://localhost:8000/research");
        assert_eq!(config.ws_url(), "ws://localhost:8000/ws");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.stall_policy, StallPolicy::FailAfter(STALL_TIMEOUT));
    }

    #[test]
    fn ws_url_follows_http_scheme() {
        assert_eq!(http_to_ws_url("https://slides.example"), "wss://slides.example");
        assert_eq!(http_to_ws_url("http://10.0.0.2:8000"), "ws://10.0.0.2:8000");
        assert_eq!(http_to_ws_url("api.internal:8000"), "ws://api.internal:8000");
    }
}
