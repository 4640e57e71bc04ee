use std::cell::Cell;
use std::rc::Rc;

use dioxus::prelude::*;
use dioxus_logger::tracing::{error, warn};
use gloo_timers::future::TimeoutFuture;

use crate::client::{Notice, NoticeLevel, ResearchSnapshot};
use crate::config::{ClientConfig, DEFAULT_MAX_SLIDES, MODELS};
use crate::connection::ConnectionState;
use crate::error::ClientError;
use crate::gateway::SubmissionGateway;
use crate::message::{ActivityAction, ActivityRecord};
use crate::session::JobState;
use crate::web::{browser_dispatcher, EventInbox, HttpStartJobApi};

const MAX_FOUND_URLS: usize = 5;
const MAX_NOTICES: usize = 4;
/// Generated decks may run scripts, but never with this page's origin.
const PREVIEW_SANDBOX: &str = "allow-scripts";

#[component]
pub fn ResearchApp() -> Element {
    let config = use_hook(ClientConfig::from_location);
    let mut snapshot = use_signal(ResearchSnapshot::default);
    let mut notices = use_signal(Vec::<Notice>::new);
    let mut query = use_signal(String::new);
    let mut model = use_signal(|| config.default_model.clone());
    let mut max_slides = use_signal(|| DEFAULT_MAX_SLIDES);
    let inbox = use_hook(EventInbox::default);
    let mut pump_started = use_signal(|| false);
    let pump_alive = use_hook(|| Rc::new(Cell::new(true)));

    let dispatcher = use_hook(|| {
        let dispatcher = browser_dispatcher(config.clone(), &inbox);
        dispatcher.set_observer(move |next, fresh| {
            snapshot.set(next);
            if !fresh.is_empty() {
                retain_latest(&mut notices.write(), fresh, MAX_NOTICES);
            }
        });
        dispatcher
    });
    let gateway = use_hook(|| Rc::new(SubmissionGateway::new(HttpStartJobApi::new(&config))));

    {
        let dispatcher = dispatcher.clone();
        let pump_alive = pump_alive.clone();
        use_drop(move || {
            pump_alive.set(false);
            dispatcher.clear_observer();
            dispatcher.with(|client| client.disconnect());
        });
    }

    // Connect once on mount, then keep applying browser events.
    {
        let dispatcher = dispatcher.clone();
        let inbox = inbox.clone();
        let pump_alive = pump_alive.clone();
        use_effect(move || {
            if pump_started() {
                return;
            }
            pump_started.set(true);

            if let Err(e) = dispatcher.with(|client| client.connect()) {
                error!("Failed to connect research websocket: {}", e);
                retain_latest(
                    &mut notices.write(),
                    vec![Notice {
                        level: NoticeLevel::Error,
                        text: "WebSocket connection error".to_string(),
                    }],
                    MAX_NOTICES,
                );
            }

            let dispatcher = dispatcher.clone();
            let inbox = inbox.clone();
            let pump_alive = pump_alive.clone();
            spawn(async move {
                while pump_alive.get() {
                    inbox.pump(&dispatcher);
                    TimeoutFuture::new(16).await;
                }
            });
        });
    }

    let on_submit = {
        let dispatcher = dispatcher.clone();
        let gateway = gateway.clone();
        move |_: MouseEvent| {
            let dispatcher = dispatcher.clone();
            let gateway = gateway.clone();
            let query = query.read().clone();
            let model = model.read().clone();
            let max_slides = max_slides();
            spawn(async move {
                let result = gateway.submit(&dispatcher, &query, &model, max_slides).await;
                // Start-request failures already raised their own notice.
                if let Err(e) = result {
                    if !matches!(e, ClientError::Submission(_)) {
                        warn!("Submission rejected: {}", e);
                        retain_latest(
                            &mut notices.write(),
                            vec![Notice {
                                level: NoticeLevel::Warning,
                                text: e.to_string(),
                            }],
                            MAX_NOTICES,
                        );
                    }
                }
            });
        }
    };

    let on_toggle_thinking = {
        let dispatcher = dispatcher.clone();
        move |_: MouseEvent| {
            dispatcher.with(|client| client.toggle_thinking());
        }
    };

    let view = snapshot.read().clone();
    let session = &view.session;
    let running = session.is_running();
    let artifact = view.artifact();
    let thinking_visible = view.thinking.is_visible();
    let thinking: Vec<String> = view.thinking.texts().map(str::to_string).collect();
    let activity: Vec<ActivityRecord> = view.activity.records().to_vec();
    let notice_views: Vec<(String, String)> = notices
        .read()
        .iter()
        .map(|n| (format!("notice notice-{}", notice_class(n.level)), n.text.clone()))
        .collect();
    let connection_css = format!("connection connection-{}", connection_class(view.connection));
    let connection_text = connection_label(view.connection);
    let slides_min = *config.max_slides.start();
    let slides_max = *config.max_slides.end();
    let status_text = session.message.clone().unwrap_or_default();
    let progress = session.progress;
    let stalled = session.stalled;
    let failure = if session.state == JobState::Failed {
        session.failure_reason.clone()
    } else {
        None
    };

    rsx! {
        style { {STYLES} }

        div {
            class: "research-app",

            header {
                class: "research-header",
                h1 { "Deep Research Slides" }
                span { class: connection_css, "{connection_text}" }
            }

            div {
                class: "notices",
                for (i, (class, text)) in notice_views.into_iter().enumerate() {
                    div {
                        key: "{i}-{text}",
                        class,
                        onclick: move |_| {
                            let mut list = notices.write();
                            if i < list.len() {
                                list.remove(i);
                            }
                        },
                        "{text}"
                    }
                }
            }

            section {
                class: "research-form",
                textarea {
                    placeholder: "What should be researched?",
                    value: "{query}",
                    disabled: running,
                    oninput: move |e| query.set(e.value()),
                }
                div {
                    class: "research-options",
                    select {
                        value: "{model}",
                        disabled: running,
                        onchange: move |e| model.set(e.value()),
                        for (id, label) in MODELS.iter().copied() {
                            option { key: "{id}", value: "{id}", "{label}" }
                        }
                    }
                    input {
                        r#type: "number",
                        min: "{slides_min}",
                        max: "{slides_max}",
                        value: "{max_slides}",
                        disabled: running,
                        oninput: move |e| {
                            if let Ok(value) = e.value().parse::<u32>() {
                                max_slides.set(value);
                            }
                        },
                    }
                    button {
                        disabled: running,
                        onclick: on_submit,
                        if running { "Researching..." } else { "Start research" }
                    }
                }
            }

            if running {
                section {
                    class: "research-progress",
                    div {
                        class: "progress-track",
                        div { class: "progress-fill", style: "width: {progress}%;" }
                    }
                    p { "{progress}% {status_text}" }
                    if stalled {
                        p { class: "stalled", "Connection lost. Waiting for the server to come back..." }
                    }
                }
            }

            if let Some(reason) = failure {
                section { class: "research-failure", "Research failed: {reason}" }
            }

            if !thinking.is_empty() {
                section {
                    class: "research-thinking",
                    div {
                        class: "section-header",
                        h2 { "Thinking" }
                        button {
                            onclick: on_toggle_thinking,
                            if thinking_visible { "Hide" } else { "Show" }
                        }
                    }
                    if thinking_visible {
                        for (i, text) in thinking.into_iter().enumerate() {
                            p { key: "{i}", class: "thinking-fragment", "{text}" }
                        }
                    }
                }
            }

            if !activity.is_empty() {
                section {
                    class: "research-activity",
                    h2 { "Activity" }
                    for (i, record) in activity.into_iter().enumerate() {
                        ActivityItem { key: "{i}", record }
                    }
                }
            }

            if let Some(artifact) = artifact {
                section {
                    class: "research-result",
                    div {
                        class: "section-header",
                        h2 { "Slides" }
                        button {
                            onclick: {
                                let artifact = artifact.clone();
                                move |_| {
                                    if let Err(e) = artifact.download() {
                                        error!("Slide download failed: {}", e);
                                        retain_latest(
                                            &mut notices.write(),
                                            vec![Notice { level: NoticeLevel::Error, text: e }],
                                            MAX_NOTICES,
                                        );
                                    }
                                }
                            },
                            "Download HTML"
                        }
                    }
                    iframe {
                        class: "slides-preview",
                        "sandbox": PREVIEW_SANDBOX,
                        srcdoc: artifact.html().to_string(),
                    }
                }
            }
        }
    }
}

#[component]
fn ActivityItem(record: ActivityRecord) -> Element {
    let label = activity_label(&record);
    let (shown, hidden) = visible_found_urls(&record.found_urls);

    rsx! {
        div {
            class: "activity-item",
            div { class: "activity-label", "{label}" }
            if !shown.is_empty() {
                ul {
                    for url in shown {
                        li { key: "{url}", "{url}" }
                    }
                    if hidden > 0 {
                        li { class: "more", "+{hidden} more" }
                    }
                }
            }
            if let Some(err) = record.error.clone() {
                div { class: "activity-error", "{err}" }
            }
        }
    }
}

fn activity_label(record: &ActivityRecord) -> String {
    match &record.action {
        Some(ActivityAction::Searching) => {
            format!("Searching: {}", record.query.as_deref().unwrap_or_default())
        }
        Some(ActivityAction::Visiting) => {
            format!("Visiting: {}", record.url.as_deref().unwrap_or_default())
        }
        Some(ActivityAction::Other(name)) => name.clone(),
        None if !record.found_urls.is_empty() => {
            format!("Found {} sources", record.found_urls.len())
        }
        None if record.error.is_some() => "Tool error".to_string(),
        None => "Tool step".to_string(),
    }
}

/// The first few URLs and how many were left out
fn visible_found_urls(urls: &[String]) -> (Vec<String>, usize) {
    let shown: Vec<String> = urls.iter().take(MAX_FOUND_URLS).cloned().collect();
    let hidden = urls.len() - shown.len();
    (shown, hidden)
}

fn retain_latest(list: &mut Vec<Notice>, fresh: Vec<Notice>, max: usize) {
    list.extend(fresh);
    let excess = list.len().saturating_sub(max);
    list.drain(..excess);
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "Connecting",
        ConnectionState::Open => "Connected",
        ConnectionState::Closing => "Disconnecting",
        ConnectionState::Closed => "Disconnected",
    }
}

fn connection_class(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Open => "open",
        ConnectionState::Connecting | ConnectionState::Closing => "pending",
        ConnectionState::Closed => "closed",
    }
}

fn notice_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "success",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    }
}

const STYLES: &str = r#"
:root {
    --bg-primary: #0f172a;
    --bg-secondary: #1e293b;
    --text-primary: #f8fafc;
    --text-secondary: #94a3b8;
    --accent-bg: #3b82f6;
    --border-color: #334155;
    --danger-bg: #ef4444;
    --success-bg: #10b981;
    --warning-bg: #f59e0b;
    --radius-md: 8px;
}

* {
    box-sizing: border-box;
}

body {
    margin: 0;
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: var(--bg-primary);
    color: var(--text-primary);
}

.research-app {
    max-width: 960px;
    margin: 0 auto;
    padding: 1.5rem;
    display: flex;
    flex-direction: column;
    gap: 1rem;
}

.research-header, .section-header, .research-options {
    display: flex;
    align-items: center;
    justify-content: space-between;
    gap: 0.75rem;
}

.connection-open { color: var(--success-bg); }
.connection-pending { color: var(--warning-bg); }
.connection-closed { color: var(--danger-bg); }

.notices {
    position: fixed;
    top: 1rem;
    right: 1rem;
    display: flex;
    flex-direction: column;
    gap: 0.5rem;
}

.notice {
    padding: 0.5rem 0.75rem;
    border-radius: var(--radius-md);
    cursor: pointer;
}

.notice-info { background: var(--accent-bg); }
.notice-success { background: var(--success-bg); }
.notice-warning { background: var(--warning-bg); }
.notice-error { background: var(--danger-bg); }

section {
    background: var(--bg-secondary);
    border: 1px solid var(--border-color);
    border-radius: var(--radius-md);
    padding: 1rem;
}

textarea {
    width: 100%;
    min-height: 5rem;
}

.progress-track {
    height: 0.5rem;
    background: var(--border-color);
    border-radius: var(--radius-md);
    overflow: hidden;
}

.progress-fill {
    height: 100%;
    background: var(--accent-bg);
    transition: width 0.3s ease;
}

.stalled, .activity-error, .research-failure {
    color: var(--danger-bg);
}

.thinking-fragment {
    color: var(--text-secondary);
    font-style: italic;
}

.activity-item ul {
    margin: 0.25rem 0 0;
    color: var(--text-secondary);
    font-size: 0.85rem;
}

.slides-preview {
    width: 100%;
    height: 540px;
    border: none;
    background: #ffffff;
}
"#;
