//! Owns the connection and the research state, and turns transport events
//! and submissions into state transitions.

use dioxus_logger::tracing::{debug, info, warn};
use shared_types::{StartResearchAck, StartResearchRequest};

use crate::artifact::SlideArtifact;
use crate::config::{ClientConfig, StallPolicy};
use crate::connection::{
    CloseAction, ConnectionManager, ConnectionState, ErrorDisposition, Generation, Scheduler,
    TimerId, TimerOutcome, Transport,
};
use crate::error::{ClientError, ValidationError};
use crate::logs::{ActivityLog, ThinkingLog};
use crate::router::{route, DiscardReason, MessageKind, RouteOutcome};
use crate::session::JobSession;
use crate::state::ResearchState;

/// Discrete events delivered to the client one at a time
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Opened {
        generation: Generation,
    },
    Frame {
        generation: Generation,
        payload: String,
    },
    TransportError {
        generation: Generation,
        detail: String,
    },
    Closed {
        generation: Generation,
        clean: bool,
        code: u16,
        reason: String,
    },
    TimerFired(TimerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification, drained by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Read model handed to the UI
#[derive(Debug, Clone, Default)]
pub struct ResearchSnapshot {
    pub connection: ConnectionState,
    pub session: JobSession,
    pub thinking: ThinkingLog,
    pub activity: ActivityLog,
}

impl ResearchSnapshot {
    pub fn artifact(&self) -> Option<SlideArtifact> {
        SlideArtifact::from_session(&self.session)
    }
}

/// A validated submission waiting for its start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub session_id: String,
    pub request: StartResearchRequest,
}

pub struct ResearchClient<T: Transport, S: Scheduler> {
    config: ClientConfig,
    connection: ConnectionManager<T, S>,
    state: ResearchState,
    notices: Vec<Notice>,
}

impl<T: Transport, S: Scheduler> ResearchClient<T, S> {
    pub fn new(config: ClientConfig, transport: T, scheduler: S) -> Self {
        let connection =
            ConnectionManager::new(transport, scheduler, config.ws_url(), config.reconnect_delay);
        Self {
            config,
            connection,
            state: ResearchState::default(),
            notices: Vec::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &ResearchState {
        &self.state
    }

    pub fn connection(&self) -> &ConnectionManager<T, S> {
        &self.connection
    }

    pub fn snapshot(&self) -> ResearchSnapshot {
        ResearchSnapshot {
            connection: self.connection.state(),
            session: self.state.session.clone(),
            thinking: self.state.thinking.clone(),
            activity: self.state.activity.clone(),
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn toggle_thinking(&mut self) -> bool {
        self.state.thinking.toggle_visible()
    }

    pub fn connect(&mut self) -> Result<Generation, ClientError> {
        self.connection.connect()
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    pub fn handle(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Opened { generation } => {
                self.connection.on_open(generation);
            }
            ClientEvent::Frame {
                generation,
                payload,
            } => {
                if let Some(msg) = self.connection.on_frame(generation, &payload) {
                    let outcome = route(&mut self.state, msg);
                    self.after_route(outcome);
                }
            }
            ClientEvent::TransportError { generation, detail } => {
                if self.connection.on_error(generation, &detail) == ErrorDisposition::Surface {
                    self.notices
                        .push(Notice::new(NoticeLevel::Error, "WebSocket connection error"));
                }
            }
            ClientEvent::Closed {
                generation,
                clean,
                code,
                reason,
            } => {
                debug!("WebSocket close: code={} reason={:?}", code, reason);
                let job_running = self.state.session.is_running();
                if self.connection.on_close(generation, clean, job_running)
                    == CloseAction::JobStranded
                {
                    self.apply_stall_policy();
                }
            }
            ClientEvent::TimerFired(id) => match self.connection.on_timer(id) {
                TimerOutcome::StallDeadline => self.fail_stalled_job(),
                TimerOutcome::ReconnectFailed => {
                    self.connection.schedule_reconnect();
                }
                TimerOutcome::Reconnected(_) | TimerOutcome::Stale => {}
            },
        }
    }

    fn after_route(&mut self, outcome: RouteOutcome) {
        match outcome {
            RouteOutcome::Applied(kind) => {
                self.state.session.stalled = false;
                match kind {
                    MessageKind::TerminalSuccess => {
                        self.connection.cancel_stall_deadline();
                        info!("Research {} completed", self.state.session.id);
                        self.notices.push(Notice::new(
                            NoticeLevel::Success,
                            "Research and slide generation completed",
                        ));
                    }
                    MessageKind::TerminalFailure(err) => {
                        self.connection.cancel_stall_deadline();
                        warn!("Research {} failed: {}", self.state.session.id, err);
                        self.notices
                            .push(Notice::new(NoticeLevel::Error, format!("Error: {err}")));
                    }
                    MessageKind::Thinking
                    | MessageKind::ToolActivity
                    | MessageKind::ProgressUpdate => {}
                }
            }
            RouteOutcome::Held => {
                debug!("Holding frame until the start request is acknowledged");
            }
            RouteOutcome::Discarded(DiscardReason::StaleResearchId { research_id }) => {
                debug!("Discarding frame for inactive research {}", research_id);
            }
            RouteOutcome::Discarded(DiscardReason::NoActiveJob) => {
                debug!("Discarding frame with no running job");
            }
        }
    }

    fn apply_stall_policy(&mut self) {
        if !self.state.session.mark_stalled() {
            return;
        }
        match self.config.stall_policy {
            StallPolicy::MarkStalled => {
                self.notices.push(Notice::new(
                    NoticeLevel::Warning,
                    "Connection lost while research is running",
                ));
            }
            StallPolicy::FailAfter(timeout) => {
                self.notices.push(Notice::new(
                    NoticeLevel::Warning,
                    "Connection lost while research is running",
                ));
                self.connection.schedule_stall_deadline(timeout);
            }
            StallPolicy::Reconnect => {
                self.connection.schedule_reconnect();
            }
        }
    }

    fn fail_stalled_job(&mut self) {
        if !self.state.session.stalled {
            return;
        }
        let err = ClientError::Transport("connection lost before the job finished".to_string());
        if self.state.session.fail(err.to_string()) {
            warn!("Research {} failed: {}", self.state.session.id, err);
            self.notices
                .push(Notice::new(NoticeLevel::Error, format!("Error: {err}")));
        }
        if self.connection.state() == ConnectionState::Closed {
            self.connection.schedule_reconnect();
        }
    }

    /// Validates input and opens a fresh running session.
    ///
    /// The previous session and both logs are discarded before anything is
    /// sent, so frames from an earlier job can never land in the new one.
    /// A stalled job counts as abandoned and may be replaced.
    pub fn begin_submission(
        &mut self,
        query: &str,
        model_id: &str,
        max_slides: u32,
    ) -> Result<PendingSubmission, ClientError> {
        let session = &self.state.session;
        if session.is_running() && !session.stalled {
            return Err(ClientError::JobInFlight);
        }
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        if !self.config.max_slides.contains(&max_slides) {
            return Err(ValidationError::MaxSlidesOutOfRange {
                min: *self.config.max_slides.start(),
                max: *self.config.max_slides.end(),
                actual: max_slides,
            }
            .into());
        }

        if self.state.session.is_running() {
            info!(
                "Replacing stalled research {} with a new submission",
                self.state.session.id
            );
        }
        self.connection.cancel_stall_deadline();
        let session_id = self.state.begin_attempt().id.clone();
        if let Err(e) = self.connection.ensure_connected() {
            warn!("Submitting without a live connection: {}", e);
        }

        Ok(PendingSubmission {
            session_id,
            request: StartResearchRequest {
                query: query.to_string(),
                model_id: model_id.to_string(),
                max_slides,
                slide_theme: self.config.slide_theme.clone(),
            },
        })
    }

    /// Reconciles the start request's result with the session it was sent for.
    pub fn finish_submission(
        &mut self,
        session_id: &str,
        result: Result<StartResearchAck, ClientError>,
    ) -> Result<StartResearchAck, ClientError> {
        match result {
            Ok(ack) => {
                match self.state.bind_ack(session_id, &ack.research_id) {
                    Some(held) => {
                        info!("Research {} started as {}", session_id, ack.research_id);
                        self.notices
                            .push(Notice::new(NoticeLevel::Info, "Research started..."));
                        for msg in held {
                            let outcome = route(&mut self.state, msg);
                            self.after_route(outcome);
                        }
                    }
                    None => {
                        debug!("Ack {} arrived for an inactive session", ack.research_id);
                    }
                }
                Ok(ack)
            }
            Err(e) => {
                let err = match e {
                    ClientError::Submission(_) => e,
                    other => ClientError::Submission(other.to_string()),
                };
                if self.state.abandon_attempt(session_id) {
                    warn!("Start request failed: {}", err);
                    self.notices
                        .push(Notice::new(NoticeLevel::Error, "Failed to send the request"));
                }
                Err(err)
            }
        }
    }
}
