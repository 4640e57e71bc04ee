//! Lifecycle of the current research job.
//!
//! `Idle -> Running -> {Completed, Failed}`. The terminal states have no way
//! out; a new submission builds a fresh session instead.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobSession {
    /// Client-side id, fresh for every submission
    pub id: String,
    /// Server-side id that frames are matched against
    pub research_id: Option<String>,
    pub state: JobState,
    pub progress: u8,
    pub message: Option<String>,
    /// Slides HTML, set only on `Completed`
    pub result_payload: Option<String>,
    /// Raw research result sent alongside the slides
    pub research_result: Option<serde_json::Value>,
    pub failure_reason: Option<String>,
    /// The connection dropped while this job was running
    pub stalled: bool,
}

impl JobSession {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn start() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: JobState::Running,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    /// Whether a frame tagged `research_id` belongs to this session.
    /// An unbound session matches nothing.
    pub fn matches(&self, research_id: &str) -> bool {
        self.research_id.as_deref() == Some(research_id)
    }

    pub fn bind(&mut self, research_id: impl Into<String>) {
        self.research_id = Some(research_id.into());
    }

    pub fn update_progress(&mut self, progress: u8, message: Option<String>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.progress = progress;
        self.message = message;
        true
    }

    pub fn complete(&mut self, slides_html: String, research_result: Option<serde_json::Value>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = JobState::Completed;
        self.result_payload = Some(slides_html);
        self.research_result = research_result;
        self.stalled = false;
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = JobState::Failed;
        self.failure_reason = Some(reason.into());
        true
    }

    pub fn mark_stalled(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stalled = true;
        true
    }

    /// Undo a submission whose start request never reached the server
    pub fn revert_to_idle(&mut self) {
        *self = Self::idle();
    }
}
