//! Lifecycle of the single shared streaming connection.
//!
//! Every connection instance gets a new generation number. Events are tagged
//! with the generation they came from, and anything from an older generation
//! is void.

use std::time::Duration;

use dioxus_logger::tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::message::{decode_frame, InboundMessage};

pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connecting,
    Open,
    /// Intentional close issued, close event not yet seen
    Closing,
    #[default]
    Closed,
}

/// Opens sockets. Implementations report open/frame/error/close back through
/// their own event sink, tagged with `generation`.
pub trait Transport {
    type Socket: Socket;

    fn open(&mut self, url: &str, generation: Generation) -> Result<Self::Socket, ClientError>;
}

pub trait Socket {
    /// Starts an intentional close handshake.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Reconnect,
    StallDeadline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub kind: TimerKind,
    pub seq: u64,
}

/// Runs deferred work. When a task fires, the implementation reports its
/// [`TimerId`] back through its event sink.
pub trait Scheduler {
    type Task: ScheduledTask;

    fn schedule(&mut self, id: TimerId, delay: Duration) -> Self::Task;
}

pub trait ScheduledTask {
    fn cancel(self);
}

struct PendingTimer<K> {
    id: TimerId,
    task: K,
}

/// What a transport error means for the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// From an old connection
    Ignored,
    /// Expected during an intentional close, or already reported
    Logged,
    /// First unexpected error on this connection
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// From an old connection
    Ignored,
    /// Clean or intentional close; nothing to recover
    Settled,
    ReconnectScheduled(TimerId),
    /// Unclean close while a job is running; the caller applies its stall policy
    JobStranded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Reconnected(Generation),
    ReconnectFailed,
    StallDeadline,
    /// Cancelled or superseded before it fired
    Stale,
}

pub struct ConnectionManager<T: Transport, S: Scheduler> {
    transport: T,
    scheduler: S,
    url: String,
    reconnect_delay: Duration,
    state: ConnectionState,
    generation: Generation,
    socket: Option<T::Socket>,
    reconnect: Option<PendingTimer<S::Task>>,
    stall_deadline: Option<PendingTimer<S::Task>>,
    next_timer_seq: u64,
    error_surfaced: bool,
}

impl<T: Transport, S: Scheduler> ConnectionManager<T, S> {
    pub fn new(transport: T, scheduler: S, url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            transport,
            scheduler,
            url: url.into(),
            reconnect_delay,
            state: ConnectionState::Closed,
            generation: 0,
            socket: None,
            reconnect: None,
            stall_deadline: None,
            next_timer_seq: 0,
            error_surfaced: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn reconnect_pending(&self) -> Option<TimerId> {
        self.reconnect.as_ref().map(|t| t.id)
    }

    pub fn stall_deadline_pending(&self) -> Option<TimerId> {
        self.stall_deadline.as_ref().map(|t| t.id)
    }

    /// Replaces any live connection with a fresh one.
    pub fn connect(&mut self) -> Result<Generation, ClientError> {
        self.cancel_reconnect();
        if let Some(mut previous) = self.socket.take() {
            debug!("Closing generation {} before reconnecting", self.generation);
            previous.close();
        }

        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.error_surfaced = false;
        info!("Connecting to WebSocket: {} (generation {})", self.url, self.generation);

        match self.transport.open(&self.url, self.generation) {
            Ok(socket) => {
                self.socket = Some(socket);
                Ok(self.generation)
            }
            Err(e) => {
                warn!("Failed to open WebSocket: {}", e);
                self.state = ConnectionState::Closed;
                Err(e)
            }
        }
    }

    /// Connects unless a live connection or a pending reconnect already exists.
    pub fn ensure_connected(&mut self) -> Result<Option<Generation>, ClientError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => Ok(None),
            ConnectionState::Closing | ConnectionState::Closed => {
                if self.reconnect.is_some() {
                    return Ok(None);
                }
                self.connect().map(Some)
            }
        }
    }

    /// Cancels timers and starts an intentional close.
    pub fn disconnect(&mut self) {
        self.cancel_reconnect();
        self.cancel_stall_deadline();
        match self.socket.as_mut() {
            Some(socket) if self.state != ConnectionState::Closing => {
                info!("Disconnecting WebSocket (generation {})", self.generation);
                self.state = ConnectionState::Closing;
                socket.close();
            }
            Some(_) => {}
            None => self.state = ConnectionState::Closed,
        }
    }

    pub fn on_open(&mut self, generation: Generation) -> bool {
        if generation != self.generation || self.state != ConnectionState::Connecting {
            debug!("Ignoring open event from generation {}", generation);
            return false;
        }
        info!("WebSocket connected");
        self.state = ConnectionState::Open;
        true
    }

    /// Decodes a frame from the live connection. Bad frames are dropped
    /// without affecting the connection.
    pub fn on_frame(&mut self, generation: Generation, payload: &str) -> Option<InboundMessage> {
        if generation != self.generation || self.state != ConnectionState::Open {
            debug!("Dropping frame from generation {} in {:?}", generation, self.state);
            return None;
        }
        match decode_frame(payload) {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!("Dropping WebSocket frame: {}", e);
                None
            }
        }
    }

    pub fn on_error(&mut self, generation: Generation, detail: &str) -> ErrorDisposition {
        if generation != self.generation {
            return ErrorDisposition::Ignored;
        }
        if self.state == ConnectionState::Closing {
            debug!("WebSocket error during intentional close: {}", detail);
            return ErrorDisposition::Logged;
        }
        warn!("WebSocket error: {}", detail);
        if self.error_surfaced {
            ErrorDisposition::Logged
        } else {
            self.error_surfaced = true;
            ErrorDisposition::Surface
        }
    }

    pub fn on_close(&mut self, generation: Generation, clean: bool, job_running: bool) -> CloseAction {
        if generation != self.generation {
            return CloseAction::Ignored;
        }
        let intentional = self.state == ConnectionState::Closing;
        self.state = ConnectionState::Closed;
        self.socket = None;

        if intentional || clean {
            info!("WebSocket disconnected cleanly");
            return CloseAction::Settled;
        }
        warn!("WebSocket disconnected unexpectedly");
        if job_running {
            return CloseAction::JobStranded;
        }
        CloseAction::ReconnectScheduled(self.schedule_reconnect())
    }

    /// Schedules one reconnect; an already pending one is kept.
    pub fn schedule_reconnect(&mut self) -> TimerId {
        if let Some(pending) = &self.reconnect {
            return pending.id;
        }
        let id = self.next_timer(TimerKind::Reconnect);
        info!("Reconnecting in {:?}", self.reconnect_delay);
        let task = self.scheduler.schedule(id, self.reconnect_delay);
        self.reconnect = Some(PendingTimer { id, task });
        id
    }

    pub fn schedule_stall_deadline(&mut self, delay: Duration) -> TimerId {
        self.cancel_stall_deadline();
        let id = self.next_timer(TimerKind::StallDeadline);
        let task = self.scheduler.schedule(id, delay);
        self.stall_deadline = Some(PendingTimer { id, task });
        id
    }

    pub fn cancel_reconnect(&mut self) {
        if let Some(pending) = self.reconnect.take() {
            debug!("Cancelling pending reconnect {:?}", pending.id);
            pending.task.cancel();
        }
    }

    pub fn cancel_stall_deadline(&mut self) {
        if let Some(pending) = self.stall_deadline.take() {
            pending.task.cancel();
        }
    }

    pub fn on_timer(&mut self, id: TimerId) -> TimerOutcome {
        match id.kind {
            TimerKind::Reconnect => {
                if self.reconnect.as_ref().map(|t| t.id) != Some(id) {
                    return TimerOutcome::Stale;
                }
                // Fired; nothing left to cancel.
                self.reconnect = None;
                match self.connect() {
                    Ok(generation) => TimerOutcome::Reconnected(generation),
                    Err(_) => TimerOutcome::ReconnectFailed,
                }
            }
            TimerKind::StallDeadline => {
                if self.stall_deadline.as_ref().map(|t| t.id) != Some(id) {
                    return TimerOutcome::Stale;
                }
                self.stall_deadline = None;
                TimerOutcome::StallDeadline
            }
        }
    }

    fn next_timer(&mut self, kind: TimerKind) -> TimerId {
        self.next_timer_seq += 1;
        TimerId {
            kind,
            seq: self.next_timer_seq,
        }
    }
}

impl<T: Transport, S: Scheduler> Drop for ConnectionManager<T, S> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
