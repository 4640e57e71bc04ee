use std::collections::VecDeque;

use dioxus_logger::tracing::{debug, warn};

use crate::logs::{ActivityLog, ThinkingLog};
use crate::message::InboundMessage;
use crate::session::JobSession;

/// Frames held while the start request is in flight
const MAX_HELD_FRAMES: usize = 64;

/// Everything scoped to one research attempt
#[derive(Debug, Clone, Default)]
pub struct ResearchState {
    pub session: JobSession,
    pub thinking: ThinkingLog,
    pub activity: ActivityLog,
    /// Frames seen before the ack named this attempt's server id. The
    /// stream is shared by every job, so none of them is trusted yet.
    held: VecDeque<InboundMessage>,
}

impl ResearchState {
    /// Discards the previous attempt and opens a fresh running session.
    pub fn begin_attempt(&mut self) -> &JobSession {
        self.thinking.clear();
        self.activity.clear();
        self.held.clear();
        self.session = JobSession::start();
        &self.session
    }

    /// Running, but the server id is not known yet
    pub fn awaiting_ack(&self) -> bool {
        self.session.is_running() && self.session.research_id.is_none()
    }

    /// Keeps a frame until the ack arrives. The oldest frame is dropped
    /// once the buffer is full.
    pub fn hold(&mut self, msg: InboundMessage) {
        if self.held.len() == MAX_HELD_FRAMES {
            if let Some(dropped) = self.held.pop_front() {
                warn!(
                    "Pre-ack buffer full; dropping frame for {}",
                    dropped.research_id
                );
            }
        }
        self.held.push_back(msg);
    }

    pub fn held_len(&self) -> usize {
        self.held.len()
    }

    /// Binds the id from the start-job ack and hands back the held frames
    /// that belong to it, oldest first. Frames for any other id are dropped.
    ///
    /// Returns `None` when `session_id` is no longer the running attempt.
    pub fn bind_ack(
        &mut self,
        session_id: &str,
        research_id: &str,
    ) -> Option<Vec<InboundMessage>> {
        if self.session.id != session_id || !self.awaiting_ack() {
            return None;
        }
        self.session.bind(research_id);

        let (mine, foreign): (Vec<_>, Vec<_>) = self
            .held
            .drain(..)
            .partition(|msg| msg.research_id == research_id);
        if !foreign.is_empty() {
            debug!(
                "Dropping {} held frame(s) from other research jobs",
                foreign.len()
            );
        }
        Some(mine)
    }

    /// Reverts a submission whose start request failed.
    pub fn abandon_attempt(&mut self, session_id: &str) -> bool {
        if self.session.id != session_id || !self.session.is_running() {
            return false;
        }
        self.held.clear();
        self.session.revert_to_idle();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{decode_frame, ActivityRecord};
    use crate::session::JobState;

    fn held_frame(research_id: &str, progress: u8) -> InboundMessage {
        decode_frame(&format!(
            r#"{{"research_id":"{research_id}","status":"running","progress":{progress}}}"#
        ))
        .expect("valid frame")
    }

    #[test]
    fn begin_attempt_resets_logs_and_unbinds_previous_id() {
        let mut state = ResearchState::default();
        let first = state.begin_attempt().id.clone();
        assert!(state.bind_ack(&first, "research_1").is_some());
        state.activity.push(ActivityRecord::searching("q"));

        let second = state.begin_attempt().id.clone();
        assert_ne!(first, second);
        assert!(state.activity.is_empty());
        assert!(state.awaiting_ack());
        assert!(!state.session.matches("research_1"));
    }

    #[test]
    fn ack_for_superseded_session_is_ignored() {
        let mut state = ResearchState::default();
        let first = state.begin_attempt().id.clone();
        state.begin_attempt();
        assert!(state.bind_ack(&first, "research_1").is_none());
        assert!(state.session.research_id.is_none());
    }

    #[test]
    fn ack_keeps_only_its_own_held_frames_in_order() {
        let mut state = ResearchState::default();
        let id = state.begin_attempt().id.clone();
        state.hold(held_frame("other", 50));
        state.hold(held_frame("research_1", 10));
        state.hold(held_frame("other", 60));
        state.hold(held_frame("research_1", 20));

        let mine = state.bind_ack(&id, "research_1").expect("running attempt");
        assert_eq!(
            mine.iter().map(|m| m.progress).collect::<Vec<_>>(),
            vec![10, 20]
        );
        assert_eq!(state.held_len(), 0);
        assert_eq!(state.session.progress, 0);
        assert!(state.session.matches("research_1"));
    }

    #[test]
    fn second_ack_is_refused() {
        let mut state = ResearchState::default();
        let id = state.begin_attempt().id.clone();
        assert!(state.bind_ack(&id, "research_1").is_some());
        assert!(state.bind_ack(&id, "research_2").is_none());
        assert!(state.session.matches("research_1"));
    }

    #[test]
    fn held_frames_are_bounded() {
        let mut state = ResearchState::default();
        let id = state.begin_attempt().id.clone();
        state.hold(held_frame("research_1", 1));
        for _ in 0..MAX_HELD_FRAMES {
            state.hold(held_frame("other", 5));
        }
        assert_eq!(state.held_len(), MAX_HELD_FRAMES);
        // The oldest frame went first.
        assert!(state.bind_ack(&id, "research_1").expect("running").is_empty());
    }

    #[test]
    fn abandon_reverts_to_idle() {
        let mut state = ResearchState::default();
        let id = state.begin_attempt().id.clone();
        state.hold(held_frame("research_1", 10));
        assert!(state.abandon_attempt(&id));
        assert_eq!(state.session.state, JobState::Idle);
        assert_eq!(state.held_len(), 0);
        assert!(!state.awaiting_ack());
    }
}
