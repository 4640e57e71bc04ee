//! Classifies decoded frames and applies them to the research state.
//!
//! Pure and synchronous: no I/O, no logging of user-facing notices.

use shared_types::ResearchStatus;

use crate::error::{ClientError, ProtocolError};
use crate::message::{InboundMessage, ToolActivity};
use crate::state::ResearchState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Thinking,
    ToolActivity,
    ProgressUpdate,
    TerminalSuccess,
    TerminalFailure(ClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// No session is running
    NoActiveJob,
    /// The frame belongs to another (usually superseded) job
    StaleResearchId { research_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Applied(MessageKind),
    /// Kept until the start request's ack says which job is ours
    Held,
    Discarded(DiscardReason),
}

pub fn route(state: &mut ResearchState, msg: InboundMessage) -> RouteOutcome {
    if !state.session.is_running() {
        return RouteOutcome::Discarded(DiscardReason::NoActiveJob);
    }
    if state.awaiting_ack() {
        state.hold(msg);
        return RouteOutcome::Held;
    }
    if !state.session.matches(&msg.research_id) {
        return RouteOutcome::Discarded(DiscardReason::StaleResearchId {
            research_id: msg.research_id,
        });
    }

    state.session.update_progress(msg.progress, msg.message);

    let mut kind = MessageKind::ProgressUpdate;
    match msg.tool_activity {
        Some(ToolActivity::Thinking(fragment)) => {
            state.thinking.push(fragment);
            kind = MessageKind::Thinking;
        }
        Some(ToolActivity::Activity(record)) => {
            state.activity.push(record);
            kind = MessageKind::ToolActivity;
        }
        None => {}
    }

    let kind = match msg.status {
        ResearchStatus::Completed => match msg.slides_html {
            Some(html) => {
                state.session.complete(html, msg.result);
                MessageKind::TerminalSuccess
            }
            None => {
                let err = ClientError::from(ProtocolError::MissingSlides {
                    research_id: msg.research_id,
                });
                state.session.fail(err.to_string());
                MessageKind::TerminalFailure(err)
            }
        },
        ResearchStatus::Error => {
            let reason = msg
                .error
                .or_else(|| state.session.message.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            state.session.fail(reason.clone());
            MessageKind::TerminalFailure(ClientError::RemoteJobFailure(reason))
        }
        ResearchStatus::Pending | ResearchStatus::Running => kind,
    };
    RouteOutcome::Applied(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{decode_frame, ActivityAction, ActivityRecord, ThinkingFragment};
    use crate::session::JobState;

    fn running_state(research_id: &str) -> ResearchState {
        let mut state = ResearchState::default();
        let id = state.begin_attempt().id.clone();
        assert!(state.bind_ack(&id, research_id).is_some());
        state
    }

    fn frame(research_id: &str, status: ResearchStatus, progress: u8) -> InboundMessage {
        InboundMessage {
            research_id: research_id.to_string(),
            status,
            progress,
            message: None,
            result: None,
            slides_html: None,
            error: None,
            tool_activity: None,
        }
    }

    fn thinking(research_id: &str, text: &str) -> InboundMessage {
        InboundMessage {
            tool_activity: Some(ToolActivity::Thinking(ThinkingFragment {
                text: text.to_string(),
                timestamp: None,
            })),
            ..frame(research_id, ResearchStatus::Running, 15)
        }
    }

    fn activity(research_id: &str, record: ActivityRecord) -> InboundMessage {
        InboundMessage {
            tool_activity: Some(ToolActivity::Activity(record)),
            ..frame(research_id, ResearchStatus::Running, 15)
        }
    }

    #[test]
    fn thinking_fragments_accumulate_in_order_without_touching_activity() {
        let mut state = running_state("r1");
        for text in ["a", "b", "c"] {
            assert_eq!(
                route(&mut state, thinking("r1", text)),
                RouteOutcome::Applied(MessageKind::Thinking)
            );
        }
        assert_eq!(state.thinking.texts().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(state.activity.is_empty());
    }

    #[test]
    fn each_activity_message_adds_exactly_one_record() {
        let mut state = running_state("r1");
        route(&mut state, activity("r1", ActivityRecord::searching("q1")));
        route(&mut state, thinking("r1", "between"));
        route(&mut state, activity("r1", ActivityRecord::visiting("https://a.example")));
        assert_eq!(state.activity.len(), 2);
        assert_eq!(state.activity.records()[0].action, Some(ActivityAction::Searching));
        assert_eq!(state.activity.records()[1].action, Some(ActivityAction::Visiting));
        assert_eq!(state.thinking.len(), 1);
    }

    #[test]
    fn completed_with_slides_is_terminal_success() {
        let mut state = running_state("r1");
        let msg = InboundMessage {
            slides_html: Some("<html>X</html>".to_string()),
            ..frame("r1", ResearchStatus::Completed, 100)
        };
        assert_eq!(
            route(&mut state, msg),
            RouteOutcome::Applied(MessageKind::TerminalSuccess)
        );
        assert_eq!(state.session.state, JobState::Completed);
        assert_eq!(state.session.result_payload.as_deref(), Some("<html>X</html>"));

        let snapshot = state.session.clone();
        route(&mut state, frame("r1", ResearchStatus::Running, 42));
        route(&mut state, thinking("r1", "late"));
        assert_eq!(state.session, snapshot);
        assert!(state.thinking.is_empty());
    }

    #[test]
    fn completed_without_slides_fails_with_protocol_error() {
        let mut state = running_state("r1");
        let outcome = route(&mut state, frame("r1", ResearchStatus::Completed, 100));
        let RouteOutcome::Applied(MessageKind::TerminalFailure(ClientError::Protocol(_))) = outcome
        else {
            panic!("expected protocol failure, got {outcome:?}");
        };
        assert_eq!(state.session.state, JobState::Failed);
        assert!(state.session.result_payload.is_none());
        assert!(state
            .session
            .failure_reason
            .as_deref()
            .is_some_and(|r| r.contains("slides_html")));
    }

    #[test]
    fn error_status_fails_with_remote_reason() {
        let mut state = running_state("r1");
        let msg = InboundMessage {
            error: Some("rate limited".to_string()),
            ..frame("r1", ResearchStatus::Error, 0)
        };
        assert_eq!(
            route(&mut state, msg),
            RouteOutcome::Applied(MessageKind::TerminalFailure(ClientError::RemoteJobFailure(
                "rate limited".to_string()
            )))
        );
        assert_eq!(state.session.failure_reason.as_deref(), Some("rate limited"));
    }

    #[test]
    fn error_without_detail_falls_back_to_message() {
        let mut state = running_state("r1");
        let msg = InboundMessage {
            message: Some("backend exploded".to_string()),
            ..frame("r1", ResearchStatus::Error, 0)
        };
        route(&mut state, msg);
        assert_eq!(state.session.failure_reason.as_deref(), Some("backend exploded"));
    }

    #[test]
    fn stale_terminal_message_mutates_nothing() {
        let mut state = running_state("r_old");
        let id = state.begin_attempt().id.clone();
        assert!(state.bind_ack(&id, "r_new").is_some());
        route(&mut state, activity("r_new", ActivityRecord::searching("q")));

        let session = state.session.clone();
        let activity_log = state.activity.clone();
        let stale = InboundMessage {
            slides_html: Some("<html>old</html>".to_string()),
            tool_activity: Some(ToolActivity::Thinking(ThinkingFragment {
                text: "old".to_string(),
                timestamp: None,
            })),
            ..frame("r_old", ResearchStatus::Completed, 100)
        };
        assert_eq!(
            route(&mut state, stale),
            RouteOutcome::Discarded(DiscardReason::StaleResearchId {
                research_id: "r_old".to_string()
            })
        );
        assert_eq!(state.session, session);
        assert_eq!(state.activity, activity_log);
        assert!(state.thinking.is_empty());
    }

    #[test]
    fn frames_without_a_running_session_are_discarded() {
        let mut state = ResearchState::default();
        assert_eq!(
            route(&mut state, frame("r1", ResearchStatus::Running, 10)),
            RouteOutcome::Discarded(DiscardReason::NoActiveJob)
        );
        assert_eq!(state.session.state, JobState::Idle);
    }

    #[test]
    fn frames_before_ack_are_held_untouched() {
        let mut state = ResearchState::default();
        state.begin_attempt();
        let msg = decode_frame(
            r#"{"research_id":"r9","status":"completed","progress":100,"slides_html":"<html>r9</html>"}"#,
        )
        .expect("valid frame");
        assert_eq!(route(&mut state, msg), RouteOutcome::Held);
        assert_eq!(state.held_len(), 1);
        assert_eq!(state.session.state, JobState::Running);
        assert!(state.session.research_id.is_none());
        assert!(state.session.result_payload.is_none());
        assert_eq!(state.session.progress, 0);
    }
}
