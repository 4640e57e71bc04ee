use shared_types::{StartResearchAck, StartResearchRequest};

use crate::connection::{Scheduler, Transport};
use crate::dispatch::Dispatcher;
use crate::error::ClientError;

/// One-shot request that asks the backend to start a job
#[allow(async_fn_in_trait)]
pub trait StartJobApi {
    async fn start_research(
        &self,
        request: &StartResearchRequest,
    ) -> Result<StartResearchAck, ClientError>;
}

pub struct SubmissionGateway<A> {
    api: A,
}

impl<A: StartJobApi> SubmissionGateway<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Validates, resets the client for a new attempt, then sends the start
    /// request. The client is not borrowed while the request is in flight.
    pub async fn submit<T: Transport, S: Scheduler>(
        &self,
        dispatcher: &Dispatcher<T, S>,
        query: &str,
        model_id: &str,
        max_slides: u32,
    ) -> Result<StartResearchAck, ClientError> {
        let pending =
            dispatcher.with(|client| client.begin_submission(query, model_id, max_slides))?;
        let result = self.api.start_research(&pending.request).await;
        dispatcher.with(|client| client.finish_submission(&pending.session_id, result))
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::client::{ClientEvent, ResearchClient};
    use crate::config::ClientConfig;
    use crate::error::ValidationError;
    use crate::session::JobState;
    use crate::testing::{FakeScheduler, FakeStartJobApi, FakeTransport};

    fn dispatcher() -> std::rc::Rc<Dispatcher<FakeTransport, FakeScheduler>> {
        Dispatcher::new(ResearchClient::new(
            ClientConfig::default(),
            FakeTransport::default(),
            FakeScheduler::default(),
        ))
    }

    #[test]
    fn accepted_submission_binds_research_id() {
        let dispatcher = dispatcher();
        let api = FakeStartJobApi::accepting("research_1");
        let gateway = SubmissionGateway::new(api.clone());

        let ack = block_on(gateway.submit(&dispatcher, "EV market", "gpt-4o", 6)).expect("ack");
        assert_eq!(ack.research_id, "research_1");
        assert_eq!(api.requests().len(), 1);
        assert_eq!(api.requests()[0].query, "EV market");

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.session.state, JobState::Running);
        assert_eq!(snapshot.session.research_id.as_deref(), Some("research_1"));
    }

    #[test]
    fn empty_query_sends_nothing() {
        let dispatcher = dispatcher();
        let api = FakeStartJobApi::accepting("research_1");
        let gateway = SubmissionGateway::new(api.clone());

        let err = block_on(gateway.submit(&dispatcher, "", "gpt-4o", 6)).expect_err("rejected");
        assert_eq!(err, ClientError::Validation(ValidationError::EmptyQuery));
        assert!(api.requests().is_empty());
        assert_eq!(dispatcher.snapshot().session.state, JobState::Idle);
    }

    #[test]
    fn failed_request_leaves_no_running_session() {
        let dispatcher = dispatcher();
        let gateway = SubmissionGateway::new(FakeStartJobApi::failing("HTTP error: 502"));

        let err = block_on(gateway.submit(&dispatcher, "EV market", "gpt-4o", 6)).expect_err("fails");
        assert_eq!(err, ClientError::Submission("HTTP error: 502".to_string()));
        assert_eq!(dispatcher.snapshot().session.state, JobState::Idle);
    }

    #[test]
    fn frames_after_submission_reach_the_session() {
        let dispatcher = dispatcher();
        let gateway = SubmissionGateway::new(FakeStartJobApi::accepting("research_1"));
        block_on(gateway.submit(&dispatcher, "EV market", "gpt-4o", 6)).expect("ack");

        let generation = dispatcher.with(|client| client.connection().generation());
        dispatcher.post(ClientEvent::Opened { generation });
        dispatcher.post(ClientEvent::Frame {
            generation,
            payload: r#"{"research_id":"research_1","status":"running","progress":40}"#.to_string(),
        });
        assert_eq!(dispatcher.snapshot().session.progress, 40);
    }
}
