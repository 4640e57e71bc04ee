//! In-memory transport and scheduler for exercising the client without a browser.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use shared_types::{StartResearchAck, StartResearchRequest};

use crate::connection::{Generation, ScheduledTask, Scheduler, Socket, TimerId, Transport};
use crate::error::ClientError;
use crate::gateway::StartJobApi;

#[derive(Default)]
struct TransportLog {
    opened: Vec<(String, Generation)>,
    closed: Vec<Generation>,
    fail_next: bool,
}

#[derive(Clone, Default)]
pub struct FakeTransport {
    log: Rc<RefCell<TransportLog>>,
}

impl FakeTransport {
    pub fn opened(&self) -> Vec<(String, Generation)> {
        self.log.borrow().opened.clone()
    }

    pub fn closed(&self) -> Vec<Generation> {
        self.log.borrow().closed.clone()
    }

    pub fn fail_next_open(&self) {
        self.log.borrow_mut().fail_next = true;
    }
}

pub struct FakeSocket {
    generation: Generation,
    log: Rc<RefCell<TransportLog>>,
}

impl Transport for FakeTransport {
    type Socket = FakeSocket;

    fn open(&mut self, url: &str, generation: Generation) -> Result<FakeSocket, ClientError> {
        let mut log = self.log.borrow_mut();
        if std::mem::take(&mut log.fail_next) {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        log.opened.push((url.to_string(), generation));
        Ok(FakeSocket {
            generation,
            log: self.log.clone(),
        })
    }
}

impl Socket for FakeSocket {
    fn close(&mut self) {
        self.log.borrow_mut().closed.push(self.generation);
    }
}

#[derive(Default)]
struct SchedulerLog {
    scheduled: Vec<(TimerId, Duration)>,
    cancelled: Vec<TimerId>,
}

#[derive(Clone, Default)]
pub struct FakeScheduler {
    log: Rc<RefCell<SchedulerLog>>,
}

impl FakeScheduler {
    pub fn scheduled(&self) -> Vec<(TimerId, Duration)> {
        self.log.borrow().scheduled.clone()
    }

    pub fn cancelled(&self) -> Vec<TimerId> {
        self.log.borrow().cancelled.clone()
    }
}

pub struct FakeTask {
    id: TimerId,
    log: Rc<RefCell<SchedulerLog>>,
}

impl Scheduler for FakeScheduler {
    type Task = FakeTask;

    fn schedule(&mut self, id: TimerId, delay: Duration) -> FakeTask {
        self.log.borrow_mut().scheduled.push((id, delay));
        FakeTask {
            id,
            log: self.log.clone(),
        }
    }
}

impl ScheduledTask for FakeTask {
    fn cancel(self) {
        self.log.borrow_mut().cancelled.push(self.id);
    }
}

/// Start-job API answering from a canned result and recording requests
#[derive(Clone)]
pub struct FakeStartJobApi {
    response: Rc<RefCell<Result<StartResearchAck, ClientError>>>,
    requests: Rc<RefCell<Vec<StartResearchRequest>>>,
}

impl FakeStartJobApi {
    pub fn accepting(research_id: &str) -> Self {
        Self {
            response: Rc::new(RefCell::new(Ok(StartResearchAck {
                research_id: research_id.to_string(),
                status: "started".to_string(),
                progress: Some(0),
            }))),
            requests: Rc::default(),
        }
    }

    pub fn failing(detail: &str) -> Self {
        Self {
            response: Rc::new(RefCell::new(Err(ClientError::Submission(detail.to_string())))),
            requests: Rc::default(),
        }
    }

    pub fn requests(&self) -> Vec<StartResearchRequest> {
        self.requests.borrow().clone()
    }
}

impl StartJobApi for FakeStartJobApi {
    async fn start_research(
        &self,
        request: &StartResearchRequest,
    ) -> Result<StartResearchAck, ClientError> {
        self.requests.borrow_mut().push(request.clone());
        self.response.borrow().clone()
    }
}
