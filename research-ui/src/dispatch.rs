//! Single-threaded event pump around [`ResearchClient`].
//!
//! Events are queued and applied one at a time. An event posted while
//! another is being applied waits in the queue; nothing re-enters the client.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::client::{ClientEvent, Notice, ResearchClient, ResearchSnapshot};
use crate::connection::{Scheduler, Transport};

type Observer = Box<dyn FnMut(ResearchSnapshot, Vec<Notice>)>;

pub struct Dispatcher<T: Transport, S: Scheduler> {
    client: RefCell<ResearchClient<T, S>>,
    queue: RefCell<VecDeque<ClientEvent>>,
    observer: RefCell<Option<Observer>>,
}

impl<T: Transport, S: Scheduler> Dispatcher<T, S> {
    pub fn new(client: ResearchClient<T, S>) -> Rc<Self> {
        Rc::new(Self {
            client: RefCell::new(client),
            queue: RefCell::new(VecDeque::new()),
            observer: RefCell::new(None),
        })
    }

    /// Called with a fresh snapshot and any new notices after each batch.
    pub fn set_observer(&self, observer: impl FnMut(ResearchSnapshot, Vec<Notice>) + 'static) {
        *self.observer.borrow_mut() = Some(Box::new(observer));
    }

    pub fn clear_observer(&self) {
        self.observer.borrow_mut().take();
    }

    pub fn post(&self, event: ClientEvent) {
        self.queue.borrow_mut().push_back(event);
        self.drain();
    }

    /// Runs `f` against the client, then applies anything it queued.
    pub fn with<R>(&self, f: impl FnOnce(&mut ResearchClient<T, S>) -> R) -> R {
        let result = f(&mut self.client.borrow_mut());
        self.drain();
        result
    }

    pub fn snapshot(&self) -> ResearchSnapshot {
        self.client.borrow().snapshot()
    }

    fn drain(&self) {
        let Ok(mut client) = self.client.try_borrow_mut() else {
            // The caller further up the stack drains once it lets go.
            return;
        };
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            client.handle(event);
        }
        let snapshot = client.snapshot();
        let notices = client.take_notices();
        drop(client);

        if let Ok(mut observer) = self.observer.try_borrow_mut() {
            if let Some(observer) = observer.as_mut() {
                observer(snapshot, notices);
            }
        }
    }
}
