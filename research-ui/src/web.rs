//! Browser implementations of the transport, scheduler and start-job seams.
//!
//! Browser callbacks never touch the client directly. They push into an
//! [`EventInbox`] that the UI drains on its own tick.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use dioxus_logger::tracing::{debug, error, info};
use gloo_net::http::Request;
use gloo_timers::callback::Timeout;
use shared_types::{StartResearchAck, StartResearchRequest};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

use crate::client::{ClientEvent, ResearchClient};
use crate::config::ClientConfig;
use crate::connection::{Generation, ScheduledTask, Scheduler, Socket, TimerId, Transport};
use crate::dispatch::Dispatcher;
use crate::error::ClientError;
use crate::gateway::StartJobApi;

pub type EventSink = Rc<dyn Fn(ClientEvent)>;

pub type BrowserDispatcher = Dispatcher<WebSocketTransport, TimeoutScheduler>;

/// Events raised by browser callbacks, waiting to be applied
#[derive(Clone, Default)]
pub struct EventInbox {
    queue: Rc<RefCell<VecDeque<ClientEvent>>>,
}

impl EventInbox {
    pub fn sink(&self) -> EventSink {
        let queue = self.queue.clone();
        Rc::new(move |event| queue.borrow_mut().push_back(event))
    }

    pub fn take_all(&self) -> Vec<ClientEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Applies everything queued so far; returns how many events were applied.
    pub fn pump(&self, dispatcher: &BrowserDispatcher) -> usize {
        let drained = self.take_all();
        let count = drained.len();
        for event in drained {
            dispatcher.post(event);
        }
        count
    }
}

/// Builds a client wired to real browser sockets and timers.
pub fn browser_dispatcher(config: ClientConfig, inbox: &EventInbox) -> Rc<BrowserDispatcher> {
    let transport = WebSocketTransport { sink: inbox.sink() };
    let scheduler = TimeoutScheduler { sink: inbox.sink() };
    Dispatcher::new(ResearchClient::new(config, transport, scheduler))
}

pub struct WebSocketTransport {
    sink: EventSink,
}

pub struct BrowserSocket {
    ws: WebSocket,
    _on_open: Closure<dyn FnMut(JsValue)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(JsValue)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
}

impl Transport for WebSocketTransport {
    type Socket = BrowserSocket;

    fn open(&mut self, url: &str, generation: Generation) -> Result<BrowserSocket, ClientError> {
        info!("Connecting to WebSocket: {}", url);
        let ws = WebSocket::new(url).map_err(|e| {
            error!("Failed to create WebSocket: {:?}", e);
            ClientError::Transport(format!("Failed to create websocket: {e:?}"))
        })?;

        let sink = self.sink.clone();
        let on_open = Closure::wrap(Box::new(move |_e: JsValue| {
            sink(ClientEvent::Opened { generation });
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let sink = self.sink.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            let Ok(text) = e.data().dyn_into::<js_sys::JsString>() else {
                debug!("Ignoring non-text WebSocket message");
                return;
            };
            sink(ClientEvent::Frame {
                generation,
                payload: text.as_string().unwrap_or_default(),
            });
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let sink = self.sink.clone();
        let on_close = Closure::wrap(Box::new(move |e: JsValue| {
            let (clean, code, reason) = match e.dyn_into::<CloseEvent>() {
                Ok(close) => (close.was_clean(), close.code(), close.reason()),
                Err(_) => (false, 1006, String::new()),
            };
            sink(ClientEvent::Closed {
                generation,
                clean,
                code,
                reason,
            });
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let sink = self.sink.clone();
        let on_error = Closure::wrap(Box::new(move |e: JsValue| {
            let detail = match e.dyn_ref::<ErrorEvent>() {
                Some(event) => event.message(),
                None => format!("{e:?}"),
            };
            sink(ClientEvent::TransportError { generation, detail });
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(BrowserSocket {
            ws,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        })
    }
}

impl Socket for BrowserSocket {
    fn close(&mut self) {
        // Handlers stay attached so the close event still arrives.
        if let Err(e) = self.ws.close() {
            debug!("WebSocket close failed: {:?}", e);
        }
    }
}

impl Drop for BrowserSocket {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
        if let Err(e) = self.ws.close() {
            debug!("WebSocket close on drop failed: {:?}", e);
        }
    }
}

pub struct TimeoutScheduler {
    sink: EventSink,
}

pub struct TimeoutTask(Timeout);

impl Scheduler for TimeoutScheduler {
    type Task = TimeoutTask;

    fn schedule(&mut self, id: TimerId, delay: Duration) -> TimeoutTask {
        let sink = self.sink.clone();
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        TimeoutTask(Timeout::new(millis, move || sink(ClientEvent::TimerFired(id))))
    }
}

impl ScheduledTask for TimeoutTask {
    fn cancel(self) {
        let _ = self.0.cancel();
    }
}

/// `POST /research` over fetch
pub struct HttpStartJobApi {
    url: String,
}

impl HttpStartJobApi {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            url: config.research_url(),
        }
    }
}

impl StartJobApi for HttpStartJobApi {
    async fn start_research(
        &self,
        request: &StartResearchRequest,
    ) -> Result<StartResearchAck, ClientError> {
        let response = Request::post(&self.url)
            .json(request)
            .map_err(|e| ClientError::Submission(format!("Failed to serialize request: {e}")))?
            .send()
            .await
            .map_err(|e| ClientError::Submission(format!("Request failed: {e}")))?;

        if !response.ok() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Submission(describe_http_error(status, &body)));
        }

        response
            .json::<StartResearchAck>()
            .await
            .map_err(|e| ClientError::Submission(format!("Failed to parse JSON: {e}")))
    }
}

fn describe_http_error(status: u16, body: &str) -> String {
    if body.trim().is_empty() {
        return format!("HTTP error: {status}");
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(text) = json.get(key).and_then(|v| v.as_str()) {
                return format!("HTTP error: {status} ({text})");
            }
        }
    }

    format!("HTTP error: {status} ({body})")
}
