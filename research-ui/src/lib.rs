pub mod app;
pub mod artifact;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod logs;
pub mod message;
pub mod router;
pub mod session;
pub mod state;
pub mod web;

#[cfg(test)]
mod testing;

pub use app::ResearchApp;
pub use client::{ClientEvent, Notice, NoticeLevel, ResearchClient, ResearchSnapshot};
pub use config::{ClientConfig, StallPolicy};
pub use error::{ClientError, ProtocolError, ValidationError};
pub use session::{JobSession, JobState};
