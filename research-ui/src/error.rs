//! Client error taxonomy

/// Input rejected before anything goes on the network
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Query must not be empty")]
    EmptyQuery,
    #[error("max_slides must be within {min}..={max}, got {actual}")]
    MaxSlidesOutOfRange { min: u32, max: u32, actual: u32 },
}

/// A frame that could not be applied as sent
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
    #[error("Completed frame for {research_id} is missing slides_html")]
    MissingSlides { research_id: String },
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("A research job is already running")]
    JobInFlight,

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Research failed: {0}")]
    RemoteJobFailure(String),
}
