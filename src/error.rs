use thiserror::Error;

/// Failures talking to the role-play backend. The driver does not distinguish
/// between them: every variant ends the current run the same way.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid endpoint {0}")]
    Endpoint(String),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("malformed payload from {endpoint}: {source}")]
    Payload {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while playing a single segment. Never escapes the playback queue.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("speech payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("audio io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot resolve sound source {0:?}")]
    Source(String),

    #[error("audio output: {0}")]
    Sink(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("no intervention is pending")]
    NothingPending,

    #[error("choice {index} out of range ({available} choices)")]
    OutOfRange { index: usize, available: usize },

    #[error("no choice labelled {0:?}")]
    UnknownLabel(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api base {value:?}: {reason}")]
    ApiBase { value: String, reason: String },

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
