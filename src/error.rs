//! Error types and process exit statuses.

use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

/// Errors raised while talking to the message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker could not be reached or the handshake failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Queue deletion or declaration failed.
    #[error("Failed to set up queue '{queue}': {reason}")]
    Queue { queue: String, reason: String },

    /// A publish was rejected or could not be confirmed.
    #[error("Failed to publish to '{queue}': {reason}")]
    Publish { queue: String, reason: String },

    /// The delivery stream or an acknowledgment failed.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// A notification could not be delivered.
///
/// Never fatal: callers log it and carry on.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Sender or recipient address is malformed.
    #[error("Invalid address '{0}'")]
    Address(String),

    /// The message could not be assembled.
    #[error("Failed to build message: {0}")]
    Message(String),

    /// The transport session failed (connect, login or send).
    #[error("Transport failed: {0}")]
    Transport(String),

    /// The receiving side of an in-process sink has gone away.
    #[error("Notification receiver dropped")]
    Closed,
}

/// Errors from a [`SlidingWindow`](crate::window::SlidingWindow).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Delta was requested before the window filled up.
    #[error("Window holds {len} of {capacity} readings; delta needs a full window")]
    Precondition { len: usize, capacity: usize },
}

/// A reading could not be parsed from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Body was not valid UTF-8.
    #[error("Body is not valid UTF-8")]
    Encoding,

    /// Body did not have a `<timestamp>,<value>` shape.
    #[error("Malformed reading '{0}'")]
    Shape(String),

    /// Value field was not a decimal number.
    #[error("Invalid temperature '{0}'")]
    Value(String),
}

/// Top-level errors that terminate a producer or consumer process.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The historical source file is missing or unreadable.
    #[error("Cannot read source {path}: {reason}")]
    Source { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Runtime(String),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl Error {
    /// The exit status this error should terminate the process with.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Error::Broker(BrokerError::Connection(_)) => ExitStatus::ConnectionFailure,
            Error::Broker(_) | Error::Runtime(_) => ExitStatus::Failure,
            Error::Source { .. } => ExitStatus::SourceUnavailable,
            Error::Config(_) => ExitStatus::InvalidConfig,
        }
    }
}

/// How a producer or consumer process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Completed,
    Failure,
    ConnectionFailure,
    SourceUnavailable,
    InvalidConfig,
    Interrupted,
}

impl ExitStatus {
    /// Numeric process exit code.
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Completed => 0,
            ExitStatus::Failure => 1,
            ExitStatus::ConnectionFailure => 2,
            ExitStatus::SourceUnavailable => 3,
            ExitStatus::InvalidConfig => 4,
            ExitStatus::Interrupted => 130,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}
