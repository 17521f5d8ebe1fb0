use thiserror::Error;

/// Failures surfaced by the [`crate::Transport`] the reporter writes through.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("influxdb responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to encode line protocol: {0}")]
    Encode(String),
}

/// A single failed write in per-point mode.
#[derive(Debug)]
pub struct WriteFailure {
    pub measurement: String,
    pub source: TransportError,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid reporter config: {0}")]
    InvalidConfig(String),
    /// The database could not be created. The reporter is unusable without it
    /// so this is only ever returned at construction.
    #[error("failed to create database {database:?}: {source}")]
    Connection {
        database: String,
        #[source]
        source: TransportError,
    },
    /// A batch write failed, none of its points were delivered.
    #[error("failed to write batch of {points} points: {source}")]
    Write {
        points: usize,
        #[source]
        source: TransportError,
    },
    /// Some per-point writes failed. Every point was still attempted.
    #[error("{} of {attempted} point writes failed", failures.len())]
    PartialWrite {
        attempted: usize,
        failures: Vec<WriteFailure>,
    },
    #[error("unable to translate {name:?}: {reason}")]
    Translation { name: String, reason: String },
    /// A blocking reporter call handed to the runtime's blocking pool panicked
    /// or was cancelled.
    #[error("reporter task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn translation(name: &str, reason: impl Into<String>) -> Self {
        Self::Translation {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
