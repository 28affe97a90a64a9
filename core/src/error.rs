//! Error taxonomy for the retrieval pipeline.
//!
//! Only [`PipelineError`] ever escapes `Pipeline::fetch_data`. Per-log
//! failures ([`FetchError`]) are stored in their batch slot and logged.

use thiserror::Error;

use crate::model::LogId;

/// HTTP-level failure talking to the report service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    /// Worth retrying: connection problems, throttling and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Request { .. } => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Decode { .. } => false,
        }
    }
}

/// A payload that does not describe a usable fight.
///
/// Expected for a share of uploads (aborted pulls, solo tests) and never a bug.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FightInvalid {
    #[error("missing or malformed section `{0}`")]
    MissingSection(&'static str),

    #[error("unparseable fight start time {0:?}")]
    BadTimestamp(String),

    #[error("fight has zero duration")]
    ZeroDuration,

    #[error("no tracked players in fight")]
    NoPlayers,
}

/// Outcome of a single log that contributes no rows
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport failure for log {log_id}: {source}")]
    Transport {
        log_id: LogId,
        #[source]
        source: TransportError,
    },

    #[error("invalid fight {log_id}: {source}")]
    Invalid {
        log_id: LogId,
        #[source]
        source: FightInvalid,
    },

    #[error("worker panicked while fetching log {log_id}")]
    WorkerPanic { log_id: LogId },

    #[error("log {log_id} was never picked up by a worker")]
    NotProcessed { log_id: LogId },
}

impl FetchError {
    pub fn log_id(&self) -> &LogId {
        match self {
            FetchError::Transport { log_id, .. }
            | FetchError::Invalid { log_id, .. }
            | FetchError::WorkerPanic { log_id }
            | FetchError::NotProcessed { log_id } => log_id,
        }
    }
}

/// Arrow failures while building or reshaping a table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("table has no column `{0}`")]
    MissingColumn(String),

    #[error("column `{column}` is not of type {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },
}

/// Errors surfaced to callers of `fetch_data`
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("report service unavailable: {0}")]
    RemoteUnavailable(#[source] TransportError),

    #[error(transparent)]
    Table(#[from] TableError),
}
