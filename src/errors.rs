//! Error types for the leaderboard engine and its request layer.

use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The issue store failed; the snapshot generated at `serving` is kept.
    #[error("issue store fetch failed, serving snapshot from {serving}: {source}")]
    Fetch {
        serving: DateTime<Utc>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("refresh timed out after {timeout_secs}s, serving snapshot from {serving}")]
    TimedOut {
        serving: DateTime<Utc>,
        timeout_secs: u64,
    },
}

impl EngineError {
    /// `generated_at` of the snapshot still being served.
    pub fn serving(&self) -> DateTime<Utc> {
        match self {
            EngineError::Fetch { serving, .. } | EngineError::TimedOut { serving, .. } => *serving,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A leaderboard request that cannot be answered as written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("unknown category id: {0}")]
    UnknownCategory(String),
}
