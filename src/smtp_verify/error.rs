use std::io;

use thiserror::Error;

use super::types::AttemptStage;

/// Failures of a single SMTP session. They never escape the probe: each one is folded into
/// the [`AttemptOutcome`](super::AttemptOutcome) of the server being tried.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("no socket address available for {host}")]
    NoAddress { host: String },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("timed out during {stage}")]
    Timeout { stage: AttemptStage },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: AttemptStage,
        #[source]
        source: io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    pub(crate) fn io(stage: AttemptStage) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { stage, source }
    }

    pub(crate) fn protocol<T: Into<String>>(message: T) -> Self {
        Self::Protocol(message.into())
    }

    /// `true` for failures that happened before any SMTP byte was exchanged.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Self::Resolve { .. }
                | Self::NoAddress { .. }
                | Self::Connect { .. }
                | Self::Timeout {
                    stage: AttemptStage::Connect
                }
        )
    }
}
