use thiserror::Error;

/// Failure kinds surfaced by the capture scheduler and the nutrition ledger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlatewiseError {
    /// Malformed detection response or an entry that violates the data model.
    #[error("invalid response format: {reason}")]
    Validation { reason: String },

    /// Transport failure or a non-2xx reply from the remote service.
    #[error("network error: {reason}")]
    Network { reason: String },

    /// A ledger operation was attempted without an authenticated owner.
    #[error("authentication required")]
    AuthRequired,

    /// A detection response belongs to a capture generation that is no longer current.
    /// Only used inside the scheduler; callers observe it as a dropped result.
    #[error("stale detection response: issued at generation {issued}, current is {current}")]
    ConcurrencyStale { issued: u64, current: u64 },
}

pub type PlatewiseResult<T> = Result<T, PlatewiseError>;

impl PlatewiseError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
        }
    }

    /// Report any remote-call failure as a `Network` error, keeping its message.
    pub fn into_network(self) -> Self {
        match self {
            Self::Network { .. } => self,
            other => Self::network(other.to_string()),
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::ConcurrencyStale { .. })
    }
}

impl From<reqwest::Error> for PlatewiseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PlatewiseError::validation(err.to_string())
        } else {
            PlatewiseError::network(err.to_string())
        }
    }
}
