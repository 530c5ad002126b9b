use thiserror::Error;

/// Failures surfaced to the user as a transient notice. None of them are fatal; the current
/// payload is left untouched and the action can be retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("failed to fetch recommendations: {0}")]
    Fetch(String),
    #[error("invalid recommendations payload: {0}")]
    InvalidPayload(String),
    #[error("a recommendations fetch is already in progress")]
    Busy,
}

impl DashboardError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::InvalidPayload(_) => "invalid",
            Self::Busy => "busy",
        }
    }
}
