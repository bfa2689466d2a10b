use mesh_types::events::DecodeError;
use thiserror::Error;

/// Every way a client request can fail. The gateway turns each of these into
/// a unicast `error` event for the originating session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    PolicyDenied(String),

    #[error("The post does not exist")]
    NotFound(String),

    #[error("{0}")]
    MalformedMessage(String),

    #[error("Could not deliver to session {0}")]
    TransportFailure(String),
}

impl From<DecodeError> for FeedError {
    fn from(err: DecodeError) -> Self {
        Self::MalformedMessage(err.to_string())
    }
}
