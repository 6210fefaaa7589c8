//! # Factory Errors

use docdb_client::ClientError;

/// Errors surfaced by [`ClientFactory`](crate::ClientFactory) and
/// [`ClientSession`](crate::ClientSession).
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// The factory is in a state where the request cannot be served, e.g. a
    /// default collection was requested while a named scope is active.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Upstream client errors pass through unchanged.
    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type FactoryResult<T> = Result<T, FactoryError>;
