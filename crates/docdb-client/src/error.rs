//! # Client Errors
//!
//! This module defines the error type returned by every collaborator operation
//! (connecting, resolving buckets/scopes/collections, document access and
//! transaction attempts). Higher layers wrap it transparently or translate it
//! into their own taxonomy.

/// Errors raised by the document database client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Authentication failure: {0}")]
    AuthenticationFailure(String),
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),
    #[error("Scope not found: {0}")]
    ScopeNotFound(String),
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    #[error("Document already exists: {0}")]
    DocumentExists(String),
    #[error("CAS mismatch for document: {0}")]
    CasMismatch(String),
    #[error("Cluster connection closed")]
    ClusterClosed,
    #[error("Operation timed out: {0}")]
    Timeout(String),
    #[error("Temporary failure: {0}")]
    TemporaryFailure(String),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Transaction expired: {0}")]
    TransactionExpired(String),
    #[error("Internal client error: {0}")]
    Internal(String),
}

/// Result alias used by all collaborator traits.
pub type ClientResult<T> = Result<T, ClientError>;
