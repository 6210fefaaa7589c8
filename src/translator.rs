//! # Exception Translation
//!
//! Maps the client library's [`ClientError`] onto a storage-agnostic
//! [`DataAccessError`] taxonomy, so repository code can react to "duplicate
//! key" or "optimistic locking failure" without knowing which driver raised it.
//!
//! The translator is stateless; a factory builds one at construction and hands
//! out a reference to that same instance for its whole life.

use docdb_client::ClientError;

/// Driver-independent data access failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataAccessError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Data retrieval failure: {0}")]
    DataRetrievalFailure(String),
    #[error("Optimistic locking failure: {0}")]
    OptimisticLockingFailure(String),
    #[error("Data access resource failure: {0}")]
    DataAccessResourceFailure(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid data access API usage: {0}")]
    InvalidDataAccessApiUsage(String),
    #[error("Transient data access resource failure: {0}")]
    TransientDataAccessResource(String),
    #[error("Query timeout: {0}")]
    QueryTimeout(String),
    #[error("Transaction system failure: {0}")]
    TransactionSystem(String),
}

impl DataAccessError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataAccessError::TransientDataAccessResource(_)
                | DataAccessError::QueryTimeout(_)
                | DataAccessError::OptimisticLockingFailure(_)
        )
    }
}

/// Converts driver errors into [`DataAccessError`]s.
pub trait ExceptionTranslator: Send + Sync {
    /// Returns `None` when the error has no meaningful data-access equivalent.
    fn translate(&self, error: &ClientError) -> Option<DataAccessError>;
}

/// Translator for [`docdb_client`] errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocDbExceptionTranslator;

impl ExceptionTranslator for DocDbExceptionTranslator {
    fn translate(&self, error: &ClientError) -> Option<DataAccessError> {
        let message = error.to_string();
        let translated = match error {
            ClientError::DocumentExists(_) => DataAccessError::DuplicateKey(message),
            ClientError::DocumentNotFound(_) => DataAccessError::DataRetrievalFailure(message),
            ClientError::CasMismatch(_) => DataAccessError::OptimisticLockingFailure(message),
            ClientError::BucketNotFound(_)
            | ClientError::ScopeNotFound(_)
            | ClientError::CollectionNotFound(_)
            | ClientError::ClusterClosed => DataAccessError::DataAccessResourceFailure(message),
            ClientError::AuthenticationFailure(_) => DataAccessError::PermissionDenied(message),
            ClientError::InvalidArgument(_) => DataAccessError::InvalidDataAccessApiUsage(message),
            ClientError::TemporaryFailure(_) => {
                DataAccessError::TransientDataAccessResource(message)
            }
            ClientError::Timeout(_) => DataAccessError::QueryTimeout(message),
            ClientError::TransactionFailed(_) | ClientError::TransactionExpired(_) => {
                DataAccessError::TransactionSystem(message)
            }
            ClientError::Internal(_) => return None,
        };
        Some(translated)
    }
}
