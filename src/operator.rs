//! Transactional operator handle.
//!
//! The factory never looks inside a [`TransactionalOperator`]; it only carries
//! one so that repository layers built on top of a factory know which
//! transaction-management strategy to run their operations under.

use docdb_client::TransactionConfig;
use std::fmt::Debug;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
struct OperatorInner {
    id: Uuid,
    name: Option<String>,
    config: TransactionConfig,
}

/// Opaque, cheaply clonable handle. Two handles are equal only if one is a
/// clone of the other.
#[derive(Debug, Clone)]
pub struct TransactionalOperator {
    inner: Arc<OperatorInner>,
}

impl TransactionalOperator {
    pub fn new(config: TransactionConfig) -> Self {
        Self {
            inner: Arc::new(OperatorInner {
                id: Uuid::new_v4(),
                name: None,
                config,
            }),
        }
    }

    pub fn named(name: impl Into<String>, config: TransactionConfig) -> Self {
        Self {
            inner: Arc::new(OperatorInner {
                id: Uuid::new_v4(),
                name: Some(name.into()),
                config,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.inner.config
    }
}

impl PartialEq for TransactionalOperator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TransactionalOperator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_identity() {
        let a = TransactionalOperator::named("orders", TransactionConfig::default());
        let b = TransactionalOperator::named("orders", TransactionConfig::default());
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), Some("orders"));
    }
}
