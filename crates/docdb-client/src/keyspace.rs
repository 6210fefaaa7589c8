//! Keyspace addressing: `bucket.scope.collection`.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Name of the scope every bucket carries.
pub const DEFAULT_SCOPE: &str = "_default";

/// Name of the collection every scope carries.
pub const DEFAULT_COLLECTION: &str = "_default";

/// Fully qualified location of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyspace {
    pub bucket: String,
    pub scope: String,
    pub collection: String,
}

impl Keyspace {
    pub fn new(
        bucket: impl Into<String>,
        scope: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            scope: scope.into(),
            collection: collection.into(),
        }
    }

    /// The `_default._default` keyspace of a bucket.
    pub fn default_for(bucket: impl Into<String>) -> Self {
        Self::new(bucket, DEFAULT_SCOPE, DEFAULT_COLLECTION)
    }

    pub fn is_default(&self) -> bool {
        self.scope == DEFAULT_SCOPE && self.collection == DEFAULT_COLLECTION
    }
}

impl Display for Keyspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.bucket, self.scope, self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keyspace() {
        let keyspace = Keyspace::default_for("travel");
        assert!(keyspace.is_default());
        assert_eq!(keyspace.to_string(), "travel._default._default");
    }

    #[test]
    fn test_named_keyspace_is_not_default() {
        let keyspace = Keyspace::new("travel", "inventory", "airline");
        assert!(!keyspace.is_default());
        assert_eq!(keyspace.to_string(), "travel.inventory.airline");
    }
}
