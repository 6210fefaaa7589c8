//! # Cluster, Bucket, Scope and Collection Contracts
//!
//! These traits are the surface a higher layer programs against. Each level
//! names the next through an associated type, so a `Cluster` implementation
//! fixes its `Bucket`, which fixes its `Scope` and `Collection`. A factory
//! written once against `C: Cluster` works for the in-memory engine, the mock,
//! or any other driver.
//!
//! Resolution calls (`bucket`, `scope`, `collection`) are synchronous and
//! cheap. Document operations are `async`.

use crate::error::ClientResult;
use crate::keyspace::Keyspace;
use crate::options::ClusterOptions;
use async_trait::async_trait;
use serde_json::Value;

/// Opens cluster connections.
pub trait Connector {
    type Cluster: Cluster;

    fn connect(&self, connection_string: &str, options: ClusterOptions)
        -> ClientResult<Self::Cluster>;
}

/// A live connection to a cluster.
pub trait Cluster: Send + Sync + 'static {
    type Bucket: Bucket;

    fn bucket(&self, name: &str) -> ClientResult<Self::Bucket>;

    /// Tears the connection down. Handles resolved from it stop working.
    fn disconnect(&self) -> ClientResult<()>;

    fn is_connected(&self) -> bool;
}

pub trait Bucket: Clone + Send + Sync + 'static {
    type Scope: Scope<Collection = Self::Collection>;
    type Collection: Collection;

    fn name(&self) -> &str;

    fn default_scope(&self) -> Self::Scope;

    fn scope(&self, name: &str) -> ClientResult<Self::Scope>;

    fn default_collection(&self) -> ClientResult<Self::Collection>;
}

pub trait Scope: Clone + Send + Sync + 'static {
    type Collection: Collection;

    fn name(&self) -> &str;

    fn bucket_name(&self) -> &str;

    fn collection(&self, name: &str) -> ClientResult<Self::Collection>;
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub struct GetResult {
    pub content: Value,
    pub cas: u64,
}

/// Result of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationResult {
    pub cas: u64,
}

#[async_trait]
pub trait Collection: Clone + Send + Sync + 'static {
    fn keyspace(&self) -> &Keyspace;

    fn name(&self) -> &str {
        &self.keyspace().collection
    }

    async fn get(&self, id: &str) -> ClientResult<GetResult>;

    /// Fails with `DocumentExists` if `id` is taken.
    async fn insert(&self, id: &str, content: Value) -> ClientResult<MutationResult>;

    async fn upsert(&self, id: &str, content: Value) -> ClientResult<MutationResult>;

    /// Fails with `CasMismatch` when `cas` is given and stale.
    async fn replace(
        &self,
        id: &str,
        content: Value,
        cas: Option<u64>,
    ) -> ClientResult<MutationResult>;

    async fn remove(&self, id: &str, cas: Option<u64>) -> ClientResult<MutationResult>;
}

/// The bucket type a cluster resolves.
pub type BucketOf<C> = <C as Cluster>::Bucket;

/// The scope type a cluster resolves.
pub type ScopeOf<C> = <BucketOf<C> as Bucket>::Scope;

/// The collection type a cluster resolves.
pub type CollectionOf<C> = <BucketOf<C> as Bucket>::Collection;
