//! # docdb-client
//!
//! The client-side contracts of a document database: how a cluster connection
//! is opened, how buckets, scopes and collections are resolved from it, and how
//! a transactions engine hands out attempt contexts.
//!
//! ## Layers
//!
//! 1. **Contracts** ([`Connector`], [`Cluster`], [`Bucket`], [`Scope`],
//!    [`Collection`], [`Transactions`], [`AttemptContext`]) - what callers
//!    program against. Each trait names the next level through an associated
//!    type, so code written once against `C: Cluster` is fully typed.
//! 2. **Options** ([`Authenticator`], [`ClusterEnvironment`], [`ClusterOptions`],
//!    [`ConnectionString`], [`TransactionConfig`]) - connection inputs.
//! 3. **Engines** ([`memory`], [`mock`]) - an in-process implementation of every
//!    contract, and a call-recording wrapper around it for tests.
//!
//! ## Keyspaces
//!
//! Every bucket has a `_default` scope and every scope a `_default` collection
//! ([`DEFAULT_SCOPE`], [`DEFAULT_COLLECTION`]).
//!
//! ## Errors
//!
//! Every fallible operation returns [`ClientResult`]. Callers are expected to
//! propagate [`ClientError`] unchanged or translate it into their own taxonomy.

pub mod cluster;
pub mod error;
pub mod keyspace;
pub mod memory;
pub mod mock;
pub mod options;
pub mod transactions;

// Re-export core types for convenience
pub use cluster::{
    Bucket, BucketOf, Cluster, Collection, CollectionOf, Connector, GetResult, MutationResult,
    Scope, ScopeOf,
};
pub use error::{ClientError, ClientResult};
pub use keyspace::{Keyspace, DEFAULT_COLLECTION, DEFAULT_SCOPE};
pub use options::{Authenticator, ClusterEnvironment, ClusterOptions, ConnectionString};
pub use transactions::{
    AttemptContext, AttemptState, DurabilityLevel, TransactionConfig, Transactions,
};
