//! # In-Memory Engine
//!
//! A process-local implementation of every collaborator contract. It exists so
//! that code written against [`Cluster`] and [`Transactions`] can be exercised
//! without a running cluster.
//!
//! ## Model
//!
//! - A [`MemoryServer`] owns the provisioned topology (buckets, scopes,
//!   collections), the user table and the document store.
//! - Each [`Connector::connect`] call yields a fresh [`MemoryCluster`]. All
//!   connections to one server share its document store, but each connection
//!   has its own connected flag: after `disconnect` every handle resolved from
//!   that connection fails with [`ClientError::ClusterClosed`].
//! - Documents are `serde_json::Value`s stamped with a server-wide,
//!   monotonically increasing CAS.
//!
//! ```rust
//! use docdb_client::memory::MemoryServer;
//! use docdb_client::{Authenticator, Bucket, Cluster, ClusterOptions, Collection, Connector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = MemoryServer::builder()
//!         .with_user("admin", "password")
//!         .with_collection("travel", "inventory", "airline")
//!         .build();
//!
//!     let options = ClusterOptions::new(Authenticator::password("admin", "password"));
//!     let cluster = server.connect("couchbase://localhost", options).unwrap();
//!     let bucket = cluster.bucket("travel").unwrap();
//!     let collection = bucket.default_collection().unwrap();
//!
//!     collection.upsert("airline_10", serde_json::json!({"name": "40-Mile Air"})).await.unwrap();
//!     let doc = collection.get("airline_10").await.unwrap();
//!     assert_eq!(doc.content["name"], "40-Mile Air");
//! }
//! ```

use crate::cluster::{Bucket, Cluster, Collection, Connector, GetResult, MutationResult, Scope};
use crate::error::{ClientError, ClientResult};
use crate::keyspace::{Keyspace, DEFAULT_COLLECTION, DEFAULT_SCOPE};
use crate::options::{Authenticator, ClusterEnvironment, ClusterOptions, ConnectionString};
use crate::transactions::{AttemptContext, AttemptState, TransactionConfig, Transactions};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

// =============================================================================
// SERVER
// =============================================================================

type Topology = HashMap<String, HashMap<String, BTreeSet<String>>>;

#[derive(Debug)]
struct StoredDocument {
    content: Value,
    cas: u64,
}

#[derive(Debug, Default)]
struct Store {
    topology: Topology,
    documents: HashMap<Keyspace, HashMap<String, StoredDocument>>,
    next_cas: u64,
}

impl Store {
    fn has_bucket(&self, bucket: &str) -> bool {
        self.topology.contains_key(bucket)
    }

    fn has_scope(&self, bucket: &str, scope: &str) -> bool {
        self.topology
            .get(bucket)
            .is_some_and(|scopes| scopes.contains_key(scope))
    }

    fn has_collection(&self, keyspace: &Keyspace) -> bool {
        self.topology
            .get(&keyspace.bucket)
            .and_then(|scopes| scopes.get(&keyspace.scope))
            .is_some_and(|collections| collections.contains(&keyspace.collection))
    }

    fn bump_cas(&mut self) -> u64 {
        self.next_cas += 1;
        self.next_cas
    }
}

/// Builder for a [`MemoryServer`].
#[derive(Debug, Default)]
pub struct MemoryServerBuilder {
    users: HashMap<String, String>,
    topology: Topology,
}

impl MemoryServerBuilder {
    /// Registers credentials. A server with no users accepts any credentials.
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    /// Provisions a bucket with its `_default` scope and collection.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.topology
            .entry(bucket.into())
            .or_default()
            .entry(DEFAULT_SCOPE.to_string())
            .or_default()
            .insert(DEFAULT_COLLECTION.to_string());
        self
    }

    /// Provisions a scope (and its bucket) with a `_default` collection.
    pub fn with_scope(self, bucket: impl Into<String>, scope: impl Into<String>) -> Self {
        self.with_collection(bucket, scope, DEFAULT_COLLECTION)
    }

    /// Provisions a collection, creating its bucket and scope as needed.
    pub fn with_collection(
        self,
        bucket: impl Into<String>,
        scope: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        let bucket = bucket.into();
        let mut builder = self.with_bucket(bucket.clone());
        let collections = builder
            .topology
            .entry(bucket)
            .or_default()
            .entry(scope.into())
            .or_default();
        collections.insert(DEFAULT_COLLECTION.to_string());
        collections.insert(collection.into());
        builder
    }

    pub fn build(self) -> MemoryServer {
        MemoryServer {
            users: Arc::new(self.users),
            store: Arc::new(RwLock::new(Store {
                topology: self.topology,
                ..Store::default()
            })),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Provisioned topology, users and documents shared by every connection.
#[derive(Debug, Clone)]
pub struct MemoryServer {
    users: Arc<HashMap<String, String>>,
    store: Arc<RwLock<Store>>,
    connections: Arc<AtomicUsize>,
}

impl MemoryServer {
    pub fn builder() -> MemoryServerBuilder {
        MemoryServerBuilder::default()
    }

    /// Number of successful `connect` calls so far.
    pub fn connections_opened(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn authenticate(&self, options: &ClusterOptions) -> ClientResult<()> {
        if self.users.is_empty() {
            return Ok(());
        }
        match &options.authenticator {
            Authenticator::Password { username, password } => {
                match self.users.get(username) {
                    Some(expected) if expected == password => Ok(()),
                    _ => Err(ClientError::AuthenticationFailure(format!(
                        "invalid credentials for user {username}"
                    ))),
                }
            }
        }
    }
}

impl Connector for MemoryServer {
    type Cluster = MemoryCluster;

    fn connect(
        &self,
        connection_string: &str,
        options: ClusterOptions,
    ) -> ClientResult<MemoryCluster> {
        let connection = ConnectionString::parse(connection_string)?;
        if let Err(e) = self.authenticate(&options) {
            warn!(user = options.authenticator.username(), error = %e, "Connect rejected");
            return Err(e);
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        info!(
            hosts = ?connection.hosts,
            tls = connection.tls,
            user = options.authenticator.username(),
            "Connected"
        );
        Ok(MemoryCluster {
            inner: Arc::new(ClusterInner {
                connection,
                environment: options.environment.unwrap_or_default(),
                store: self.store.clone(),
                connected: AtomicBool::new(true),
            }),
        })
    }
}

// =============================================================================
// CLUSTER / BUCKET / SCOPE
// =============================================================================

#[derive(Debug)]
struct ClusterInner {
    connection: ConnectionString,
    environment: ClusterEnvironment,
    store: Arc<RwLock<Store>>,
    connected: AtomicBool,
}

impl ClusterInner {
    fn ensure_connected(&self) -> ClientResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::ClusterClosed)
        }
    }

    fn read(&self) -> ClientResult<RwLockReadGuard<'_, Store>> {
        self.ensure_connected()?;
        self.store
            .read()
            .map_err(|_| ClientError::Internal("document store lock poisoned".into()))
    }

    fn write(&self) -> ClientResult<RwLockWriteGuard<'_, Store>> {
        self.ensure_connected()?;
        self.store
            .write()
            .map_err(|_| ClientError::Internal("document store lock poisoned".into()))
    }
}

/// One connection to a [`MemoryServer`]. Cheap to clone; clones share the
/// connection.
#[derive(Debug, Clone)]
pub struct MemoryCluster {
    inner: Arc<ClusterInner>,
}

impl MemoryCluster {
    pub fn environment(&self) -> &ClusterEnvironment {
        &self.inner.environment
    }

    pub fn connection_string(&self) -> &ConnectionString {
        &self.inner.connection
    }
}

impl Cluster for MemoryCluster {
    type Bucket = MemoryBucket;

    fn bucket(&self, name: &str) -> ClientResult<MemoryBucket> {
        if !self.inner.read()?.has_bucket(name) {
            return Err(ClientError::BucketNotFound(name.to_string()));
        }
        Ok(MemoryBucket {
            cluster: self.inner.clone(),
            name: name.to_string(),
        })
    }

    fn disconnect(&self) -> ClientResult<()> {
        if self.inner.connected.swap(false, Ordering::SeqCst) {
            info!(hosts = ?self.inner.connection.hosts, "Disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryBucket {
    cluster: Arc<ClusterInner>,
    name: String,
}

impl Bucket for MemoryBucket {
    type Scope = MemoryScope;
    type Collection = MemoryCollection;

    fn name(&self) -> &str {
        &self.name
    }

    fn default_scope(&self) -> MemoryScope {
        MemoryScope {
            cluster: self.cluster.clone(),
            bucket: self.name.clone(),
            name: DEFAULT_SCOPE.to_string(),
        }
    }

    fn scope(&self, name: &str) -> ClientResult<MemoryScope> {
        if !self.cluster.read()?.has_scope(&self.name, name) {
            return Err(ClientError::ScopeNotFound(format!("{}.{}", self.name, name)));
        }
        Ok(MemoryScope {
            cluster: self.cluster.clone(),
            bucket: self.name.clone(),
            name: name.to_string(),
        })
    }

    fn default_collection(&self) -> ClientResult<MemoryCollection> {
        self.cluster.ensure_connected()?;
        Ok(MemoryCollection {
            cluster: self.cluster.clone(),
            keyspace: Keyspace::default_for(self.name.clone()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryScope {
    cluster: Arc<ClusterInner>,
    bucket: String,
    name: String,
}

impl Scope for MemoryScope {
    type Collection = MemoryCollection;

    fn name(&self) -> &str {
        &self.name
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    fn collection(&self, name: &str) -> ClientResult<MemoryCollection> {
        let keyspace = Keyspace::new(self.bucket.clone(), self.name.clone(), name);
        if !self.cluster.read()?.has_collection(&keyspace) {
            return Err(ClientError::CollectionNotFound(keyspace.to_string()));
        }
        Ok(MemoryCollection {
            cluster: self.cluster.clone(),
            keyspace,
        })
    }
}

// =============================================================================
// COLLECTION
// =============================================================================

#[derive(Debug, Clone)]
pub struct MemoryCollection {
    cluster: Arc<ClusterInner>,
    keyspace: Keyspace,
}

impl PartialEq for MemoryCollection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cluster, &other.cluster) && self.keyspace == other.keyspace
    }
}

impl MemoryCollection {
    /// Number of documents currently stored in this collection.
    pub fn len(&self) -> ClientResult<usize> {
        Ok(self
            .cluster
            .read()?
            .documents
            .get(&self.keyspace)
            .map_or(0, HashMap::len))
    }

    pub fn is_empty(&self) -> ClientResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    async fn get(&self, id: &str) -> ClientResult<GetResult> {
        let store = self.cluster.read()?;
        let doc = store
            .documents
            .get(&self.keyspace)
            .and_then(|docs| docs.get(id));
        debug!(keyspace = %self.keyspace, id, found = doc.is_some(), "Get");
        doc.map(|doc| GetResult {
            content: doc.content.clone(),
            cas: doc.cas,
        })
        .ok_or_else(|| ClientError::DocumentNotFound(id.to_string()))
    }

    async fn insert(&self, id: &str, content: Value) -> ClientResult<MutationResult> {
        let mut store = self.cluster.write()?;
        let cas = store.bump_cas();
        let docs = store.documents.entry(self.keyspace.clone()).or_default();
        if docs.contains_key(id) {
            warn!(keyspace = %self.keyspace, id, "Insert rejected, document exists");
            return Err(ClientError::DocumentExists(id.to_string()));
        }
        docs.insert(id.to_string(), StoredDocument { content, cas });
        debug!(keyspace = %self.keyspace, id, cas, "Inserted");
        Ok(MutationResult { cas })
    }

    async fn upsert(&self, id: &str, content: Value) -> ClientResult<MutationResult> {
        let mut store = self.cluster.write()?;
        let cas = store.bump_cas();
        store
            .documents
            .entry(self.keyspace.clone())
            .or_default()
            .insert(id.to_string(), StoredDocument { content, cas });
        debug!(keyspace = %self.keyspace, id, cas, "Upserted");
        Ok(MutationResult { cas })
    }

    async fn replace(
        &self,
        id: &str,
        content: Value,
        cas: Option<u64>,
    ) -> ClientResult<MutationResult> {
        let mut store = self.cluster.write()?;
        let next = store.bump_cas();
        let doc = store
            .documents
            .get_mut(&self.keyspace)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| ClientError::DocumentNotFound(id.to_string()))?;
        if let Some(expected) = cas {
            if doc.cas != expected {
                warn!(keyspace = %self.keyspace, id, expected, actual = doc.cas, "CAS mismatch");
                return Err(ClientError::CasMismatch(id.to_string()));
            }
        }
        doc.content = content;
        doc.cas = next;
        debug!(keyspace = %self.keyspace, id, cas = next, "Replaced");
        Ok(MutationResult { cas: next })
    }

    async fn remove(&self, id: &str, cas: Option<u64>) -> ClientResult<MutationResult> {
        let mut store = self.cluster.write()?;
        let next = store.bump_cas();
        let docs = store
            .documents
            .get_mut(&self.keyspace)
            .ok_or_else(|| ClientError::DocumentNotFound(id.to_string()))?;
        let current = docs
            .get(id)
            .map(|doc| doc.cas)
            .ok_or_else(|| ClientError::DocumentNotFound(id.to_string()))?;
        if cas.is_some_and(|expected| expected != current) {
            return Err(ClientError::CasMismatch(id.to_string()));
        }
        docs.remove(id);
        debug!(keyspace = %self.keyspace, id, "Removed");
        Ok(MutationResult { cas: next })
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Transactions engine bound to one [`MemoryCluster`] connection.
#[derive(Debug)]
pub struct MemoryTransactions {
    cluster: MemoryCluster,
    config: TransactionConfig,
    started: AtomicUsize,
}

impl MemoryTransactions {
    pub fn new(cluster: &MemoryCluster, config: TransactionConfig) -> Self {
        Self {
            cluster: cluster.clone(),
            config,
            started: AtomicUsize::new(0),
        }
    }

    /// Number of attempts created by this engine.
    pub fn attempts_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

impl Transactions for MemoryTransactions {
    type AttemptContext = MemoryAttemptContext;

    fn config(&self) -> &TransactionConfig {
        &self.config
    }

    fn new_attempt_context(&self) -> ClientResult<MemoryAttemptContext> {
        self.cluster.inner.ensure_connected()?;
        self.started.fetch_add(1, Ordering::SeqCst);
        let attempt = MemoryAttemptContext {
            transaction_id: Uuid::new_v4().to_string(),
            attempt_id: Uuid::new_v4().to_string(),
            deadline: Instant::now().checked_add(self.config.expiration_time),
            state: Mutex::new(AttemptState::Pending),
        };
        debug!(
            transaction_id = %attempt.transaction_id,
            attempt_id = %attempt.attempt_id,
            "Attempt started"
        );
        Ok(attempt)
    }
}

/// An attempt created by [`MemoryTransactions`].
#[derive(Debug)]
pub struct MemoryAttemptContext {
    transaction_id: String,
    attempt_id: String,
    /// `None` when the expiration is too large to represent; such attempts never expire.
    deadline: Option<Instant>,
    state: Mutex<AttemptState>,
}

impl MemoryAttemptContext {
    // The state is a plain enum, so a poisoned guard still holds a valid value.
    fn lock_state(&self) -> MutexGuard<'_, AttemptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish(&self, target: AttemptState) -> ClientResult<()> {
        let mut state = self.lock_state();
        if state.is_finished() {
            return Err(ClientError::TransactionFailed(format!(
                "attempt {} is already {}",
                self.attempt_id, *state
            )));
        }
        let expired = self.deadline.is_some_and(|deadline| Instant::now() > deadline);
        if target == AttemptState::Committed && expired {
            *state = AttemptState::Expired;
            warn!(attempt_id = %self.attempt_id, "Attempt expired before commit");
            return Err(ClientError::TransactionExpired(self.transaction_id.clone()));
        }
        *state = target;
        info!(attempt_id = %self.attempt_id, state = %target, "Attempt finished");
        Ok(())
    }
}

#[async_trait]
impl AttemptContext for MemoryAttemptContext {
    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    fn state(&self) -> AttemptState {
        *self.lock_state()
    }

    async fn commit(&self) -> ClientResult<()> {
        self.finish(AttemptState::Committed)
    }

    async fn rollback(&self) -> ClientResult<()> {
        self.finish(AttemptState::RolledBack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn server() -> MemoryServer {
        MemoryServer::builder()
            .with_user("admin", "password")
            .with_collection("travel", "inventory", "airline")
            .build()
    }

    fn connect(server: &MemoryServer) -> MemoryCluster {
        let options = ClusterOptions::new(Authenticator::password("admin", "password"));
        server.connect("couchbase://localhost", options).unwrap()
    }

    #[test]
    fn test_connect_rejects_bad_credentials() {
        let options = ClusterOptions::new(Authenticator::password("admin", "wrong"));
        let err = server()
            .connect("couchbase://localhost", options)
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthenticationFailure(_)));
    }

    #[test]
    fn test_connect_uses_supplied_environment() {
        let env = ClusterEnvironment::default().kv_timeout(Duration::from_secs(7));
        let options =
            ClusterOptions::new(Authenticator::password("admin", "password")).environment(env);
        let cluster = server().connect("couchbase://localhost", options).unwrap();
        assert_eq!(cluster.environment().kv_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_resolution_against_topology() {
        let cluster = connect(&server());
        let bucket = cluster.bucket("travel").unwrap();
        assert_eq!(bucket.default_scope().name(), DEFAULT_SCOPE);
        assert!(bucket.scope("inventory").is_ok());
        assert!(matches!(
            bucket.scope("tenants"),
            Err(ClientError::ScopeNotFound(_))
        ));
        assert!(matches!(
            cluster.bucket("beer-sample"),
            Err(ClientError::BucketNotFound(_))
        ));

        let scope = bucket.scope("inventory").unwrap();
        assert_eq!(scope.collection("airline").unwrap().name(), "airline");
        assert!(matches!(
            scope.collection("hotel"),
            Err(ClientError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let cluster = connect(&server());
        let collection = cluster
            .bucket("travel")
            .unwrap()
            .scope("inventory")
            .unwrap()
            .collection("airline")
            .unwrap();

        let inserted = collection
            .insert("airline_10", json!({"name": "40-Mile Air"}))
            .await
            .unwrap();
        assert!(matches!(
            collection.insert("airline_10", json!({})).await,
            Err(ClientError::DocumentExists(_))
        ));

        let replaced = collection
            .replace("airline_10", json!({"name": "Texas Wings"}), Some(inserted.cas))
            .await
            .unwrap();
        assert!(replaced.cas > inserted.cas);

        // Stale CAS
        assert!(matches!(
            collection
                .replace("airline_10", json!({}), Some(inserted.cas))
                .await,
            Err(ClientError::CasMismatch(_))
        ));

        let doc = collection.get("airline_10").await.unwrap();
        assert_eq!(doc.content["name"], "Texas Wings");

        collection.remove("airline_10", None).await.unwrap();
        assert!(matches!(
            collection.get("airline_10").await,
            Err(ClientError::DocumentNotFound(_))
        ));
        assert!(collection.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_connections_share_documents_but_not_lifecycle() {
        let server = server();
        let first = connect(&server);
        let second = connect(&server);
        assert_eq!(server.connections_opened(), 2);

        let a = first.bucket("travel").unwrap().default_collection().unwrap();
        let b = second.bucket("travel").unwrap().default_collection().unwrap();
        a.upsert("k", json!(1)).await.unwrap();
        assert_eq!(b.get("k").await.unwrap().content, json!(1));

        first.disconnect().unwrap();
        assert!(!first.is_connected());
        assert!(matches!(a.get("k").await, Err(ClientError::ClusterClosed)));
        assert!(b.get("k").await.is_ok());
    }

    #[tokio::test]
    async fn test_attempt_commit_once() {
        let cluster = connect(&server());
        let transactions = MemoryTransactions::new(&cluster, TransactionConfig::default());
        let attempt = transactions.new_attempt_context().unwrap();
        assert_eq!(attempt.state(), AttemptState::Pending);

        attempt.commit().await.unwrap();
        assert_eq!(attempt.state(), AttemptState::Committed);
        assert!(matches!(
            attempt.rollback().await,
            Err(ClientError::TransactionFailed(_))
        ));
        assert_eq!(transactions.attempts_started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_expires() {
        let cluster = connect(&server());
        let config = TransactionConfig::default().expiration_time(Duration::from_secs(1));
        let transactions = MemoryTransactions::new(&cluster, config);
        let attempt = transactions.new_attempt_context().unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(matches!(
            attempt.commit().await,
            Err(ClientError::TransactionExpired(_))
        ));
        assert_eq!(attempt.state(), AttemptState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_expiration_never_expires() {
        let cluster = connect(&server());
        let config = TransactionConfig::default().expiration_time(Duration::MAX);
        let transactions = MemoryTransactions::new(&cluster, config);
        let attempt = transactions.new_attempt_context().unwrap();

        tokio::time::advance(Duration::from_secs(3600)).await;

        attempt.commit().await.unwrap();
        assert_eq!(attempt.state(), AttemptState::Committed);
    }

    #[test]
    fn test_no_attempts_after_disconnect() {
        let cluster = connect(&server());
        let transactions = MemoryTransactions::new(&cluster, TransactionConfig::default());
        cluster.disconnect().unwrap();
        assert!(matches!(
            transactions.new_attempt_context(),
            Err(ClientError::ClusterClosed)
        ));
    }
}
