//! # Client Factory
//!
//! [`ClientFactory`] resolves and holds the three handles a repository layer
//! needs: a cluster connection, a bucket and a scope. It optionally carries a
//! [`TransactionalOperator`] for layers that run their work transactionally.
//!
//! ## Immutability
//!
//! A factory never changes after construction. "Changing" the scope or the
//! operator builds a new factory that shares the same connection:
//!
//! ```text
//!            connect(..)                    Owned(conn)
//!                 │
//!      ┌──────────┴───────────┐
//!  with_scope("s1")       with(operator)     Borrowed(conn)
//! ```
//!
//! Only the root factory (the one that dialed) may close the connection. There
//! is no reference counting: closing the root disconnects every derived factory
//! too.
//!
//! ## Example
//!
//! ```rust
//! use bucket_factory::ClientFactory;
//! use docdb_client::memory::MemoryServer;
//! use docdb_client::{Authenticator, Scope};
//!
//! let server = MemoryServer::builder()
//!     .with_user("admin", "password")
//!     .with_collection("travel", "inventory", "airline")
//!     .build();
//!
//! let factory = ClientFactory::connect(
//!     &server,
//!     "couchbase://localhost",
//!     Authenticator::password("admin", "password"),
//!     "travel",
//!     None,
//! )
//! .unwrap();
//! assert_eq!(factory.scope().name(), "_default");
//! assert!(factory.default_collection().is_ok());
//!
//! let inventory = factory.with_scope(Some("inventory")).unwrap();
//! assert!(inventory.default_collection().is_err());
//! assert!(inventory.collection(Some("airline")).is_ok());
//!
//! factory.close().unwrap();
//! ```

use crate::config::FactoryConfig;
use crate::error::{FactoryError, FactoryResult};
use crate::lifecycle::ClusterHandle;
use crate::operator::TransactionalOperator;
use crate::session::{ClientSession, ClientSessionOptions};
use crate::translator::DocDbExceptionTranslator;
use docdb_client::{
    Authenticator, Bucket, BucketOf, Cluster, ClusterEnvironment, ClusterOptions, CollectionOf,
    Connector, Scope, ScopeOf, TransactionConfig, Transactions, DEFAULT_COLLECTION, DEFAULT_SCOPE,
};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const SCOPED_COLLECTION_REQUIRED: &str =
    "A collection name must be provided if a non-default scope is used";

/// Resolved cluster, bucket and scope handles plus an optional transactional
/// operator.
pub struct ClientFactory<C: Cluster> {
    cluster: ClusterHandle<C>,
    bucket: BucketOf<C>,
    scope: ScopeOf<C>,
    exception_translator: DocDbExceptionTranslator,
    transactional_operator: Option<TransactionalOperator>,
}

impl<C: Cluster> ClientFactory<C> {
    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    /// Dials a new connection that this factory owns.
    ///
    /// `scope_name = None` selects the bucket's default scope. If the bucket or
    /// scope cannot be resolved, the new connection is disconnected and the
    /// resolution error is returned. Should that disconnect fail too, the
    /// failure is only logged and the connection is leaked.
    pub fn connect<K>(
        connector: &K,
        connection_string: &str,
        authenticator: Authenticator,
        bucket_name: &str,
        scope_name: Option<&str>,
    ) -> FactoryResult<Self>
    where
        K: Connector<Cluster = C>,
    {
        let cluster = connector.connect(connection_string, ClusterOptions::new(authenticator))?;
        Self::new(ClusterHandle::owned(cluster), bucket_name, scope_name, None)
    }

    /// Like [`connect`](Self::connect), with an explicit environment.
    pub fn connect_with_environment<K>(
        connector: &K,
        connection_string: &str,
        authenticator: Authenticator,
        bucket_name: &str,
        scope_name: Option<&str>,
        environment: ClusterEnvironment,
    ) -> FactoryResult<Self>
    where
        K: Connector<Cluster = C>,
    {
        let options = ClusterOptions::new(authenticator).environment(environment);
        let cluster = connector.connect(connection_string, options)?;
        Self::new(ClusterHandle::owned(cluster), bucket_name, scope_name, None)
    }

    /// Wraps a connection the caller keeps ownership of. [`close`](Self::close)
    /// will never disconnect it.
    pub fn from_cluster(
        cluster: Arc<C>,
        bucket_name: &str,
        scope_name: Option<&str>,
    ) -> FactoryResult<Self> {
        Self::new(ClusterHandle::borrowed(cluster), bucket_name, scope_name, None)
    }

    /// Validates `config` and dials an owned connection from it.
    pub fn from_config<K>(connector: &K, config: &FactoryConfig) -> FactoryResult<Self>
    where
        K: Connector<Cluster = C>,
    {
        config.validate()?;
        debug!(?config, "Building client factory from config");
        match config.cluster_environment() {
            Some(environment) => Self::connect_with_environment(
                connector,
                &config.connection_string,
                config.authenticator(),
                &config.bucket,
                config.scope.as_deref(),
                environment,
            ),
            None => Self::connect(
                connector,
                &config.connection_string,
                config.authenticator(),
                &config.bucket,
                config.scope.as_deref(),
            ),
        }
    }

    /// Shared by every constructor. On a resolution error an owned handle is
    /// released before returning; a failed release is logged, not returned, and
    /// leaves that connection open with no owner.
    fn new(
        cluster: ClusterHandle<C>,
        bucket_name: &str,
        scope_name: Option<&str>,
        transactional_operator: Option<TransactionalOperator>,
    ) -> FactoryResult<Self> {
        let resolved = Self::resolve(cluster.get(), bucket_name, scope_name);
        let (bucket, scope) = match resolved {
            Ok(handles) => handles,
            Err(e) => {
                warn!(bucket = bucket_name, scope = ?scope_name, error = %e, "Resolution failed");
                // A connection dialed for this factory must not outlive it.
                if let Err(release_error) = cluster.release() {
                    warn!(error = %release_error, "Failed to release cluster after resolution error");
                }
                return Err(e.into());
            }
        };

        info!(
            bucket = bucket.name(),
            scope = scope.name(),
            owned = cluster.is_owned(),
            transactional = transactional_operator.is_some(),
            "Client factory created"
        );
        Ok(Self {
            cluster,
            bucket,
            scope,
            exception_translator: DocDbExceptionTranslator,
            transactional_operator,
        })
    }

    fn resolve(
        cluster: &C,
        bucket_name: &str,
        scope_name: Option<&str>,
    ) -> docdb_client::ClientResult<(BucketOf<C>, ScopeOf<C>)> {
        let bucket = cluster.bucket(bucket_name)?;
        let scope = match scope_name {
            Some(name) => bucket.scope(name)?,
            None => bucket.default_scope(),
        };
        Ok((bucket, scope))
    }

    /// A non-owning copy sharing every resolved handle.
    fn derive(&self, transactional_operator: Option<TransactionalOperator>) -> Self {
        Self {
            cluster: self.cluster.share(),
            bucket: self.bucket.clone(),
            scope: self.scope.clone(),
            exception_translator: self.exception_translator,
            transactional_operator,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The shared connection; the same `Arc` on every call.
    pub fn cluster(&self) -> &Arc<C> {
        self.cluster.get()
    }

    pub fn bucket(&self) -> &BucketOf<C> {
        &self.bucket
    }

    pub fn scope(&self) -> &ScopeOf<C> {
        &self.scope
    }

    pub fn bucket_name(&self) -> &str {
        self.bucket.name()
    }

    pub fn scope_name(&self) -> &str {
        self.scope.name()
    }

    /// Whether [`close`](Self::close) on this instance disconnects.
    pub fn is_owner(&self) -> bool {
        self.cluster.is_owned()
    }

    pub fn exception_translator(&self) -> &DocDbExceptionTranslator {
        &self.exception_translator
    }

    pub fn transactional_operator(&self) -> Option<&TransactionalOperator> {
        self.transactional_operator.as_ref()
    }

    // =========================================================================
    // DERIVATION
    // =========================================================================

    /// A new factory on the same connection and bucket, scoped to `scope_name`.
    ///
    /// `None` keeps the current scope rather than resetting to the default. The
    /// derived factory carries no transactional operator.
    #[instrument(skip(self), fields(bucket = self.bucket.name()))]
    pub fn with_scope(&self, scope_name: Option<&str>) -> FactoryResult<Self> {
        let scope_name = scope_name.unwrap_or_else(|| self.scope.name());
        debug!(from = self.scope.name(), to = scope_name, "Deriving scoped factory");
        Self::new(
            self.cluster.share(),
            self.bucket.name(),
            Some(scope_name),
            None,
        )
    }

    /// A new factory identical to this one but carrying `operator`. Any
    /// previously attached operator is replaced.
    pub fn with(&self, operator: TransactionalOperator) -> Self {
        debug!(
            operator = %operator.id(),
            replaced = self.transactional_operator.is_some(),
            "Attaching transactional operator"
        );
        self.derive(Some(operator))
    }

    // =========================================================================
    // COLLECTIONS
    // =========================================================================

    /// Resolves a collection in the current scope.
    ///
    /// `None` (or `"_default"`) means the bucket's default collection, which is
    /// only reachable while the factory is on the default scope.
    pub fn collection(&self, name: Option<&str>) -> FactoryResult<CollectionOf<C>> {
        match name {
            None | Some(DEFAULT_COLLECTION) => {
                if self.scope.name() != DEFAULT_SCOPE {
                    warn!(scope = self.scope.name(), "Default collection requested on named scope");
                    return Err(FactoryError::InvalidState(
                        SCOPED_COLLECTION_REQUIRED.to_string(),
                    ));
                }
                Ok(self.bucket.default_collection()?)
            }
            Some(name) => Ok(self.scope.collection(name)?),
        }
    }

    pub fn default_collection(&self) -> FactoryResult<CollectionOf<C>> {
        self.collection(None)
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Opens a session on this factory.
    ///
    /// Uses `attempt` if given, otherwise asks `transactions` for a new attempt
    /// context. Engine errors propagate unchanged.
    #[instrument(skip_all, fields(bucket = self.bucket.name(), scope = self.scope.name()))]
    pub fn session<T: Transactions>(
        &self,
        options: ClientSessionOptions,
        transactions: Arc<T>,
        config: TransactionConfig,
        attempt: Option<T::AttemptContext>,
    ) -> FactoryResult<ClientSession<C, T>> {
        let attempt = match attempt {
            Some(attempt) => attempt,
            None => transactions.new_attempt_context()?,
        };
        let factory = self.derive(self.transactional_operator.clone());
        Ok(ClientSession::new(factory, transactions, config, options, attempt))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Disconnects the cluster if this factory owns it. Repeated calls, and
    /// calls on non-owning factories, do nothing.
    pub fn close(&self) -> FactoryResult<()> {
        let disconnected = self.cluster.release()?;
        info!(
            bucket = self.bucket.name(),
            scope = self.scope.name(),
            disconnected,
            "Client factory closed"
        );
        Ok(())
    }
}

impl<C: Cluster> Debug for ClientFactory<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("bucket", &self.bucket.name())
            .field("scope", &self.scope.name())
            .field("owned", &self.cluster.is_owned())
            .field("transactional_operator", &self.transactional_operator)
            .finish()
    }
}
