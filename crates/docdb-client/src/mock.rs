//! # Mock Collaborators & Testing Guide
//!
//! [`MockCluster`], [`MockConnector`] and [`MockTransactions`] implement the same
//! contracts as the in-memory engine, delegating to it, but additionally
//! **record every call** and let a test **inject failures**. Use them when the
//! assertion is about *how* a collaborator was driven (was `disconnect` called?
//! how many attempts were started?) rather than about document state.
//!
//! ## When to use Mocks vs the In-Memory Engine
//!
//! | Feature | Mock | In-memory engine |
//! |---------|------|------------------|
//! | **Call recording** | Every call, in order | None |
//! | **Error injection** | `expect_*().return_err(..)` | Only via real state (unknown bucket, bad CAS) |
//! | **Documents** | Delegated to the wrapped engine | Yes |
//! | **Use Case** | Ownership and wiring assertions | Behavioural tests |
//!
//! ## Example: spying on `disconnect`
//!
//! ```rust
//! use docdb_client::memory::MemoryServer;
//! use docdb_client::mock::MockConnector;
//! use docdb_client::{Authenticator, Cluster, ClusterOptions, Connector};
//!
//! let server = MemoryServer::builder().with_bucket("travel").build();
//! let connector = MockConnector::new(server);
//!
//! let options = ClusterOptions::new(Authenticator::password("admin", "password"));
//! let cluster = connector.connect("couchbase://localhost", options).unwrap();
//! cluster.disconnect().unwrap();
//!
//! assert_eq!(connector.connect_count(), 1);
//! assert_eq!(cluster.disconnect_count(), 1);
//! ```
//!
//! ## Example: simulating an upstream failure
//!
//! ```rust
//! use docdb_client::memory::MemoryServer;
//! use docdb_client::mock::MockCluster;
//! use docdb_client::{Authenticator, Cluster, ClusterOptions, ClientError, Connector};
//!
//! let server = MemoryServer::builder().with_bucket("travel").build();
//! let options = ClusterOptions::new(Authenticator::password("admin", "password"));
//! let mock = MockCluster::new(server.connect("couchbase://localhost", options).unwrap());
//!
//! mock.expect_bucket("travel")
//!     .return_err(ClientError::Timeout("bucket config".into()));
//!
//! assert!(matches!(mock.bucket("travel"), Err(ClientError::Timeout(_))));
//! assert!(mock.bucket("travel").is_ok());
//! mock.verify();
//! ```

use crate::cluster::{Cluster, Connector};
use crate::error::{ClientError, ClientResult};
use crate::memory::{
    MemoryAttemptContext, MemoryBucket, MemoryCluster, MemoryServer, MemoryTransactions,
};
use crate::options::ClusterOptions;
use crate::transactions::{TransactionConfig, Transactions};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A call observed by a [`MockCluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    Bucket(String),
    Disconnect,
}

/// A queued failure, consumed by the first matching call.
#[derive(Debug)]
enum Expectation {
    Bucket { name: String, error: ClientError },
    Disconnect { error: ClientError },
}

#[derive(Debug, Default)]
struct Recorder {
    calls: Vec<ClusterCall>,
    expectations: VecDeque<Expectation>,
}

fn lock(recorder: &Mutex<Recorder>) -> MutexGuard<'_, Recorder> {
    recorder.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A cluster that records calls and delegates to a [`MemoryCluster`].
///
/// Clones share the same recording, so a clone handed to the code under test
/// can be inspected through the handle the test kept.
#[derive(Debug, Clone)]
pub struct MockCluster {
    inner: MemoryCluster,
    recorder: Arc<Mutex<Recorder>>,
}

impl MockCluster {
    pub fn new(inner: MemoryCluster) -> Self {
        Self {
            inner,
            recorder: Arc::new(Mutex::new(Recorder::default())),
        }
    }

    /// The wrapped connection.
    pub fn inner(&self) -> &MemoryCluster {
        &self.inner
    }

    /// Expects a `bucket` lookup for `name`.
    pub fn expect_bucket(&self, name: impl Into<String>) -> BucketExpectationBuilder {
        BucketExpectationBuilder {
            name: name.into(),
            recorder: self.recorder.clone(),
        }
    }

    /// Expects a `disconnect` call.
    pub fn expect_disconnect(&self) -> DisconnectExpectationBuilder {
        DisconnectExpectationBuilder {
            recorder: self.recorder.clone(),
        }
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<ClusterCall> {
        lock(&self.recorder).calls.clone()
    }

    pub fn disconnect_count(&self) -> usize {
        lock(&self.recorder)
            .calls
            .iter()
            .filter(|call| matches!(call, ClusterCall::Disconnect))
            .count()
    }

    pub fn bucket_lookups(&self) -> usize {
        lock(&self.recorder)
            .calls
            .iter()
            .filter(|call| matches!(call, ClusterCall::Bucket(_)))
            .count()
    }

    /// Verifies that all injected expectations were consumed.
    pub fn verify(&self) {
        let recorder = lock(&self.recorder);
        if !recorder.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                recorder.expectations.len(),
                recorder.expectations
            );
        }
    }
}

impl Cluster for MockCluster {
    type Bucket = MemoryBucket;

    fn bucket(&self, name: &str) -> ClientResult<MemoryBucket> {
        let injected = {
            let mut recorder = lock(&self.recorder);
            recorder.calls.push(ClusterCall::Bucket(name.to_string()));
            let position = recorder.expectations.iter().position(
                |exp| matches!(exp, Expectation::Bucket { name: expected, .. } if expected == name),
            );
            position.and_then(|i| recorder.expectations.remove(i))
        };
        match injected {
            Some(Expectation::Bucket { error, .. }) => Err(error),
            _ => self.inner.bucket(name),
        }
    }

    fn disconnect(&self) -> ClientResult<()> {
        let injected = {
            let mut recorder = lock(&self.recorder);
            recorder.calls.push(ClusterCall::Disconnect);
            let position = recorder
                .expectations
                .iter()
                .position(|exp| matches!(exp, Expectation::Disconnect { .. }));
            position.and_then(|i| recorder.expectations.remove(i))
        };
        match injected {
            Some(Expectation::Disconnect { error }) => Err(error),
            _ => self.inner.disconnect(),
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }
}

/// Builder for `bucket` expectations.
pub struct BucketExpectationBuilder {
    name: String,
    recorder: Arc<Mutex<Recorder>>,
}

impl BucketExpectationBuilder {
    /// The next lookup of this bucket fails with `error`.
    pub fn return_err(self, error: ClientError) {
        lock(&self.recorder).expectations.push_back(Expectation::Bucket {
            name: self.name,
            error,
        });
    }
}

/// Builder for `disconnect` expectations.
pub struct DisconnectExpectationBuilder {
    recorder: Arc<Mutex<Recorder>>,
}

impl DisconnectExpectationBuilder {
    /// The next `disconnect` fails with `error` and leaves the connection open.
    pub fn return_err(self, error: ClientError) {
        lock(&self.recorder)
            .expectations
            .push_back(Expectation::Disconnect { error });
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// A connector that wraps every connection it opens in a [`MockCluster`].
///
/// All clusters handed out share one recording, which is what tests usually
/// want: "the connection the factory opened was disconnected once".
#[derive(Debug, Clone)]
pub struct MockConnector {
    server: MemoryServer,
    connects: Arc<AtomicUsize>,
    recorder: Arc<Mutex<Recorder>>,
}

impl MockConnector {
    pub fn new(server: MemoryServer) -> Self {
        Self {
            server,
            connects: Arc::new(AtomicUsize::new(0)),
            recorder: Arc::new(Mutex::new(Recorder::default())),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Expects a `disconnect` on any cluster this connector opens, including
    /// ones not yet opened.
    pub fn expect_disconnect(&self) -> DisconnectExpectationBuilder {
        DisconnectExpectationBuilder {
            recorder: self.recorder.clone(),
        }
    }

    /// Calls observed across every cluster this connector opened.
    pub fn calls(&self) -> Vec<ClusterCall> {
        lock(&self.recorder).calls.clone()
    }

    pub fn disconnect_count(&self) -> usize {
        lock(&self.recorder)
            .calls
            .iter()
            .filter(|call| matches!(call, ClusterCall::Disconnect))
            .count()
    }
}

impl Connector for MockConnector {
    type Cluster = MockCluster;

    fn connect(
        &self,
        connection_string: &str,
        options: ClusterOptions,
    ) -> ClientResult<MockCluster> {
        let inner = self.server.connect(connection_string, options)?;
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MockCluster {
            inner,
            recorder: self.recorder.clone(),
        })
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// A transactions engine that counts attempts and can fail on demand.
#[derive(Debug)]
pub struct MockTransactions {
    inner: MemoryTransactions,
    requested: AtomicUsize,
    failures: Mutex<VecDeque<ClientError>>,
}

impl MockTransactions {
    pub fn new(cluster: &MemoryCluster, config: TransactionConfig) -> Self {
        Self {
            inner: MemoryTransactions::new(cluster, config),
            requested: AtomicUsize::new(0),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// The next `new_attempt_context` call fails with `error`.
    pub fn fail_next(&self, error: ClientError) {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(error);
    }

    /// Number of `new_attempt_context` calls, failed ones included.
    pub fn attempts_requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }
}

impl Transactions for MockTransactions {
    type AttemptContext = MemoryAttemptContext;

    fn config(&self) -> &TransactionConfig {
        self.inner.config()
    }

    fn new_attempt_context(&self) -> ClientResult<MemoryAttemptContext> {
        self.requested.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        match failure {
            Some(error) => Err(error),
            None => self.inner.new_attempt_context(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Bucket;
    use crate::options::Authenticator;
    use crate::transactions::AttemptContext;

    fn server() -> MemoryServer {
        MemoryServer::builder()
            .with_user("admin", "password")
            .with_scope("travel", "inventory")
            .build()
    }

    fn options() -> ClusterOptions {
        ClusterOptions::new(Authenticator::password("admin", "password"))
    }

    #[test]
    fn test_mock_cluster_records_calls() {
        let mock = MockCluster::new(server().connect("couchbase://localhost", options()).unwrap());

        let bucket = mock.bucket("travel").unwrap();
        assert_eq!(bucket.name(), "travel");
        mock.disconnect().unwrap();

        assert_eq!(
            mock.calls(),
            vec![ClusterCall::Bucket("travel".into()), ClusterCall::Disconnect]
        );
        assert_eq!(mock.disconnect_count(), 1);
        assert!(!mock.is_connected());
    }

    #[test]
    fn test_injected_disconnect_failure_keeps_connection() {
        let mock = MockCluster::new(server().connect("couchbase://localhost", options()).unwrap());
        mock.expect_disconnect()
            .return_err(ClientError::Timeout("disconnect".into()));

        assert!(mock.disconnect().is_err());
        assert!(mock.is_connected());
        mock.verify();
    }

    #[test]
    #[should_panic(expected = "Not all expectations were met")]
    fn test_verify_panics_on_unconsumed_expectation() {
        let mock = MockCluster::new(server().connect("couchbase://localhost", options()).unwrap());
        mock.expect_bucket("travel")
            .return_err(ClientError::BucketNotFound("travel".into()));
        mock.verify();
    }

    #[test]
    fn test_connector_shares_recording_across_clusters() {
        let connector = MockConnector::new(server());
        let first = connector.connect("couchbase://localhost", options()).unwrap();
        let second = connector.connect("couchbase://localhost", options()).unwrap();
        first.disconnect().unwrap();
        second.disconnect().unwrap();

        assert_eq!(connector.connect_count(), 2);
        assert_eq!(connector.disconnect_count(), 2);
    }

    #[test]
    fn test_connector_expectation_applies_to_later_connections() {
        let connector = MockConnector::new(server());
        connector
            .expect_disconnect()
            .return_err(ClientError::Timeout("disconnect".into()));
        let cluster = connector.connect("couchbase://localhost", options()).unwrap();

        assert!(cluster.disconnect().is_err());
        assert!(cluster.is_connected());
        cluster.verify();
    }

    #[test]
    fn test_connector_does_not_count_rejected_connects() {
        let connector = MockConnector::new(server());
        let bad = ClusterOptions::new(Authenticator::password("admin", "nope"));
        assert!(connector.connect("couchbase://localhost", bad).is_err());
        assert_eq!(connector.connect_count(), 0);
    }

    #[test]
    fn test_mock_transactions_fail_next() {
        let cluster = server().connect("couchbase://localhost", options()).unwrap();
        let transactions = MockTransactions::new(&cluster, TransactionConfig::default());
        transactions.fail_next(ClientError::TemporaryFailure("busy".into()));

        assert!(transactions.new_attempt_context().is_err());
        let attempt = transactions.new_attempt_context().unwrap();
        assert!(!attempt.attempt_id().is_empty());
        assert_eq!(transactions.attempts_requested(), 2);
    }
}
