//! # Cluster Ownership
//!
//! A factory either **owns** the connection it holds (it dialed it and must
//! release it) or merely **borrows** one (the caller, or the root factory it
//! was derived from, keeps ownership). The distinction is carried by the
//! [`ClusterHandle`] variant, never inferred from the connection itself.
//!
//! ```text
//!  ClientFactory::connect(..)      -> Owned(conn)     close() disconnects once
//!  ClientFactory::from_cluster(..) -> Borrowed(conn)  close() is a no-op
//!  factory.with_scope(..)          -> Borrowed(conn)  close() is a no-op
//!  factory.with(..)                -> Borrowed(conn)  close() is a no-op
//! ```
//!
//! There is no reference counting: releasing the owner disconnects the
//! connection for every borrower still holding it.

use docdb_client::{ClientResult, Cluster};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A connection this factory dialed itself.
#[derive(Debug)]
pub struct OwnedCluster<C: Cluster> {
    cluster: Arc<C>,
    // Held across `disconnect` so concurrent releases observe its outcome.
    released: Mutex<bool>,
}

/// A cluster connection tagged with who is responsible for closing it.
#[derive(Debug)]
pub enum ClusterHandle<C: Cluster> {
    Owned(OwnedCluster<C>),
    Borrowed(Arc<C>),
}

impl<C: Cluster> ClusterHandle<C> {
    pub fn owned(cluster: C) -> Self {
        ClusterHandle::Owned(OwnedCluster {
            cluster: Arc::new(cluster),
            released: Mutex::new(false),
        })
    }

    pub fn borrowed(cluster: Arc<C>) -> Self {
        ClusterHandle::Borrowed(cluster)
    }

    /// The shared connection. Every call returns the same `Arc`.
    pub fn get(&self) -> &Arc<C> {
        match self {
            ClusterHandle::Owned(owned) => &owned.cluster,
            ClusterHandle::Borrowed(cluster) => cluster,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, ClusterHandle::Owned(_))
    }

    /// A non-owning view of the same connection.
    pub fn share(&self) -> Self {
        ClusterHandle::Borrowed(self.get().clone())
    }

    /// Disconnects if this handle owns the connection and has not already
    /// released it. Returns whether a disconnect was issued.
    ///
    /// If the disconnect itself fails the handle stays unreleased, so a later
    /// call can retry. Concurrent calls are serialized: none reports "already
    /// released" while another is still disconnecting.
    pub fn release(&self) -> ClientResult<bool> {
        match self {
            ClusterHandle::Owned(owned) => {
                let mut released = owned
                    .released
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if *released {
                    debug!("Cluster already released");
                    return Ok(false);
                }
                owned.cluster.disconnect()?;
                *released = true;
                info!("Owned cluster disconnected");
                Ok(true)
            }
            ClusterHandle::Borrowed(_) => {
                debug!("Cluster is borrowed, leaving it connected");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docdb_client::memory::MemoryServer;
    use docdb_client::mock::MockCluster;
    use docdb_client::{Authenticator, ClientError, ClusterOptions, Connector};

    fn mock() -> MockCluster {
        let server = MemoryServer::builder().with_bucket("travel").build();
        let options = ClusterOptions::new(Authenticator::password("admin", "password"));
        MockCluster::new(server.connect("couchbase://localhost", options).unwrap())
    }

    #[test]
    fn test_owned_releases_once() {
        let spy = mock();
        let handle = ClusterHandle::owned(spy.clone());
        assert!(handle.is_owned());

        assert!(handle.release().unwrap());
        assert!(!handle.release().unwrap());
        assert_eq!(spy.disconnect_count(), 1);
    }

    #[test]
    fn test_borrowed_never_releases() {
        let spy = Arc::new(mock());
        let handle = ClusterHandle::borrowed(spy.clone());
        assert!(!handle.is_owned());

        assert!(!handle.release().unwrap());
        assert_eq!(spy.disconnect_count(), 0);
        assert!(spy.is_connected());
    }

    #[test]
    fn test_share_is_borrowed_view_of_same_connection() {
        let handle = ClusterHandle::owned(mock());
        let shared = handle.share();
        assert!(!shared.is_owned());
        assert!(Arc::ptr_eq(handle.get(), shared.get()));
        assert!(!shared.release().unwrap());
        assert!(handle.get().is_connected());
    }

    #[test]
    fn test_failed_disconnect_can_be_retried() {
        let spy = mock();
        spy.expect_disconnect()
            .return_err(ClientError::Timeout("disconnect".into()));
        let handle = ClusterHandle::owned(spy.clone());

        assert!(handle.release().is_err());
        assert!(handle.release().unwrap());
        assert_eq!(spy.disconnect_count(), 2);
        spy.verify();
    }

    #[test]
    fn test_concurrent_release_waits_for_failing_disconnect() {
        let spy = mock();
        spy.expect_disconnect()
            .return_err(ClientError::Timeout("disconnect".into()));
        let handle = ClusterHandle::owned(spy.clone());

        let results: Vec<ClientResult<bool>> = std::thread::scope(|s| {
            let first = s.spawn(|| handle.release());
            let second = s.spawn(|| handle.release());
            vec![first.join().unwrap(), second.join().unwrap()]
        });

        // One call hits the injected failure, the other performs the real disconnect
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert!(results.iter().any(|r| matches!(r, Ok(true))));
        assert!(!results.iter().any(|r| matches!(r, Ok(false))));
        assert_eq!(spy.disconnect_count(), 2);
        assert!(!spy.is_connected());
    }
}
