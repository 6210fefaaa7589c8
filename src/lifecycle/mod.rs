//! Connection lifecycle and process setup.
//!
//! - [`ClusterHandle`] - who owns a cluster connection and may close it
//! - [`setup_tracing`] - installs the tracing subscriber

pub mod handle;
pub mod tracing;

pub use handle::{ClusterHandle, OwnedCluster};
pub use self::tracing::setup_tracing;
