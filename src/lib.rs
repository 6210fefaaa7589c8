//! # Bucket Factory
//!
//! > **Resolve a cluster, bucket and scope once; hand them out everywhere.**
//!
//! This crate provides [`ClientFactory`], the component a document repository
//! layer asks for database handles. A factory is built once per bucket, holds
//! the resolved handles, and derives cheap copies for other scopes or for
//! transactional use.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Factory ([`factory`])
//! - **Role**: Connection acquisition, bucket/scope resolution, collection
//!   lookup with the default-scope rule, derivation, and closing.
//! - **Key items**: [`ClientFactory`], [`ClientFactory::with_scope`],
//!   [`ClientFactory::collection`], [`ClientFactory::close`].
//!
//! ### 2. Ownership ([`lifecycle`])
//! - **Role**: Records whether a factory dialed its connection (and must close
//!   it) or borrowed one.
//! - **Key items**: [`ClusterHandle`](lifecycle::ClusterHandle),
//!   [`setup_tracing`](lifecycle::setup_tracing).
//!
//! ### 3. Sessions ([`session`])
//! - **Role**: Binds a transaction attempt to a non-owning factory view.
//! - **Key items**: [`ClientSession`], [`ClientSessionOptions`].
//!
//! ### 4. Errors ([`error`], [`translator`])
//! - **Role**: Factory errors wrap client errors transparently;
//!   [`DocDbExceptionTranslator`] maps client errors onto a
//!   persistence-neutral [`DataAccessError`] taxonomy.
//!
//! ### 5. Configuration ([`config`])
//! - **Role**: A serde-friendly [`FactoryConfig`] accepted by
//!   [`ClientFactory::from_config`].
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use bucket_factory::{ClientFactory, FactoryConfig};
//! use docdb_client::memory::MemoryServer;
//!
//! let server = MemoryServer::builder()
//!     .with_user("admin", "password")
//!     .with_bucket("travel")
//!     .build();
//!
//! let config = FactoryConfig::new("couchbase://localhost", "admin", "password", "travel");
//! let factory = ClientFactory::from_config(&server, &config).unwrap();
//! assert!(factory.is_owner());
//! factory.close().unwrap();
//! ```
//!
//! ## 🧪 Testing
//!
//! [`docdb_client::mock`] records cluster calls so tests can assert exactly
//! when a connection is disconnected.

pub mod config;
pub mod error;
pub mod factory;
pub mod lifecycle;
pub mod operator;
pub mod session;
pub mod translator;

pub use config::{EnvironmentConfig, FactoryConfig};
pub use error::{FactoryError, FactoryResult};
pub use factory::ClientFactory;
pub use operator::TransactionalOperator;
pub use session::{ClientSession, ClientSessionOptions};
pub use translator::{DataAccessError, DocDbExceptionTranslator, ExceptionTranslator};
