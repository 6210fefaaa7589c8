//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the process-wide subscriber. Everything else in the
//! workspace only emits events through the `tracing` macros.
//!
//! ## What Gets Traced
//!
//! - **Connection lifecycle**: connect, owned disconnect, borrowed close skipped
//! - **Resolution**: bucket and scope resolved at factory construction
//! - **Derivation**: `with_scope` / `with` copies
//! - **Sessions**: attempt creation, commit and abort
//! - **Document access** (in-memory engine, `debug`): keyspace, id, CAS
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle events only
//! RUST_LOG=info cargo run -p factory-sample
//!
//! # Include per-document operations
//! RUST_LOG=debug cargo run -p factory-sample
//!
//! # Only the factory crate
//! RUST_LOG=bucket_factory=debug cargo run -p factory-sample
//! ```
//!
//! With `RUST_LOG=info` a factory run reads:
//!
//! ```text
//! INFO Connected hosts=["localhost"] tls=false user="admin"
//! INFO Client factory created bucket="travel" scope="_default" owned=true
//! INFO Client factory created bucket="travel" scope="inventory" owned=false
//! INFO Attempt finished attempt_id="9a0c..." state=committed
//! INFO Owned cluster disconnected
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
