//! # Client Factory Sample
//!
//! Demonstrates the life of a [`ClientFactory`]:
//! 1. Building the root factory from configuration (it owns the connection).
//! 2. Deriving a scoped factory and writing through a named collection.
//! 3. Attaching a transactional operator and committing a session.
//! 4. Closing: derived factories leave the connection alone, the root
//!    disconnects it.

mod config;

use bucket_factory::lifecycle::setup_tracing;
use bucket_factory::{
    ClientFactory, ClientSessionOptions, ExceptionTranslator, FactoryError,
    TransactionalOperator,
};
use clap::Parser;
use config::Args;
use docdb_client::memory::{MemoryServer, MemoryTransactions};
use docdb_client::{Collection, Scope, TransactionConfig};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();
    let args = Args::parse();

    info!(bucket = %args.bucket, scope = %args.scope, "Starting client factory sample");

    let server = MemoryServer::builder()
        .with_user(args.username.clone(), args.password.clone())
        .with_collection(args.bucket.clone(), args.scope.clone(), args.collection.clone())
        .build();

    let factory =
        ClientFactory::from_config(&server, &args.factory_config()).map_err(|e| e.to_string())?;

    // The root factory sits on the default scope
    let default_collection = factory.default_collection().map_err(|e| e.to_string())?;
    default_collection
        .upsert("settings", json!({"currency": "EUR"}))
        .await
        .map_err(|e| e.to_string())?;

    let scoped = factory
        .with_scope(Some(args.scope.as_str()))
        .map_err(|e| e.to_string())?;
    match scoped.default_collection() {
        Err(FactoryError::InvalidState(reason)) => {
            info!(scope = scoped.scope().name(), %reason, "Default collection refused")
        }
        other => warn!(?other, "Named scope unexpectedly served a default collection"),
    }

    let span = tracing::info_span!("document_access", collection = %args.collection);
    async {
        let airline = scoped
            .collection(Some(args.collection.as_str()))
            .map_err(|e| e.to_string())?;
        let written = airline
            .insert("airline_10", json!({"name": "40-Mile Air", "country": "US"}))
            .await
            .map_err(|e| e.to_string())?;
        let read = airline.get("airline_10").await.map_err(|e| e.to_string())?;
        info!(cas = written.cas, name = %read.content["name"], "Document round trip");

        if let Err(e) = airline.insert("airline_10", json!({})).await {
            let translated = scoped.exception_translator().translate(&e);
            info!(error = %e, ?translated, "Duplicate insert translated");
        }
        Ok::<(), String>(())
    }
    .instrument(span)
    .await?;

    let config = TransactionConfig::default();
    let operator = TransactionalOperator::named("sample", config.clone());
    let transactional = scoped.with(operator);
    let transactions = Arc::new(MemoryTransactions::new(factory.cluster(), config.clone()));

    let span = tracing::info_span!("transaction");
    async {
        let session = transactional
            .session(ClientSessionOptions::new(), transactions, config, None)
            .map_err(|e| e.to_string())?;
        session.commit_transaction().await.map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    // Only the root factory disconnects
    transactional.close().map_err(|e| e.to_string())?;
    scoped.close().map_err(|e| e.to_string())?;
    factory.close().map_err(|e| e.to_string())?;

    info!(
        connections = server.connections_opened(),
        "Sample completed successfully"
    );
    Ok(())
}
