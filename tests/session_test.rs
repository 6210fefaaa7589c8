use bucket_factory::{ClientFactory, ClientSessionOptions, FactoryError, TransactionalOperator};
use docdb_client::memory::{MemoryCluster, MemoryServer, MemoryTransactions};
use docdb_client::mock::{MockCluster, MockConnector, MockTransactions};
use docdb_client::{
    AttemptContext, AttemptState, Authenticator, ClientError, Cluster, Transactions,
    TransactionConfig,
};
use std::sync::Arc;
use std::time::Duration;

fn server() -> MemoryServer {
    MemoryServer::builder()
        .with_user("admin", "password")
        .with_collection("b1", "s1", "c1")
        .build()
}

fn factory(connector: &MockConnector) -> ClientFactory<MockCluster> {
    ClientFactory::connect(
        connector,
        "couchbase://localhost",
        Authenticator::password("admin", "password"),
        "b1",
        Some("s1"),
    )
    .expect("factory")
}

#[tokio::test]
async fn test_session_requests_attempt_and_commits() {
    let connector = MockConnector::new(server());
    let factory = factory(&connector);
    let transactions = Arc::new(MockTransactions::new(
        factory.cluster().inner(),
        TransactionConfig::default(),
    ));

    let session = factory
        .session(
            ClientSessionOptions::new().causally_consistent(true),
            transactions.clone(),
            TransactionConfig::default(),
            None,
        )
        .unwrap();
    assert_eq!(transactions.attempts_requested(), 1);
    assert!(session.options().causally_consistent);
    assert!(session.has_active_transaction());

    session.commit_transaction().await.unwrap();
    assert!(!session.has_active_transaction());
    assert_eq!(session.attempt_context().state(), AttemptState::Committed);

    // A finished attempt cannot be committed again
    assert!(matches!(
        session.commit_transaction().await,
        Err(FactoryError::Client(ClientError::TransactionFailed(_)))
    ));
}

#[tokio::test]
async fn test_session_uses_supplied_attempt() {
    let connector = MockConnector::new(server());
    let factory = factory(&connector);
    let transactions = Arc::new(MockTransactions::new(
        factory.cluster().inner(),
        TransactionConfig::default(),
    ));
    let attempt = transactions.new_attempt_context().unwrap();
    let attempt_id = attempt.attempt_id().to_string();

    let session = factory
        .session(
            ClientSessionOptions::default(),
            transactions.clone(),
            TransactionConfig::default(),
            Some(attempt),
        )
        .unwrap();
    assert_eq!(transactions.attempts_requested(), 1);
    assert_eq!(session.attempt_context().attempt_id(), attempt_id);

    session.abort_transaction().await.unwrap();
    let attempt = session.into_attempt_context();
    assert_eq!(attempt.state(), AttemptState::RolledBack);
}

#[test]
fn test_session_propagates_engine_error() {
    let connector = MockConnector::new(server());
    let factory = factory(&connector);
    let transactions = Arc::new(MockTransactions::new(
        factory.cluster().inner(),
        TransactionConfig::default(),
    ));
    transactions.fail_next(ClientError::TemporaryFailure("no attempt slots".into()));

    let result = factory.session(
        ClientSessionOptions::default(),
        transactions.clone(),
        TransactionConfig::default(),
        None,
    );
    assert!(matches!(
        result,
        Err(FactoryError::Client(ClientError::TemporaryFailure(_)))
    ));
    assert_eq!(transactions.attempts_requested(), 1);
}

#[test]
fn test_session_factory_is_non_owning_view() {
    let connector = MockConnector::new(server());
    let operator = TransactionalOperator::new(TransactionConfig::default());
    let factory = factory(&connector).with(operator.clone());
    let transactions = Arc::new(MockTransactions::new(
        factory.cluster().inner(),
        TransactionConfig::default(),
    ));

    let session = factory
        .session(
            ClientSessionOptions::default(),
            transactions,
            TransactionConfig::default(),
            None,
        )
        .unwrap();
    let view = session.factory();
    assert!(Arc::ptr_eq(view.cluster(), factory.cluster()));
    assert_eq!(view.scope_name(), "s1");
    assert_eq!(view.transactional_operator(), Some(&operator));
    assert!(!view.is_owner());

    view.close().unwrap();
    drop(session);
    assert_eq!(connector.disconnect_count(), 0);
    assert!(factory.cluster().is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_session_commit_after_expiry() {
    let server = server();
    let factory: ClientFactory<MemoryCluster> = ClientFactory::connect(
        &server,
        "couchbase://localhost",
        Authenticator::password("admin", "password"),
        "b1",
        None,
    )
    .unwrap();
    let config = TransactionConfig::default().expiration_time(Duration::from_secs(1));
    let transactions = Arc::new(MemoryTransactions::new(factory.cluster(), config.clone()));

    let session = factory
        .session(ClientSessionOptions::default(), transactions, config, None)
        .unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;

    assert!(matches!(
        session.commit_transaction().await,
        Err(FactoryError::Client(ClientError::TransactionExpired(_)))
    ));
    assert_eq!(session.attempt_context().state(), AttemptState::Expired);
}

#[test]
fn test_session_after_close_fails() {
    let connector = MockConnector::new(server());
    let factory = factory(&connector);
    let transactions = Arc::new(MockTransactions::new(
        factory.cluster().inner(),
        TransactionConfig::default(),
    ));
    factory.close().unwrap();

    let result = factory.session(
        ClientSessionOptions::default(),
        transactions,
        TransactionConfig::default(),
        None,
    );
    assert!(matches!(
        result,
        Err(FactoryError::Client(ClientError::ClusterClosed))
    ));
}
