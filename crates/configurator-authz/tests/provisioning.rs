//! Customer auto-provisioning under concurrency.
//!
//! Many requests for the same principal may race to create its customer row.
//! Afterwards exactly one row must exist and every caller must get it.

use std::sync::Arc;

use configurator_authz::{
    AuthzConfig, AuthzError, Directories, InMemoryDirectory, InsertFault, PolicyStore,
    RbacService, RepositoryError,
};
use configurator_rbac::{Role, User};

async fn service() -> (RbacService, Arc<InMemoryDirectory>) {
    let store = Arc::new(PolicyStore::in_memory().await.unwrap());
    let directory = Arc::new(InMemoryDirectory::new());
    let service = RbacService::new(
        store,
        Directories::shared(directory.clone()),
        AuthzConfig::default(),
    );
    (service, directory)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_provisioning_converges() {
    let (service, directory) = service().await;
    let user = User::new(21, "race@example.com", "race", Role::Customer);

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let service = service.request_scope();
            let user = user.clone();
            tokio::spawn(async move { service.get_or_create_customer_for_user(&user).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let customer = handle.await.unwrap().unwrap();
        assert_eq!(customer.email, "race@example.com");
        ids.push(customer.id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(directory.customer_count("race@example.com").await, 1);
}

#[tokio::test]
async fn test_lost_race_returns_winner() {
    let (service, directory) = service().await;
    let user = User::new(22, "late@example.com", "late", Role::Customer);
    directory.fail_next_insert(InsertFault::LoseRace).await;

    let customer = service.get_or_create_customer_for_user(&user).await.unwrap();
    assert_eq!(customer.contact_person, "competitor");
    assert_eq!(directory.customer_count("late@example.com").await, 1);
}

#[tokio::test]
async fn test_phantom_conflict_is_reported() {
    let (service, directory) = service().await;
    let user = User::new(23, "ghost@example.com", "ghost", Role::Customer);
    directory.fail_next_insert(InsertFault::PhantomConflict).await;

    let err = service.get_or_create_customer_for_user(&user).await.unwrap_err();
    match err {
        AuthzError::CustomerCreation { email, source, .. } => {
            assert_eq!(email, "ghost@example.com");
            assert!(matches!(source, Some(RepositoryError::UniqueViolation { .. })));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(directory.customer_count("ghost@example.com").await, 0);
}

#[tokio::test]
async fn test_provisioned_customer_becomes_accessible() {
    let (service, _) = service().await;
    let user = User::new(24, "new@example.com", "new", Role::Customer);

    assert!(service.get_accessible_customers(&user).await.unwrap().is_empty());
    let customer = service.get_or_create_customer_for_user(&user).await.unwrap();
    assert_eq!(
        service.get_accessible_customers(&user).await.unwrap(),
        vec![customer.id]
    );
}
