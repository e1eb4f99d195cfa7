//! End-to-end authorization scenarios over an in-memory store.

use std::collections::BTreeSet;
use std::sync::Arc;

use configurator_authz::{
    AuthzConfig, Directories, InMemoryDirectory, PolicyManager, PolicyStore, RbacService,
    StoredRow,
};
use configurator_rbac::{Effect, Permission, Privilege, ResourceType, Role, User};

struct Fixture {
    manager: PolicyManager,
    directory: Arc<InMemoryDirectory>,
}

impl Fixture {
    async fn new() -> Self {
        let store = Arc::new(PolicyStore::in_memory().await.unwrap());
        let directory = Arc::new(InMemoryDirectory::new());
        let service = RbacService::new(
            store,
            Directories::shared(directory.clone()),
            AuthzConfig::default(),
        );
        Self {
            manager: PolicyManager::new(service),
            directory,
        }
    }

    fn service(&self) -> &RbacService {
        self.manager.service()
    }

    async fn rows(&self) -> BTreeSet<StoredRow> {
        self.service().store().raw_rows().await.into_iter().collect()
    }
}

#[tokio::test]
async fn test_duplicate_add_policy() {
    let f = Fixture::new().await;

    assert!(f
        .manager
        .add_policy("salesman", "configuration", "read", Effect::Allow)
        .await
        .unwrap());
    assert!(!f
        .manager
        .add_policy("salesman", "configuration", "read", Effect::Allow)
        .await
        .unwrap());
    assert_eq!(f.manager.get_policy_summary().await.total_policies, 1);
}

#[tokio::test]
async fn test_seed_then_validate() {
    let f = Fixture::new().await;
    f.manager.seed_initial_policies().await.unwrap();

    let report = f.manager.validate_policies().await;
    assert!(report.valid, "{:?}", report.issues);
    assert_eq!(report.statistics.total_policies, 8);
    assert_eq!(report.statistics.unique_subjects, 5);
}

#[tokio::test]
async fn test_backup_then_restore_is_set_equal() {
    let f = Fixture::new().await;
    let service = f.service();
    f.manager.seed_initial_policies().await.unwrap();
    f.manager
        .add_policy("a@example.com", "order", "delete", Effect::Deny)
        .await
        .unwrap();
    service
        .store()
        .replace_role("a@example.com", Role::Partner)
        .await
        .unwrap();
    let customer = f.directory.add_customer("c@example.com", "C").await.unwrap();
    f.manager
        .assign_customer_to_user("a@example.com", customer.id)
        .await
        .unwrap();

    let before = f.rows().await;
    let backup = f.manager.backup_policies().await;
    assert_eq!(backup.metadata.total_policies, 9);
    assert_eq!(backup.metadata.total_grouping_policies, 2);

    let payload = serde_json::to_value(&backup).unwrap();
    let restored = f.manager.restore_policies(&payload).await.unwrap();
    assert_eq!(restored.policies_restored, 9);
    assert_eq!(restored.grouping_policies_restored, 2);
    assert_eq!(f.rows().await, before);
}

#[tokio::test]
async fn test_superadmin_always_allowed() {
    let f = Fixture::new().await;
    let service = f.service();
    let root = User::new(1, "root@example.com", "root", Role::Superadmin);
    let privilege = Privilege::new([Role::Customer], Permission::new("nothing", "ever"))
        .with_ownership(ResourceType::Quote);

    assert!(service.check_permission(&root, "nothing", "ever").await.unwrap());
    assert!(service.check_resource_ownership(&root, "quote", 12345).await.unwrap());
    assert!(service.check_resource_ownership(&root, "unknown", 1).await.unwrap());
    assert!(service.check_privilege(&root, &privilege, None).await.unwrap());
}

#[tokio::test]
async fn test_same_role_same_answer() {
    let f = Fixture::new().await;
    f.manager.seed_initial_policies().await.unwrap();
    let service = f.service();

    let grouped = User::new(2, "one@example.com", "one", Role::Customer);
    let ungrouped = User::new(3, "two@example.com", "two", Role::Customer);
    service.initialize_user_policies(&grouped).await.unwrap();

    for (resource, action) in [
        ("configuration", "read"),
        ("configuration", "create"),
        ("quote", "create"),
        ("quote", "delete"),
        ("order", "read"),
        ("template", "update"),
    ] {
        assert_eq!(
            service.check_permission(&grouped, resource, action).await.unwrap(),
            service.check_permission(&ungrouped, resource, action).await.unwrap(),
            "{resource}:{action}"
        );
    }
}

#[tokio::test]
async fn test_subject_deny_overrides_role_allow() {
    let f = Fixture::new().await;
    f.manager.seed_initial_policies().await.unwrap();
    f.manager
        .add_policy("blocked@example.com", "quote", "create", Effect::Deny)
        .await
        .unwrap();

    let service = f.service();
    let blocked = User::new(4, "blocked@example.com", "blocked", Role::Customer);
    let other = User::new(5, "other@example.com", "other", Role::Customer);

    assert!(!service.check_permission(&blocked, "quote", "create").await.unwrap());
    assert!(service.check_permission(&blocked, "quote", "read").await.unwrap());
    assert!(service.check_permission(&other, "quote", "create").await.unwrap());
}
