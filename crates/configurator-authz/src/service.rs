//! # Authorization service
//!
//! Single point of truth for "may principal X do A on resource R (instance
//! I)?" and for which customers a principal may act for.
//!
//! ## Architecture
//!
//! ```text
//! RbacService
//!   ├─ check_permission ──────────→ PolicyStore (email + role name)
//!   ├─ check_resource_ownership ──→ OwnershipDirectory ─→ owning customer
//!   │                               get_accessible_customers
//!   │                                 ├─ CustomerRepository (email match)
//!   │                                 └─ PolicyStore (customer groupings)
//!   └─ check_privilege ───────────→ role AND permission AND ownership
//! ```
//!
//! Every result is memoized in a [`DecisionCache`] owned by the service
//! instance. Use [`RbacService::request_scope`] to get a sibling with a fresh
//! cache per request, and [`RbacService::clear_cache`] after mutations made
//! through the same instance.

use std::sync::Arc;

use configurator_rbac::{Privilege, ResourceType, Role, User};
use tracing::{debug, error, info, warn};

use crate::audit::{AuditSink, TracingAuditSink};
use crate::cache::{CacheStats, DecisionCache};
use crate::config::AuthzConfig;
use crate::customer::provision_customer;
use crate::directory::{Customer, CustomerRepository, OwnershipDirectory, UserDirectory};
use crate::error::{AuthzError, AuthzResult};
use crate::policy_store::PolicyStore;

/// The relational collaborators of the service.
#[derive(Clone)]
pub struct Directories {
    /// Customer table.
    pub customers: Arc<dyn CustomerRepository>,
    /// Resource ownership lookups.
    pub ownership: Arc<dyn OwnershipDirectory>,
    /// User table.
    pub users: Arc<dyn UserDirectory>,
}

impl Directories {
    /// Use one object for every collaborator.
    pub fn shared<D>(directory: Arc<D>) -> Self
    where
        D: CustomerRepository + OwnershipDirectory + UserDirectory + 'static,
    {
        Self {
            customers: directory.clone(),
            ownership: directory.clone(),
            users: directory,
        }
    }
}

/// Authorization facade.
#[derive(Clone)]
pub struct RbacService {
    store: Arc<PolicyStore>,
    directories: Directories,
    audit: Arc<dyn AuditSink>,
    config: Arc<AuthzConfig>,
    cache: Arc<DecisionCache>,
}

impl std::fmt::Debug for RbacService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RbacService")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

impl RbacService {
    /// Create a service over a shared policy store.
    pub fn new(store: Arc<PolicyStore>, directories: Directories, config: AuthzConfig) -> Self {
        Self {
            store,
            directories,
            audit: Arc::new(TracingAuditSink),
            config: Arc::new(config),
            cache: Arc::new(DecisionCache::new()),
        }
    }

    /// Send audit entries to a different sink.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Sibling service sharing store and collaborators, with an empty cache.
    pub fn request_scope(&self) -> Self {
        Self {
            cache: Arc::new(DecisionCache::new()),
            ..self.clone()
        }
    }

    /// The policy store.
    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    /// The collaborators.
    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    /// The configuration.
    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    pub(crate) fn audit_sink(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Cache statistics of this instance.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop every memoized decision of this instance.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        debug!("Authorization cache cleared");
    }

    /// Check whether the principal holds a permission.
    ///
    /// # Errors
    ///
    /// [`AuthzError::PolicyEvaluation`] if the engine fails.
    pub async fn check_permission(
        &self,
        user: &User,
        resource: &str,
        action: &str,
    ) -> AuthzResult<bool> {
        if user.is_superadmin() {
            return Ok(true);
        }

        let key = (user.id, resource.to_string(), action.to_string());
        if let Some(allowed) = self.cache.permission(&key).await {
            debug!(subject = %user.email, resource, action, allowed, "Permission cache hit");
            return Ok(allowed);
        }

        let allowed = self
            .store
            .enforce(user.subject(), user.role.as_str(), resource, action)
            .await?;
        debug!(subject = %user.email, resource, action, allowed, "Permission checked");

        self.cache.store_permission(key, allowed).await;
        Ok(allowed)
    }

    /// Check whether a resource instance belongs to an accessible customer.
    ///
    /// An unknown resource type is refused with a warning.
    pub async fn check_resource_ownership(
        &self,
        user: &User,
        resource_type: &str,
        resource_id: i64,
    ) -> AuthzResult<bool> {
        if user.is_superadmin() {
            return Ok(true);
        }

        match ResourceType::parse(resource_type) {
            Some(resource_type) => self.check_ownership(user, resource_type, resource_id).await,
            None => {
                warn!(
                    subject = %user.email,
                    resource_type,
                    resource_id,
                    "Unknown resource type in ownership check"
                );
                Ok(false)
            }
        }
    }

    /// Typed form of [`RbacService::check_resource_ownership`].
    pub async fn check_ownership(
        &self,
        user: &User,
        resource_type: ResourceType,
        resource_id: i64,
    ) -> AuthzResult<bool> {
        if user.is_superadmin() {
            return Ok(true);
        }

        let Some(owner) = self.owning_customer(resource_type, resource_id).await? else {
            debug!(
                subject = %user.email,
                resource_type = %resource_type,
                resource_id,
                "Resource has no owning customer"
            );
            return Ok(false);
        };

        let accessible = self.get_accessible_customers(user).await?;
        Ok(accessible.binary_search(&owner).is_ok())
    }

    /// Owning customer of a resource instance.
    ///
    /// Orders resolve through the quote they were placed from.
    pub async fn owning_customer(
        &self,
        resource_type: ResourceType,
        resource_id: i64,
    ) -> AuthzResult<Option<i64>> {
        let ownership = &self.directories.ownership;
        let owner = match resource_type {
            ResourceType::Customer => self
                .directories
                .customers
                .find_by_id(resource_id)
                .await?
                .map(|customer| customer.id),
            ResourceType::Configuration => ownership.configuration_customer(resource_id).await?,
            ResourceType::Quote => ownership.quote_customer(resource_id).await?,
            ResourceType::Order => match ownership.order_quote(resource_id).await? {
                Some(quote_id) => ownership.quote_customer(quote_id).await?,
                None => None,
            },
        };
        Ok(owner)
    }

    /// Customers the principal may act for, sorted and de-duplicated.
    ///
    /// Superadmins get every customer. Other principals get the customers
    /// whose email matches theirs plus, when fan-out is enabled, the
    /// customers they are grouped with.
    pub async fn get_accessible_customers(&self, user: &User) -> AuthzResult<Vec<i64>> {
        if let Some(ids) = self.cache.customers(user.id).await {
            return Ok(ids);
        }

        let customers = &self.directories.customers;
        let mut ids = if user.is_superadmin() {
            customers.all_ids().await?
        } else {
            let mut ids = customers.ids_by_email(user.subject()).await?;
            if self.config.customer_grouping_fanout {
                ids.extend(self.store.customers_for(user.subject()).await);
            }
            ids
        };
        ids.sort_unstable();
        ids.dedup();

        debug!(subject = %user.email, count = ids.len(), "Accessible customers resolved");
        self.cache.store_customers(user.id, ids.clone()).await;
        Ok(ids)
    }

    /// Return the principal's customer, provisioning it on first use.
    ///
    /// # Errors
    ///
    /// [`AuthzError::CustomerCreation`] when provisioning fails for a reason
    /// other than a lost race.
    pub async fn get_or_create_customer_for_user(&self, user: &User) -> AuthzResult<Customer> {
        let customer = provision_customer(
            self.directories.customers.as_ref(),
            user,
            &self.config.default_customer_type,
        )
        .await?;
        self.cache.forget_customers(user.id).await;
        Ok(customer)
    }

    /// Check a privilege (roles AND permission AND optional ownership).
    ///
    /// The ownership component needs the target instance id; without one it
    /// fails closed.
    pub async fn check_privilege(
        &self,
        user: &User,
        privilege: &Privilege,
        resource_id: Option<i64>,
    ) -> AuthzResult<bool> {
        if user.is_superadmin() {
            return Ok(true);
        }

        let key = (user.id, privilege.cache_key(), resource_id);
        if let Some(allowed) = self.cache.privilege(&key).await {
            return Ok(allowed);
        }

        let allowed = self.evaluate_privilege(user, privilege, resource_id).await?;
        self.cache.store_privilege(key, allowed).await;
        Ok(allowed)
    }

    async fn evaluate_privilege(
        &self,
        user: &User,
        privilege: &Privilege,
        resource_id: Option<i64>,
    ) -> AuthzResult<bool> {
        if !privilege.accepts_role(user.role) {
            return Ok(false);
        }

        let permission = privilege.permission();
        if !self
            .check_permission(user, &permission.resource, &permission.action)
            .await?
        {
            return Ok(false);
        }

        match (privilege.ownership(), resource_id) {
            (None, _) => Ok(true),
            (Some(ownership), Some(id)) => {
                self.check_ownership(user, ownership.resource_type, id).await
            }
            (Some(ownership), None) => {
                warn!(
                    subject = %user.email,
                    resource_type = %ownership.resource_type,
                    "Ownership required but no resource id given"
                );
                Ok(false)
            }
        }
    }

    /// Change a principal's role in the policy store and the user table.
    ///
    /// The role grouping is replaced first; if the user row cannot be
    /// updated the previous groupings are put back before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`AuthzError::UserNotFound`] if the user row does not exist
    /// - [`AuthzError::Directory`] if the user row update fails
    pub async fn assign_role_to_user(&self, user: &User, role: Role) -> AuthzResult<User> {
        let subject = user.subject();
        let previous = self.store.roles_for(subject).await;

        self.store.replace_role(subject, role).await?;

        let updated = match self.directories.users.update_role(user.id, role).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.rollback_roles(subject, &previous).await;
                return Err(AuthzError::UserNotFound(user.email.clone()));
            }
            Err(e) => {
                self.rollback_roles(subject, &previous).await;
                return Err(e.into());
            }
        };

        self.clear_cache().await;
        info!(subject = %subject, from = %user.role, to = %role, "Role assigned");
        Ok(updated)
    }

    async fn rollback_roles(&self, subject: &str, previous: &[Role]) {
        if let Err(e) = self.store.set_roles(subject, previous).await {
            error!(subject = %subject, error = %e, "Failed to restore role groupings");
        }
    }

    /// Group a principal with an existing customer.
    ///
    /// # Returns
    ///
    /// `false` if the customer does not exist or the grouping already existed
    pub async fn assign_customer_to_user(&self, user: &User, customer_id: i64) -> AuthzResult<bool> {
        if self
            .directories
            .customers
            .find_by_id(customer_id)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let added = self
            .store
            .add_customer_grouping(user.subject(), customer_id)
            .await?;
        if added {
            self.cache.forget_customers(user.id).await;
        }
        Ok(added)
    }

    /// Write the initial groupings of a principal.
    ///
    /// Every principal gets its role grouping; customers additionally get
    /// their customer row (provisioned if needed) and its grouping.
    pub async fn initialize_user_policies(&self, user: &User) -> AuthzResult<()> {
        self.store.replace_role(user.subject(), user.role).await?;

        if user.role == Role::Customer {
            let customer = self.get_or_create_customer_for_user(user).await?;
            self.store
                .add_customer_grouping(user.subject(), customer.id)
                .await?;
        }

        self.clear_cache().await;
        info!(subject = %user.email, role = %user.role, "User policies initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;
    use configurator_rbac::{Effect, Permission, PolicyRule};

    struct Fixture {
        service: RbacService,
        directory: Arc<InMemoryDirectory>,
    }

    async fn fixture(config: AuthzConfig) -> Fixture {
        let store = Arc::new(PolicyStore::in_memory().await.unwrap());
        let directory = Arc::new(InMemoryDirectory::new());
        let service = RbacService::new(store, Directories::shared(directory.clone()), config);
        Fixture { service, directory }
    }

    fn superadmin() -> User {
        User::new(1, "root@example.com", "root", Role::Superadmin)
    }

    fn customer(id: i64, email: &str) -> User {
        User::new(id, email, email.split('@').next().unwrap_or(email), Role::Customer)
    }

    #[tokio::test]
    async fn test_superadmin_bypasses_everything() {
        let f = fixture(AuthzConfig::default()).await;
        let root = superadmin();
        let flagged = User::new(2, "flag@example.com", "flag", Role::Customer).with_superuser(true);

        for user in [&root, &flagged] {
            assert!(f.service.check_permission(user, "anything", "at_all").await.unwrap());
            assert!(f.service.check_resource_ownership(user, "spaceship", 404).await.unwrap());
            let privilege = Privilege::new([Role::Partner], Permission::new("order", "delete"))
                .with_ownership(ResourceType::Order);
            assert!(f.service.check_privilege(user, &privilege, None).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_permission_is_cached_until_cleared() {
        let f = fixture(AuthzConfig::default()).await;
        let rule = PolicyRule::new("salesman", "quote", "read", Effect::Allow);
        f.service.store().add_policy(&rule).await.unwrap();

        let user = User::new(5, "s@example.com", "s", Role::Salesman);
        assert!(f.service.check_permission(&user, "quote", "read").await.unwrap());

        f.service.store().remove_policy(&rule).await.unwrap();
        assert!(f.service.check_permission(&user, "quote", "read").await.unwrap());
        assert!(!f
            .service
            .request_scope()
            .check_permission(&user, "quote", "read")
            .await
            .unwrap());

        let stats = f.service.cache_stats().await;
        assert_eq!(stats.permission_entries, 1);
        assert_eq!(stats.hits, 1);

        f.service.clear_cache().await;
        assert!(!f.service.check_permission(&user, "quote", "read").await.unwrap());
    }

    #[tokio::test]
    async fn test_ownership_resolution() {
        let f = fixture(AuthzConfig::default()).await;
        let ana = customer(10, "ana@example.com");
        let own = f.service.get_or_create_customer_for_user(&ana).await.unwrap();
        let other = f.directory.add_customer("bob@example.com", "Bob").await.unwrap();

        f.directory.link_configuration(100, own.id).await;
        f.directory.link_configuration(101, other.id).await;
        f.directory.link_quote(200, own.id).await;
        f.directory.link_order(300, 200).await;

        let svc = &f.service;
        assert!(svc.check_resource_ownership(&ana, "customer", own.id).await.unwrap());
        assert!(!svc.check_resource_ownership(&ana, "customer", other.id).await.unwrap());
        assert!(svc.check_resource_ownership(&ana, "configuration", 100).await.unwrap());
        assert!(!svc.check_resource_ownership(&ana, "configuration", 101).await.unwrap());
        assert!(svc.check_resource_ownership(&ana, "quote", 200).await.unwrap());
        assert!(svc.check_resource_ownership(&ana, "order", 300).await.unwrap());
        assert!(!svc.check_resource_ownership(&ana, "order", 999).await.unwrap());
        assert!(!svc.check_resource_ownership(&ana, "template", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_accessible_customers_fanout() {
        let f = fixture(AuthzConfig::default()).await;
        let a = f.directory.add_customer("a@example.com", "A").await.unwrap();
        let b = f.directory.add_customer("b@example.com", "B").await.unwrap();
        let seller = User::new(7, "seller@example.com", "seller", Role::Salesman);

        assert!(f.service.assign_customer_to_user(&seller, b.id).await.unwrap());
        assert!(f.service.assign_customer_to_user(&seller, a.id).await.unwrap());
        assert!(!f.service.assign_customer_to_user(&seller, a.id).await.unwrap());
        assert!(!f.service.assign_customer_to_user(&seller, 999).await.unwrap());

        assert_eq!(
            f.service.get_accessible_customers(&seller).await.unwrap(),
            vec![a.id, b.id]
        );

        let narrow = RbacService::new(
            f.service.store().clone(),
            Directories::shared(f.directory.clone()),
            AuthzConfig::default().with_customer_grouping_fanout(false),
        );
        assert!(narrow.get_accessible_customers(&seller).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_padded_email_sees_own_customer() {
        let f = fixture(AuthzConfig::default()).await;
        let padded = customer(12, " ana@example.com ");

        let own = f.service.get_or_create_customer_for_user(&padded).await.unwrap();
        let again = f.service.get_or_create_customer_for_user(&padded).await.unwrap();
        assert_eq!(own, again);
        assert_eq!(
            f.service.get_accessible_customers(&padded).await.unwrap(),
            vec![own.id]
        );
    }

    #[tokio::test]
    async fn test_superadmin_sees_all_customers() {
        let f = fixture(AuthzConfig::default()).await;
        f.directory.add_customer("a@example.com", "A").await.unwrap();
        f.directory.add_customer("b@example.com", "B").await.unwrap();
        assert_eq!(
            f.service.get_accessible_customers(&superadmin()).await.unwrap(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn test_privilege_components() {
        let f = fixture(AuthzConfig::default()).await;
        f.service
            .store()
            .add_policy(&PolicyRule::allow("customer", "configuration", "read"))
            .await
            .unwrap();
        let ana = customer(10, "ana@example.com");
        let own = f.service.get_or_create_customer_for_user(&ana).await.unwrap();
        f.directory.link_configuration(100, own.id).await;

        let read_own = Privilege::new([Role::Customer], Permission::new("configuration", "read"))
            .with_ownership(ResourceType::Configuration);
        assert!(f.service.check_privilege(&ana, &read_own, Some(100)).await.unwrap());
        assert!(!f.service.check_privilege(&ana, &read_own, Some(101)).await.unwrap());
        assert!(!f.service.check_privilege(&ana, &read_own, None).await.unwrap());

        let staff_only = Privilege::new([Role::Salesman], Permission::new("configuration", "read"));
        assert!(!f.service.check_privilege(&ana, &staff_only, None).await.unwrap());

        let any_role = Privilege::any_role(Permission::new("configuration", "read"));
        assert!(f.service.check_privilege(&ana, &any_role, None).await.unwrap());

        let no_permission = Privilege::any_role(Permission::new("configuration", "delete"));
        assert!(!f.service.check_privilege(&ana, &no_permission, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_assign_role_updates_both_sides() {
        let f = fixture(AuthzConfig::default()).await;
        let user = User::new(3, "c@example.com", "c", Role::Customer);
        f.directory.add_user(user.clone()).await;
        f.service.initialize_user_policies(&user).await.unwrap();

        let updated = f.service.assign_role_to_user(&user, Role::Partner).await.unwrap();
        assert_eq!(updated.role, Role::Partner);
        assert_eq!(f.service.store().roles_for("c@example.com").await, vec![Role::Partner]);
        assert_eq!(f.directory.user(3).await.unwrap().role, Role::Partner);
    }

    #[tokio::test]
    async fn test_assign_role_rolls_back_on_user_failure() {
        let f = fixture(AuthzConfig::default()).await;
        let user = User::new(3, "c@example.com", "c", Role::Salesman);
        f.directory.add_user(user.clone()).await;
        f.service.initialize_user_policies(&user).await.unwrap();
        f.directory.fail_user_updates(true).await;

        let err = f.service.assign_role_to_user(&user, Role::Partner).await.unwrap_err();
        assert!(matches!(err, AuthzError::Directory(_)));
        assert_eq!(f.service.store().roles_for("c@example.com").await, vec![Role::Salesman]);
        assert_eq!(f.directory.user(3).await.unwrap().role, Role::Salesman);
    }

    #[tokio::test]
    async fn test_assign_role_to_missing_user() {
        let f = fixture(AuthzConfig::default()).await;
        let ghost = User::new(99, "ghost@example.com", "ghost", Role::Customer);

        let err = f.service.assign_role_to_user(&ghost, Role::Partner).await.unwrap_err();
        assert!(matches!(err, AuthzError::UserNotFound(_)));
        assert!(f.service.store().roles_for("ghost@example.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_customer_policies() {
        let f = fixture(AuthzConfig::default()).await;
        let ana = customer(10, "ana@example.com").with_full_name("Ana Lima");
        f.service.initialize_user_policies(&ana).await.unwrap();
        f.service.initialize_user_policies(&ana).await.unwrap();

        let store = f.service.store();
        assert_eq!(store.roles_for("ana@example.com").await, vec![Role::Customer]);
        assert_eq!(store.customers_for("ana@example.com").await.len(), 1);
        assert_eq!(f.directory.customer_count("ana@example.com").await, 1);
    }
}
