//! # Configurator Authorization
//!
//! Policy store, authorization service and policy administration for the
//! configurator back office.
//!
//! ## Overview
//!
//! The configurator-authz crate handles:
//! - **Policy store**: casbin rules and groupings behind a read-mostly lock,
//!   persisted on every mutation
//! - **Authorization**: permission, ownership and privilege checks with
//!   per-instance decision caching
//! - **Guards**: OR-of-AND requirement evaluation in front of service methods
//! - **Administration**: audited rule mutations, backup, restore, validation
//!   and seeding
//! - **Query scoping**: customer filters for list endpoints
//!
//! ## Architecture
//!
//! ```text
//! PolicyManager ─→ RbacService ─→ PolicyStore ─→ casbin Enforcer ─→ policy file
//!      │                │
//!      └─ AuditSink     ├─ DecisionCache
//!                       └─ Directories (customers, ownership, users)
//! RbacQueryFilter ─→ RbacService::get_accessible_customers
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use configurator_authz::{AuthzConfig, Directories, InMemoryDirectory, PolicyStore, RbacService};
//! use configurator_rbac::{Guard, Permission, Privilege, Role, User};
//!
//! # async fn example() -> configurator_authz::AuthzResult<()> {
//! let config = AuthzConfig::from_env();
//! let store = Arc::new(PolicyStore::open(&config).await?);
//! let directory = Arc::new(InMemoryDirectory::new());
//! let service = RbacService::new(store, Directories::shared(directory), config);
//!
//! let user = User::new(7, "seller@example.com", "seller", Role::Salesman);
//! let guard = Guard::new().require(Privilege::new([Role::Salesman], Permission::new("quote", "read")));
//! service.request_scope().require(&user, &guard, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod cache;
pub mod config;
pub mod customer;
pub mod directory;
pub mod error;
pub mod filter;
pub mod guard;
pub mod manager;
pub mod memory;
pub mod model;
pub mod policy_store;
pub mod service;

// Re-export main types for convenience
pub use audit::{AuditAction, AuditEntry, AuditError, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use cache::{CacheStats, DecisionCache};
pub use config::AuthzConfig;
pub use customer::{new_customer_for, provision_customer};
pub use directory::{
    Customer, CustomerRepository, NewCustomer, OwnershipDirectory, RepositoryError,
    RepositoryResult, UserDirectory,
};
pub use error::{AuthzError, AuthzResult};
pub use filter::{CustomerScope, RbacQueryFilter};
pub use manager::{
    initial_policies, BackupMetadata, PolicyBackup, PolicyManager, PolicyStatistics,
    PolicySummary, RestoreSummary, ValidationReport,
};
pub use memory::{InMemoryDirectory, InsertFault};
pub use model::{load_model, model_string};
pub use policy_store::{check_value, InstalledRows, PolicyStore, StoredRow};
pub use service::{Directories, RbacService};
