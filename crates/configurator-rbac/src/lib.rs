//! # Configurator RBAC (Role-Based Access Control)
//!
//! This crate provides the authorization vocabulary for the configurator
//! back office, shared by the policy store, the authorization service and
//! the services they gate (configurations, quotes, orders, templates).
//!
//! ## Overview
//!
//! The configurator-rbac crate handles:
//! - **Roles**: The fixed role enumeration held by principals
//! - **Principals**: The authenticated user as read by authorization
//! - **Permissions**: Resource + Action pairs with `*` wildcards
//! - **Rules**: Policy rules and role/customer groupings as persisted
//! - **Privileges**: Roles AND permission AND optional ownership
//! - **Guards**: Ordered OR of requirement groups for one operation
//!
//! ## Architecture
//!
//! ```text
//! Guard
//!   ├─ RequirementGroup (AND) ─→ Requirement::Role
//!   │                           Requirement::Permission ─→ PolicyRule
//!   │                           Requirement::Ownership  ─→ ResourceType
//!   └─ RequirementGroup (AND) ─→ Requirement::Privilege
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use configurator_rbac::{Guard, Permission, Privilege, ResourceType, Role};
//!
//! // Customers may read their own orders, staff may read any order.
//! let read_order = Guard::new()
//!     .require(Privilege::new([Role::Salesman, Role::DataEntry], Permission::new("order", "read")))
//!     .require(
//!         Privilege::new([Role::Customer, Role::Partner], Permission::new("order", "read"))
//!             .with_ownership(ResourceType::Order),
//!     );
//!
//! assert_eq!(read_order.groups().len(), 2);
//! ```
//!
//! Evaluation lives in `configurator-authz`; this crate holds data only.

pub mod permissions;
pub mod principal;
pub mod privilege;
pub mod requirement;
pub mod resources;
pub mod roles;
pub mod rules;

// Re-export main types for convenience
pub use permissions::{Permission, WILDCARD};
pub use principal::User;
pub use privilege::{Privilege, ResourceOwnership};
pub use requirement::{Guard, Requirement, RequirementGroup};
pub use resources::ResourceType;
pub use roles::Role;
pub use rules::{
    Effect, GroupingRule, PolicyRule, CUSTOMER_GROUP, CUSTOMER_GROUPING_PTYPE, POLICY_PTYPE,
    ROLE_GROUPING_PTYPE,
};
