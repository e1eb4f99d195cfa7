//! # Privileges
//!
//! A privilege is one authorization path for a service method: an
//! AND-composition of acceptable roles, a permission and an optional
//! ownership requirement. Privileges are built once, at service definition
//! time, and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::permissions::Permission;
use crate::resources::ResourceType;
use crate::roles::Role;

/// Requirement that the target resource instance belongs to one of the
/// principal's accessible customers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceOwnership {
    /// Type used to look up the owning customer of the instance.
    pub resource_type: ResourceType,
}

impl ResourceOwnership {
    /// Create an ownership requirement for a resource type.
    pub fn new(resource_type: ResourceType) -> Self {
        Self { resource_type }
    }
}

/// AND-composition of roles, permission and optional ownership.
///
/// An empty role list accepts any role.
///
/// # Example
///
/// ```
/// use configurator_rbac::{Permission, Privilege, ResourceType, Role};
///
/// let privilege = Privilege::new([Role::Salesman, Role::Partner], Permission::new("quote", "update"))
///     .with_ownership(ResourceType::Quote);
///
/// assert!(privilege.accepts_role(Role::Partner));
/// assert!(!privilege.accepts_role(Role::Customer));
/// assert_eq!(privilege.cache_key(), "salesman,partner|quote:update|quote");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Privilege {
    /// Acceptable roles, sorted and de-duplicated.
    roles: Vec<Role>,
    /// Required permission.
    permission: Permission,
    /// Optional ownership component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ownership: Option<ResourceOwnership>,
}

impl Privilege {
    /// Create a privilege from acceptable roles and a permission.
    pub fn new(roles: impl IntoIterator<Item = Role>, permission: Permission) -> Self {
        let mut roles: Vec<Role> = roles.into_iter().collect();
        roles.sort();
        roles.dedup();
        Self {
            roles,
            permission,
            ownership: None,
        }
    }

    /// Privilege accepting any role that holds the permission.
    pub fn any_role(permission: Permission) -> Self {
        Self::new(Vec::new(), permission)
    }

    /// Add an ownership requirement on the given resource type.
    pub fn with_ownership(mut self, resource_type: ResourceType) -> Self {
        self.ownership = Some(ResourceOwnership::new(resource_type));
        self
    }

    /// Acceptable roles.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Required permission.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    /// Ownership component, if any.
    pub fn ownership(&self) -> Option<&ResourceOwnership> {
        self.ownership.as_ref()
    }

    /// Check if a role satisfies the role component.
    pub fn accepts_role(&self, role: Role) -> bool {
        self.roles.is_empty() || self.roles.contains(&role)
    }

    /// Stable textual key, used to memoize privilege decisions.
    pub fn cache_key(&self) -> String {
        let roles: Vec<&str> = self.roles.iter().map(Role::as_str).collect();
        let ownership = self
            .ownership
            .map(|o| o.resource_type.as_str())
            .unwrap_or("-");
        format!("{}|{}|{}", roles.join(","), self.permission, ownership)
    }
}
