//! # Requirements
//!
//! Declarative access requirements attached to service methods.
//!
//! ```text
//! Guard = RequirementGroup OR RequirementGroup OR ...
//! RequirementGroup = Requirement AND Requirement AND ...
//! ```
//!
//! Groups are evaluated in declaration order and evaluation stops at the
//! first satisfied group. A superadmin principal satisfies every group.

use serde::{Deserialize, Serialize};

use crate::permissions::Permission;
use crate::privilege::{Privilege, ResourceOwnership};
use crate::resources::ResourceType;
use crate::roles::Role;

/// One atomic requirement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// The principal holds one of the listed roles.
    Role {
        /// Acceptable roles.
        roles: Vec<Role>,
    },
    /// The principal holds the permission in the policy store.
    Permission {
        /// Required permission.
        permission: Permission,
    },
    /// The target instance belongs to an accessible customer.
    Ownership {
        /// Ownership requirement.
        ownership: ResourceOwnership,
    },
    /// A full privilege (roles AND permission AND ownership).
    Privilege {
        /// Required privilege.
        privilege: Privilege,
    },
}

impl Requirement {
    /// Role requirement.
    pub fn role(roles: impl IntoIterator<Item = Role>) -> Self {
        Requirement::Role {
            roles: roles.into_iter().collect(),
        }
    }

    /// Permission requirement.
    pub fn permission(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Requirement::Permission {
            permission: Permission::new(resource, action),
        }
    }

    /// Ownership requirement.
    pub fn ownership(resource_type: ResourceType) -> Self {
        Requirement::Ownership {
            ownership: ResourceOwnership::new(resource_type),
        }
    }

    /// Short human-readable description, used in denial logs.
    pub fn describe(&self) -> String {
        match self {
            Requirement::Role { roles } => {
                let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
                format!("role in [{}]", names.join(", "))
            }
            Requirement::Permission { permission } => format!("permission {}", permission),
            Requirement::Ownership { ownership } => {
                format!("ownership of {}", ownership.resource_type)
            }
            Requirement::Privilege { privilege } => format!("privilege {}", privilege.cache_key()),
        }
    }

    /// Permission this requirement checks, if any.
    pub fn permission_ref(&self) -> Option<&Permission> {
        match self {
            Requirement::Permission { permission } => Some(permission),
            Requirement::Privilege { privilege } => Some(privilege.permission()),
            _ => None,
        }
    }
}

impl From<Privilege> for Requirement {
    fn from(privilege: Privilege) -> Self {
        Requirement::Privilege { privilege }
    }
}

impl From<Permission> for Requirement {
    fn from(permission: Permission) -> Self {
        Requirement::Permission { permission }
    }
}

impl From<ResourceOwnership> for Requirement {
    fn from(ownership: ResourceOwnership) -> Self {
        Requirement::Ownership { ownership }
    }
}

/// Requirements that must all hold (AND).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RequirementGroup {
    requirements: Vec<Requirement>,
}

impl RequirementGroup {
    /// Create a group from requirements.
    pub fn new(requirements: impl IntoIterator<Item = Requirement>) -> Self {
        Self {
            requirements: requirements.into_iter().collect(),
        }
    }

    /// Add a requirement to the group.
    pub fn and(mut self, requirement: impl Into<Requirement>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    /// Requirements in declaration order.
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Check if the group has no requirements (trivially satisfied).
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// First permission named in the group, used to label denials.
    pub fn primary_permission(&self) -> Option<&Permission> {
        self.requirements.iter().find_map(Requirement::permission_ref)
    }

    /// Human-readable description of the whole group.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self.requirements.iter().map(Requirement::describe).collect();
        parts.join(" AND ")
    }
}

impl From<Requirement> for RequirementGroup {
    fn from(requirement: Requirement) -> Self {
        Self::new([requirement])
    }
}

impl From<Privilege> for RequirementGroup {
    fn from(privilege: Privilege) -> Self {
        Self::new([Requirement::from(privilege)])
    }
}

/// Ordered alternatives guarding one operation (OR of groups).
///
/// # Example
///
/// ```
/// use configurator_rbac::{Guard, Permission, Privilege, Requirement, RequirementGroup, ResourceType, Role};
///
/// // Staff may update any quote; customers only their own.
/// let guard = Guard::new()
///     .require(Privilege::new([Role::Salesman, Role::DataEntry], Permission::new("quote", "update")))
///     .require(
///         RequirementGroup::new([Requirement::role([Role::Customer])])
///             .and(Permission::new("quote", "update"))
///             .and(Requirement::ownership(ResourceType::Quote)),
///     );
///
/// assert_eq!(guard.groups().len(), 2);
/// assert_eq!(guard.primary_permission(), Some(&Permission::new("quote", "update")));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Guard {
    groups: Vec<RequirementGroup>,
}

impl Guard {
    /// Create a guard with no groups.
    ///
    /// A guard with no groups denies every non-superadmin principal.
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Append an alternative group.
    pub fn require(mut self, group: impl Into<RequirementGroup>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Groups in declaration order.
    pub fn groups(&self) -> &[RequirementGroup] {
        &self.groups
    }

    /// First permission named by any group, used to label denials.
    pub fn primary_permission(&self) -> Option<&Permission> {
        self.groups.iter().find_map(RequirementGroup::primary_permission)
    }

    /// Human-readable description of all alternatives.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self
            .groups
            .iter()
            .map(|group| format!("({})", group.describe()))
            .collect();
        parts.join(" OR ")
    }
}
