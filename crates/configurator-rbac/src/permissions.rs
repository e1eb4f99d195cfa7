//! # Permissions
//!
//! Core permission type for the RBAC system.
//! A permission combines a resource name with an action name, either of
//! which may be the `*` wildcard.

use serde::{Deserialize, Serialize};

/// Wildcard accepted in the resource, action and subject positions.
pub const WILDCARD: &str = "*";

/// A permission is a combination of resource and action.
///
/// Resources and actions are plain strings because policy rules are
/// administered at runtime; `*` in either position matches any value.
///
/// # Example
///
/// ```
/// use configurator_rbac::Permission;
///
/// let perm = Permission::new("quote", "read");
/// assert_eq!(perm.to_string(), "quote:read");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// The resource this permission applies to.
    pub resource: String,
    /// The action allowed on the resource.
    pub action: String,
}

impl Permission {
    /// Create a new permission.
    ///
    /// # Arguments
    ///
    /// * `resource` - The resource name, or `*`
    /// * `action` - The action name, or `*`
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}
