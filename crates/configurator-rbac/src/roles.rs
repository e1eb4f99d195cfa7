//! Principal roles
//!
//! This module defines the fixed role enumeration held by every principal.
//! Role names double as policy subjects in the policy store.

use serde::{Deserialize, Serialize};

/// Role held by a principal.
///
/// Roles are flat: there is no hierarchy between them. The only special role
/// is [`Role::Superadmin`], which satisfies every authorization check.
///
/// # Examples
///
/// ```
/// use configurator_rbac::Role;
///
/// let role = Role::Salesman;
/// assert_eq!(role.as_str(), "salesman");
/// assert!(!role.is_superadmin());
/// assert!(Role::Superadmin.is_superadmin());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unrestricted back-office administrator
    Superadmin,

    /// Sales staff acting on behalf of many customers
    Salesman,

    /// Staff maintaining product data and templates
    DataEntry,

    /// External reseller acting on behalf of its own customers
    Partner,

    /// End customer acting on its own behalf
    Customer,
}

impl Role {
    /// Check if this role bypasses every authorization check.
    pub fn is_superadmin(&self) -> bool {
        matches!(self, Role::Superadmin)
    }

    /// Check if this role acts on behalf of more than one customer.
    ///
    /// # Returns
    ///
    /// `true` for Salesman and Partner roles
    pub fn acts_for_customers(&self) -> bool {
        matches!(self, Role::Salesman | Role::Partner)
    }

    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, accepts the upper-case
    ///   enumeration names used by the user table)
    ///
    /// # Returns
    ///
    /// `Some(Role)` if valid, `None` otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use configurator_rbac::Role;
    ///
    /// assert_eq!(Role::parse("salesman"), Some(Role::Salesman));
    /// assert_eq!(Role::parse("DATA_ENTRY"), Some(Role::DataEntry));
    /// assert_eq!(Role::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "superadmin" | "super_admin" => Some(Self::Superadmin),
            "salesman" => Some(Self::Salesman),
            "data_entry" | "dataentry" => Some(Self::DataEntry),
            "partner" => Some(Self::Partner),
            "customer" => Some(Self::Customer),
            _ => None,
        }
    }

    /// Get string representation of the role.
    ///
    /// This is the subject name used by policy rules and role groupings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Salesman => "salesman",
            Self::DataEntry => "data_entry",
            Self::Partner => "partner",
            Self::Customer => "customer",
        }
    }

    /// Get all roles.
    pub fn all() -> Vec<Self> {
        vec![
            Self::Superadmin,
            Self::Salesman,
            Self::DataEntry,
            Self::Partner,
            Self::Customer,
        ]
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Customer
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
