//! # Principal
//!
//! The authenticated user as seen by the authorization core. The user
//! management subsystem owns the record; this crate only reads it.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Authenticated principal.
///
/// The email address is the policy subject: every rule and grouping in the
/// policy store is keyed by it.
///
/// # Example
///
/// ```
/// use configurator_rbac::{Role, User};
///
/// let user = User::new(7, "ana@example.com", "ana", Role::Salesman);
/// assert!(!user.is_superadmin());
/// assert_eq!(user.subject(), "ana@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric user id, used as the decision cache key.
    pub id: i64,
    /// Unique email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Full display name, if the user provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Role held by the user.
    pub role: Role,
    /// Legacy superuser flag; treated like the superadmin role.
    #[serde(default)]
    pub is_superuser: bool,
    /// Whether the account is active.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Create an active, non-superuser principal.
    pub fn new(id: i64, email: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            username: username.into(),
            full_name: None,
            role,
            is_superuser: false,
            is_active: true,
        }
    }

    /// Set the full display name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Set the legacy superuser flag.
    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    /// Policy subject for this principal.
    ///
    /// The email without surrounding whitespace; groupings and customer rows
    /// are keyed by this value.
    pub fn subject(&self) -> &str {
        self.email.trim()
    }

    /// Check if this principal bypasses every authorization check.
    pub fn is_superadmin(&self) -> bool {
        self.is_superuser || self.role.is_superadmin()
    }

    /// Name to record as the contact person of an auto-provisioned customer.
    ///
    /// Returns the full name when it is non-blank, otherwise the username.
    pub fn contact_name(&self) -> &str {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superadmin_by_role_or_flag() {
        let admin = User::new(1, "root@example.com", "root", Role::Superadmin);
        assert!(admin.is_superadmin());

        let flagged = User::new(2, "ops@example.com", "ops", Role::DataEntry).with_superuser(true);
        assert!(flagged.is_superadmin());

        let plain = User::new(3, "c@example.com", "c", Role::Customer);
        assert!(!plain.is_superadmin());
    }

    #[test]
    fn test_contact_name_prefers_full_name() {
        let user = User::new(1, "a@example.com", "alice", Role::Customer).with_full_name("Alice Doe");
        assert_eq!(user.contact_name(), "Alice Doe");
    }

    #[test]
    fn test_contact_name_falls_back_on_blank() {
        let user = User::new(1, "a@example.com", "alice", Role::Customer).with_full_name("   ");
        assert_eq!(user.contact_name(), "alice");

        let user = User::new(1, "a@example.com", "alice", Role::Customer);
        assert_eq!(user.contact_name(), "alice");
    }

    #[test]
    fn test_subject_is_trimmed_email() {
        let user = User::new(1, " ana@example.com\t", "ana", Role::Customer);
        assert_eq!(user.subject(), "ana@example.com");
    }

    #[test]
    fn test_deserialize_defaults() {
        let user: User = serde_json::from_str(
            r#"{"id": 4, "email": "p@example.com", "username": "p", "role": "partner"}"#,
        )
        .unwrap();
        assert!(user.is_active);
        assert!(!user.is_superuser);
        assert_eq!(user.full_name, None);
    }
}
