//! # Policy and grouping rules
//!
//! Row shapes persisted by the policy store:
//!
//! ```text
//! p, subject, resource, action, effect      policy rule
//! g, subject, role                          role grouping
//! g2, subject, customer, customer_id        customer grouping
//! ```

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Policy type tag of permission rules.
pub const POLICY_PTYPE: &str = "p";
/// Policy type tag of role groupings.
pub const ROLE_GROUPING_PTYPE: &str = "g";
/// Policy type tag of customer groupings.
pub const CUSTOMER_GROUPING_PTYPE: &str = "g2";
/// Middle column of every customer grouping row.
pub const CUSTOMER_GROUP: &str = "customer";

/// Outcome associated with a policy rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Grant access.
    Allow,
    /// Refuse access; overrides any matching allow.
    Deny,
}

impl Effect {
    /// Get the string representation of the effect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }

    /// Parse effect from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Some(Effect::Allow),
            "deny" => Some(Effect::Deny),
            _ => None,
        }
    }
}

impl Default for Effect {
    fn default() -> Self {
        Effect::Allow
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(subject, resource, action, effect)` policy rule.
///
/// The subject is a role name, a principal's email, or `*`.
///
/// # Example
///
/// ```
/// use configurator_rbac::{Effect, PolicyRule};
///
/// let rule = PolicyRule::allow("salesman", "quote", "*");
/// assert_eq!(rule.to_params(), vec!["salesman", "quote", "*", "allow"]);
/// assert_eq!(PolicyRule::from_params(&rule.to_params()), Some(rule));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Role name, principal email, or `*`.
    pub subject: String,
    /// Resource name or `*`.
    pub resource: String,
    /// Action name or `*`.
    pub action: String,
    /// Allow or deny.
    #[serde(default)]
    pub effect: Effect,
}

impl PolicyRule {
    /// Create a new policy rule.
    pub fn new(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        effect: Effect,
    ) -> Self {
        Self {
            subject: subject.into(),
            resource: resource.into(),
            action: action.into(),
            effect,
        }
    }

    /// Create an allow rule.
    pub fn allow(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self::new(subject, resource, action, Effect::Allow)
    }

    /// Create a deny rule.
    pub fn deny(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self::new(subject, resource, action, Effect::Deny)
    }

    /// Row parameters without the `p` tag.
    pub fn to_params(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.resource.clone(),
            self.action.clone(),
            self.effect.as_str().to_string(),
        ]
    }

    /// Parse row parameters without the `p` tag.
    ///
    /// # Returns
    ///
    /// `None` if the row does not have exactly four columns or the effect is unknown
    pub fn from_params(params: &[String]) -> Option<Self> {
        match params {
            [subject, resource, action, effect] => Some(Self::new(
                subject.as_str(),
                resource.as_str(),
                action.as_str(),
                Effect::parse(effect)?,
            )),
            _ => None,
        }
    }
}

/// Membership assertion, separate from permission rules.
///
/// # Example
///
/// ```
/// use configurator_rbac::{GroupingRule, Role};
///
/// let rule = GroupingRule::customer("ana@example.com", 42);
/// assert_eq!(rule.ptype(), "g2");
/// assert_eq!(rule.to_params(), vec!["ana@example.com", "customer", "42"]);
///
/// let rule = GroupingRule::role("ana@example.com", Role::Salesman);
/// assert_eq!(rule.to_params(), vec!["ana@example.com", "salesman"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupingRule {
    /// The subject holds a role.
    Role {
        /// Principal email.
        subject: String,
        /// Role held.
        role: Role,
    },
    /// The subject may act on behalf of a customer.
    Customer {
        /// Principal email.
        subject: String,
        /// Customer id.
        customer_id: i64,
    },
}

impl GroupingRule {
    /// Create a role grouping.
    pub fn role(subject: impl Into<String>, role: Role) -> Self {
        GroupingRule::Role {
            subject: subject.into(),
            role,
        }
    }

    /// Create a customer grouping.
    pub fn customer(subject: impl Into<String>, customer_id: i64) -> Self {
        GroupingRule::Customer {
            subject: subject.into(),
            customer_id,
        }
    }

    /// Subject of the grouping.
    pub fn subject(&self) -> &str {
        match self {
            GroupingRule::Role { subject, .. } | GroupingRule::Customer { subject, .. } => subject,
        }
    }

    /// Policy type tag this grouping is stored under.
    pub fn ptype(&self) -> &'static str {
        match self {
            GroupingRule::Role { .. } => ROLE_GROUPING_PTYPE,
            GroupingRule::Customer { .. } => CUSTOMER_GROUPING_PTYPE,
        }
    }

    /// Row parameters without the policy type tag.
    pub fn to_params(&self) -> Vec<String> {
        match self {
            GroupingRule::Role { subject, role } => {
                vec![subject.clone(), role.as_str().to_string()]
            }
            GroupingRule::Customer {
                subject,
                customer_id,
            } => vec![
                subject.clone(),
                CUSTOMER_GROUP.to_string(),
                customer_id.to_string(),
            ],
        }
    }

    /// Parse row parameters stored under `ptype`.
    ///
    /// # Returns
    ///
    /// `None` for unknown tags, wrong arity, unknown roles or non-numeric customer ids
    pub fn from_params(ptype: &str, params: &[String]) -> Option<Self> {
        match (ptype, params) {
            (ROLE_GROUPING_PTYPE, [subject, role]) => Some(Self::role(subject.as_str(), Role::parse(role)?)),
            (CUSTOMER_GROUPING_PTYPE, [subject, group, customer_id]) if group == CUSTOMER_GROUP => {
                Some(Self::customer(subject.as_str(), customer_id.trim().parse().ok()?))
            }
            _ => None,
        }
    }
}
