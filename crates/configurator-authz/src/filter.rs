//! Row-level scoping of list queries.
//!
//! List endpoints narrow their results to the customers the principal may
//! act for. Superadmins are unrestricted.

use configurator_rbac::User;
use serde::{Deserialize, Serialize};

use crate::error::AuthzResult;
use crate::service::RbacService;

/// Customers a principal may see rows of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "customer_ids", rename_all = "snake_case")]
pub enum CustomerScope {
    /// Every row is visible.
    Unrestricted,
    /// Only rows owned by these customers (sorted) are visible.
    Customers(Vec<i64>),
}

impl CustomerScope {
    /// Check whether rows of a customer are visible.
    pub fn permits(&self, customer_id: i64) -> bool {
        match self {
            CustomerScope::Unrestricted => true,
            CustomerScope::Customers(ids) => ids.binary_search(&customer_id).is_ok(),
        }
    }

    /// Drop the items owned by customers outside the scope.
    pub fn retain<T>(&self, items: &mut Vec<T>, customer_of: impl Fn(&T) -> i64) {
        if let CustomerScope::Customers(_) = self {
            items.retain(|item| self.permits(customer_of(item)));
        }
    }

    /// SQL predicate on a customer id column.
    ///
    /// # Returns
    ///
    /// `None` when unrestricted; `1 = 0` for an empty scope
    pub fn sql_predicate(&self, column: &str) -> Option<String> {
        match self {
            CustomerScope::Unrestricted => None,
            CustomerScope::Customers(ids) if ids.is_empty() => Some("1 = 0".to_string()),
            CustomerScope::Customers(ids) => {
                let list: Vec<String> = ids.iter().map(i64::to_string).collect();
                Some(format!("{column} IN ({})", list.join(", ")))
            }
        }
    }
}

/// Builds customer scopes for list queries.
#[derive(Debug, Clone)]
pub struct RbacQueryFilter {
    service: RbacService,
}

impl RbacQueryFilter {
    /// Create a filter over a service.
    pub fn new(service: RbacService) -> Self {
        Self { service }
    }

    /// Scope of a principal.
    pub async fn scope_for(&self, user: &User) -> AuthzResult<CustomerScope> {
        if user.is_superadmin() {
            return Ok(CustomerScope::Unrestricted);
        }
        let ids = self.service.get_accessible_customers(user).await?;
        Ok(CustomerScope::Customers(ids))
    }
}
