//! Collaborator directories.
//!
//! The relational layer (customers, resource ownership, users) stays outside
//! this crate. The authorization core reaches it only through these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configurator_rbac::{Role, User};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Constraint name.
        constraint: String,
    },

    /// A foreign key constraint rejected the write.
    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation {
        /// Constraint name.
        constraint: String,
    },

    /// The backing store could not be reached.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Result type for directory operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer id.
    pub id: i64,
    /// Unique contact email.
    pub email: String,
    /// Contact person.
    pub contact_person: String,
    /// Customer type (`residential`, `commercial`, ...).
    pub customer_type: String,
    /// Whether the customer is active.
    pub is_active: bool,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Customer to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    /// Unique contact email.
    pub email: String,
    /// Contact person.
    pub contact_person: String,
    /// Customer type.
    pub customer_type: String,
    /// Whether the customer is active.
    pub is_active: bool,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Customer table access.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Find the customer with this email.
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Customer>>;

    /// Find a customer by id.
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Customer>>;

    /// Ids of every customer row matching this email.
    async fn ids_by_email(&self, email: &str) -> RepositoryResult<Vec<i64>>;

    /// Ids of every customer.
    async fn all_ids(&self) -> RepositoryResult<Vec<i64>>;

    /// Insert a customer atomically.
    ///
    /// Must fail with [`RepositoryError::UniqueViolation`] when a row with
    /// the same email already exists.
    async fn insert(&self, customer: NewCustomer) -> RepositoryResult<Customer>;
}

/// Resolves which customer a resource instance belongs to.
#[async_trait]
pub trait OwnershipDirectory: Send + Sync {
    /// Owning customer of a configuration.
    async fn configuration_customer(&self, configuration_id: i64) -> RepositoryResult<Option<i64>>;

    /// Owning customer of a quote.
    async fn quote_customer(&self, quote_id: i64) -> RepositoryResult<Option<i64>>;

    /// Quote an order was placed from.
    async fn order_quote(&self, order_id: i64) -> RepositoryResult<Option<i64>>;
}

/// User table access.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find the user with this email.
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Set the role column of a user, returning the updated row.
    async fn update_role(&self, user_id: i64, role: Role) -> RepositoryResult<Option<User>>;
}
