//! In-memory directory implementation.
//!
//! Implements every collaborator trait over plain maps. This is suitable for
//! tests and single-process tools; production wires the relational layer.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use configurator_rbac::{Role, User};
use tokio::sync::RwLock;

use crate::directory::{
    Customer, CustomerRepository, NewCustomer, OwnershipDirectory, RepositoryError,
    RepositoryResult, UserDirectory,
};

const EMAIL_CONSTRAINT: &str = "customers_email_key";

/// Failure injected into the next customer insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertFault {
    /// A competitor row for the same email is written first and the insert
    /// fails with a unique violation.
    LoseRace,
    /// The insert fails with a unique violation but no row exists.
    PhantomConflict,
    /// The insert fails with a foreign key violation.
    ForeignKey,
}

#[derive(Debug, Default)]
struct DirectoryState {
    customers: BTreeMap<i64, Customer>,
    next_customer_id: i64,
    configurations: HashMap<i64, i64>,
    quotes: HashMap<i64, i64>,
    orders: HashMap<i64, i64>,
    users: HashMap<i64, User>,
    insert_fault: Option<InsertFault>,
    fail_user_updates: bool,
}

impl DirectoryState {
    fn email_taken(&self, email: &str) -> bool {
        self.customers.values().any(|c| c.email == email)
    }

    fn push_customer(&mut self, customer: NewCustomer) -> Customer {
        self.next_customer_id += 1;
        let customer = Customer {
            id: self.next_customer_id,
            email: customer.email,
            contact_person: customer.contact_person,
            customer_type: customer.customer_type,
            is_active: customer.is_active,
            notes: customer.notes,
            created_at: Utc::now(),
        };
        self.customers.insert(customer.id, customer.clone());
        customer
    }
}

/// Customer, ownership and user directory held in memory.
///
/// Customer emails are unique; inserts check and write under one lock.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a customer directly, bypassing fault injection.
    pub async fn add_customer(&self, email: &str, contact_person: &str) -> RepositoryResult<Customer> {
        let mut state = self.state.write().await;
        if state.email_taken(email) {
            return Err(RepositoryError::UniqueViolation {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }
        Ok(state.push_customer(NewCustomer {
            email: email.to_string(),
            contact_person: contact_person.to_string(),
            customer_type: "commercial".to_string(),
            is_active: true,
            notes: None,
        }))
    }

    /// Record that a configuration belongs to a customer.
    pub async fn link_configuration(&self, configuration_id: i64, customer_id: i64) {
        self.state
            .write()
            .await
            .configurations
            .insert(configuration_id, customer_id);
    }

    /// Record that a quote belongs to a customer.
    pub async fn link_quote(&self, quote_id: i64, customer_id: i64) {
        self.state.write().await.quotes.insert(quote_id, customer_id);
    }

    /// Record that an order was placed from a quote.
    pub async fn link_order(&self, order_id: i64, quote_id: i64) {
        self.state.write().await.orders.insert(order_id, quote_id);
    }

    /// Add or replace a user.
    pub async fn add_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// Get a user by id.
    pub async fn user(&self, user_id: i64) -> Option<User> {
        self.state.read().await.users.get(&user_id).cloned()
    }

    /// Number of customer rows with this email.
    pub async fn customer_count(&self, email: &str) -> usize {
        self.state
            .read()
            .await
            .customers
            .values()
            .filter(|c| c.email == email)
            .count()
    }

    /// Make the next customer insert fail.
    pub async fn fail_next_insert(&self, fault: InsertFault) {
        self.state.write().await.insert_fault = Some(fault);
    }

    /// Make user role updates fail until reset.
    pub async fn fail_user_updates(&self, fail: bool) {
        self.state.write().await.fail_user_updates = fail;
    }
}

#[async_trait]
impl CustomerRepository for InMemoryDirectory {
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Customer>> {
        Ok(self
            .state
            .read()
            .await
            .customers
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Customer>> {
        Ok(self.state.read().await.customers.get(&id).cloned())
    }

    async fn ids_by_email(&self, email: &str) -> RepositoryResult<Vec<i64>> {
        Ok(self
            .state
            .read()
            .await
            .customers
            .values()
            .filter(|c| c.email == email)
            .map(|c| c.id)
            .collect())
    }

    async fn all_ids(&self) -> RepositoryResult<Vec<i64>> {
        Ok(self.state.read().await.customers.keys().copied().collect())
    }

    async fn insert(&self, customer: NewCustomer) -> RepositoryResult<Customer> {
        let mut state = self.state.write().await;

        match state.insert_fault.take() {
            Some(InsertFault::LoseRace) => {
                if !state.email_taken(&customer.email) {
                    state.push_customer(NewCustomer {
                        contact_person: "competitor".to_string(),
                        ..customer
                    });
                }
                return Err(RepositoryError::UniqueViolation {
                    constraint: EMAIL_CONSTRAINT.to_string(),
                });
            }
            Some(InsertFault::PhantomConflict) => {
                return Err(RepositoryError::UniqueViolation {
                    constraint: EMAIL_CONSTRAINT.to_string(),
                });
            }
            Some(InsertFault::ForeignKey) => {
                return Err(RepositoryError::ForeignKeyViolation {
                    constraint: "customers_type_fk".to_string(),
                });
            }
            None => {}
        }

        if state.email_taken(&customer.email) {
            return Err(RepositoryError::UniqueViolation {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }
        Ok(state.push_customer(customer))
    }
}

#[async_trait]
impl OwnershipDirectory for InMemoryDirectory {
    async fn configuration_customer(&self, configuration_id: i64) -> RepositoryResult<Option<i64>> {
        Ok(self
            .state
            .read()
            .await
            .configurations
            .get(&configuration_id)
            .copied())
    }

    async fn quote_customer(&self, quote_id: i64) -> RepositoryResult<Option<i64>> {
        Ok(self.state.read().await.quotes.get(&quote_id).copied())
    }

    async fn order_quote(&self, order_id: i64) -> RepositoryResult<Option<i64>> {
        Ok(self.state.read().await.orders.get(&order_id).copied())
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_role(&self, user_id: i64, role: Role) -> RepositoryResult<Option<User>> {
        let mut state = self.state.write().await;
        if state.fail_user_updates {
            return Err(RepositoryError::Unavailable("user table is read-only".to_string()));
        }
        Ok(state.users.get_mut(&user_id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_customer(email: &str) -> NewCustomer {
        NewCustomer {
            email: email.to_string(),
            contact_person: "Ana".to_string(),
            customer_type: "residential".to_string(),
            is_active: true,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_email() {
        let directory = InMemoryDirectory::new();
        let created = directory.insert(new_customer("a@example.com")).await.unwrap();
        assert_eq!(created.id, 1);

        let err = directory.insert(new_customer("a@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation { .. }));
        assert_eq!(directory.all_ids().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_fault_applies_once() {
        let directory = InMemoryDirectory::new();
        directory.fail_next_insert(InsertFault::ForeignKey).await;
        assert!(directory.insert(new_customer("a@example.com")).await.is_err());
        assert!(directory.insert(new_customer("a@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_ownership_links() {
        let directory = InMemoryDirectory::new();
        directory.link_configuration(5, 1).await;
        directory.link_quote(8, 2).await;
        directory.link_order(13, 8).await;

        assert_eq!(directory.configuration_customer(5).await.unwrap(), Some(1));
        assert_eq!(directory.quote_customer(8).await.unwrap(), Some(2));
        assert_eq!(directory.order_quote(13).await.unwrap(), Some(8));
        assert_eq!(directory.order_quote(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_role() {
        let directory = InMemoryDirectory::new();
        directory
            .add_user(User::new(1, "a@example.com", "a", Role::Customer))
            .await;

        let updated = directory.update_role(1, Role::Partner).await.unwrap().unwrap();
        assert_eq!(updated.role, Role::Partner);
        assert_eq!(directory.user(1).await.unwrap().role, Role::Partner);
        assert!(directory.update_role(2, Role::Partner).await.unwrap().is_none());

        directory.fail_user_updates(true).await;
        assert!(directory.update_role(1, Role::Salesman).await.is_err());
    }
}
