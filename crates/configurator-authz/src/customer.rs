//! Customer auto-provisioning.
//!
//! A principal without a customer row gets one the first time it performs a
//! customer-scoped action. Concurrent first requests race on the unique email
//! constraint; the loser re-reads and returns the winner's row.

use configurator_rbac::User;
use tracing::{debug, info, warn};

use crate::directory::{Customer, CustomerRepository, NewCustomer, RepositoryError};
use crate::error::{AuthzError, AuthzResult};

/// Build the row to insert for a principal.
///
/// # Errors
///
/// [`AuthzError::CustomerCreation`] when the principal has no email.
pub fn new_customer_for(user: &User, customer_type: &str) -> AuthzResult<NewCustomer> {
    let email = user.subject();
    if email.is_empty() {
        return Err(AuthzError::CustomerCreation {
            email: String::new(),
            reason: format!("user {} has no email address", user.id),
            source: None,
        });
    }

    Ok(NewCustomer {
        email: email.to_string(),
        contact_person: user.contact_name().to_string(),
        customer_type: customer_type.to_string(),
        is_active: true,
        notes: Some(format!(
            "Auto-created for user {} (id {})",
            user.username, user.id
        )),
    })
}

/// Return the principal's customer, inserting it if absent.
///
/// Insert-then-recover: a unique violation means another caller created the
/// row first, so the row is re-read once. If it is still missing the
/// conflict is reported instead of retried.
///
/// # Errors
///
/// - [`AuthzError::CustomerCreation`] for data problems, unrecoverable
///   conflicts and any other insert failure (original error preserved)
/// - [`AuthzError::Directory`] when a lookup fails
pub async fn provision_customer(
    repository: &dyn CustomerRepository,
    user: &User,
    customer_type: &str,
) -> AuthzResult<Customer> {
    let email = user.subject();
    if let Some(existing) = repository.find_by_email(email).await? {
        debug!(email = %email, customer_id = existing.id, "Customer already provisioned");
        return Ok(existing);
    }

    let new_customer = new_customer_for(user, customer_type)?;
    match repository.insert(new_customer).await {
        Ok(customer) => {
            info!(email = %email, customer_id = customer.id, "Auto-provisioned customer");
            Ok(customer)
        }
        Err(RepositoryError::UniqueViolation { constraint }) => {
            warn!(
                email = %email,
                constraint = %constraint,
                "Customer insert lost a race, re-reading"
            );
            match repository.find_by_email(email).await? {
                Some(winner) => Ok(winner),
                None => Err(AuthzError::CustomerCreation {
                    email: email.to_string(),
                    reason: "unique constraint violated but no customer row was found".to_string(),
                    source: Some(RepositoryError::UniqueViolation { constraint }),
                }),
            }
        }
        Err(other) => Err(AuthzError::CustomerCreation {
            email: email.to_string(),
            reason: "customer insert failed".to_string(),
            source: Some(other),
        }),
    }
}
