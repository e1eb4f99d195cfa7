//! # Policy store
//!
//! Owns the embedded policy engine and its persisted rows.
//!
//! ```text
//! p, subject, resource, action, effect
//! g, subject, role
//! g2, subject, customer, customer_id
//! ```
//!
//! Reads (enforcement, enumeration) share the engine; every mutation takes
//! the write lock, applies all of its changes and persists them before the
//! lock is released, so readers never observe a half-applied policy set and
//! a restart observes every completed mutation.
//!
//! Values are written as plain comma separated columns, so a value that
//! would not read back as the same single column is rejected with
//! [`AuthzError::InvalidPolicy`] before anything is changed.

use std::path::{Path, PathBuf};

use casbin::{CoreApi, Enforcer, FileAdapter, MemoryAdapter, MgmtApi};
use configurator_rbac::{
    GroupingRule, PolicyRule, Role, CUSTOMER_GROUPING_PTYPE, POLICY_PTYPE, ROLE_GROUPING_PTYPE,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::AuthzConfig;
use crate::error::{AuthzError, AuthzResult};
use crate::model::load_model;

/// Check that `value` survives the policy file as one column.
///
/// # Errors
///
/// [`AuthzError::InvalidPolicy`] for an empty value, a separator, a line
/// break, a quote or surrounding whitespace.
pub fn check_value(value: &str) -> AuthzResult<()> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.contains(',') {
        "contains a comma"
    } else if value.contains(['\n', '\r']) {
        "contains a line break"
    } else if value.contains('"') {
        "contains a quote"
    } else if value.trim() != value {
        "has surrounding whitespace"
    } else {
        return Ok(());
    };
    Err(AuthzError::InvalidPolicy {
        value: value.to_string(),
        reason,
    })
}

fn check_values<'a>(values: impl IntoIterator<Item = &'a String>) -> AuthzResult<()> {
    values.into_iter().try_for_each(|value| check_value(value))
}

/// Rows installed by [`PolicyStore::replace_all`], per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstalledRows {
    /// `p` rows.
    pub policies: usize,
    /// `g` and `g2` rows.
    pub groupings: usize,
}

/// One persisted row, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoredRow {
    /// Policy type tag (`p`, `g` or `g2`).
    pub ptype: String,
    /// Row values after the tag.
    pub params: Vec<String>,
}

impl StoredRow {
    /// Create a row.
    pub fn new(ptype: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            ptype: ptype.into(),
            params,
        }
    }

    /// Row of a policy rule.
    pub fn policy(rule: &PolicyRule) -> Self {
        Self::new(POLICY_PTYPE, rule.to_params())
    }

    /// Row of a grouping rule.
    pub fn grouping(rule: &GroupingRule) -> Self {
        Self::new(rule.ptype(), rule.to_params())
    }

    /// Check if this is a permission rule row.
    pub fn is_policy(&self) -> bool {
        self.ptype == POLICY_PTYPE
    }

    /// Check the tag and every value with [`check_value`].
    pub fn check(&self) -> AuthzResult<()> {
        check_value(&self.ptype)?;
        check_values(&self.params)
    }

    /// Render the row in the policy file syntax.
    pub fn to_line(&self) -> String {
        std::iter::once(self.ptype.as_str())
            .chain(self.params.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Policy engine plus persistence.
pub struct PolicyStore {
    enforcer: RwLock<Enforcer>,
    policy_file: Option<PathBuf>,
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("policy_file", &self.policy_file)
            .finish()
    }
}

fn store_error(operation: &'static str) -> impl FnOnce(casbin::Error) -> AuthzError {
    move |source| {
        error!(operation, error = %source, "Policy store operation failed");
        AuthzError::PolicyStore { operation, source }
    }
}

async fn ensure_policy_file(path: &Path) -> AuthzResult<()> {
    let io_error = |source| AuthzError::PolicyFile {
        path: path.to_path_buf(),
        source,
    };

    if tokio::fs::try_exists(path).await.map_err(io_error)? {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, b"").await.map_err(io_error)?;
    info!(path = %path.display(), "Created empty policy file");
    Ok(())
}

impl PolicyStore {
    /// Create a store that is not backed by a file.
    ///
    /// # Errors
    ///
    /// [`AuthzError::PolicyStore`] if the engine cannot be built.
    pub async fn in_memory() -> AuthzResult<Self> {
        let model = load_model(None).await?;
        let enforcer = Enforcer::new(model, MemoryAdapter::default())
            .await
            .map_err(store_error("open"))?;

        Ok(Self {
            enforcer: RwLock::new(enforcer),
            policy_file: None,
        })
    }

    /// Open the store described by the configuration.
    ///
    /// Creates the policy file (and its directory) when missing.
    ///
    /// # Errors
    ///
    /// - [`AuthzError::Config`] for an invalid configuration
    /// - [`AuthzError::PolicyFile`] if the file cannot be created
    /// - [`AuthzError::PolicyStore`] for an invalid model or policy file
    pub async fn open(config: &AuthzConfig) -> AuthzResult<Self> {
        config.validate()?;
        ensure_policy_file(&config.policy_file).await?;

        let model = load_model(config.model_file.as_deref()).await?;
        let adapter = FileAdapter::new(config.policy_file.clone());
        let enforcer = Enforcer::new(model, adapter)
            .await
            .map_err(store_error("open"))?;

        info!(
            path = %config.policy_file.display(),
            policies = enforcer.get_policy().len(),
            groupings = enforcer.get_grouping_policy().len(),
            "Policy store opened"
        );

        Ok(Self {
            enforcer: RwLock::new(enforcer),
            policy_file: Some(config.policy_file.clone()),
        })
    }

    /// Backing file, if any.
    pub fn policy_file(&self) -> Option<&Path> {
        self.policy_file.as_deref()
    }

    /// Evaluate a request.
    ///
    /// # Errors
    ///
    /// [`AuthzError::PolicyEvaluation`] if the engine fails; a failure is
    /// never reported as a denial.
    pub async fn enforce(
        &self,
        subject: &str,
        role: &str,
        resource: &str,
        action: &str,
    ) -> AuthzResult<bool> {
        let enforcer = self.enforcer.read().await;
        enforcer
            .enforce((subject, role, resource, action))
            .map_err(|source| {
                error!(
                    subject = %subject,
                    resource = %resource,
                    action = %action,
                    error = %source,
                    "Policy evaluation failed"
                );
                AuthzError::PolicyEvaluation {
                    subject: subject.to_string(),
                    resource: resource.to_string(),
                    action: action.to_string(),
                    source,
                }
            })
    }

    /// Add a policy rule.
    ///
    /// # Returns
    ///
    /// `false` if the rule already existed
    pub async fn add_policy(&self, rule: &PolicyRule) -> AuthzResult<bool> {
        check_values(&rule.to_params())?;
        let mut enforcer = self.enforcer.write().await;
        let added = enforcer
            .add_policy(rule.to_params())
            .await
            .map_err(store_error("add_policy"))?;
        if added {
            save(&mut enforcer).await?;
        }
        Ok(added)
    }

    /// Remove a policy rule.
    ///
    /// # Returns
    ///
    /// `false` if the rule did not exist
    pub async fn remove_policy(&self, rule: &PolicyRule) -> AuthzResult<bool> {
        check_values(&rule.to_params())?;
        let mut enforcer = self.enforcer.write().await;
        let removed = enforcer
            .remove_policy(rule.to_params())
            .await
            .map_err(store_error("remove_policy"))?;
        if removed {
            save(&mut enforcer).await?;
        }
        Ok(removed)
    }

    /// Policy rules, skipping rows that do not parse.
    pub async fn policies(&self) -> Vec<PolicyRule> {
        self.enforcer
            .read()
            .await
            .get_policy()
            .iter()
            .filter_map(|row| PolicyRule::from_params(row))
            .collect()
    }

    /// Role groupings, skipping rows that do not parse.
    pub async fn role_groupings(&self) -> Vec<GroupingRule> {
        self.enforcer
            .read()
            .await
            .get_named_grouping_policy(ROLE_GROUPING_PTYPE)
            .iter()
            .filter_map(|row| GroupingRule::from_params(ROLE_GROUPING_PTYPE, row))
            .collect()
    }

    /// Customer groupings, skipping rows that do not parse.
    pub async fn customer_groupings(&self) -> Vec<GroupingRule> {
        self.enforcer
            .read()
            .await
            .get_named_grouping_policy(CUSTOMER_GROUPING_PTYPE)
            .iter()
            .filter_map(|row| GroupingRule::from_params(CUSTOMER_GROUPING_PTYPE, row))
            .collect()
    }

    /// Role groupings followed by customer groupings.
    pub async fn groupings(&self) -> Vec<GroupingRule> {
        let mut groupings = self.role_groupings().await;
        groupings.extend(self.customer_groupings().await);
        groupings
    }

    /// Every persisted row, including rows that do not parse.
    pub async fn raw_rows(&self) -> Vec<StoredRow> {
        let enforcer = self.enforcer.read().await;
        rows_of(&enforcer)
    }

    /// Roles the subject is grouped into.
    pub async fn roles_for(&self, subject: &str) -> Vec<Role> {
        self.role_groupings()
            .await
            .into_iter()
            .filter_map(|rule| match rule {
                GroupingRule::Role { subject: s, role } if s == subject => Some(role),
                _ => None,
            })
            .collect()
    }

    /// Customers the subject is grouped with.
    pub async fn customers_for(&self, subject: &str) -> Vec<i64> {
        self.customer_groupings()
            .await
            .into_iter()
            .filter_map(|rule| match rule {
                GroupingRule::Customer {
                    subject: s,
                    customer_id,
                } if s == subject => Some(customer_id),
                _ => None,
            })
            .collect()
    }

    /// Make `role` the subject's only role grouping.
    pub async fn replace_role(&self, subject: &str, role: Role) -> AuthzResult<()> {
        self.set_roles(subject, &[role]).await
    }

    /// Replace all of the subject's role groupings with `roles`.
    ///
    /// Old groupings are removed before new ones are added, under one write
    /// lock.
    pub async fn set_roles(&self, subject: &str, roles: &[Role]) -> AuthzResult<()> {
        check_value(subject)?;
        let mut enforcer = self.enforcer.write().await;

        let existing: Vec<Vec<String>> = enforcer
            .get_named_grouping_policy(ROLE_GROUPING_PTYPE)
            .into_iter()
            .filter(|row| row.first().map(String::as_str) == Some(subject))
            .collect();
        for row in existing {
            enforcer
                .remove_named_grouping_policy(ROLE_GROUPING_PTYPE, row)
                .await
                .map_err(store_error("remove_role_grouping"))?;
        }
        for role in roles {
            enforcer
                .add_named_grouping_policy(
                    ROLE_GROUPING_PTYPE,
                    GroupingRule::role(subject, *role).to_params(),
                )
                .await
                .map_err(store_error("add_role_grouping"))?;
        }

        save(&mut enforcer).await?;
        debug!(subject = %subject, roles = ?roles, "Role groupings replaced");
        Ok(())
    }

    /// Group the subject with a customer.
    ///
    /// # Returns
    ///
    /// `false` if the grouping already existed
    pub async fn add_customer_grouping(&self, subject: &str, customer_id: i64) -> AuthzResult<bool> {
        check_value(subject)?;
        let mut enforcer = self.enforcer.write().await;
        let added = enforcer
            .add_named_grouping_policy(
                CUSTOMER_GROUPING_PTYPE,
                GroupingRule::customer(subject, customer_id).to_params(),
            )
            .await
            .map_err(store_error("add_customer_grouping"))?;
        if added {
            save(&mut enforcer).await?;
        }
        Ok(added)
    }

    /// Remove a customer grouping.
    ///
    /// # Returns
    ///
    /// `false` if the grouping did not exist
    pub async fn remove_customer_grouping(
        &self,
        subject: &str,
        customer_id: i64,
    ) -> AuthzResult<bool> {
        check_value(subject)?;
        let mut enforcer = self.enforcer.write().await;
        let removed = enforcer
            .remove_named_grouping_policy(
                CUSTOMER_GROUPING_PTYPE,
                GroupingRule::customer(subject, customer_id).to_params(),
            )
            .await
            .map_err(store_error("remove_customer_grouping"))?;
        if removed {
            save(&mut enforcer).await?;
        }
        Ok(removed)
    }

    /// Replace every policy rule, leaving groupings untouched.
    ///
    /// # Returns
    ///
    /// Number of rules installed
    pub async fn replace_policies(&self, rules: &[PolicyRule]) -> AuthzResult<usize> {
        for rule in rules {
            check_values(&rule.to_params())?;
        }
        let mut enforcer = self.enforcer.write().await;
        remove_rows(&mut enforcer, |row| row.is_policy()).await?;

        let mut installed = 0;
        for rule in rules {
            if enforcer
                .add_policy(rule.to_params())
                .await
                .map_err(store_error("add_policy"))?
            {
                installed += 1;
            }
        }

        save(&mut enforcer).await?;
        Ok(installed)
    }

    /// Replace the whole rule set with `rows`.
    ///
    /// # Returns
    ///
    /// Rows actually installed; duplicates in `rows` count once
    pub async fn replace_all(&self, rows: &[StoredRow]) -> AuthzResult<InstalledRows> {
        for row in rows {
            row.check()?;
        }
        let mut enforcer = self.enforcer.write().await;
        remove_rows(&mut enforcer, |_| true).await?;

        let mut installed = InstalledRows::default();
        for row in rows {
            let added = if row.is_policy() {
                enforcer.add_policy(row.params.clone()).await
            } else {
                enforcer
                    .add_named_grouping_policy(&row.ptype, row.params.clone())
                    .await
            };
            if added.map_err(store_error("replace_all"))? {
                if row.is_policy() {
                    installed.policies += 1;
                } else {
                    installed.groupings += 1;
                }
            }
        }

        save(&mut enforcer).await?;
        info!(
            policies = installed.policies,
            groupings = installed.groupings,
            "Policy set replaced"
        );
        Ok(installed)
    }

    /// Remove every rule and grouping.
    pub async fn clear(&self) -> AuthzResult<()> {
        let mut enforcer = self.enforcer.write().await;
        remove_rows(&mut enforcer, |_| true).await?;
        save(&mut enforcer).await
    }

    /// Re-read the persisted rules.
    ///
    /// Makes writes by other processes sharing the policy file visible.
    pub async fn reload(&self) -> AuthzResult<()> {
        let mut enforcer = self.enforcer.write().await;
        enforcer
            .load_policy()
            .await
            .map_err(store_error("reload"))?;
        debug!(policies = enforcer.get_policy().len(), "Policy store reloaded");
        Ok(())
    }
}

fn rows_of(enforcer: &Enforcer) -> Vec<StoredRow> {
    let policies = enforcer
        .get_policy()
        .into_iter()
        .map(|params| StoredRow::new(POLICY_PTYPE, params));
    let groupings = [ROLE_GROUPING_PTYPE, CUSTOMER_GROUPING_PTYPE]
        .into_iter()
        .flat_map(|ptype| {
            enforcer
                .get_named_grouping_policy(ptype)
                .into_iter()
                .map(move |params| StoredRow::new(ptype, params))
        });
    policies.chain(groupings).collect()
}

async fn remove_rows(
    enforcer: &mut Enforcer,
    selected: impl Fn(&StoredRow) -> bool,
) -> AuthzResult<()> {
    let rows: Vec<StoredRow> = rows_of(enforcer).into_iter().filter(|row| selected(row)).collect();
    for row in rows {
        let removed = if row.is_policy() {
            enforcer.remove_policy(row.params).await
        } else {
            enforcer
                .remove_named_grouping_policy(&row.ptype, row.params)
                .await
        };
        removed.map_err(store_error("remove_rows"))?;
    }
    Ok(())
}

async fn save(enforcer: &mut Enforcer) -> AuthzResult<()> {
    enforcer.save_policy().await.map_err(store_error("save"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_policy_is_idempotent() {
        let store = PolicyStore::in_memory().await.unwrap();
        let rule = PolicyRule::allow("salesman", "configuration", "read");

        assert!(store.add_policy(&rule).await.unwrap());
        assert!(!store.add_policy(&rule).await.unwrap());
        assert_eq!(store.policies().await, vec![rule.clone()]);

        assert!(store.remove_policy(&rule).await.unwrap());
        assert!(!store.remove_policy(&rule).await.unwrap());
        assert!(store.policies().await.is_empty());
    }

    #[tokio::test]
    async fn test_enforce_by_role_name_and_grouping() {
        let store = PolicyStore::in_memory().await.unwrap();
        store
            .add_policy(&PolicyRule::allow("salesman", "quote", "*"))
            .await
            .unwrap();

        // Role carried in the request.
        assert!(store.enforce("a@example.com", "salesman", "quote", "update").await.unwrap());
        assert!(!store.enforce("a@example.com", "customer", "quote", "update").await.unwrap());

        // Role reached through a grouping.
        store.replace_role("b@example.com", Role::Salesman).await.unwrap();
        assert!(store.enforce("b@example.com", "customer", "quote", "read").await.unwrap());
        assert!(!store.enforce("b@example.com", "customer", "order", "read").await.unwrap());
    }

    #[tokio::test]
    async fn test_wildcards_and_deny_override() {
        let store = PolicyStore::in_memory().await.unwrap();
        store.add_policy(&PolicyRule::allow("*", "catalog", "read")).await.unwrap();
        store.add_policy(&PolicyRule::allow("partner", "*", "*")).await.unwrap();
        store
            .add_policy(&PolicyRule::deny("p@example.com", "order", "delete"))
            .await
            .unwrap();

        assert!(store.enforce("x@example.com", "customer", "catalog", "read").await.unwrap());
        assert!(store.enforce("q@example.com", "partner", "order", "delete").await.unwrap());
        assert!(!store.enforce("p@example.com", "partner", "order", "delete").await.unwrap());
        assert!(store.enforce("p@example.com", "partner", "order", "read").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_role_keeps_one_grouping() {
        let store = PolicyStore::in_memory().await.unwrap();
        store.replace_role("a@example.com", Role::Customer).await.unwrap();
        store.replace_role("a@example.com", Role::Partner).await.unwrap();
        store.replace_role("b@example.com", Role::Salesman).await.unwrap();

        assert_eq!(store.roles_for("a@example.com").await, vec![Role::Partner]);
        assert_eq!(store.role_groupings().await.len(), 2);

        store.set_roles("a@example.com", &[]).await.unwrap();
        assert!(store.roles_for("a@example.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_customer_groupings() {
        let store = PolicyStore::in_memory().await.unwrap();
        assert!(store.add_customer_grouping("s@example.com", 3).await.unwrap());
        assert!(store.add_customer_grouping("s@example.com", 5).await.unwrap());
        assert!(!store.add_customer_grouping("s@example.com", 5).await.unwrap());

        let mut customers = store.customers_for("s@example.com").await;
        customers.sort_unstable();
        assert_eq!(customers, vec![3, 5]);

        assert!(store.remove_customer_grouping("s@example.com", 3).await.unwrap());
        assert!(!store.remove_customer_grouping("s@example.com", 3).await.unwrap());
        assert_eq!(store.customers_for("s@example.com").await, vec![5]);
    }

    #[tokio::test]
    async fn test_replace_all_and_clear() {
        let store = PolicyStore::in_memory().await.unwrap();
        store.add_policy(&PolicyRule::allow("customer", "quote", "read")).await.unwrap();
        store.replace_role("a@example.com", Role::Customer).await.unwrap();

        let rows = vec![
            StoredRow::policy(&PolicyRule::allow("partner", "*", "*")),
            StoredRow::grouping(&GroupingRule::role("b@example.com", Role::Partner)),
            StoredRow::grouping(&GroupingRule::customer("b@example.com", 9)),
        ];
        let mut doubled = rows.clone();
        doubled.push(rows[0].clone());
        let installed = store.replace_all(&doubled).await.unwrap();
        assert_eq!(installed, InstalledRows { policies: 1, groupings: 2 });

        let mut stored = store.raw_rows().await;
        stored.sort();
        let mut expected = rows.clone();
        expected.sort();
        assert_eq!(stored, expected);

        store.clear().await.unwrap();
        assert!(store.raw_rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_replace_policies_keeps_groupings() {
        let store = PolicyStore::in_memory().await.unwrap();
        store.add_policy(&PolicyRule::allow("customer", "order", "*")).await.unwrap();
        store.replace_role("a@example.com", Role::Customer).await.unwrap();

        let installed = store
            .replace_policies(&[PolicyRule::allow("superadmin", "*", "*")])
            .await
            .unwrap();
        assert_eq!(installed, 1);
        assert_eq!(store.policies().await, vec![PolicyRule::allow("superadmin", "*", "*")]);
        assert_eq!(store.roles_for("a@example.com").await, vec![Role::Customer]);
    }

    #[tokio::test]
    async fn test_values_that_break_columns_are_rejected() {
        let store = PolicyStore::in_memory().await.unwrap();
        store.add_policy(&PolicyRule::allow("partner", "quote", "read")).await.unwrap();

        for rule in [
            PolicyRule::allow("salesman", "quote,order", "read"),
            PolicyRule::allow("salesman", "quote\norder", "read"),
            PolicyRule::allow(" salesman", "quote", "read"),
            PolicyRule::allow("salesman", "", "read"),
            PolicyRule::allow("salesman", "\"quote\"", "read"),
        ] {
            let err = store.add_policy(&rule).await.unwrap_err();
            assert!(matches!(err, AuthzError::InvalidPolicy { .. }), "{rule:?}");
            assert!(store.remove_policy(&rule).await.is_err());
        }
        assert!(store.replace_role("a,b@example.com", Role::Partner).await.is_err());
        assert!(store.add_customer_grouping("a@example.com\n", 3).await.is_err());

        let bad = StoredRow::new("p", vec!["a".into(), "b, c".into(), "d".into(), "allow".into()]);
        assert!(store.replace_all(&[bad]).await.is_err());
        assert_eq!(store.policies().await, vec![PolicyRule::allow("partner", "quote", "read")]);
        assert!(store.role_groupings().await.is_empty());
    }

    #[test]
    fn test_check_value() {
        assert!(check_value("a@example.com").is_ok());
        assert!(check_value("*").is_ok());
        let err = check_value("x, y").unwrap_err();
        assert_eq!(err.to_string(), "Invalid policy value \"x, y\": contains a comma");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_row_line_syntax() {
        let row = StoredRow::grouping(&GroupingRule::customer("a@example.com", 4));
        assert_eq!(row.to_line(), "g2, a@example.com, customer, 4");
    }
}
