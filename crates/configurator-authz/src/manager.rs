//! # Policy administration
//!
//! Mutates and inspects the policy store outside the hot authorization
//! path. Every successful mutation is audited and clears the decision cache
//! of the wrapped service.
//!
//! Backups are full point-in-time exports; restoring one replaces the whole
//! policy set and cannot be undone.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use configurator_rbac::{
    Effect, GroupingRule, PolicyRule, Role, User, CUSTOMER_GROUPING_PTYPE, POLICY_PTYPE,
    ROLE_GROUPING_PTYPE, WILDCARD,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::audit::{record_quietly, AuditAction};
use crate::error::{AuthzError, AuthzResult};
use crate::policy_store::StoredRow;
use crate::service::RbacService;

/// Keys a restore payload must carry.
const BACKUP_KEYS: [&str; 3] = ["timestamp", "policies", "grouping_policies"];

/// Listing of the current policy set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicySummary {
    /// Number of permission rules
    pub total_policies: usize,
    /// Number of role groupings
    pub total_role_assignments: usize,
    /// Number of customer groupings
    pub total_customer_assignments: usize,
    /// Permission rules
    pub policies: Vec<PolicyRule>,
    /// Role groupings
    pub role_assignments: Vec<GroupingRule>,
    /// Customer groupings
    pub customer_assignments: Vec<GroupingRule>,
}

/// Backup metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupMetadata {
    /// Number of permission rows
    pub total_policies: usize,
    /// Number of grouping rows
    pub total_grouping_policies: usize,
    /// SHA-256 (hex) of the canonical rows
    pub checksum: String,
}

/// Full export of the policy set.
///
/// Policy rows hold `[subject, resource, action, effect]`; grouping rows
/// keep their type tag first (`["g", subject, role]` or
/// `["g2", subject, "customer", id]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyBackup {
    /// Export time
    pub timestamp: DateTime<Utc>,
    /// Permission rows
    pub policies: Vec<Vec<String>>,
    /// Grouping rows
    pub grouping_policies: Vec<Vec<String>>,
    /// Counts and checksum
    pub metadata: BackupMetadata,
}

/// Result of a restore.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Permission rows installed
    pub policies_restored: usize,
    /// Grouping rows installed
    pub grouping_policies_restored: usize,
}

/// Cardinality statistics of the policy set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyStatistics {
    pub total_policies: usize,
    pub total_role_assignments: usize,
    pub total_customer_assignments: usize,
    pub unique_subjects: usize,
    pub unique_resources: usize,
    /// Role groupings per role name
    pub role_assignment_counts: BTreeMap<String, usize>,
}

/// Outcome of [`PolicyManager::validate_policies`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationReport {
    /// `true` when no issue was found; warnings do not invalidate
    pub valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub statistics: PolicyStatistics,
}

/// Administrative facade over the policy store.
#[derive(Debug, Clone)]
pub struct PolicyManager {
    service: RbacService,
}

impl PolicyManager {
    /// Create a manager over a service.
    pub fn new(service: RbacService) -> Self {
        Self { service }
    }

    /// The wrapped service.
    pub fn service(&self) -> &RbacService {
        &self.service
    }

    async fn audit(&self, action: AuditAction, payload: Value) {
        record_quietly(self.service.audit_sink(), action, payload).await;
    }

    /// Add a policy rule.
    ///
    /// # Returns
    ///
    /// `false` if the rule already existed
    pub async fn add_policy(
        &self,
        subject: &str,
        resource: &str,
        action: &str,
        effect: Effect,
    ) -> AuthzResult<bool> {
        let rule = PolicyRule::new(subject, resource, action, effect);
        let added = self.service.store().add_policy(&rule).await?;
        if added {
            info!(subject, resource, action, effect = %effect, "Policy added");
            self.audit(AuditAction::PolicyAdded, json!(rule)).await;
            self.service.clear_cache().await;
        }
        Ok(added)
    }

    /// Remove a policy rule.
    ///
    /// # Returns
    ///
    /// `false` if the rule did not exist
    pub async fn remove_policy(
        &self,
        subject: &str,
        resource: &str,
        action: &str,
        effect: Effect,
    ) -> AuthzResult<bool> {
        let rule = PolicyRule::new(subject, resource, action, effect);
        let removed = self.service.store().remove_policy(&rule).await?;
        if removed {
            info!(subject, resource, action, effect = %effect, "Policy removed");
            self.audit(AuditAction::PolicyRemoved, json!(rule)).await;
            self.service.clear_cache().await;
        }
        Ok(removed)
    }

    async fn customer_exists(&self, customer_id: i64) -> AuthzResult<bool> {
        let customer = self
            .service
            .directories()
            .customers
            .find_by_id(customer_id)
            .await?;
        Ok(customer.is_some())
    }

    /// Let a principal act for a customer.
    ///
    /// # Returns
    ///
    /// `false` if the customer does not exist or the grouping already existed
    pub async fn assign_customer_to_user(&self, email: &str, customer_id: i64) -> AuthzResult<bool> {
        if !self.customer_exists(customer_id).await? {
            warn!(subject = %email, customer_id, "Cannot assign unknown customer");
            return Ok(false);
        }

        let added = self
            .service
            .store()
            .add_customer_grouping(email, customer_id)
            .await?;
        if added {
            info!(subject = %email, customer_id, "Customer assigned");
            self.audit(
                AuditAction::CustomerAssigned,
                json!({"subject": email, "customer_id": customer_id}),
            )
            .await;
            self.service.clear_cache().await;
        }
        Ok(added)
    }

    /// Withdraw a customer grouping.
    ///
    /// # Returns
    ///
    /// `false` if the customer or the grouping does not exist
    pub async fn remove_customer_assignment(
        &self,
        email: &str,
        customer_id: i64,
    ) -> AuthzResult<bool> {
        if !self.customer_exists(customer_id).await? {
            return Ok(false);
        }

        let removed = self
            .service
            .store()
            .remove_customer_grouping(email, customer_id)
            .await?;
        if removed {
            info!(subject = %email, customer_id, "Customer unassigned");
            self.audit(
                AuditAction::CustomerUnassigned,
                json!({"subject": email, "customer_id": customer_id}),
            )
            .await;
            self.service.clear_cache().await;
        }
        Ok(removed)
    }

    /// Give a principal a new role in the policy store and the user table.
    ///
    /// # Errors
    ///
    /// [`AuthzError::UserNotFound`] if no user has this email.
    pub async fn assign_role_to_user(&self, email: &str, role: Role) -> AuthzResult<User> {
        let user = self
            .service
            .directories()
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthzError::UserNotFound(email.to_string()))?;

        let updated = self.service.assign_role_to_user(&user, role).await?;
        self.audit(
            AuditAction::RoleAssigned,
            json!({"subject": email, "from": user.role.as_str(), "to": role.as_str()}),
        )
        .await;
        Ok(updated)
    }

    /// List the current policy set.
    pub async fn get_policy_summary(&self) -> PolicySummary {
        let store = self.service.store();
        let policies = store.policies().await;
        let role_assignments = store.role_groupings().await;
        let customer_assignments = store.customer_groupings().await;

        PolicySummary {
            total_policies: policies.len(),
            total_role_assignments: role_assignments.len(),
            total_customer_assignments: customer_assignments.len(),
            policies,
            role_assignments,
            customer_assignments,
        }
    }

    /// Export every row of the policy set.
    pub async fn backup_policies(&self) -> PolicyBackup {
        let rows = self.service.store().raw_rows().await;
        let checksum = checksum(&rows);

        let mut policies: Vec<Vec<String>> = Vec::new();
        let mut grouping_policies: Vec<Vec<String>> = Vec::new();
        for row in rows {
            if row.is_policy() {
                policies.push(row.params);
            } else {
                grouping_policies.push(std::iter::once(row.ptype).chain(row.params).collect());
            }
        }

        info!(
            policies = policies.len(),
            groupings = grouping_policies.len(),
            "Policy backup created"
        );
        PolicyBackup {
            timestamp: Utc::now(),
            metadata: BackupMetadata {
                total_policies: policies.len(),
                total_grouping_policies: grouping_policies.len(),
                checksum,
            },
            policies,
            grouping_policies,
        }
    }

    /// Replace the whole policy set with a backup.
    ///
    /// The payload is fully validated before anything is changed. Once
    /// applied, the previous policy set is gone.
    ///
    /// # Errors
    ///
    /// [`AuthzError::InvalidBackup`] for a missing key, a malformed row, a
    /// value the policy file cannot hold or a
    /// checksum mismatch.
    pub async fn restore_policies(&self, backup: &Value) -> AuthzResult<RestoreSummary> {
        let rows = parse_backup(backup)?;

        warn!(rows = rows.len(), "Replacing the entire policy set from backup");
        let installed = self.service.store().replace_all(&rows).await?;
        self.audit(
            AuditAction::PoliciesRestored,
            json!({
                "timestamp": backup.get("timestamp"),
                "policies": installed.policies,
                "grouping_policies": installed.groupings,
            }),
        )
        .await;
        self.service.clear_cache().await;

        Ok(RestoreSummary {
            policies_restored: installed.policies,
            grouping_policies_restored: installed.groupings,
        })
    }

    /// Check the policy set for conflicts and suspicious assignments.
    ///
    /// Conflicts are reported, never resolved.
    pub async fn validate_policies(&self) -> ValidationReport {
        let rows = self.service.store().raw_rows().await;
        let mut report = ValidationReport::default();

        let mut effects: BTreeMap<(&str, &str, &str), BTreeSet<&str>> = BTreeMap::new();
        let mut policy_subjects = BTreeSet::new();
        let mut resources = BTreeSet::new();
        let mut roles_by_subject: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut customers_by_subject: BTreeMap<&str, usize> = BTreeMap::new();
        let stats = &mut report.statistics;

        for row in &rows {
            match (row.ptype.as_str(), row.params.as_slice()) {
                (POLICY_PTYPE, [subject, resource, action, effect]) => {
                    stats.total_policies += 1;
                    policy_subjects.insert(subject.as_str());
                    resources.insert(resource.as_str());
                    effects
                        .entry((subject.as_str(), resource.as_str(), action.as_str()))
                        .or_default()
                        .insert(effect.as_str());
                    if Effect::parse(effect).is_none() {
                        report.warnings.push(format!(
                            "Unknown effect '{effect}' for ({subject}, {resource}, {action})"
                        ));
                    }
                }
                (ROLE_GROUPING_PTYPE, [subject, role]) => {
                    stats.total_role_assignments += 1;
                    *stats.role_assignment_counts.entry(role.clone()).or_default() += 1;
                    roles_by_subject.entry(subject.as_str()).or_default().push(role.as_str());
                }
                (CUSTOMER_GROUPING_PTYPE, [subject, ..]) => {
                    stats.total_customer_assignments += 1;
                    *customers_by_subject.entry(subject.as_str()).or_default() += 1;
                }
                _ => report
                    .warnings
                    .push(format!("Malformed row: {}", row.to_line())),
            }
        }
        stats.unique_subjects = policy_subjects.len();
        stats.unique_resources = resources.len();

        for ((subject, resource, action), found) in &effects {
            if found.len() > 1 {
                let found: Vec<&str> = found.iter().copied().collect();
                report.issues.push(format!(
                    "Conflicting effects for ({subject}, {resource}, {action}): {}",
                    found.join(", ")
                ));
            }
        }

        let wildcard_subject = policy_subjects.contains(WILDCARD);
        for (subject, roles) in &roles_by_subject {
            if roles.len() > 1 {
                report.warnings.push(format!(
                    "{subject} holds {} role groupings: {}",
                    roles.len(),
                    roles.join(", ")
                ));
            }
            for role in roles {
                if !wildcard_subject && !policy_subjects.contains(role) {
                    report
                        .warnings
                        .push(format!("{subject} is grouped into role '{role}' which has no policy"));
                }
            }
        }

        for (subject, count) in &customers_by_subject {
            let fans_out = roles_by_subject
                .get(subject)
                .into_iter()
                .flatten()
                .filter_map(|role| Role::parse(role))
                .any(|role| role.acts_for_customers());
            if *count > 1 && !fans_out {
                report.warnings.push(format!(
                    "{subject} is grouped with {count} customers but holds no role acting for customers"
                ));
            }
        }

        report.valid = report.issues.is_empty();
        report
    }

    /// Install the bootstrap rule set, replacing every existing rule.
    ///
    /// Staff roles get unrestricted access and customers may read and
    /// create configurations and quotes. Groupings are kept. Meant for first
    /// start only; narrow the grants once real rules exist.
    ///
    /// # Returns
    ///
    /// Number of rules installed
    pub async fn seed_initial_policies(&self) -> AuthzResult<usize> {
        let rules = initial_policies();
        let installed = self.service.store().replace_policies(&rules).await?;

        info!(rules = installed, "Initial policies seeded");
        self.audit(AuditAction::PoliciesSeeded, json!({"rules": installed}))
            .await;
        self.service.clear_cache().await;
        Ok(installed)
    }
}

/// The bootstrap rule set.
pub fn initial_policies() -> Vec<PolicyRule> {
    let staff = [Role::Superadmin, Role::Salesman, Role::DataEntry, Role::Partner]
        .into_iter()
        .map(|role| PolicyRule::allow(role.as_str(), WILDCARD, WILDCARD));
    let customer = ["configuration", "quote"].into_iter().flat_map(|resource| {
        ["read", "create"]
            .into_iter()
            .map(move |action| PolicyRule::allow(Role::Customer.as_str(), resource, action))
    });
    staff.chain(customer).collect()
}

fn checksum(rows: &[StoredRow]) -> String {
    let mut lines: Vec<String> = rows.iter().map(StoredRow::to_line).collect();
    lines.sort();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

fn string_rows(backup: &Value, key: &str) -> AuthzResult<Vec<Vec<String>>> {
    let rows = backup
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| AuthzError::InvalidBackup(format!("'{key}' must be an array")))?;

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            row.as_array()
                .and_then(|values| {
                    values
                        .iter()
                        .map(|v| v.as_str().map(str::to_string))
                        .collect::<Option<Vec<String>>>()
                })
                .ok_or_else(|| {
                    AuthzError::InvalidBackup(format!("{key}[{index}] must be an array of strings"))
                })
        })
        .collect()
}

fn parse_backup(backup: &Value) -> AuthzResult<Vec<StoredRow>> {
    if !backup.is_object() {
        return Err(AuthzError::InvalidBackup("backup must be an object".to_string()));
    }
    let missing: Vec<&str> = BACKUP_KEYS
        .into_iter()
        .filter(|key| backup.get(*key).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(AuthzError::InvalidBackup(format!(
            "missing keys: {}",
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for (index, params) in string_rows(backup, "policies")?.into_iter().enumerate() {
        if params.len() != 4 {
            return Err(AuthzError::InvalidBackup(format!(
                "policies[{index}] must have 4 values, found {}",
                params.len()
            )));
        }
        rows.push(StoredRow::new(POLICY_PTYPE, params));
    }
    for (index, mut params) in string_rows(backup, "grouping_policies")?
        .into_iter()
        .enumerate()
    {
        let arity = match params.first().map(String::as_str) {
            Some(ROLE_GROUPING_PTYPE) => 3,
            Some(CUSTOMER_GROUPING_PTYPE) => 4,
            _ => {
                return Err(AuthzError::InvalidBackup(format!(
                    "grouping_policies[{index}] has an unknown type"
                )))
            }
        };
        if params.len() != arity {
            return Err(AuthzError::InvalidBackup(format!(
                "grouping_policies[{index}] must have {arity} values, found {}",
                params.len()
            )));
        }
        let ptype = params.remove(0);
        rows.push(StoredRow::new(ptype, params));
    }

    for row in &rows {
        row.check()
            .map_err(|err| AuthzError::InvalidBackup(format!("{} row: {err}", row.ptype)))?;
    }

    if let Some(expected) = backup.pointer("/metadata/checksum").and_then(Value::as_str) {
        if checksum(&rows) != expected {
            return Err(AuthzError::InvalidBackup("checksum mismatch".to_string()));
        }
    }
    Ok(rows)
}
