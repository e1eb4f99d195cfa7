//! Guard evaluation.
//!
//! A [`Guard`] is an ordered OR of requirement groups; each group is an AND
//! of requirements. Groups are tried in declaration order and evaluation
//! stops at the first satisfied one. Superadmins pass every guard.

use std::future::Future;

use configurator_rbac::{Guard, Requirement, RequirementGroup, User, WILDCARD};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::audit::{record_quietly, AuditAction};
use crate::error::{AuthzError, AuthzResult};
use crate::service::RbacService;

impl RbacService {
    /// Evaluate a guard.
    ///
    /// `resource_id` is the target instance for ownership requirements; an
    /// ownership requirement without one is not satisfied.
    pub async fn authorize(
        &self,
        user: &User,
        guard: &Guard,
        resource_id: Option<i64>,
    ) -> AuthzResult<bool> {
        if user.is_superadmin() {
            return Ok(true);
        }

        for (index, group) in guard.groups().iter().enumerate() {
            if self.group_satisfied(user, group, resource_id).await? {
                debug!(subject = %user.email, group = index, "Requirement group satisfied");
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn group_satisfied(
        &self,
        user: &User,
        group: &RequirementGroup,
        resource_id: Option<i64>,
    ) -> AuthzResult<bool> {
        for requirement in group.requirements() {
            if !self
                .requirement_satisfied(user, requirement, resource_id)
                .await?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn requirement_satisfied(
        &self,
        user: &User,
        requirement: &Requirement,
        resource_id: Option<i64>,
    ) -> AuthzResult<bool> {
        match requirement {
            Requirement::Role { roles } => Ok(roles.contains(&user.role)),
            Requirement::Permission { permission } => {
                self.check_permission(user, &permission.resource, &permission.action)
                    .await
            }
            Requirement::Ownership { ownership } => match resource_id {
                Some(id) => self.check_ownership(user, ownership.resource_type, id).await,
                None => {
                    warn!(
                        subject = %user.email,
                        resource_type = %ownership.resource_type,
                        "Ownership required but no resource id given"
                    );
                    Ok(false)
                }
            },
            Requirement::Privilege { privilege } => {
                self.check_privilege(user, privilege, resource_id).await
            }
        }
    }

    /// Evaluate a guard, turning a denial into [`AuthzError::AccessDenied`].
    ///
    /// Denials are logged and sent to the audit sink before returning.
    pub async fn require(
        &self,
        user: &User,
        guard: &Guard,
        resource_id: Option<i64>,
    ) -> AuthzResult<()> {
        if self.authorize(user, guard, resource_id).await? {
            return Ok(());
        }

        let (resource, action) = guard
            .primary_permission()
            .map(|p| (p.resource.clone(), p.action.clone()))
            .unwrap_or_else(|| (WILDCARD.to_string(), WILDCARD.to_string()));

        info!(
            subject = %user.email,
            role = %user.role,
            resource = %resource,
            action = %action,
            resource_id = ?resource_id,
            requirements = %guard.describe(),
            "Access denied"
        );
        record_quietly(
            self.audit_sink(),
            AuditAction::AccessDenied,
            json!({
                "subject": user.email,
                "role": user.role.as_str(),
                "resource": resource,
                "action": action,
                "resource_id": resource_id,
                "requirements": guard.describe(),
            }),
        )
        .await;

        Err(AuthzError::AccessDenied {
            subject: user.email.clone(),
            resource,
            action,
        })
    }

    /// Run `operation` only if the guard passes.
    ///
    /// The operation is never started on denial, so it has no partial side
    /// effects.
    pub async fn guarded<T, F, Fut>(
        &self,
        user: &User,
        guard: &Guard,
        resource_id: Option<i64>,
        operation: F,
    ) -> AuthzResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AuthzResult<T>>,
    {
        self.require(user, guard, resource_id).await?;
        operation().await
    }
}
