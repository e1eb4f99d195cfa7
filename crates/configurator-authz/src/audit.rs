//! Audit trail for policy administration and access denials.
//!
//! Recording an entry must never fail the operation being audited: callers
//! go through [`record_quietly`], which logs sink failures and moves on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Audit sink error types.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink cannot accept entries.
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),

    /// The entry could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Audited action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A policy rule was added.
    PolicyAdded,
    /// A policy rule was removed.
    PolicyRemoved,
    /// A customer grouping was added.
    CustomerAssigned,
    /// A customer grouping was removed.
    CustomerUnassigned,
    /// A principal's role was changed.
    RoleAssigned,
    /// The policy set was replaced from a backup.
    PoliciesRestored,
    /// The bootstrap policy set was installed.
    PoliciesSeeded,
    /// A guarded operation was refused.
    AccessDenied,
}

impl AuditAction {
    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PolicyAdded => "policy_added",
            AuditAction::PolicyRemoved => "policy_removed",
            AuditAction::CustomerAssigned => "customer_assigned",
            AuditAction::CustomerUnassigned => "customer_unassigned",
            AuditAction::RoleAssigned => "role_assigned",
            AuditAction::PoliciesRestored => "policies_restored",
            AuditAction::PoliciesSeeded => "policies_seeded",
            AuditAction::AccessDenied => "access_denied",
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    /// Entry id (UUID v7, time ordered).
    pub id: Uuid,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: AuditAction,
    /// Structured details.
    pub payload: Value,
}

impl AuditEntry {
    /// Create an entry stamped now.
    pub fn new(action: AuditAction, payload: Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            action,
            payload,
        }
    }
}

/// Destination of audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an entry.
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Sink that emits entries as tracing events on the `configurator::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let payload = serde_json::to_string(&entry.payload)?;
        tracing::info!(
            target: "configurator::audit",
            audit_id = %entry.id,
            action = entry.action.as_str(),
            payload = %payload,
            "{}",
            entry.action.as_str()
        );
        Ok(())
    }
}

/// Sink that keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
    failing: RwLock<bool>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded entries in order.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    /// Recorded entries for one action.
    pub async fn entries_for(&self, action: AuditAction) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    /// Make every subsequent record call fail.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        if *self.failing.read().await {
            return Err(AuditError::Unavailable("sink is failing".to_string()));
        }
        self.entries.write().await.push(entry.clone());
        Ok(())
    }
}

/// Record an entry, logging instead of propagating sink failures.
pub async fn record_quietly(sink: &Arc<dyn AuditSink>, action: AuditAction, payload: Value) {
    let entry = AuditEntry::new(action, payload);
    if let Err(e) = sink.record(&entry).await {
        tracing::warn!(action = action.as_str(), error = %e, "Failed to record audit entry");
    }
}
