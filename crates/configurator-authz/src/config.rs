//! Authorization configuration.
//!
//! Loaded from environment variables with defaults suitable for local
//! development.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, AuthzResult};

/// Authorization configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Row-per-rule policy file.
    pub policy_file: PathBuf,

    /// Policy model file; the embedded model is used when `None`.
    pub model_file: Option<PathBuf>,

    /// Customer type given to auto-provisioned customers.
    pub default_customer_type: String,

    /// Whether customer groupings (`g2` rows) widen a principal's accessible
    /// customers beyond the email-matched row.
    pub customer_grouping_fanout: bool,
}

impl Default for AuthzConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            policy_file: PathBuf::from("config/rbac_policy.csv"),
            model_file: None,
            default_customer_type: "residential".to_string(),
            customer_grouping_fanout: true,
        }
    }
}

impl AuthzConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CONFIGURATOR_POLICY_FILE`: policy rows (default: config/rbac_policy.csv)
    /// - `CONFIGURATOR_POLICY_MODEL`: model file (default: embedded model)
    /// - `CONFIGURATOR_DEFAULT_CUSTOMER_TYPE`: type of auto-provisioned customers (default: residential)
    /// - `CONFIGURATOR_CUSTOMER_GROUPING_FANOUT`: honor customer groupings (default: true)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            policy_file: std::env::var("CONFIGURATOR_POLICY_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.policy_file),
            model_file: std::env::var("CONFIGURATOR_POLICY_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            default_customer_type: std::env::var("CONFIGURATOR_DEFAULT_CUSTOMER_TYPE")
                .unwrap_or(default.default_customer_type),
            customer_grouping_fanout: std::env::var("CONFIGURATOR_CUSTOMER_GROUPING_FANOUT")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.customer_grouping_fanout),
        }
    }

    /// Use a different policy file.
    pub fn with_policy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_file = path.into();
        self
    }

    /// Enable or disable customer grouping fan-out.
    pub fn with_customer_grouping_fanout(mut self, enabled: bool) -> Self {
        self.customer_grouping_fanout = enabled;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// [`AuthzError::Config`] for an empty policy path or customer type.
    pub fn validate(&self) -> AuthzResult<()> {
        if self.policy_file.as_os_str().is_empty() {
            return Err(AuthzError::Config("policy file path is empty".to_string()));
        }
        if self.default_customer_type.trim().is_empty() {
            return Err(AuthzError::Config(
                "default customer type is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthzConfig::default();
        assert_eq!(config.policy_file, PathBuf::from("config/rbac_policy.csv"));
        assert_eq!(config.default_customer_type, "residential");
        assert!(config.customer_grouping_fanout);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let config = AuthzConfig::default().with_policy_file("");
        assert!(matches!(config.validate(), Err(AuthzError::Config(_))));

        let config = AuthzConfig {
            default_customer_type: " ".to_string(),
            ..AuthzConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
