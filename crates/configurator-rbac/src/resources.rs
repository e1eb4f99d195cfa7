//! # Resource Types
//!
//! Resource types whose instances belong to a customer. These are the types
//! an ownership check can resolve; every other policy resource (templates,
//! manufacturing types, ...) is coarse-grained and only appears in rules.

use serde::{Deserialize, Serialize};

/// Resource types that can be checked for customer ownership.
///
/// Owning customers are resolved as follows:
/// - **Customer**: the instance is the customer itself
/// - **Configuration**, **Quote**: one hop, via the instance's customer id
/// - **Order**: two hops, through the quote the order was placed from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Customer records.
    Customer,
    /// Product configurations built for a customer.
    Configuration,
    /// Quotes issued to a customer.
    Quote,
    /// Orders placed from a quote.
    Order,
}

impl ResourceType {
    /// Get the string representation of the resource type.
    ///
    /// This is also the resource name used in policy rules.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Customer => "customer",
            ResourceType::Configuration => "configuration",
            ResourceType::Quote => "quote",
            ResourceType::Order => "order",
        }
    }

    /// Parse resource type from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, supports plural forms)
    ///
    /// # Returns
    ///
    /// `Some(ResourceType)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use configurator_rbac::ResourceType;
    ///
    /// assert_eq!(ResourceType::parse("quote"), Some(ResourceType::Quote));
    /// assert_eq!(ResourceType::parse("Orders"), Some(ResourceType::Order));
    /// assert_eq!(ResourceType::parse("template"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "customers" => Some(ResourceType::Customer),
            "configuration" | "configurations" | "config" | "configs" => {
                Some(ResourceType::Configuration)
            }
            "quote" | "quotes" => Some(ResourceType::Quote),
            "order" | "orders" => Some(ResourceType::Order),
            _ => None,
        }
    }

    /// Number of lookups needed to reach the owning customer id.
    ///
    /// # Example
    ///
    /// ```
    /// use configurator_rbac::ResourceType;
    ///
    /// assert_eq!(ResourceType::Customer.owner_hops(), 0);
    /// assert_eq!(ResourceType::Order.owner_hops(), 2);
    /// ```
    pub fn owner_hops(&self) -> usize {
        match self {
            ResourceType::Customer => 0,
            ResourceType::Configuration | ResourceType::Quote => 1,
            ResourceType::Order => 2,
        }
    }

    /// Get all resource types.
    pub fn all() -> Vec<Self> {
        vec![
            ResourceType::Customer,
            ResourceType::Configuration,
            ResourceType::Quote,
            ResourceType::Order,
        ]
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
