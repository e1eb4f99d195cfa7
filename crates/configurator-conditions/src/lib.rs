//! # Configurator Conditions
//!
//! Evaluator for the display conditions attached to configurator form
//! attributes. A condition decides whether a field is shown for the current
//! form values; the form client evaluates the same conditions, so both sides
//! are held to one shared vector suite.
//!
//! ## Overview
//!
//! - **Operators**: eighteen leaf operators plus `and`, `or` and `not`
//! - **Conditions**: a typed AST parsed once from the JSON wire format
//! - **Evaluation**: pure and deterministic over a JSON context with
//!   dot-path field lookup
//! - **Visibility**: bulk evaluation that keeps a form usable when one
//!   stored rule is broken
//! - **Vectors**: golden (condition, context, expected) triples
//!
//! ## Usage
//!
//! ```rust
//! use configurator_conditions::{Condition, ConditionEvaluator, Operator};
//! use serde_json::json;
//!
//! let evaluator = ConditionEvaluator::new();
//! let condition = Condition::And(vec![
//!     Condition::leaf(Operator::Equals, "type", "Window"),
//!     Condition::leaf(Operator::GreaterThan, "width", 40),
//! ]);
//!
//! assert!(evaluator.evaluate(&condition, &json!({"type": "Window", "width": 120})));
//! assert!(!evaluator.evaluate(&condition, &json!({"type": "Window"})));
//! ```

pub mod condition;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod operator;
pub mod value;
pub mod vectors;
pub mod visibility;

pub use condition::Condition;
pub use context::resolve_field;
pub use error::{ConditionError, ConditionResult};
pub use evaluator::ConditionEvaluator;
pub use operator::{Operator, AND, NOT, OR};
pub use vectors::{golden_vectors, golden_vectors_json, Expectation, GoldenVector};
pub use visibility::evaluate_visibility;
