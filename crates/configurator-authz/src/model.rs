//! Embedded policy model.
//!
//! Requests carry the principal's email and its role name. A rule applies
//! when its subject is the email, a role the email is grouped into, the
//! request's role, or `*`. Any matching deny overrides every allow.

use std::path::Path;

use casbin::DefaultModel;

use crate::error::{AuthzError, AuthzResult};

const MODEL: &str = r#"
[request_definition]
r = sub, role, obj, act

[policy_definition]
p = sub, obj, act, eft

[role_definition]
g = _, _
g2 = _, _, _

[policy_effect]
e = some(where (p.eft == allow)) && !some(where (p.eft == deny))

[matchers]
m = (g(r.sub, p.sub) || r.role == p.sub || p.sub == "*") && (r.obj == p.obj || p.obj == "*") && (r.act == p.act || p.act == "*")
"#;

/// Text of the embedded model.
pub fn model_string() -> &'static str {
    MODEL
}

/// Load the embedded model, or the model file when one is given.
///
/// # Errors
///
/// [`AuthzError::PolicyStore`] if the model does not parse.
pub async fn load_model(model_file: Option<&Path>) -> AuthzResult<DefaultModel> {
    let loaded = match model_file {
        Some(path) => DefaultModel::from_file(path).await,
        None => DefaultModel::from_str(MODEL).await,
    };
    loaded.map_err(|source| AuthzError::PolicyStore {
        operation: "load_model",
        source,
    })
}
