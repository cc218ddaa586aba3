//! IAM policy models

use serde::{Deserialize, Serialize};

/// Role allowing a member to invoke a Cloud Run service
pub const RUN_INVOKER_ROLE: &str = "roles/run.invoker";

/// Special member matching every caller, authenticated or not
pub const ALL_USERS: &str = "allUsers";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl Policy {
    /// Policy granting unauthenticated invoke access
    pub fn public_invoker() -> Self {
        Self {
            bindings: vec![Binding {
                role: RUN_INVOKER_ROLE.to_string(),
                members: vec![ALL_USERS.to_string()],
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetIamPolicyRequest {
    pub policy: Policy,
}
