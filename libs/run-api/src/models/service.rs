//! Knative Service resource

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "serving.knative.dev/v1";
pub const KIND_SERVICE: &str = "Service";

/// Annotation attaching a revision to a Serverless VPC Access connector
pub const VPC_CONNECTOR_ANNOTATION: &str = "run.googleapis.com/vpc-access-connector";

/// Condition status values reported by the control plane
pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";
pub const CONDITION_UNKNOWN: &str = "Unknown";

/// Condition type that summarises the service as a whole
pub const CONDITION_READY: &str = "Ready";

/// A Cloud Run service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
}

impl Service {
    /// The condition that decides readiness: `Ready` if reported, otherwise the first one
    pub fn ready_condition(&self) -> Option<&Condition> {
        let conditions = &self.status.as_ref()?.conditions;
        conditions
            .iter()
            .find(|c| c.condition_type == CONDITION_READY)
            .or_else(|| conditions.first())
    }

    /// Whether the reported status describes the current generation of the spec
    pub fn status_is_current(&self) -> bool {
        match (self.metadata.generation, self.status.as_ref()) {
            (Some(generation), Some(status)) => status
                .observed_generation
                .map(|observed| observed >= generation)
                .unwrap_or(false),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    /// The public URL, if one has been assigned
    pub fn url(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Object metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Set by the server, never sent
    #[serde(default, skip_serializing)]
    pub generation: Option<i64>,

    #[serde(default, skip_serializing)]
    pub resource_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub template: RevisionTemplate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TemplateMeta>,
    pub spec: RevisionSpec,
}

/// Revision template metadata (annotations only, names are server-assigned)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMeta {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Status reported by the control plane
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    #[serde(default)]
    pub observed_generation: Option<i64>,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub latest_ready_revision_name: Option<String>,

    #[serde(default)]
    pub latest_created_revision_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,

    pub status: String,

    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    pub fn is_unknown(&self) -> bool {
        self.status == CONDITION_UNKNOWN
    }

    pub fn is_true(&self) -> bool {
        self.status == CONDITION_TRUE
    }
}
