//! Builds the declarative service descriptor sent on every upsert

use std::collections::BTreeMap;

use run_api::{
    Container, EnvVar, ObjectMeta, RevisionSpec, RevisionTemplate, Service, ServiceSpec,
    TemplateMeta, API_VERSION, KIND_SERVICE, VPC_CONNECTOR_ANNOTATION,
};

use crate::deploy::platform::ServiceLocation;
use crate::deploy::request::{DeploymentRequest, RESERVED_ENV_KEYS};
use crate::errors::DeployError;
use crate::utils::sha256_hex;

/// Immutable snapshot of the desired service, rebuilt for every upsert
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    location: ServiceLocation,
    resource: Service,
}

impl ServiceDescriptor {
    pub fn location(&self) -> &ServiceLocation {
        &self.location
    }

    pub fn resource(&self) -> &Service {
        &self.resource
    }

    /// Canonical JSON form; identical inputs give identical bytes
    pub fn to_json(&self) -> Result<Vec<u8>, DeployError> {
        Ok(serde_json::to_vec(&self.resource)?)
    }

    /// SHA-256 of the canonical JSON, used to trace which spec was applied
    pub fn digest(&self) -> Result<String, DeployError> {
        Ok(sha256_hex(&self.to_json()?))
    }
}

/// Map a request onto a service descriptor. No I/O.
pub fn build_descriptor(request: &DeploymentRequest, project: &str) -> ServiceDescriptor {
    let location = ServiceLocation::for_request(project, request);

    let env = request
        .environment
        .iter()
        .filter(|(name, _)| !RESERVED_ENV_KEYS.contains(name))
        .map(|(name, value)| EnvVar {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect();

    let template_metadata = request.network_connector.as_ref().map(|connector| {
        let mut annotations = BTreeMap::new();
        annotations.insert(VPC_CONNECTOR_ANNOTATION.to_string(), connector.clone());
        TemplateMeta { annotations }
    });

    let resource = Service {
        api_version: API_VERSION.to_string(),
        kind: KIND_SERVICE.to_string(),
        metadata: ObjectMeta {
            name: location.name.to_string(),
            namespace: Some(location.project.clone()),
            ..Default::default()
        },
        spec: ServiceSpec {
            template: RevisionTemplate {
                metadata: template_metadata,
                spec: RevisionSpec {
                    service_account_name: request.runtime_identity.clone(),
                    containers: vec![Container {
                        image: request.image.to_string(),
                        env,
                    }],
                },
            },
        },
        status: None,
    };

    ServiceDescriptor { location, resource }
}
