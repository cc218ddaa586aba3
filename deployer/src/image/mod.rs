//! Image metadata used to annotate the deployment report

pub mod docker;

use async_trait::async_trait;

use crate::deploy::request::{parse_env_declaration, EnvironmentMapping};
use crate::models::image::ImageReference;

pub use docker::DockerInspector;

/// Looks up the environment an image declares
///
/// `None` means the lookup failed; the deployment goes ahead without hints.
#[async_trait]
pub trait ImageMetadataSource: Send + Sync {
    async fn lookup_env(&self, image: &ImageReference) -> Option<Vec<String>>;
}

/// One variable declared by the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvHint {
    pub name: String,
    pub overridden: bool,
}

/// Variables declared by the image, and the overrides that do not match any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvHints {
    declared: Vec<EnvHint>,
    added: Vec<String>,
}

impl EnvHints {
    pub fn new(declarations: &[String], overrides: &EnvironmentMapping) -> Self {
        let mut declared: Vec<EnvHint> = Vec::new();
        for (name, _) in declarations.iter().filter_map(|d| parse_env_declaration(d)) {
            if declared.iter().any(|hint| hint.name == name) {
                continue;
            }
            declared.push(EnvHint {
                name: name.to_string(),
                overridden: overrides.contains(name),
            });
        }

        let added = overrides
            .iter()
            .map(|(name, _)| name)
            .filter(|name| !declared.iter().any(|hint| hint.name == *name))
            .map(str::to_string)
            .collect();

        Self { declared, added }
    }

    pub fn declared(&self) -> &[EnvHint] {
        &self.declared
    }

    /// Overrides the image does not declare
    pub fn added(&self) -> &[String] {
        &self.added
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty() && self.added.is_empty()
    }
}
