//! Deployment request and its value types

use std::fmt;

use tracing::warn;

use crate::errors::DeployError;
use crate::models::image::ImageReference;

/// Maximum length of a Cloud Run service name
const MAX_SERVICE_NAME_LEN: usize = 63;

/// Keys the platform assigns itself; user overrides for them are dropped
pub const RESERVED_ENV_KEYS: &[&str] = &["PORT", "K_SERVICE", "K_REVISION", "K_CONFIGURATION"];

/// Label prefix that declares an environment override on a pull request
pub const ENV_LABEL_PREFIX: &str = "env:";

/// A service name normalized to the platform's naming rules
///
/// Lowercase letters, digits and single hyphens; starts with a letter, does not
/// end with a hyphen, at most 63 characters. Normalizing an already normalized
/// name returns it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn normalize(raw: &str) -> Result<Self, DeployError> {
        let mut name = String::with_capacity(raw.len());
        for c in raw.trim().chars().flat_map(char::to_lowercase) {
            let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            };
            if c == '-' && (name.is_empty() || name.ends_with('-')) {
                continue;
            }
            name.push(c);
        }

        if name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert_str(0, "s-");
        }

        name.truncate(MAX_SERVICE_NAME_LEN);
        while name.ends_with('-') {
            name.pop();
        }

        if name.is_empty() {
            return Err(DeployError::ConfigError(format!(
                "Service name '{}' has no usable characters",
                raw
            )));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered name -> value mapping; a later insert for an existing name
/// overwrites the value in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMapping {
    entries: Vec<(String, String)>,
}

impl EnvironmentMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Empty names and platform-reserved names are dropped.
    /// Returns whether the entry was kept.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into().trim().to_string();
        let value = value.into();

        if name.is_empty() {
            warn!("Dropping environment override with an empty name");
            return false;
        }
        if RESERVED_ENV_KEYS.contains(&name.as_str()) {
            warn!(key = %name, "Dropping environment override for a platform-reserved key");
            return false;
        }

        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        true
    }

    /// Collect every variable carrying `prefix`, with the prefix stripped.
    /// Entries are sorted by name so the mapping does not depend on the
    /// iteration order of the process environment.
    pub fn from_prefixed<I>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut matched: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .map(|name| (name.to_string(), value))
            })
            .collect();
        matched.sort();

        let mut mapping = Self::new();
        for (name, value) in matched {
            mapping.insert(name, value);
        }
        mapping
    }

    /// Apply `env:KEY=VALUE` labels on top of this mapping
    pub fn apply_labels<'a, I>(&mut self, labels: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for label in labels {
            if let Some((name, value)) = parse_env_label(label) {
                self.insert(name, value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentMapping {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut mapping = Self::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

/// Parse a `env:KEY=VALUE` label
pub fn parse_env_label(label: &str) -> Option<(&str, &str)> {
    let declaration = label.trim().strip_prefix(ENV_LABEL_PREFIX)?;
    parse_env_declaration(declaration)
}

/// Parse a `KEY=VALUE` declaration; the value may contain further `=`
pub fn parse_env_declaration(declaration: &str) -> Option<(&str, &str)> {
    let (name, value) = declaration.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

/// Everything needed to deploy one service, fixed for the invocation
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub service_name: ServiceName,
    pub region: String,
    pub image: ImageReference,
    pub runtime_identity: Option<String>,
    pub network_connector: Option<String>,
    pub environment: EnvironmentMapping,
}

impl DeploymentRequest {
    /// Build a request, normalizing the service name once
    pub fn new(
        service_name: &str,
        region: &str,
        image: ImageReference,
        runtime_identity: Option<String>,
        network_connector: Option<String>,
        environment: EnvironmentMapping,
    ) -> Result<Self, DeployError> {
        let region = region.trim();
        if region.is_empty() {
            return Err(DeployError::ConfigError("Region must not be empty".to_string()));
        }

        Ok(Self {
            service_name: ServiceName::normalize(service_name)?,
            region: region.to_string(),
            image,
            runtime_identity: runtime_identity.filter(|s| !s.trim().is_empty()),
            network_connector: network_connector.filter(|s| !s.trim().is_empty()),
            environment,
        })
    }
}
