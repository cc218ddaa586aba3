//! Container image references

use std::fmt;
use std::str::FromStr;

use crate::errors::DeployError;

const DEFAULT_TAG: &str = "latest";

/// A fully qualified image reference: `host/repository[:tag][@digest]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    raw: String,
    host: String,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    /// Parse a reference; the registry host is mandatory
    pub fn parse(raw: &str) -> Result<Self, DeployError> {
        let raw = raw.trim();
        let invalid = |reason: &str| DeployError::ConfigError(format!("Invalid image reference '{}': {}", raw, reason));

        let (host, rest) = raw
            .split_once('/')
            .ok_or_else(|| invalid("missing registry host"))?;

        if !(host.contains('.') || host.contains(':') || host == "localhost") {
            return Err(invalid("first path segment is not a registry host"));
        }

        let (name, digest) = match rest.split_once('@') {
            Some((name, digest)) if !digest.is_empty() => (name, Some(digest.to_string())),
            Some(_) => return Err(invalid("empty digest")),
            None => (rest, None),
        };

        // A ':' after the last '/' separates the tag
        let last_segment_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (repository, tag) = match name[last_segment_start..].rfind(':') {
            Some(i) => {
                let split = last_segment_start + i;
                let tag = &name[split + 1..];
                if tag.is_empty() {
                    return Err(invalid("empty tag"));
                }
                (&name[..split], Some(tag.to_string()))
            }
            None => (name, None),
        };

        if repository.is_empty() || repository.ends_with('/') {
            return Err(invalid("missing repository"));
        }

        Ok(Self {
            raw: raw.to_string(),
            host: host.to_string(),
            repository: repository.to_string(),
            tag,
            digest,
        })
    }

    /// Registry host, including port if any
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Repository path below the host
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Manifest reference: the digest if pinned, else the tag, else `latest`
    pub fn reference(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }

    /// Registry v2 path of the manifest
    pub fn manifest_path(&self) -> String {
        format!("/v2/{}/manifests/{}", self.repository, self.reference())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ImageReference {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
