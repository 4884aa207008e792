//! Build artifact resolution.
//!
//! Turns a caller's build reference into a concrete [`BuildDetail`]. The
//! project's artifact URL selects the strategy:
//! - `http*` with sub-paths: query the remote build system
//! - `file*`: the reference is a path on a file share
//! - anything else: the reference is used verbatim as a folder

pub mod azure;
mod client;
mod pinning;
mod resolver;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PlanError, PlanResult};

pub use azure::AzureDevOpsClient;
pub use client::{Build, BuildArtifact, BuildDefinition, BuildSystemClient};
pub use pinning::{BuildCandidate, PINNED_SUFFIX, candidates_for};
pub use resolver::BuildArtifactResolver;

/// Where a project publishes its builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectArtifactConfig {
    /// Build system collection URL, file share URL or plain folder
    pub url: String,
    /// Semicolon-delimited remote project scopes
    #[serde(default)]
    pub sub_paths: String,
    /// Regex applied to build definition names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_name_filter: Option<String>,
}

/// Strategy used to resolve a build reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    RemoteBuildSystem,
    FileShare,
    DirectFolder,
}

impl ProjectArtifactConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sub_paths(mut self, sub_paths: impl Into<String>) -> Self {
        self.sub_paths = sub_paths.into();
        self
    }

    #[must_use]
    pub fn with_build_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.build_name_filter = Some(filter.into());
        self
    }

    /// Trimmed, non-empty, de-duplicated sub-paths in declaration order.
    pub fn sub_path_list(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for path in self.sub_paths.split(';').map(str::trim) {
            if !path.is_empty() && !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }
        paths
    }

    /// Classify by URL scheme.
    pub fn source(&self) -> ArtifactSource {
        let scheme = match Url::parse(self.url.trim()) {
            Ok(url) => url.scheme().to_ascii_lowercase(),
            Err(_) => self.url.trim().to_ascii_lowercase(),
        };

        if scheme.starts_with("http") && !self.sub_path_list().is_empty() {
            ArtifactSource::RemoteBuildSystem
        } else if scheme.starts_with("file") {
            ArtifactSource::FileShare
        } else {
            ArtifactSource::DirectFolder
        }
    }

    /// Compiled build name filter, if configured.
    pub fn name_filter(&self) -> PlanResult<Option<Regex>> {
        match self.build_name_filter.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(pattern) => Regex::new(pattern).map(Some).map_err(|e| {
                PlanError::validation(format!("invalid build name filter '{}': {}", pattern, e))
            }),
        }
    }
}

/// A caller's pointer at a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReference {
    /// `"<remoteProject>; <buildDefinitionName>"`
    pub label: String,
    /// Build URL, folder path, or drop path
    pub locator: String,
}

impl BuildReference {
    pub fn new(label: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            locator: locator.into(),
        }
    }

    /// Split the label into trimmed `(remote project, definition name)`.
    pub fn parse_label(&self) -> PlanResult<(String, String)> {
        let (project, definition) = self.label.split_once(';').ok_or_else(|| {
            PlanError::validation(format!(
                "build label '{}' must look like '<project>; <definition>'",
                self.label
            ))
        })?;
        let (project, definition) = (project.trim(), definition.trim());
        if project.is_empty() || definition.is_empty() || definition.contains(';') {
            return Err(PlanError::validation(format!(
                "build label '{}' must look like '<project>; <definition>'",
                self.label
            )));
        }
        Ok((project.to_string(), definition.to_string()))
    }
}

/// A resolved build: what to deploy and where to fetch it from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildDetail {
    #[serde(default)]
    pub build_id: Option<u64>,
    #[serde(default)]
    pub build_number: String,
    #[serde(default)]
    pub drop_location: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub uri: String,
}
