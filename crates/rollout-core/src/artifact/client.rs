//! Remote build system client seam.

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use crate::error::PlanResult;

/// A build definition (pipeline) in the remote build system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDefinition {
    pub id: u64,
    pub name: String,
    /// Owning remote project
    pub project: String,
}

/// One run of a build definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Build {
    pub id: Option<u64>,
    pub number: String,
    pub uri: String,
    pub status: String,
    pub result: String,
    /// Retained indefinitely ("pinned")
    pub keep_forever: bool,
    pub url: String,
    pub project: String,
    pub definition_id: u64,
}

/// A published build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub name: String,
    pub download_url: String,
}

/// Queries against a remote build system.
///
/// Injected into [`BuildArtifactResolver`](super::BuildArtifactResolver);
/// tests substitute a scripted fake.
#[async_trait]
pub trait BuildSystemClient: Send + Sync {
    /// Definitions visible under each sub-path, filtered by name.
    async fn list_build_definitions(
        &self,
        url: &Url,
        sub_paths: &[String],
        name_filter: Option<&Regex>,
    ) -> PlanResult<Vec<BuildDefinition>>;

    /// Builds of the given definitions.
    async fn list_builds(
        &self,
        url: &Url,
        definitions: &[BuildDefinition],
    ) -> PlanResult<Vec<Build>>;

    /// Artifacts published by one build.
    async fn list_artifacts(
        &self,
        url: &Url,
        project: &str,
        build: &Build,
    ) -> PlanResult<Vec<BuildArtifact>>;
}
