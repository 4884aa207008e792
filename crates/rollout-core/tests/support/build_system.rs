use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use rollout_core::artifact::{Build, BuildArtifact, BuildDefinition, BuildSystemClient};
use rollout_core::error::PlanResult;

/// Scripted build system: answers from fixed tables.
#[derive(Default)]
pub struct FakeBuildSystem {
    definitions: Vec<BuildDefinition>,
    builds: Vec<Build>,
    artifacts: HashMap<String, Vec<BuildArtifact>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeBuildSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(mut self, id: u64, project: &str, name: &str) -> Self {
        self.definitions.push(BuildDefinition {
            id,
            name: name.to_string(),
            project: project.to_string(),
        });
        self
    }

    pub fn with_build(mut self, build: Build) -> Self {
        self.builds.push(build);
        self
    }

    pub fn with_artifact(mut self, build_number: &str, name: &str, download_url: &str) -> Self {
        self.artifacts
            .entry(build_number.to_string())
            .or_default()
            .push(BuildArtifact {
                name: name.to_string(),
                download_url: download_url.to_string(),
            });
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl BuildSystemClient for FakeBuildSystem {
    async fn list_build_definitions(
        &self,
        _url: &Url,
        sub_paths: &[String],
        name_filter: Option<&Regex>,
    ) -> PlanResult<Vec<BuildDefinition>> {
        self.enter().await;
        Ok(self
            .definitions
            .iter()
            .filter(|d| sub_paths.contains(&d.project))
            .filter(|d| name_filter.is_none_or(|re| re.is_match(&d.name)))
            .cloned()
            .collect())
    }

    async fn list_builds(
        &self,
        _url: &Url,
        definitions: &[BuildDefinition],
    ) -> PlanResult<Vec<Build>> {
        self.enter().await;
        Ok(self
            .builds
            .iter()
            .filter(|b| definitions.iter().any(|d| d.id == b.definition_id))
            .cloned()
            .collect())
    }

    async fn list_artifacts(
        &self,
        _url: &Url,
        _project: &str,
        build: &Build,
    ) -> PlanResult<Vec<BuildArtifact>> {
        self.enter().await;
        Ok(self.artifacts.get(&build.number).cloned().unwrap_or_default())
    }
}

/// A completed build of definition `definition_id`.
pub fn build(id: u64, number: &str, definition_id: u64, keep_forever: bool) -> Build {
    Build {
        id: Some(id),
        number: number.to_string(),
        uri: format!("vstfs:///Build/Build/{id}"),
        status: "completed".to_string(),
        result: "succeeded".to_string(),
        keep_forever,
        url: format!("https://tfs.example.com/tfs/Main/_apis/build/Builds/{id}"),
        project: "Payments".to_string(),
        definition_id,
    }
}
