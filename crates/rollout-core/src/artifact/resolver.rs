//! Build artifact resolver implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::BuildSystemConfig;
use crate::environment::Environment;
use crate::error::{PlanError, PlanResult};

use super::azure::AzureDevOpsClient;
use super::client::{Build, BuildArtifact, BuildDefinition, BuildSystemClient};
use super::pinning::{BuildCandidate, candidates_for};
use super::{ArtifactSource, BuildDetail, BuildReference, ProjectArtifactConfig};

const PREFERRED_ARTIFACT: &str = "drop";

/// Resolves build references into [`BuildDetail`]s.
///
/// Remote calls go through the injected [`BuildSystemClient`]. Each call is
/// raced against the optional per-call timeout and the caller's
/// cancellation token. Nothing is retried.
#[derive(Clone)]
pub struct BuildArtifactResolver {
    client: Arc<dyn BuildSystemClient>,
    call_timeout: Option<Duration>,
}

impl std::fmt::Debug for BuildArtifactResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildArtifactResolver")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl BuildArtifactResolver {
    /// Create a resolver over `client` with no call timeout.
    pub fn new(client: Arc<dyn BuildSystemClient>) -> Self {
        Self {
            client,
            call_timeout: None,
        }
    }

    /// Resolver backed by [`AzureDevOpsClient`], timed out per configuration.
    pub fn from_config(config: &BuildSystemConfig) -> PlanResult<Self> {
        let client = AzureDevOpsClient::new(config)?;
        Ok(Self::new(Arc::new(client)).with_timeout(config.timeout()))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Resolve `reference` against the project's artifact source.
    pub async fn resolve(
        &self,
        config: &ProjectArtifactConfig,
        reference: &BuildReference,
    ) -> PlanResult<BuildDetail> {
        self.resolve_cancellable(config, reference, &CancellationToken::new())
            .await
    }

    /// [`resolve`](Self::resolve), abandoning remote calls once `cancel` fires.
    #[instrument(skip_all, fields(label = %reference.label, locator = %reference.locator))]
    pub async fn resolve_cancellable(
        &self,
        config: &ProjectArtifactConfig,
        reference: &BuildReference,
        cancel: &CancellationToken,
    ) -> PlanResult<BuildDetail> {
        let detail = match config.source() {
            ArtifactSource::RemoteBuildSystem => {
                self.resolve_remote(config, reference, cancel).await?
            }
            ArtifactSource::FileShare => resolve_file_share(reference),
            ArtifactSource::DirectFolder => resolve_direct_folder(reference),
        };
        info!(
            build_number = %detail.build_number,
            drop_location = %detail.drop_location,
            "resolved build artifact"
        );
        Ok(detail)
    }

    /// `"<project>; <definition>"` labels of every visible build definition.
    pub async fn definition_labels(
        &self,
        config: &ProjectArtifactConfig,
    ) -> PlanResult<Vec<String>> {
        let url = remote_url(config)?;
        let filter = config.name_filter()?;
        let definitions = self
            .call(
                &CancellationToken::new(),
                self.client
                    .list_build_definitions(&url, &config.sub_path_list(), filter.as_ref()),
            )
            .await?;
        Ok(definitions
            .iter()
            .map(|d| format!("{}; {}", d.project, d.name))
            .collect())
    }

    /// Builds of the labelled definition that may be deployed to `target`.
    ///
    /// See [`candidates_for`] for the pinned-build policy.
    #[instrument(skip(self, config, target), fields(environment = %target.name))]
    pub async fn candidate_builds(
        &self,
        config: &ProjectArtifactConfig,
        label: &str,
        target: &Environment,
    ) -> PlanResult<Vec<BuildCandidate>> {
        if config.source() != ArtifactSource::RemoteBuildSystem {
            return Err(PlanError::validation(format!(
                "'{}' is not a remote build system; builds cannot be listed",
                config.url
            )));
        }
        let cancel = CancellationToken::new();
        let url = remote_url(config)?;
        let definition = self.find_definition(&url, config, label, &cancel).await?;
        let builds = self
            .call(&cancel, self.client.list_builds(&url, std::slice::from_ref(&definition)))
            .await?;

        let candidates = candidates_for(builds, target);
        debug!(
            count = candidates.len(),
            pinned_only = target.requires_pinned_builds(),
            "listed candidate builds"
        );
        Ok(candidates)
    }

    async fn resolve_remote(
        &self,
        config: &ProjectArtifactConfig,
        reference: &BuildReference,
        cancel: &CancellationToken,
    ) -> PlanResult<BuildDetail> {
        let url = remote_url(config)?;
        let definition = self
            .find_definition(&url, config, &reference.label, cancel)
            .await?;

        let builds = self
            .call(cancel, self.client.list_builds(&url, std::slice::from_ref(&definition)))
            .await?;
        let build = select_build(builds, &reference.locator).ok_or_else(|| {
            PlanError::ArtifactNotFound(format!(
                "build '{}' of definition '{}'",
                reference.locator, reference.label
            ))
        })?;

        let artifacts = self
            .call(
                cancel,
                self.client.list_artifacts(&url, &definition.project, &build),
            )
            .await?;
        let artifact = select_artifact(artifacts).ok_or_else(|| {
            PlanError::ArtifactNotFound(format!("no artifacts published by build {}", build.number))
        })?;

        let project = if build.project.is_empty() {
            definition.project
        } else {
            build.project
        };
        Ok(BuildDetail {
            build_id: build.id,
            build_number: build.number,
            drop_location: artifact.download_url,
            project,
            uri: build.uri,
        })
    }

    async fn find_definition(
        &self,
        url: &Url,
        config: &ProjectArtifactConfig,
        label: &str,
        cancel: &CancellationToken,
    ) -> PlanResult<BuildDefinition> {
        let (project, name) = BuildReference::new(label, "").parse_label()?;
        let filter = config.name_filter()?;

        let definitions = self
            .call(
                cancel,
                self.client
                    .list_build_definitions(url, &config.sub_path_list(), filter.as_ref()),
            )
            .await?;

        let mut matches: Vec<BuildDefinition> = definitions
            .into_iter()
            .filter(|d| d.name == name && d.project == project)
            .collect();

        match matches.len() {
            0 => Err(PlanError::ArtifactNotFound(format!(
                "no build definition '{}' in project '{}'",
                name, project
            ))),
            1 => Ok(matches.remove(0)),
            n => Err(PlanError::AmbiguousBuildDefinition {
                label: label.to_string(),
                matches: n,
            }),
        }
    }

    async fn call<T, F>(&self, cancel: &CancellationToken, fut: F) -> PlanResult<T>
    where
        F: Future<Output = PlanResult<T>>,
    {
        let timed = async {
            match self.call_timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| PlanError::Timeout { limit })?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PlanError::Cancelled),
            result = timed => result,
        }
    }
}

fn remote_url(config: &ProjectArtifactConfig) -> PlanResult<Url> {
    Url::parse(config.url.trim()).map_err(|e| {
        PlanError::validation(format!("invalid build system URL '{}': {}", config.url, e))
    })
}

/// First build whose URL, URI or number equals `locator`.
fn select_build(builds: Vec<Build>, locator: &str) -> Option<Build> {
    builds
        .into_iter()
        .find(|b| b.url == locator || b.uri == locator || b.number == locator)
}

/// The artifact named "drop" when several are published, else the first.
fn select_artifact(mut artifacts: Vec<BuildArtifact>) -> Option<BuildArtifact> {
    if artifacts.len() > 1
        && let Some(pos) = artifacts
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(PREFERRED_ARTIFACT))
    {
        return Some(artifacts.swap_remove(pos));
    }
    artifacts.into_iter().next()
}

fn resolve_file_share(reference: &BuildReference) -> BuildDetail {
    let build_number = reference
        .locator
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string();

    BuildDetail {
        build_id: None,
        build_number,
        drop_location: reference.locator.clone(),
        project: String::new(),
        uri: reference.locator.clone(),
    }
}

fn resolve_direct_folder(reference: &BuildReference) -> BuildDetail {
    BuildDetail {
        drop_location: reference.locator.clone(),
        ..BuildDetail::default()
    }
}
