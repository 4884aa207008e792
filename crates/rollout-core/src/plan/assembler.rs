//! Turns a component selection into per-build deployment requests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::artifact::{BuildArtifactResolver, BuildDetail};
use crate::batch::ContiguousBatchExt;
use crate::component::{Component, DEFAULT_MAX_DEPTH, contains_component, flatten_with_limit};
use crate::config::PlanningConfig;
use crate::environment::{ComponentBuildStatus, Environment, Project};
use crate::error::{PlanError, PlanResult};
use crate::store::{EnvironmentStore, OrderingProvider, ProjectStore};

use super::{DeploymentRequestDetail, NewDeploymentRequest, PlanRequest, PropertyPair};

/// Builds deployment plans from stored state.
///
/// Each call is a single pass; nothing is kept between calls.
pub struct DeploymentPlanAssembler {
    projects: Arc<dyn ProjectStore>,
    environments: Arc<dyn EnvironmentStore>,
    ordering: Arc<dyn OrderingProvider>,
    max_tree_depth: usize,
}

impl DeploymentPlanAssembler {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        environments: Arc<dyn EnvironmentStore>,
        ordering: Arc<dyn OrderingProvider>,
    ) -> Self {
        Self {
            projects,
            environments,
            ordering,
            max_tree_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_planning_config(mut self, config: &PlanningConfig) -> Self {
        self.max_tree_depth = config.max_tree_depth;
        self
    }

    /// Plan copying the selected components' builds from the source
    /// environment into the target environment.
    ///
    /// Components are ordered by the ordering provider, joined with their
    /// source build status and cut into runs of equal build number. Each run
    /// becomes one request, in order. Components without a build status in
    /// the source environment are left out.
    #[instrument(
        skip_all,
        fields(
            project = %request.project,
            source = %request.source_environment,
            target = %request.target_environment
        )
    )]
    pub fn plan(&self, request: &PlanRequest) -> PlanResult<Vec<DeploymentRequestDetail>> {
        let project = self.project(&request.project)?;
        let source = self.environment(&request.source_environment)?;
        let target = self.environment(&request.target_environment)?;
        let ordered = self.ordered_selection(&project, &request.selected_components)?;

        let statuses = self.environments.component_statuses(source.id)?;
        let by_component: HashMap<&str, &ComponentBuildStatus> = statuses
            .iter()
            .map(|status| (status.component.as_str(), status))
            .collect();

        let joined: Vec<(Component, &ComponentBuildStatus)> = ordered
            .into_iter()
            .filter_map(|component| match by_component.get(component.name.as_str()) {
                Some(status) => Some((component, *status)),
                None => {
                    warn!(component = %component.name, "no build status in source environment");
                    None
                }
            })
            .collect();
        if joined.is_empty() {
            return Err(PlanError::NoBuildFound(source.name));
        }

        let mut requests = Vec::new();
        for (build_number, batch) in joined
            .into_iter()
            .batch_contiguous(|(_, status)| status.build_number.clone())
        {
            let status = batch[0].1;
            let build = BuildDetail {
                build_id: None,
                build_number,
                drop_location: status.drop_location.clone(),
                project: status.project.clone(),
                uri: status.uri.clone(),
            };
            let components: Vec<Component> = batch.into_iter().map(|(c, _)| c).collect();

            if let Some(detail) = self.assemble(
                &target,
                &components,
                build,
                &request.skip_components,
                &request.property_overrides,
            )? {
                requests.push(detail);
            }
        }

        finish(requests)
    }

    /// Plan deploying a specific build, resolved through `resolver`.
    ///
    /// Produces a single request covering every selected component.
    #[instrument(
        skip_all,
        fields(project = %request.project, target = %request.target_environment)
    )]
    pub async fn plan_new_deployment(
        &self,
        request: &NewDeploymentRequest,
        resolver: &BuildArtifactResolver,
    ) -> PlanResult<Vec<DeploymentRequestDetail>> {
        let project = self.project(&request.project)?;
        let target = self.environment(&request.target_environment)?;
        let ordered = self.ordered_selection(&project, &request.selected_components)?;

        let build = resolver.resolve(&project.artifact, &request.build).await?;

        let requests = self
            .assemble(
                &target,
                &ordered,
                build,
                &request.skip_components,
                &request.property_overrides,
            )?
            .into_iter()
            .collect();
        finish(requests)
    }

    fn project(&self, name: &str) -> PlanResult<Project> {
        self.projects
            .project(name)?
            .ok_or_else(|| PlanError::ProjectNotFound(name.to_string()))
    }

    fn environment(&self, name: &str) -> PlanResult<Environment> {
        self.environments
            .environment(name)?
            .ok_or_else(|| PlanError::EnvironmentNotFound(name.to_string()))
    }

    /// Check membership, then ask the ordering provider for an order.
    ///
    /// An empty selection stands for every root component of the project.
    fn ordered_selection(
        &self,
        project: &Project,
        selected: &BTreeSet<String>,
    ) -> PlanResult<Vec<Component>> {
        let roots = self.projects.components_for_project(project.id)?;
        if selected.is_empty() {
            let everything: BTreeSet<String> = roots.iter().map(|c| c.name.clone()).collect();
            debug!(components = everything.len(), "no selection; planning whole project");
            return self.ordering.ordered_components(project, &everything);
        }

        for name in selected {
            if contains_component(&roots, name, self.max_tree_depth)? {
                continue;
            }
            return Err(match self.projects.component_by_name(name)? {
                Some(_) => PlanError::validation(format!(
                    "component '{}' does not belong to project '{}'",
                    name, project.name
                )),
                None => PlanError::ComponentNotFound(name.clone()),
            });
        }

        self.ordering.ordered_components(project, selected)
    }

    fn assemble(
        &self,
        target: &Environment,
        components: &[Component],
        build: BuildDetail,
        skip: &BTreeSet<String>,
        overrides: &[PropertyPair],
    ) -> PlanResult<Option<DeploymentRequestDetail>> {
        let names = flatten_with_limit(components, self.max_tree_depth)?;
        if names.is_empty() {
            debug!(build_number = %build.build_number, "batch has no deployable components");
            return Ok(None);
        }

        let components_to_skip = names
            .iter()
            .filter(|name| skip.contains(*name))
            .cloned()
            .collect();

        debug!(
            build_number = %build.build_number,
            components = names.len(),
            "assembled deployment request"
        );
        Ok(Some(DeploymentRequestDetail {
            environment: target.name.clone(),
            components: names,
            components_to_skip,
            build,
            properties: overrides.to_vec(),
        }))
    }
}

fn finish(requests: Vec<DeploymentRequestDetail>) -> PlanResult<Vec<DeploymentRequestDetail>> {
    if requests.is_empty() {
        return Err(PlanError::NoRequestsProduced);
    }
    info!(requests = requests.len(), "planned deployment");
    Ok(requests)
}
