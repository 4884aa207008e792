//! In-memory collaborators.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use crate::component::{Component, DEFAULT_MAX_DEPTH};
use crate::environment::{
    ComponentBuildStatus, Database, DatabaseGrant, Environment, Project, Server,
};
use crate::error::{PlanError, PlanResult};

use super::{
    EnvironmentStore, OrderingProvider, ProjectStore, PropertyLookup, RequestGateway,
    SubmissionMetadata, TopologyStore,
};

#[derive(Debug, Default)]
struct CatalogData {
    projects: BTreeMap<String, Project>,
    components: HashMap<u64, Vec<Component>>,
    environments: BTreeMap<String, Environment>,
    statuses: HashMap<u64, Vec<ComponentBuildStatus>>,
    servers: HashMap<u64, Vec<Server>>,
    databases: HashMap<u64, Vec<Database>>,
    grants: HashMap<u64, Vec<DatabaseGrant>>,
    file_shares: HashMap<u64, String>,
    config_files: HashMap<u64, String>,
}

/// Projects, environments and topology held in memory.
///
/// Implements every read-side store trait.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    data: RwLock<CatalogData>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&self, project: Project, roots: Vec<Component>) -> PlanResult<()> {
        let mut data = self.write()?;
        data.components.insert(project.id, roots);
        data.projects.insert(project.name.clone(), project);
        Ok(())
    }

    pub fn add_environment(&self, environment: Environment) -> PlanResult<()> {
        self.write()?
            .environments
            .insert(environment.name.clone(), environment);
        Ok(())
    }

    /// Replace what is recorded as deployed in an environment.
    pub fn set_statuses(
        &self,
        environment_id: u64,
        statuses: Vec<ComponentBuildStatus>,
    ) -> PlanResult<()> {
        self.write()?.statuses.insert(environment_id, statuses);
        Ok(())
    }

    pub fn add_server(&self, environment_id: u64, server: Server) -> PlanResult<()> {
        self.write()?
            .servers
            .entry(environment_id)
            .or_default()
            .push(server);
        Ok(())
    }

    pub fn add_database(&self, environment_id: u64, database: Database) -> PlanResult<()> {
        self.write()?
            .databases
            .entry(environment_id)
            .or_default()
            .push(database);
        Ok(())
    }

    pub fn add_grant(&self, environment_id: u64, grant: DatabaseGrant) -> PlanResult<()> {
        self.write()?
            .grants
            .entry(environment_id)
            .or_default()
            .push(grant);
        Ok(())
    }

    pub fn set_file_share_path(
        &self,
        environment_id: u64,
        path: impl Into<String>,
    ) -> PlanResult<()> {
        self.write()?.file_shares.insert(environment_id, path.into());
        Ok(())
    }

    pub fn set_config_file_path(
        &self,
        environment_id: u64,
        path: impl Into<String>,
    ) -> PlanResult<()> {
        self.write()?.config_files.insert(environment_id, path.into());
        Ok(())
    }

    fn read(&self) -> PlanResult<std::sync::RwLockReadGuard<'_, CatalogData>> {
        self.data
            .read()
            .map_err(|_| PlanError::store("catalog lock poisoned"))
    }

    fn write(&self) -> PlanResult<std::sync::RwLockWriteGuard<'_, CatalogData>> {
        self.data
            .write()
            .map_err(|_| PlanError::store("catalog lock poisoned"))
    }
}

impl ProjectStore for MemoryCatalog {
    fn project(&self, name: &str) -> PlanResult<Option<Project>> {
        Ok(self.read()?.projects.get(name).cloned())
    }

    fn components_for_project(&self, project_id: u64) -> PlanResult<Vec<Component>> {
        Ok(self
            .read()?
            .components
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }

    fn component_by_name(&self, name: &str) -> PlanResult<Option<Component>> {
        let data = self.read()?;
        for roots in data.components.values() {
            if let Some(component) = find_component(roots, name, 1)? {
                return Ok(Some(component.clone()));
            }
        }
        Ok(None)
    }
}

impl EnvironmentStore for MemoryCatalog {
    fn environment(&self, name: &str) -> PlanResult<Option<Environment>> {
        Ok(self.read()?.environments.get(name).cloned())
    }

    fn component_statuses(&self, environment_id: u64) -> PlanResult<Vec<ComponentBuildStatus>> {
        Ok(self
            .read()?
            .statuses
            .get(&environment_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl TopologyStore for MemoryCatalog {
    fn servers(&self, environment_id: u64) -> PlanResult<Vec<Server>> {
        Ok(self.read()?.servers.get(&environment_id).cloned().unwrap_or_default())
    }

    fn databases(&self, environment_id: u64) -> PlanResult<Vec<Database>> {
        Ok(self.read()?.databases.get(&environment_id).cloned().unwrap_or_default())
    }

    fn database_grants(&self, environment_id: u64) -> PlanResult<Vec<DatabaseGrant>> {
        Ok(self.read()?.grants.get(&environment_id).cloned().unwrap_or_default())
    }
}

impl PropertyLookup for MemoryCatalog {
    fn file_share_path(&self, environment: &Environment) -> PlanResult<Option<String>> {
        Ok(self.read()?.file_shares.get(&environment.id).cloned())
    }

    fn config_file_path(&self, environment: &Environment) -> PlanResult<Option<String>> {
        Ok(self.read()?.config_files.get(&environment.id).cloned())
    }
}

fn too_deep(component: &Component) -> PlanError {
    PlanError::TreeTooDeep {
        component: component.name.clone(),
        limit: DEFAULT_MAX_DEPTH,
    }
}

fn find_component<'a>(
    roots: &'a [Component],
    name: &str,
    depth: usize,
) -> PlanResult<Option<&'a Component>> {
    for component in roots {
        if depth > DEFAULT_MAX_DEPTH {
            return Err(too_deep(component));
        }
        if component.name == name {
            return Ok(Some(component));
        }
        if let Some(found) = find_component(&component.children, name, depth + 1)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn pre_order<'a>(
    roots: &'a [Component],
    depth: usize,
    out: &mut Vec<&'a Component>,
) -> PlanResult<()> {
    for component in roots {
        if depth > DEFAULT_MAX_DEPTH {
            return Err(too_deep(component));
        }
        out.push(component);
        pre_order(&component.children, depth + 1, out)?;
    }
    Ok(())
}

/// Orders components by declared dependencies.
///
/// Components are emitted in the project's declaration (pre-order) order,
/// except that each one is preceded by its selected dependencies.
/// Dependencies outside the selection are ignored.
pub struct DependencyOrdering {
    projects: Arc<dyn ProjectStore>,
    depends_on: BTreeMap<String, Vec<String>>,
}

impl DependencyOrdering {
    pub fn new(projects: Arc<dyn ProjectStore>) -> Self {
        Self {
            projects,
            depends_on: BTreeMap::new(),
        }
    }

    /// Declare that `component` must be deployed after `dependency`.
    #[must_use]
    pub fn with_dependency(
        mut self,
        component: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        self.depends_on
            .entry(component.into())
            .or_default()
            .push(dependency.into());
        self
    }

    fn visit<'a>(
        &self,
        name: &str,
        selected: &HashMap<&str, &'a Component>,
        marks: &mut HashMap<String, Mark>,
        out: &mut Vec<&'a Component>,
    ) -> PlanResult<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(PlanError::validation(format!(
                    "dependency cycle through component '{}'",
                    name
                )));
            }
            None => {}
        }
        marks.insert(name.to_string(), Mark::Visiting);

        for dependency in self.depends_on.get(name).into_iter().flatten() {
            if selected.contains_key(dependency.as_str()) {
                self.visit(dependency, selected, marks, out)?;
            }
        }

        marks.insert(name.to_string(), Mark::Done);
        if let Some(component) = selected.get(name) {
            out.push(*component);
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Mark {
    Visiting,
    Done,
}

impl OrderingProvider for DependencyOrdering {
    fn ordered_components(
        &self,
        project: &Project,
        names: &BTreeSet<String>,
    ) -> PlanResult<Vec<Component>> {
        let roots = self.projects.components_for_project(project.id)?;
        let mut declared = Vec::new();
        pre_order(&roots, 1, &mut declared)?;

        let mut selected: HashMap<&str, &Component> = HashMap::new();
        let mut declaration_order = Vec::new();
        for component in declared {
            if names.contains(&component.name) && !selected.contains_key(component.name.as_str()) {
                selected.insert(component.name.as_str(), component);
                declaration_order.push(component.name.as_str());
            }
        }
        if let Some(missing) = names.iter().find(|n| !selected.contains_key(n.as_str())) {
            return Err(PlanError::ComponentNotFound(missing.clone()));
        }

        let mut marks = HashMap::new();
        let mut ordered = Vec::with_capacity(selected.len());
        for name in declaration_order {
            self.visit(name, &selected, &mut marks, &mut ordered)?;
        }
        Ok(ordered.into_iter().cloned().collect())
    }
}

/// A request recorded by [`MemoryGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedRequest {
    pub id: u64,
    pub serialized: String,
    pub metadata: SubmissionMetadata,
}

/// Request gateway that keeps submissions in memory, ids starting at 1.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    submitted: Mutex<Vec<SubmittedRequest>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> PlanResult<Vec<SubmittedRequest>> {
        Ok(self
            .submitted
            .lock()
            .map_err(|_| PlanError::store("gateway lock poisoned"))?
            .clone())
    }
}

impl RequestGateway for MemoryGateway {
    fn submit_request(&self, serialized: &str, metadata: &SubmissionMetadata) -> PlanResult<u64> {
        let mut submitted = self
            .submitted
            .lock()
            .map_err(|_| PlanError::store("gateway lock poisoned"))?;
        let id = submitted.len() as u64 + 1;
        submitted.push(SubmittedRequest {
            id,
            serialized: serialized.to_string(),
            metadata: metadata.clone(),
        });
        Ok(id)
    }
}
