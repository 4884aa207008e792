//! Seams to the collaborators that own persistent data.
//!
//! Storage, dependency ordering and request persistence live outside the
//! planning core. The traits below are what the core needs from them;
//! [`memory`] holds in-process implementations used by tests and by
//! embedders that load everything up front.

pub mod memory;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::environment::{
    ComponentBuildStatus, Database, DatabaseGrant, Environment, Project, Server,
};
use crate::error::PlanResult;

pub use memory::{DependencyOrdering, MemoryCatalog, MemoryGateway, SubmittedRequest};

/// Read access to projects and their component trees.
pub trait ProjectStore: Send + Sync {
    fn project(&self, name: &str) -> PlanResult<Option<Project>>;

    /// Root components of the project's forest.
    fn components_for_project(&self, project_id: u64) -> PlanResult<Vec<Component>>;

    fn component_by_name(&self, name: &str) -> PlanResult<Option<Component>>;
}

/// Read access to environments and what is deployed in them.
pub trait EnvironmentStore: Send + Sync {
    fn environment(&self, name: &str) -> PlanResult<Option<Environment>>;

    fn component_statuses(&self, environment_id: u64) -> PlanResult<Vec<ComponentBuildStatus>>;
}

/// Topology rows for an environment, read fresh on every call.
pub trait TopologyStore: Send + Sync {
    fn servers(&self, environment_id: u64) -> PlanResult<Vec<Server>>;

    fn databases(&self, environment_id: u64) -> PlanResult<Vec<Database>>;

    fn database_grants(&self, environment_id: u64) -> PlanResult<Vec<DatabaseGrant>>;
}

/// Per-environment scalar settings.
pub trait PropertyLookup: Send + Sync {
    fn file_share_path(&self, environment: &Environment) -> PlanResult<Option<String>>;

    fn config_file_path(&self, environment: &Environment) -> PlanResult<Option<String>>;
}

/// Orders components so that dependencies come first.
pub trait OrderingProvider: Send + Sync {
    /// Total order over `names` consistent with declared dependencies.
    fn ordered_components(
        &self,
        project: &Project,
        names: &BTreeSet<String>,
    ) -> PlanResult<Vec<Component>>;
}

/// Context stored alongside each submitted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    pub target_environment: String,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    /// Position of this request in its plan
    pub batch_index: usize,
    pub batch_count: usize,
}

/// Persists serialized requests for the execution runner.
pub trait RequestGateway: Send + Sync {
    /// Store one request, returning its identifier.
    fn submit_request(&self, serialized: &str, metadata: &SubmissionMetadata) -> PlanResult<u64>;
}
