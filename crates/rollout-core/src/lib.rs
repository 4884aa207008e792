//! Rollout Core Library
//!
//! Planning core of a deployment orchestrator: turns a deployment intent
//! into an ordered list of per-build requests and derives the variable
//! scope scripts see in the target environment.

pub mod artifact;
pub mod batch;
pub mod component;
pub mod config;
pub mod environment;
pub mod error;
pub mod logging;
pub mod plan;
pub mod store;
pub mod variables;

pub use error::{PlanError, PlanResult};

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{PlanError, PlanResult};

    // Configuration
    pub use crate::config::{BuildSystemConfig, ConfigStore, PlanningConfig, RolloutConfig};

    // Domain
    pub use crate::component::Component;
    pub use crate::environment::{
        ComponentBuildStatus, Daemon, Database, DatabaseGrant, Environment, Project, Server,
    };

    // Artifacts
    pub use crate::artifact::{
        ArtifactSource, AzureDevOpsClient, BuildArtifactResolver, BuildDetail, BuildReference,
        BuildSystemClient, ProjectArtifactConfig,
    };

    // Planning
    pub use crate::batch::ContiguousBatchExt;
    pub use crate::plan::{
        DeploymentPlanAssembler, DeploymentRequestDetail, NewDeploymentRequest, PlanRequest,
        PropertyPair, RequestSerializer, submit_plan,
    };

    // Stores
    pub use crate::store::{
        EnvironmentStore, OrderingProvider, ProjectStore, PropertyLookup, RequestGateway,
        SubmissionMetadata, TopologyStore,
    };

    // Variables
    pub use crate::variables::{VariableContext, VariableScopeResolver, VariableValue, ValueKind};
}
