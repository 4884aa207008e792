//! Deployment planning.
//!
//! A plan is an ordered list of [`DeploymentRequestDetail`]s, one per build.
//! Request order is execution order.

mod assembler;
mod serializer;
mod submit;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::artifact::{BuildDetail, BuildReference};

pub use assembler::DeploymentPlanAssembler;
pub use serializer::RequestSerializer;
pub use submit::submit_plan;

/// A name/value override applied on top of environment defaults.
///
/// Order is preserved and duplicate names are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyPair {
    pub name: String,
    pub value: String,
}

impl PropertyPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One deployment of one build to one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentRequestDetail {
    pub environment: String,
    /// Deployable components, in execution order
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub components_to_skip: Vec<String>,
    pub build: BuildDetail,
    #[serde(default)]
    pub properties: Vec<PropertyPair>,
}

/// Copy what is deployed in one environment into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRequest {
    pub project: String,
    pub source_environment: String,
    pub target_environment: String,
    pub selected_components: BTreeSet<String>,
    pub skip_components: BTreeSet<String>,
    pub property_overrides: Vec<PropertyPair>,
}

/// Deploy a specific build to an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeploymentRequest {
    pub project: String,
    pub target_environment: String,
    pub build: BuildReference,
    pub selected_components: BTreeSet<String>,
    pub skip_components: BTreeSet<String>,
    pub property_overrides: Vec<PropertyPair>,
}
