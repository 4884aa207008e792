//! Text form of request documents.
//!
//! The text is persisted and read back by the execution runner, so field
//! names and list order must stay stable.

use crate::error::{PlanError, PlanResult};

use super::DeploymentRequestDetail;

/// Converts request documents to and from JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSerializer;

impl RequestSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(&self, detail: &DeploymentRequestDetail) -> PlanResult<String> {
        serde_json::to_string_pretty(detail).map_err(|e| {
            PlanError::Serialisation(format!(
                "request for environment {}: {}",
                detail.environment, e
            ))
        })
    }

    pub fn deserialize(&self, text: &str) -> PlanResult<DeploymentRequestDetail> {
        serde_json::from_str(text).map_err(|e| PlanError::Parse(e.to_string()))
    }
}
