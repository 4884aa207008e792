//! Hand planned requests to the persistence gateway.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{PlanError, PlanResult};
use crate::store::{RequestGateway, SubmissionMetadata};

use super::{DeploymentRequestDetail, RequestSerializer};

/// Serialize and submit each request in plan order.
///
/// Returns the issued identifiers in the same order. A failure after at
/// least one successful submission yields [`PlanError::PartialSubmission`]
/// with the identifiers issued so far; earlier submissions stay in place.
pub fn submit_plan(
    gateway: &dyn RequestGateway,
    serializer: &RequestSerializer,
    plan: &[DeploymentRequestDetail],
    requested_by: &str,
) -> PlanResult<Vec<u64>> {
    let requested_at = Utc::now();
    let mut submitted = Vec::with_capacity(plan.len());

    for (index, detail) in plan.iter().enumerate() {
        let metadata = SubmissionMetadata {
            target_environment: detail.environment.clone(),
            requested_by: requested_by.to_string(),
            requested_at,
            batch_index: index,
            batch_count: plan.len(),
        };

        let outcome = serializer
            .serialize(detail)
            .and_then(|text| gateway.submit_request(&text, &metadata));

        match outcome {
            Ok(id) => {
                info!(
                    request_id = id,
                    batch = index,
                    build_number = %detail.build.build_number,
                    "submitted deployment request"
                );
                submitted.push(id);
            }
            Err(e) if submitted.is_empty() => return Err(e),
            Err(e) => {
                warn!(batch = index, error = %e, "submission stopped part-way");
                return Err(PlanError::PartialSubmission {
                    submitted,
                    source: Box::new(e),
                });
            }
        }
    }

    Ok(submitted)
}
