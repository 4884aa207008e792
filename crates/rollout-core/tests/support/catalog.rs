use std::sync::Arc;

use rollout_core::artifact::ProjectArtifactConfig;
use rollout_core::component::Component;
use rollout_core::environment::{ComponentBuildStatus, Environment, Project};
use rollout_core::plan::DeploymentPlanAssembler;
use rollout_core::store::{DependencyOrdering, MemoryCatalog};

pub const DEV: u64 = 1;
pub const UAT: u64 = 2;
pub const PROD: u64 = 3;

pub fn status(component: &str, build_number: &str) -> ComponentBuildStatus {
    ComponentBuildStatus {
        component: component.to_string(),
        build_number: build_number.to_string(),
        drop_location: format!(r"\\fs01\drops\Payments\{build_number}"),
        uri: format!("vstfs:///Build/Build/{build_number}"),
        project: "Payments".to_string(),
    }
}

/// Payments (DB, API, UI) plus an unrelated Billing project.
///
/// DEV has DB and API on build 2024.1 and UI on 2024.2.
pub fn payments_catalog(artifact: ProjectArtifactConfig) -> Arc<MemoryCatalog> {
    let catalog = Arc::new(MemoryCatalog::new());
    catalog
        .add_project(
            Project {
                id: 10,
                name: "Payments".to_string(),
                artifact,
            },
            vec![
                Component::leaf("UI", "deploy-ui.ps1"),
                Component::leaf("API", "deploy-api.ps1"),
                Component::leaf("DB", "deploy-db.ps1"),
            ],
        )
        .unwrap();
    catalog
        .add_project(
            Project {
                id: 20,
                name: "Billing".to_string(),
                artifact: ProjectArtifactConfig::new(r"\\fs01\billing"),
            },
            vec![Component::leaf("Ledger", "deploy-ledger.ps1")],
        )
        .unwrap();

    catalog.add_environment(Environment::new(DEV, "DEV")).unwrap();
    catalog.add_environment(Environment::new(UAT, "UAT")).unwrap();
    catalog
        .add_environment(Environment::new(PROD, "PROD").production())
        .unwrap();

    catalog
        .set_statuses(
            DEV,
            vec![
                status("DB", "2024.1"),
                status("API", "2024.1"),
                status("UI", "2024.2"),
            ],
        )
        .unwrap();
    catalog
}

/// Assembler ordering DB before API before UI.
pub fn assembler(catalog: &Arc<MemoryCatalog>) -> DeploymentPlanAssembler {
    let ordering = DependencyOrdering::new(catalog.clone())
        .with_dependency("API", "DB")
        .with_dependency("UI", "API");
    DeploymentPlanAssembler::new(catalog.clone(), catalog.clone(), Arc::new(ordering))
}
