//! Projects, environments and the topology rows read from storage.

use serde::{Deserialize, Serialize};

use crate::artifact::ProjectArtifactConfig;

/// A deployable project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    /// Where this project's builds are published
    pub artifact: ProjectArtifactConfig,
}

/// A deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub production: bool,
    #[serde(default)]
    pub secure: bool,
}

impl Environment {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            production: false,
            secure: false,
        }
    }

    #[must_use]
    pub fn production(mut self) -> Self {
        self.production = true;
        self
    }

    #[must_use]
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Production and secure environments only accept builds kept forever.
    pub fn requires_pinned_builds(&self) -> bool {
        self.production || self.secure
    }
}

/// The build currently deployed for one component in one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentBuildStatus {
    pub component: String,
    pub build_number: String,
    pub drop_location: String,
    pub uri: String,
    pub project: String,
}

/// A machine attached to an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    pub os_name: String,
    /// Roles the server plays, e.g. "Web" or "App Server"
    pub application_tags: Vec<String>,
    pub daemons: Vec<Daemon>,
}

/// A service or daemon installed on a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Daemon {
    pub name: String,
    pub display_name: String,
    pub account: String,
    pub daemon_type: String,
}

/// A database attached to an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub server: String,
    pub db_type: String,
}

impl Database {
    pub fn new(
        name: impl Into<String>,
        server: impl Into<String>,
        db_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            db_type: db_type.into(),
        }
    }
}

/// Roles granted to one user on one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseGrant {
    pub database: String,
    pub user: String,
    pub roles: Vec<String>,
}
