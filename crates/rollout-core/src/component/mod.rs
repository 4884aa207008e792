//! Project component trees.
//!
//! A component with a script path is deployable; one without is an
//! organisational folder whose deployable descendants still count.

mod flatten;

use serde::{Deserialize, Serialize};

pub use flatten::{DEFAULT_MAX_DEPTH, contains_component, flatten_deployable, flatten_with_limit};

/// A node in a project's component forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Unique within the project
    pub name: String,
    /// Script run for this component; empty for folders
    #[serde(default)]
    pub script_path: String,
    /// Owned child components
    #[serde(default)]
    pub children: Vec<Component>,
}

impl Component {
    /// A deployable component without children.
    pub fn leaf(name: impl Into<String>, script_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script_path: script_path.into(),
            children: Vec::new(),
        }
    }

    /// A non-deployable grouping component.
    pub fn folder(name: impl Into<String>) -> Self {
        Self::leaf(name, "")
    }

    /// Append a child, builder style.
    #[must_use]
    pub fn with_child(mut self, child: Component) -> Self {
        self.children.push(child);
        self
    }

    /// Whether this component carries a script of its own.
    pub fn is_deployable(&self) -> bool {
        !self.script_path.is_empty()
    }
}
