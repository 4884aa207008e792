//! Flatten component trees into deployable names.

use std::collections::HashSet;

use crate::error::{PlanError, PlanResult};

use super::Component;

/// Recursion bound used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Pre-order, de-duplicated names of every deployable component under `roots`.
///
/// Folders contribute their deployable descendants. A name seen earlier
/// anywhere in the traversal is not repeated. Fails with
/// [`PlanError::TreeTooDeep`] beyond [`DEFAULT_MAX_DEPTH`] levels.
pub fn flatten_deployable(roots: &[Component]) -> PlanResult<Vec<String>> {
    flatten_with_limit(roots, DEFAULT_MAX_DEPTH)
}

/// [`flatten_deployable`] with an explicit recursion bound.
pub fn flatten_with_limit(roots: &[Component], max_depth: usize) -> PlanResult<Vec<String>> {
    let mut acc = Accumulator::default();
    for root in roots {
        acc.visit(root, 1, max_depth)?;
    }
    Ok(acc.names)
}

/// Whether a component named `name` exists anywhere under `roots`.
///
/// Fails with [`PlanError::TreeTooDeep`] when the search passes `max_depth`
/// levels before finding `name`.
pub fn contains_component(roots: &[Component], name: &str, max_depth: usize) -> PlanResult<bool> {
    search(roots, name, 1, max_depth)
}

fn search(roots: &[Component], name: &str, depth: usize, max_depth: usize) -> PlanResult<bool> {
    for component in roots {
        if depth > max_depth {
            return Err(too_deep(component, max_depth));
        }
        if component.name == name || search(&component.children, name, depth + 1, max_depth)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn too_deep(component: &Component, limit: usize) -> PlanError {
    PlanError::TreeTooDeep {
        component: component.name.clone(),
        limit,
    }
}

#[derive(Default)]
struct Accumulator<'a> {
    names: Vec<String>,
    seen: HashSet<&'a str>,
}

impl<'a> Accumulator<'a> {
    fn visit(
        &mut self,
        component: &'a Component,
        depth: usize,
        max_depth: usize,
    ) -> PlanResult<()> {
        if depth > max_depth {
            return Err(too_deep(component, max_depth));
        }

        if component.is_deployable() && self.seen.insert(component.name.as_str()) {
            self.names.push(component.name.clone());
        }

        for child in &component.children {
            self.visit(child, depth + 1, max_depth)?;
        }
        Ok(())
    }
}
