//! Candidate build listing and the pinned-build policy.

use serde::{Deserialize, Serialize};

use crate::environment::Environment;

use super::client::Build;

/// Appended to the display name of builds kept forever.
pub const PINNED_SUFFIX: &str = " [PINNED]";

/// A build offered to the caller for deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCandidate {
    pub display_name: String,
    pub build_number: String,
    /// Value to put in [`BuildReference::locator`](super::BuildReference::locator)
    pub locator: String,
    pub pinned: bool,
}

/// Apply the pinned-build policy for `target`.
///
/// Production and secure targets only see builds kept forever. Any build
/// kept forever is labelled with [`PINNED_SUFFIX`]. Input order is kept.
pub fn candidates_for(builds: Vec<Build>, target: &Environment) -> Vec<BuildCandidate> {
    let pinned_only = target.requires_pinned_builds();
    builds
        .into_iter()
        .filter(|build| !pinned_only || build.keep_forever)
        .map(|build| {
            let display_name = if build.keep_forever {
                format!("{}{}", build.number, PINNED_SUFFIX)
            } else {
                build.number.clone()
            };
            let locator = if build.url.is_empty() {
                build.uri
            } else {
                build.url
            };
            BuildCandidate {
                display_name,
                build_number: build.number,
                locator,
                pinned: build.keep_forever,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(number: &str, keep_forever: bool) -> Build {
        Build {
            number: number.to_string(),
            url: format!("https://tfs/builds/{number}"),
            keep_forever,
            ..Build::default()
        }
    }

    #[test]
    fn test_production_target_only_sees_pinned_builds() {
        let builds = vec![build("1.0", false), build("1.1", true), build("1.2", false)];
        let target = Environment::new(1, "PROD").production();

        let candidates = candidates_for(builds, &target);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].display_name, "1.1 [PINNED]");
        assert!(candidates.iter().all(|c| c.display_name.ends_with(PINNED_SUFFIX)));
    }

    #[test]
    fn test_secure_target_is_pinned_only() {
        let target = Environment::new(1, "SEC").secure();
        let candidates = candidates_for(vec![build("2.0", false)], &target);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_non_production_target_sees_all_builds() {
        let builds = vec![build("1.0", false), build("1.1", true)];
        let candidates = candidates_for(builds, &Environment::new(2, "DEV"));

        let names: Vec<_> = candidates.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["1.0", "1.1 [PINNED]"]);
        assert_eq!(candidates[0].locator, "https://tfs/builds/1.0");
    }

    #[test]
    fn test_locator_falls_back_to_uri() {
        let b = Build {
            number: "3.0".to_string(),
            uri: "vstfs:///Build/Build/3".to_string(),
            ..Build::default()
        };
        let candidates = candidates_for(vec![b], &Environment::new(2, "DEV"));
        assert_eq!(candidates[0].locator, "vstfs:///Build/Build/3");
    }
}
