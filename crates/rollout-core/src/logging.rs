//! Tracing setup for processes embedding the planner.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global fmt subscriber filtered by `RUST_LOG`.
///
/// `default_directive` applies when `RUST_LOG` is unset or invalid, e.g.
/// `"rollout_core=debug,info"`. Fails if a global subscriber already exists.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_fails() {
        let _ = init_tracing("rollout_core=debug");
        assert!(init_tracing("info").is_err());
    }
}
