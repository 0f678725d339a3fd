use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is not set; heartbeats are debug level
pub const DEFAULT_FILTER: &str = "trendbot=info,trendbot::strategy=debug";

/// Install the global fmt subscriber. `RUST_LOG` overrides `default_filter`.
///
/// Returns an error if a global subscriber is already installed.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}
