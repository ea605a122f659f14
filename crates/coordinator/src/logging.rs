use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize console logging with an `RUST_LOG` env filter.
///
/// Defaults to `info` when `RUST_LOG` is unset or unparseable. Safe to call
/// once per process; subsequent calls return an error from the subscriber
/// registry.
pub fn init_logging() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    Ok(())
}
