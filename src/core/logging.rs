use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` wins over `directives`.
pub fn init_tracing(directives: &str) {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directives.to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if let Err(e) = result {
        // Already installed, e.g. by a test harness
        tracing::debug!("Tracing subscriber not installed: {}", e);
    }
}
