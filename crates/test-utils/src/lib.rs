pub mod builders;
pub mod fake_builder;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Install a per-test tracing subscriber.
///
/// Output goes through the test writer, so the harness only shows it for
/// failing tests (or under `-- --nocapture`). `RUST_LOG` directives pick the
/// level, defaulting to `info`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Bound a future so a wedged Filer fails the test instead of hanging it.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("future did not finish within 5s")
}
