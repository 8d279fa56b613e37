//! Native log output for the CLI. The library only emits `tracing` events.

use tracing_subscriber::{fmt, EnvFilter};

/// Session transitions at info, everything else from dependencies at warn.
const DEFAULT_FILTER: &str = "warn,bitfrac=info";

/// `BITFRAC_LOG` takes precedence over `RUST_LOG`.
fn filter_directives() -> String {
    ["BITFRAC_LOG", "RUST_LOG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the stderr subscriber: pretty by default, JSON lines with
/// `BITFRAC_LOG_JSON=1`. A second call is a no-op.
pub fn init_logging() {
    let directives = filter_directives();
    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("bitfrac: ignoring log filter {directives:?}: {e}");
        EnvFilter::new(DEFAULT_FILTER)
    });
    let json = std::env::var("BITFRAC_LOG_JSON").is_ok_and(|value| value == "1");

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
}
