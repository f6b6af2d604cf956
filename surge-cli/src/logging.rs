use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr subscriber. `-v` flags win over `RUST_LOG`; with
/// neither, only warnings and errors are shown.
pub fn init(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
