use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install a subscriber writing to the test output. Respects `RUST_LOG`, defaults to `warn`.
/// Safe to call from every test.
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_test_writer()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
