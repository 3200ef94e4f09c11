#![allow(dead_code)]

pub mod mock_server;
pub mod tls;

/// Install a test subscriber; repeated calls are harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keysweep=debug")),
        )
        .with_test_writer()
        .try_init();
}
