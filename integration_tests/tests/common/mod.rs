//! Common test utilities and fixtures
#![allow(dead_code)]

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialize test logging (call once per test module)
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::from_default_env()
            .add_directive("airtunes_receiver=debug".parse().unwrap());

        fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Build a receiver configuration suited to fast-running tests: an
/// auto-assigned port and short session timeout.
pub fn test_config() -> airtunes_receiver::ReceiverConfig {
    airtunes_receiver::ReceiverConfig::with_name("test-receiver")
        .port(0)
        .latency_ms(100)
}
