//! Test helpers
//!
//! Shared setup for integration tests: a fixture-backed service factory,
//! a recording transport, and seed-data builders.

pub mod test_data;
pub mod transport_mock;

#[allow(unused_imports)]
pub use test_data::*;
#[allow(unused_imports)]
pub use transport_mock::*;

use std::sync::Arc;

use retreat_ops::config::Settings;
use retreat_ops::database::Repositories;
use retreat_ops::services::ServiceFactory;

pub struct TestContext {
    pub services: ServiceFactory,
    pub transport: Arc<transport_mock::RecordingTransport>,
}

/// Build a service factory over the in-memory fixture backend with a
/// recording transport.
pub fn test_context() -> TestContext {
    let mut settings = Settings::default();
    settings.notifications.throttle_ms = 0;
    settings.notifications.send_timeout_seconds = 2;

    let repositories = Repositories::fixture();
    let transport = Arc::new(transport_mock::RecordingTransport::new());
    let services = ServiceFactory::new(&settings, repositories, transport.clone());

    TestContext {
        services,
        transport,
    }
}
