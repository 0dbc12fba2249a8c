use biometrics::{Collector, Counter, Moments};
use tracing_subscriber::EnvFilter;

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("rbot.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("rbot.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("rbot.client.request_duration_seconds");

pub(crate) static SESSIONS_SAVED: Counter = Counter::new("rbot.sessions.saved");
pub(crate) static SESSIONS_LOADED: Counter = Counter::new("rbot.sessions.loaded");

pub(crate) static WEB_REQUESTS: Counter = Counter::new("rbot.web.requests");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSIONS_SAVED);
    collector.register_counter(&SESSIONS_LOADED);

    collector.register_counter(&WEB_REQUESTS);
}

/// Installs the stderr log subscriber used by the binaries.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .try_init();
}
