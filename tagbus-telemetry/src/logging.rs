//! ## tagbus-telemetry::logging
//! **Structured logging through `tracing`**
//!
//! `RUST_LOG` always wins; otherwise the configured level applies to every
//! target.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    fn filter(level: &str) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }

    /// Installs the global subscriber.
    ///
    /// # Panics
    /// If a global subscriber is already installed.
    pub fn init(level: &str) {
        fmt()
            .with_env_filter(Self::filter(level))
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .init()
    }

    /// Like [`EventLogger::init`] but returns `false` instead of panicking
    /// when a subscriber is already in place.
    pub fn try_init(level: &str) -> bool {
        fmt()
            .with_env_filter(Self::filter(level))
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .is_ok()
    }

    /// Emits one structured record for a bus event.
    #[inline]
    pub fn log_event(direction: &str, event: &str, argc: usize) {
        let span = tracing::debug_span!("bus_event", direction = direction, event = event);
        let _guard = span.enter();
        tracing::debug!(argc, "Bus event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logging() {
        EventLogger::log_event("inbound", "ping", 1);
        assert!(logs_contain("Bus event"));
        assert!(logs_contain("ping"));
    }

    #[test]
    fn test_second_init_is_refused() {
        let first = EventLogger::try_init("info");
        assert!(!EventLogger::try_init("info") || !first);
    }
}
