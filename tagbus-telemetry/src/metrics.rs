//! ## tagbus-telemetry::metrics
//! **Prometheus counters for event traffic**

use prometheus::{IntCounter, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub events_sent: IntCounter,
    pub events_received: IntCounter,
    pub events_dispatched: IntCounter,
    pub events_ignored: IntCounter,
    pub dispatch_errors: IntCounter,
    pub decode_errors: IntCounter,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let counter = IntCounter::new(name, help)?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        Ok(Self {
            events_sent: counter("tagbus_events_sent_total", "Events handed to the transport")?,
            events_received: counter(
                "tagbus_events_received_total",
                "Inbound messages drained from the transport",
            )?,
            events_dispatched: counter(
                "tagbus_events_dispatched_total",
                "Inbound events delivered to a handler",
            )?,
            events_ignored: counter(
                "tagbus_events_ignored_total",
                "Inbound events with no registered handler",
            )?,
            dispatch_errors: counter(
                "tagbus_dispatch_errors_total",
                "Inbound events rejected by a typed handler signature",
            )?,
            decode_errors: counter(
                "tagbus_decode_errors_total",
                "Inbound messages that could not be decoded",
            )?,
            registry,
        })
    }

    pub fn inc_sent(&self) {
        self.events_sent.inc();
    }

    pub fn inc_received(&self) {
        self.events_received.inc();
    }

    pub fn inc_dispatched(&self) {
        self.events_dispatched.inc();
    }

    pub fn inc_ignored(&self) {
        self.events_ignored.inc();
    }

    pub fn inc_dispatch_errors(&self) {
        self.dispatch_errors.inc();
    }

    pub fn inc_decode_errors(&self) {
        self.decode_errors.inc();
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.inc_sent();
        metrics.dispatch_errors.inc_by(2);
        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("tagbus_events_sent_total 1"));
        assert!(text.contains("tagbus_dispatch_errors_total 2"));
        assert!(text.contains("tagbus_events_ignored_total 0"));
    }

    #[test]
    fn recorders_are_independent() {
        let a = MetricsRecorder::new().unwrap();
        let b = MetricsRecorder::new().unwrap();
        a.events_received.inc();
        assert_eq!(b.events_received.get(), 0);
    }
}
