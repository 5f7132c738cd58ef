//! Round lifecycle metrics
//!
//! Each coordinator owns its own registry so tests never share counters.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub struct RoundMetrics {
    registry: Registry,
    transitions: IntCounterVec,
    next_round_id: IntGauge,
    round_active: IntGauge,
}

impl RoundMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions = IntCounterVec::new(
            Opts::new(
                "crash_round_transitions_total",
                "Round transitions submitted to the program",
            ),
            &["operation", "outcome"],
        )
        .expect("static metric definition is valid");
        let next_round_id = IntGauge::new("crash_next_round_id", "Round id the coordinator will mint next")
            .expect("static metric definition is valid");
        let round_active = IntGauge::new("crash_round_active", "1 while a round is pending or active")
            .expect("static metric definition is valid");

        for collector in [
            Box::new(transitions.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(next_round_id.clone()),
            Box::new(round_active.clone()),
        ] {
            // Fresh registry, names are unique
            let _ = registry.register(collector);
        }

        Self {
            registry,
            transitions,
            next_round_id,
            round_active,
        }
    }

    /// Count one transition attempt; `operation` is start/end/initialize/update_config
    pub fn record(&self, operation: &str, succeeded: bool) {
        let outcome = if succeeded { "ok" } else { "error" };
        self.transitions.with_label_values(&[operation, outcome]).inc();
    }

    pub fn set_next_round_id(&self, round_id: u64) {
        self.next_round_id.set(i64::try_from(round_id).unwrap_or(i64::MAX));
    }

    pub fn set_round_active(&self, active: bool) {
        self.round_active.set(i64::from(active));
    }

    pub fn transitions(&self, operation: &str, succeeded: bool) -> u64 {
        let outcome = if succeeded { "ok" } else { "error" };
        self.transitions.with_label_values(&[operation, outcome]).get()
    }

    /// Prometheus text exposition
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for RoundMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_render() {
        let metrics = RoundMetrics::new();
        metrics.record("start", true);
        metrics.record("start", true);
        metrics.record("end", false);
        metrics.set_next_round_id(12);
        metrics.set_round_active(true);

        assert_eq!(metrics.transitions("start", true), 2);
        assert_eq!(metrics.transitions("end", false), 1);

        let text = metrics.render();
        assert!(text.contains("crash_round_transitions_total"));
        assert!(text.contains("crash_next_round_id 12"));
        assert!(text.contains("crash_round_active 1"));
    }
}
