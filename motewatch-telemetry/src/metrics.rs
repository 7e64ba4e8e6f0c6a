//! ## motewatch-telemetry::metrics
//! **Prometheus registry for the observer loop**

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub processed_events: IntCounter,
    pub ignored_events: IntCounter,
    pub dropped_events: IntCounter,
    pub attack_transitions: IntCounterVec,
    pub control_messages: IntCounterVec,
    pub active_attacks: IntGauge,
    pub reception_rate: Gauge,
    pub delivery_ratio: Gauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let processed_events =
            IntCounter::new("motewatch_events_total", "Total events taken off the feed")?;
        let ignored_events = IntCounter::new(
            "motewatch_ignored_events_total",
            "Log lines that were not packet events",
        )?;
        let dropped_events = IntCounter::new(
            "motewatch_dropped_events_total",
            "Packet events with an out-of-range node id",
        )?;
        let attack_transitions = IntCounterVec::new(
            Opts::new(
                "motewatch_attack_transitions_total",
                "Attack scheduler outcomes by kind",
            ),
            &["kind"],
        )?;
        let control_messages = IntCounterVec::new(
            Opts::new(
                "motewatch_control_messages_total",
                "RPL control messages sent by motes, by kind",
            ),
            &["kind"],
        )?;
        let active_attacks = IntGauge::new("motewatch_active_attacks", "Attacks currently active")?;
        let reception_rate = Gauge::new(
            "motewatch_packet_reception_rate",
            "Network-wide received / sent",
        )?;
        let delivery_ratio = Gauge::new(
            "motewatch_packet_delivery_ratio_percent",
            "Network-wide delivery ratio in percent",
        )?;

        registry.register(Box::new(processed_events.clone()))?;
        registry.register(Box::new(ignored_events.clone()))?;
        registry.register(Box::new(dropped_events.clone()))?;
        registry.register(Box::new(attack_transitions.clone()))?;
        registry.register(Box::new(control_messages.clone()))?;
        registry.register(Box::new(active_attacks.clone()))?;
        registry.register(Box::new(reception_rate.clone()))?;
        registry.register(Box::new(delivery_ratio.clone()))?;

        Ok(Self {
            registry,
            processed_events,
            ignored_events,
            dropped_events,
            attack_transitions,
            control_messages,
            active_attacks,
            reception_rate,
            delivery_ratio,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn inc_processed_events(&self) {
        self.processed_events.inc();
    }

    pub fn record_attack_transition(&self, kind: &str) {
        self.attack_transitions.with_label_values(&[kind]).inc();
    }

    pub fn record_control_message(&self, kind: &str) {
        self.control_messages.with_label_values(&[kind]).inc();
    }

    /// Withheld ratios leave the gauges at their previous value.
    pub fn record_ratios(&self, reception_rate: Option<f64>, delivery_ratio: Option<f64>) {
        if let Some(rate) = reception_rate {
            self.reception_rate.set(rate);
        }
        if let Some(pdr) = delivery_ratio {
            self.delivery_ratio.set(pdr);
        }
    }
}
