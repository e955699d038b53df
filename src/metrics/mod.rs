use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    Opts, Registry, TextEncoder,
};

use crate::error::Error;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Customer commands (outcome per command, latency)
// - Event store appends and concurrency conflicts
// - Customer queries
//
// Metrics live in their own Registry; `render` produces the text exposition
// ============================================================================

pub const OUTCOME_OK: &str = "ok";

/// Central metrics registry for the application
pub struct Metrics {
    registry: Registry,

    // Command Metrics
    pub commands_total: IntCounterVec,
    pub command_duration: HistogramVec,

    // Event Store Metrics
    pub appended_events_total: IntCounter,
    pub concurrency_conflicts_total: IntCounter,

    // Query Metrics
    pub queries_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Command Metrics
        let commands_total = IntCounterVec::new(
            Opts::new("customer_commands_total", "Total customer commands handled"),
            &["command", "outcome"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new(
                "customer_command_duration_seconds",
                "Customer command handling duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["command"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        // Event Store Metrics
        let appended_events_total = IntCounter::new(
            "event_store_appended_events_total",
            "Total events appended to the event store",
        )?;
        registry.register(Box::new(appended_events_total.clone()))?;

        let concurrency_conflicts_total = IntCounter::new(
            "event_store_concurrency_conflicts_total",
            "Total appends rejected by the optimistic version check",
        )?;
        registry.register(Box::new(concurrency_conflicts_total.clone()))?;

        // Query Metrics
        let queries_total = IntCounterVec::new(
            Opts::new("customer_queries_total", "Total customer queries handled"),
            &["outcome"],
        )?;
        registry.register(Box::new(queries_total.clone()))?;

        Ok(Self {
            registry,
            commands_total,
            command_duration,
            appended_events_total,
            concurrency_conflicts_total,
            queries_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record the outcome and duration of one command
    pub fn record_command(&self, command: &str, duration_secs: f64, outcome: Result<(), &Error>) {
        let label = match outcome {
            Ok(()) => OUTCOME_OK,
            Err(err) => {
                if let Error::ConcurrencyConflict(_) = err {
                    self.concurrency_conflicts_total.inc();
                }
                err.kind().as_str()
            }
        };

        self.commands_total.with_label_values(&[command, label]).inc();
        self.command_duration.with_label_values(&[command]).observe(duration_secs);
    }

    pub fn record_appended_events(&self, count: usize) {
        self.appended_events_total.inc_by(count as u64);
    }

    pub fn record_query(&self, outcome: Result<(), &Error>) {
        let label = match outcome {
            Ok(()) => OUTCOME_OK,
            Err(err) => err.kind().as_str(),
        };
        self.queries_total.with_label_values(&[label]).inc();
    }

    /// Text exposition of everything registered
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}
