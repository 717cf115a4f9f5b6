//! Prometheus Metrics Registry - Keeper Observability
//!
//! Registers the `grinder_*` metric families and renders them in the
//! text exposition format for `GET /metrics`. Covers cycle outcomes,
//! accepted candidates, probe failures, batch cost and the inputs of
//! the cost gate (native price, gas price).

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Centralized Prometheus metrics for the keeper.
pub struct MetricsRegistry {
    registry: Registry,
    /// Finished grind cycles by outcome (`submitted`, `empty`, `over_budget`, ...).
    pub cycles: IntCounterVec,
    /// Candidates accepted by the validity prober, by operation.
    pub candidates_accepted: IntCounterVec,
    /// Probes that errored (counted as rejections).
    pub probe_failures: IntCounter,
    /// Batch transactions sent.
    pub batches_submitted: IntCounter,
    /// USD cost of each assessed batch.
    pub batch_cost_usd: Histogram,
    /// Last native/USD quote in use.
    pub native_price_usd: Gauge,
    /// Last observed gas price (gwei).
    pub gas_price_gwei: Gauge,
    /// Cursor position after the last cycle.
    pub cursor_position: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounterVec::new(
            Opts::new("grinder_cycles_total", "Grind cycles finished, by outcome"),
            &["outcome"],
        )?;

        let candidates_accepted = IntCounterVec::new(
            Opts::new(
                "grinder_candidates_accepted_total",
                "Operations that passed the single-position dry-run",
            ),
            &["op"],
        )?;

        let probe_failures = IntCounter::new(
            "grinder_probe_failures_total",
            "Dry-run probes that errored instead of answering",
        )?;

        let batches_submitted = IntCounter::new(
            "grinder_batches_submitted_total",
            "Batch transactions sent to the executor",
        )?;

        let batch_cost_usd = Histogram::with_opts(
            HistogramOpts::new("grinder_batch_cost_usd", "Estimated USD cost per assessed batch")
                .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;

        let native_price_usd = Gauge::new(
            "grinder_native_price_usd",
            "Native/USD quote used by the cost gate",
        )?;

        let gas_price_gwei = Gauge::new("grinder_gas_price_gwei", "Last observed gas price in gwei")?;

        let cursor_position = IntGauge::new(
            "grinder_cursor_position",
            "Cursor position in the intent population",
        )?;

        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(candidates_accepted.clone()))?;
        registry.register(Box::new(probe_failures.clone()))?;
        registry.register(Box::new(batches_submitted.clone()))?;
        registry.register(Box::new(batch_cost_usd.clone()))?;
        registry.register(Box::new(native_price_usd.clone()))?;
        registry.register(Box::new(gas_price_gwei.clone()))?;
        registry.register(Box::new(cursor_position.clone()))?;

        Ok(Self {
            registry,
            cycles,
            candidates_accepted,
            probe_failures,
            batches_submitted,
            batch_cost_usd,
            native_price_usd,
            gas_price_gwei,
            cursor_position,
        })
    }

    /// Encode all metric families in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
