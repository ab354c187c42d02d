//! Synthetic trace generation for simulations and tests.
//!
//! Traces model a small e-commerce service mesh: a gateway span fans out to a
//! few downstream services, each reported under its own resource. Output is a
//! pure function of the seed.

use crate::span::{Span, SpanEvent, SpanKind, SpanStatus};
use crate::trace::{ResourceSpan, ScopeSpan, Trace};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const SERVICES: [(&str, &[&str]); 5] = [
    ("user-service", &["/internal/users/:id", "/internal/auth/validate"]),
    ("order-service", &["/internal/orders", "/internal/orders/:id"]),
    ("product-service", &["/internal/products/search", "/internal/inventory"]),
    ("payment-service", &["/internal/charge", "/internal/refund"]),
    ("cache-service", &["/internal/get", "/internal/set"]),
];

const GATEWAY_ROUTES: [&str; 4] = ["/api/v2/users/:id", "/api/v2/orders", "/api/v2/checkout", "/health"];

const ENVIRONMENTS: [&str; 2] = ["production", "staging"];

/// Configuration for fixture generation.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Number of traces to generate.
    pub trace_count: usize,
    /// Probability that a trace contains an error span.
    pub error_rate: f64,
    /// Probability that a trace is slow.
    pub slow_rate: f64,
    /// Start time of the first trace, in nanoseconds.
    pub start_time_ns: u64,
    /// Gap between consecutive trace start times, in nanoseconds.
    pub interval_ns: u64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            trace_count: 100,
            error_rate: 0.05,
            slow_rate: 0.10,
            start_time_ns: 1_700_000_000_000_000_000,
            interval_ns: 10_000_000,
        }
    }
}

impl FixtureConfig {
    /// Sets the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the trace count.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.trace_count = count;
        self
    }

    /// Sets the error rate.
    #[must_use]
    pub const fn with_error_rate(mut self, rate: f64) -> Self {
        self.error_rate = rate;
        self
    }

    /// Sets the gap between trace start times.
    #[must_use]
    pub const fn with_interval_ns(mut self, interval_ns: u64) -> Self {
        self.interval_ns = interval_ns;
        self
    }
}

/// Seeded synthetic trace generator.
pub struct FixtureGenerator {
    rng: ChaCha8Rng,
    config: FixtureConfig,
    generated: u64,
}

impl FixtureGenerator {
    /// Creates a new fixture generator.
    #[must_use]
    pub fn new(config: FixtureConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            rng,
            config,
            generated: 0,
        }
    }

    /// Generates `trace_count` traces.
    #[must_use]
    pub fn generate(&mut self) -> Vec<Trace> {
        (0..self.config.trace_count).map(|_| self.next_trace()).collect()
    }

    /// Generates the next trace in the sequence.
    pub fn next_trace(&mut self) -> Trace {
        let trace_id = format!("{:032x}", self.rng.gen::<u128>());
        let start = self.config.start_time_ns + self.generated * self.config.interval_ns;
        self.generated += 1;

        let is_error = self.rng.gen_bool(self.config.error_rate.clamp(0.0, 1.0));
        let is_slow = self.rng.gen_bool(self.config.slow_rate.clamp(0.0, 1.0));
        let environment = ENVIRONMENTS[self.rng.gen_range(0..ENVIRONMENTS.len())];

        let root_id = self.span_id();
        let route = GATEWAY_ROUTES[self.rng.gen_range(0..GATEWAY_ROUTES.len())];
        let downstream = self.rng.gen_range(1..=3);
        let error_at = is_error.then(|| self.rng.gen_range(0..downstream));

        let mut cursor = start + self.rng.gen_range(100_000..1_000_000);
        let mut resource_spans = Vec::with_capacity(downstream + 1);

        for i in 0..downstream {
            let (service, routes) = SERVICES[self.rng.gen_range(0..SERVICES.len())];
            let child_route = routes[self.rng.gen_range(0..routes.len())];
            let base_ms: u64 = if service == "payment-service" { 400 } else { 30 };
            let duration_ms = if is_slow {
                base_ms * 20 + self.rng.gen_range(0..3_000)
            } else {
                base_ms + self.rng.gen_range(0..base_ms * 2)
            };
            let end = cursor + duration_ms * 1_000_000;

            let mut span = Span::new(self.span_id(), format!("GET {child_route}"))
                .with_trace_id(&trace_id)
                .with_parent(&root_id)
                .with_kind(SpanKind::Server)
                .with_times(cursor, end)
                .with_attribute("http.route", child_route)
                .with_attribute("retry", self.rng.gen_bool(0.1));

            if error_at == Some(i) {
                span = span
                    .with_status(SpanStatus::error("upstream failure"))
                    .with_attribute("http.status_code", 503i64)
                    .with_event(
                        SpanEvent::new("exception", end)
                            .with_attribute("exception.type", "TimeoutError"),
                    );
            } else {
                span = span
                    .with_status(SpanStatus::ok())
                    .with_attribute("http.status_code", 200i64);
            }

            resource_spans.push(
                ResourceSpan::new()
                    .with_resource_attribute("service.name", service)
                    .with_resource_attribute("deployment.environment", environment)
                    .with_scope_span(ScopeSpan::new(vec![span]).with_scope("otail.fixtures", "1.0.0")),
            );
            cursor = end;
        }

        let root_end = cursor + self.rng.gen_range(100_000..1_000_000);
        let mut root = Span::new(root_id, format!("GET {route}"))
            .with_trace_id(&trace_id)
            .with_kind(SpanKind::Server)
            .with_times(start, root_end)
            .with_attribute("http.method", "GET")
            .with_attribute("http.route", route)
            .with_attribute("http.status_code", if is_error { 500i64 } else { 200i64 });
        if is_error {
            root = root.with_status(SpanStatus::error("internal error"));
        }
        if self.rng.gen_bool(0.2) {
            root = root.with_trace_state(format!("vendor=p{}", self.rng.gen_range(0..4)));
        }

        resource_spans.insert(
            0,
            ResourceSpan::new()
                .with_resource_attribute("service.name", "api-gateway")
                .with_resource_attribute("deployment.environment", environment)
                .with_spans(vec![root]),
        );

        Trace {
            trace_id,
            resource_spans,
        }
    }

    fn span_id(&mut self) -> String {
        format!("{:016x}", self.rng.gen::<u64>())
    }
}
