use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for all metrics tracked by Prometheus.
///
/// Each instance owns its registry, so several dispatchers can live in one process.
pub struct Metrics {
    registry: Registry,
    pub invocations: IntCounterVec,
    pub prompts: IntCounter,
}
impl Metrics {
    pub fn new() -> anyhow::Result<Metrics> {
        let registry = Registry::new();

        let invocations = IntCounterVec::new(
            Opts::new("parley_invocations_total", "Finished invocations by outcome"),
            &["outcome"],
        )?;
        let prompts = IntCounter::new("parley_prompts_total", "Argument prompts sent")?;

        registry.register(Box::new(invocations.clone()))?;
        registry.register(Box::new(prompts.clone()))?;

        Ok(Metrics {
            registry,
            invocations,
            prompts,
        })
    }

    pub fn add_invocation(&self, outcome: &str) {
        self.invocations.with_label_values(&[outcome]).inc();
    }

    pub fn add_prompt(&self) {
        self.prompts.inc();
    }

    pub fn invocation_count(&self, outcome: &str) -> u64 {
        self.invocations.with_label_values(&[outcome]).get()
    }

    /// Every metric in the Prometheus text format.
    pub fn gather(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
