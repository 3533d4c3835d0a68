use prometheus::{CounterVec, HistogramVec, Opts, Registry};

/// Per-controller Prometheus instrumentation. One instance is created per
/// reconciler (`binding`, `nodeset`, `autoscaler`, `backup`), each
/// registered under its own `controller` constant label so the counters
/// don't collide in the shared registry.
#[derive(Clone)]
pub struct ControllerMetrics {
    pub reconcile_counter: CounterVec,
    pub read_histogram: HistogramVec,
    pub write_histogram: HistogramVec,
    pub action_counter: CounterVec,
}

impl ControllerMetrics {
    pub fn new(controller: &str) -> Self {
        let reconcile_counter = CounterVec::new(
            Opts::new(
                "platform_operator_reconcile_total",
                "Total number of reconciles processed",
            )
            .const_label("controller", controller),
            &["name", "namespace"],
        )
        .unwrap();

        let read_histogram = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "platform_operator_reconcile_read_seconds",
                "Time spent determining the reconcile action",
            )
            .const_label("controller", controller),
            &["name", "namespace", "action"],
        )
        .unwrap();

        let write_histogram = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "platform_operator_reconcile_write_seconds",
                "Time spent applying the reconcile action",
            )
            .const_label("controller", controller),
            &["name", "namespace", "action"],
        )
        .unwrap();

        let action_counter = CounterVec::new(
            Opts::new(
                "platform_operator_reconcile_actions_total",
                "Count of reconcile actions taken, by kind",
            )
            .const_label("controller", controller),
            &["name", "namespace", "action"],
        )
        .unwrap();

        Self {
            reconcile_counter,
            read_histogram,
            write_histogram,
            action_counter,
        }
    }

    pub fn register(&self, registry: &Registry) {
        registry
            .register(Box::new(self.reconcile_counter.clone()))
            .ok();
        registry
            .register(Box::new(self.read_histogram.clone()))
            .ok();
        registry
            .register(Box::new(self.write_histogram.clone()))
            .ok();
        registry
            .register(Box::new(self.action_counter.clone()))
            .ok();
    }
}
