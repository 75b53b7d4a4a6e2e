use shared::metrics_defs::{MetricDef, MetricType};

pub const DISPATCH_RESOLVED: MetricDef = MetricDef {
    name: "dispatch.resolved",
    metric_type: MetricType::Counter,
    description: "Requests resolved to a route, by a rule or the default decomposition. Tagged with source.",
};

pub const DISPATCH_REDIRECT: MetricDef = MetricDef {
    name: "dispatch.redirect",
    metric_type: MetricType::Counter,
    description: "Requests answered with a redirect. Tagged with status.",
};

pub const DISPATCH_HANDLED: MetricDef = MetricDef {
    name: "dispatch.handled",
    metric_type: MetricType::Counter,
    description: "Requests answered by an inline handler",
};

pub const DISPATCH_NO_MATCH: MetricDef = MetricDef {
    name: "dispatch.no_match",
    metric_type: MetricType::Counter,
    description: "Requests no rule matched",
};

pub const DISPATCH_DURATION: MetricDef = MetricDef {
    name: "dispatch.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent resolving a request in seconds. Tagged with outcome.",
};

pub const ROUTER_RELOADS: MetricDef = MetricDef {
    name: "router.reloads",
    metric_type: MetricType::Counter,
    description: "Routing rule reloads. Tagged with result.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    DISPATCH_RESOLVED,
    DISPATCH_REDIRECT,
    DISPATCH_HANDLED,
    DISPATCH_NO_MATCH,
    DISPATCH_DURATION,
    ROUTER_RELOADS,
];
