//! Metric Catalog
//!
//! Descriptors for metrics known up front. Catalogued metrics exist at zero
//! from startup, carry help text for exposition, and fix the kind of their
//! name when a snapshot is restored.

// == Metric Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic, never decreases
    Counter,
    /// Moves up and down by one, may go negative
    Gauge,
}

// == Metric Descriptor ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
}

impl MetricDescriptor {
    pub const fn counter(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
        }
    }

    pub const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
        }
    }
}

// == Default Catalog ==
pub const TOTAL_REQUESTS: &str = "total_requests";
pub const TOTAL_RECEIVED_HISTORICAL_DATA: &str = "total_recived_historical_data";
pub const TOTAL_RECEIVED_ONLINE_DATA: &str = "total_recived_online_data";
pub const TOTAL_CACHING_DATA: &str = "total_caching_data";
pub const ACTIVE_REQUESTS: &str = "active_requests";

/// Identity set tracking users with requests in flight.
pub const ACTIVE_USERS: &str = "active_users";

/// Metrics served by the metrics service.
///
/// The historical/online names keep their established spelling so existing
/// dashboards and backup files keep matching.
pub const DEFAULT_CATALOG: &[MetricDescriptor] = &[
    MetricDescriptor::counter(TOTAL_REQUESTS, "Total number of requests received"),
    MetricDescriptor::counter(
        TOTAL_RECEIVED_HISTORICAL_DATA,
        "Total size of received historical data",
    ),
    MetricDescriptor::counter(
        TOTAL_RECEIVED_ONLINE_DATA,
        "Total size of received online data",
    ),
    MetricDescriptor::counter(TOTAL_CACHING_DATA, "Total size of caching data"),
    MetricDescriptor::gauge(ACTIVE_REQUESTS, "Current number of active requests"),
];

/// Identity sets served by the metrics service.
pub const DEFAULT_IDENTITY_SETS: &[&str] = &[ACTIVE_USERS];
