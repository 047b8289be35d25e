//! Prometheus Exposition
//!
//! Renders counters and gauges in the Prometheus text format. A fresh
//! registry is built per scrape from the store's current values, so the
//! store itself stays the only source of truth.

use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::aggregate::AggregateStore;

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

impl AggregateStore {
    /// Renders every counter and gauge as Prometheus text.
    ///
    /// Metrics whose names the format cannot represent are skipped with a
    /// warning rather than failing the whole scrape.
    pub fn render_exposition(&self) -> Result<String, prometheus::Error> {
        let registry = Registry::new();

        for (name, value) in self.counters() {
            let registered = IntCounter::with_opts(Opts::new(name.as_str(), self.help_for(&name)))
                .and_then(|counter| {
                    counter.inc_by(value);
                    registry.register(Box::new(counter))
                });
            if let Err(e) = registered {
                warn!(metric = %name, error = %e, "counter left out of exposition");
            }
        }

        for (name, value) in self.gauges() {
            let registered = IntGauge::with_opts(Opts::new(name.as_str(), self.help_for(&name)))
                .and_then(|gauge| {
                    gauge.set(value);
                    registry.register(Box::new(gauge))
                });
            if let Err(e) = registered {
                warn!(metric = %name, error = %e, "gauge left out of exposition");
            }
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
