use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and expose a static gauge for the cache TTL.
    /// The recorder is process-global, so call this once from the binary.
    pub fn init(cache_ttl: Duration) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        // Absolute TTL, no sliding refresh
        describe_gauge!("events_cache_ttl_secs", "Configured events cache TTL in seconds.");
        gauge!("events_cache_ttl_secs").set(cache_ttl.as_secs_f64());

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
