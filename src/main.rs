//! Pet News Events API — Binary Entrypoint
//! Boots the Axum HTTP server: config, tracing, metrics, routes.

use pet_news_events::{build_state, create_router, metrics::Metrics, ServiceConfig};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON with `LOG_FORMAT=json`. `RUST_LOG` overrides
/// the filter. Uses `try_init` since the runtime may have installed its own.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pet_news_events=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = ServiceConfig::load()?;
    tracing::info!(
        source_url = %cfg.source_url,
        ttl_secs = cfg.cache_ttl_secs,
        max_retries = cfg.max_retries,
        "config loaded"
    );

    let state = build_state(&cfg)?;
    let metrics = Metrics::init(state.scraper.cache().ttl())?;
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
