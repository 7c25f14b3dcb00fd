//! Gateway example with per-client, per-endpoint admission control.
//!
//! Serves a small plant API on 127.0.0.1:3000 where `/search` is limited to
//! 3 requests per minute and everything else to 100 per minute.
//!
//! Try it:
//!
//! ```text
//! RUST_LOG=gateway_admission=debug cargo run --example gateway
//! for i in 1 2 3 4; do curl -si localhost:3000/search | head -n 1; done
//! ```

use axum::{extract::Path, middleware, routing::get, Extension, Router};
use gateway_admission::{admit, AdmissionConfig, Endpoint};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
[default]
requests = 100
window_secs = 60

[endpoints.search]
requests = 3
window_secs = 60

[reaper]
interval_secs = 30
staleness_secs = 120
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let controller = AdmissionConfig::from_toml_str(CONFIG)?.build()?;
    let reaper = controller.reaper().start();

    let admission = middleware::from_fn_with_state(controller.clone(), admit);

    // `/search` carries an explicit endpoint id; the plant routes are keyed
    // by their route template.
    let search = Router::new()
        .route("/search", get(|| async { "[\"fern\", \"ficus\"]" }))
        .route_layer(admission.clone())
        .route_layer(Extension(Endpoint::new("search")));

    let app = Router::new()
        .route("/plants/:id", get(|Path(id): Path<u32>| async move { format!("plant {}", id) }))
        .route("/plants", get(|| async { "[]" }))
        .route_layer(admission)
        .merge(search);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!(addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    let snapshot = controller.metrics().snapshot();
    tracing::info!(
        admitted = snapshot.requests_admitted,
        rejected = snapshot.requests_rejected,
        live_buckets = controller.bucket_count(),
        "gateway stopped"
    );

    reaper.shutdown().await?;
    Ok(())
}
