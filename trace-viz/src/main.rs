use std::sync::Arc;

use axum::http::{header, Method};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trace_viz::api;
use trace_viz::app_state::AppState;
use trace_viz::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trace_viz=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        port = config.port,
        broadcast_capacity = config.broadcast_capacity,
        timeline_limit = config.timeline_limit,
        "trace-viz starting"
    );

    let app_state = AppState::spawn(&config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to spawn trace session actor: {e}"))?;

    let cors = if config.cors_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(std::time::Duration::from_secs(3600))
    } else {
        CorsLayer::new()
    };

    let api_state = api::ApiState {
        app_state: Arc::new(app_state),
    };

    let app = api::router()
        .with_state(api_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    info!("listening on http://{addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
