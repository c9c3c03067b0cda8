//! HTTP server implementation

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::config::ServerConfig;
use crate::rag::RagService;
use crate::Result;

/// Router with the tracing, compression, timeout and CORS layers applied
pub fn build_app(state: AppState, server: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )));

    let mut app = routes::api_routes(state).layer(middleware);

    if server.enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Build the pipeline and serve the API until the process is stopped
///
/// A pipeline that fails to start (store unreachable, bad schema) does not
/// stop the server; the error is reported through `/health` and 503s.
pub async fn serve_api(config: &AppConfig) -> Result<()> {
    info!("Starting TopGo RAG API server...");

    let (state, probe) = match RagService::new(config).await {
        Ok(rag) => {
            let rag = Arc::new(rag);
            let probe = (config.llm.probe_interval_secs > 0).then(|| {
                rag.spawn_llm_probe(Duration::from_secs(config.llm.probe_interval_secs))
            });
            (AppState::ready(rag), probe)
        }
        Err(e) => {
            error!("Failed to initialize RAG pipeline: {}", e);
            (AppState::unavailable(e.to_string()), None)
        }
    };

    let app = build_app(state, &config.server);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /                     - API info");
    info!("  GET  /health               - Health check");
    info!("  POST /api/chat             - Chat with the assistant");
    info!("  POST /api/search           - Filtered venue search");
    info!("  POST /api/recommendations  - Occasion-based recommendations");

    let served = axum::serve(listener, app).await;
    if let Some(probe) = probe {
        probe.abort();
    }
    served?;

    Ok(())
}
