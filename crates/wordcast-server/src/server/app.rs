use crate::config::ServerConfig;
use crate::server::{events, routes, websocket};
use crate::state::AppState;
use anyhow::Context;
use axum::{http::HeaderValue, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the WebSocket stream application
pub fn build_stream_app(state: AppState) -> Router {
    // `/ws` is the path a fronting proxy forwards
    Router::new()
        .route("/", get(websocket::websocket_handler))
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state)
}

/// Build the push (SSE) application
pub fn build_push_app(state: AppState) -> Router {
    // CORS defaults to local origins; override only for explicit use.
    let cors = if state.config.cors_allow_any_origin {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([
                HeaderValue::from_static("http://localhost"),
                HeaderValue::from_static("http://127.0.0.1"),
            ]))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route(&state.config.push_path, get(events::connections_handler))
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind both ports and run until `shutdown` resolves.
///
/// Failing to bind either port is fatal.
pub async fn run_server<F>(
    config: ServerConfig,
    metrics: Option<PrometheusHandle>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let stream_addr = config.stream_addr()?;
    let push_addr = config.push_addr()?;

    let stream_listener = TcpListener::bind(stream_addr)
        .await
        .with_context(|| format!("failed to bind stream port {}", stream_addr))?;
    let push_listener = TcpListener::bind(push_addr)
        .await
        .with_context(|| format!("failed to bind push port {}", push_addr))?;

    tracing::info!("WebSocket server started on ws://{}", stream_addr);
    tracing::info!(
        "HTTP server started on http://{}{}",
        push_addr,
        config.push_path
    );

    let state = AppState::new(config, metrics);
    let engine = state.engine.clone();
    tokio::spawn(async move {
        shutdown.await;
        tracing::warn!("Shutdown signal received, stopping server...");
        engine.shutdown();
    });

    serve(state, stream_listener, push_listener).await
}

/// Run the scheduler and both servers on already-bound listeners until the
/// engine shuts down.
pub async fn serve(
    state: AppState,
    stream_listener: TcpListener,
    push_listener: TcpListener,
) -> anyhow::Result<()> {
    let engine = state.engine.clone();
    let token = engine.shutdown_token();

    let scheduler = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run_scheduler().await }
    });

    let stream_app = build_stream_app(state.clone());
    let push_app = build_push_app(state);

    let stream_server = {
        let token = token.clone();
        async move {
            axum::serve(stream_listener, stream_app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
                .context("stream server failed")
        }
    };
    let push_server = async move {
        axum::serve(push_listener, push_app)
            .with_graceful_shutdown(token.cancelled_owned())
            .await
            .context("push server failed")
    };

    let result = tokio::try_join!(stream_server, push_server);

    // A failing server takes the other one and the scheduler down with it.
    engine.shutdown();
    scheduler.await?;
    result?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
