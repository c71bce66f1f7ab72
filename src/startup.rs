//! Application startup and lifecycle management.

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::handlers::generate::{generate, method_not_allowed};
use crate::handlers::health::health_check;
use crate::handlers::rss::search_news;
use crate::services::news::NewsClient;
use crate::services::providers::gemini::GeminiClient;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub gemini: GeminiClient,
    pub news: NewsClient,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ProxyConfig) -> Result<Self, ProxyError> {
        let gemini = GeminiClient::new(config.gemini.clone()).map_err(|e| {
            tracing::error!("Failed to build Gemini client: {}", e);
            ProxyError::from(e)
        })?;

        tracing::info!(
            model = %config.gemini.model,
            force_json_output = config.gemini.force_json_output,
            "Initialized Gemini relay client"
        );

        let news = NewsClient::new(config.news.clone())?;
        tracing::info!(
            feed = %config.news.base_url,
            "Initialized news feed client"
        );

        let state = AppState {
            config: config.clone(),
            gemini,
            news,
        };

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            ProxyError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Proxy service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

pub fn build_router(state: AppState) -> Router {
    // The CORS layer is outermost so it answers OPTIONS preflights before
    // routing; other methods on the proxy route fall through to the
    // structured 405.
    // Aggregated feeds must never be cached by intermediaries.
    let rss_routes = Router::new()
        .route("/api/rss", get(search_news).fallback(method_not_allowed))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/generate",
            post(generate).fallback(method_not_allowed),
        )
        .merge(rss_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
