use crate::{Error, Result, handler, session::SessionRegistry};
use axum::{
    Router,
    routing::{get, post},
};
use gemchat_config::SessionConfig;
use gemchat_core::AnswerSource;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state handed to every request handler.
pub struct AppState {
    pub answers: Arc<dyn AnswerSource>,
    pub sessions: SessionRegistry,
}

/// HTTP chat server.
pub struct ChatServer {
    state: Arc<AppState>,
    session_config: SessionConfig,
}

impl ChatServer {
    pub fn new(answers: Arc<dyn AnswerSource>, session_config: SessionConfig) -> Self {
        Self {
            state: Arc::new(AppState {
                answers,
                sessions: SessionRegistry::new(),
            }),
            session_config,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.state.sessions
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handler::index).post(handler::submit))
            .route("/reset", post(handler::reset))
            .route("/api/chat", post(handler::api_chat))
            .route("/api/reset", post(handler::api_reset))
            .route("/health", get(handler::health))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Serve on `addr` until Ctrl+C.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        let sweeper = self.state.sessions.spawn_sweeper(
            self.session_config.idle_ttl(),
            self.session_config.sweep_interval(),
        );

        info!("Chat server listening on http://{addr}");
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();
        info!("Chat server stopped");
        result.map_err(Error::from)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
