//! Admin HTTP server

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::ApiConfig;
use crate::coordinator::Coordinator;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

pub struct ApiServer {
    config: ApiConfig,
    coordinator: Arc<Coordinator>,
    shutdown: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ApiConfig, coordinator: Arc<Coordinator>, shutdown: CancellationToken) -> Self {
        Self {
            config,
            coordinator,
            shutdown,
        }
    }

    /// Serve until Ctrl+C, SIGTERM or the shutdown token fires; signals cancel the token
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = build_app(Arc::new(AppState::new(self.coordinator.clone())), &self.config);
        let addr = self.socket_addr()?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("🌐 Admin API listening on http://{}", addr);
        self.log_server_info();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(self.shutdown.clone()))
            .await?;

        info!("🛑 Admin API stopped");
        Ok(())
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    fn log_server_info(&self) {
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);
        info!("📊 Available endpoints:");
        info!("   GET  /health");
        info!("   GET  /metrics");
        info!("   GET  /admin/status");
        info!("   POST /admin/initialize     {{houseEdge?}}");
        info!("   POST /admin/update-config  {{minBet?, maxBet?, houseEdge?}}");
        info!("   POST /admin/start          {{roundId, crashPoint}}");
        info!("   POST /admin/end            {{roundId}}");
    }
}

/// Router with the full middleware stack
pub fn build_app(state: Arc<AppState>, config: &ApiConfig) -> axum::Router {
    create_router(state)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
        _ = shutdown.cancelled() => info!("Shutdown requested"),
    }
    shutdown.cancel();
}
