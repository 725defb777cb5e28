//! HTTP server lifecycle

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use iconforge_images::{ForgeResult, IconForge};
use tokio::net::TcpListener;
use tracing::info;

use crate::{config::AppConfig, routes::build_router, state::AppState};

/// Owns the pipeline and the router for one server process.
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    /// Build the pipeline and state from configuration.
    pub fn new(config: AppConfig) -> ForgeResult<Self> {
        let forge = IconForge::new(&config.forge);
        let state = AppState::new(forge, config.server)?;
        Ok(Self { state })
    }

    /// Shared state handed to handlers.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Router with every route and middleware attached.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Warm up the pipeline, serve until `shutdown` resolves, then drop all materials.
    pub async fn run<F>(self, shutdown: F) -> ForgeResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.state.forge.warm_up().await?;

        let listener = TcpListener::bind(self.state.config.bind_address.as_str()).await?;
        info!(
            "IconForge API listening on {} (prefix '{}')",
            listener.local_addr()?,
            self.state.config.api_prefix
        );

        axum::serve(
            listener,
            self.router().into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("Shutting down, clearing materials");
        self.state.forge.shutdown().await;
        Ok(())
    }
}
