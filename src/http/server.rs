//! HTTP server setup and the restart loop.
//!
//! # Responsibilities
//! - Build an Axum router from one config snapshot
//! - Wire up middleware (access control, request ID, tracing)
//! - Serve plain HTTP or TLS until the cycle's restart trigger fires
//! - Start the next cycle after a short pause, until process shutdown
//!
//! # Design Decisions
//! - The router is rebuilt every cycle so added and removed routes apply
//! - A cycle only ends once its in-flight requests have completed

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::any,
    Extension, Router,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::{ConfigStore, DeployerConfig};
use crate::exec::CommandExecutor;
use crate::http::handlers::{self, Route};
use crate::http::middleware::access_control_middleware;
use crate::http::request::{RequestIdGenerator, X_REQUEST_ID};
use crate::lifecycle::{ReloadSupervisor, RestartTrigger, Shutdown};
use crate::net::{listener, tls, ListenerError};
use crate::observability::metrics;

/// Pause between the end of one serving cycle and the next bind.
pub const RESTART_PAUSE: Duration = Duration::from_secs(1);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<ReloadSupervisor>,
    pub executor: Arc<CommandExecutor>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build the router for one serving cycle.
pub fn build_router(config: &DeployerConfig, state: AppState) -> Router {
    let mut routes: Vec<_> = config.commands.iter().collect();
    routes.sort();

    let mut router = Router::new();
    for (name, command) in routes {
        let route = Arc::new(Route {
            name: name.clone(),
            command: command.clone(),
        });
        router = router.route(
            &format!("/{}", name),
            any(handlers::run_command).layer(Extension(route)),
        );
    }

    router
        .route("/reload", any(handlers::reload))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            access_control_middleware,
        ))
        .with_state(state)
        // Body size is enforced by the access control middleware.
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, RequestIdGenerator))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
}

/// Webhook server that restarts itself whenever its config is reloaded.
pub struct DeployerServer {
    listen: SocketAddr,
    supervisor: Arc<ReloadSupervisor>,
    executor: Arc<CommandExecutor>,
}

impl DeployerServer {
    pub fn new(store: Arc<ConfigStore>, shutdown: Shutdown, listen: SocketAddr) -> Self {
        Self {
            listen,
            supervisor: Arc::new(ReloadSupervisor::new(store, shutdown)),
            executor: Arc::new(CommandExecutor::new()),
        }
    }

    pub fn with_executor(mut self, executor: CommandExecutor) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn supervisor(&self) -> Arc<ReloadSupervisor> {
        Arc::clone(&self.supervisor)
    }

    pub fn state(&self) -> AppState {
        AppState {
            supervisor: Arc::clone(&self.supervisor),
            executor: Arc::clone(&self.executor),
        }
    }

    /// Serve until process shutdown.
    pub async fn run(self) {
        let shutdown = self.supervisor.shutdown().clone();

        loop {
            let config = self.supervisor.store().snapshot();
            let restart = self.supervisor.begin_cycle();
            let app = build_router(&config, self.state());

            info!(
                address = %self.listen,
                routes = config.commands.len(),
                tls = config.tls_paths().is_some(),
                "Starting HTTP server"
            );
            if config.tls_paths().is_none() && (!config.cert.is_empty() || !config.key.is_empty()) {
                warn!("Only one of cert and key is configured, serving plain HTTP");
            }
            if config.disable_autoreload {
                info!(
                    "Autoreload disabled, apply config changes with: curl http://localhost:{}/reload",
                    self.listen.port()
                );
            }

            if let Err(e) = self.serve_cycle(&config, app, restart).await {
                error!(error = %e, "HTTP server cycle failed");
            }

            if shutdown.is_triggered() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(RESTART_PAUSE) => {}
                _ = shutdown.wait() => break,
            }
            metrics::record_restart();
            info!("Http restart");
        }

        self.supervisor.stop_watcher();
        info!("HTTP server stopped");
    }

    async fn serve_cycle(
        &self,
        config: &DeployerConfig,
        app: Router,
        restart: RestartTrigger,
    ) -> Result<(), ServerError> {
        let service = app.into_make_service_with_connect_info::<SocketAddr>();

        match config.tls_paths() {
            Some((cert, key)) => {
                let tls_config = tls::load_tls_config(&cert, &key)
                    .await
                    .map_err(ServerError::Tls)?;

                let handle = axum_server::Handle::new();
                let finished = CancellationToken::new();
                let _finished_guard = finished.clone().drop_guard();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = restart.requested() => shutdown_handle.graceful_shutdown(None),
                        _ = finished.cancelled() => {}
                    }
                });

                axum_server::bind_rustls(self.listen, tls_config)
                    .handle(handle)
                    .serve(service)
                    .await
                    .map_err(ServerError::Serve)
            }
            None => {
                let listener = listener::bind(self.listen).await?;
                axum::serve(listener, service)
                    .with_graceful_shutdown(async move { restart.requested().await })
                    .await
                    .map_err(ServerError::Serve)
            }
        }
    }
}
