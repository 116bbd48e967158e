//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use mini_deployer::config::ConfigStore;
use mini_deployer::exec::CommandExecutor;
use mini_deployer::http::{build_router, DeployerServer};
use mini_deployer::lifecycle::Shutdown;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Peer address reported for router-level requests.
pub const TEST_PEER: &str = "127.0.0.1:40000";

pub fn write_config(path: &Path, config: &Value) {
    std::fs::write(path, config.to_string()).unwrap();
}

/// A server wired to a config file in a temporary directory, driven without
/// a socket.
pub struct TestApp {
    pub dir: TempDir,
    pub server: DeployerServer,
}

impl TestApp {
    pub fn new(config: Value) -> Self {
        Self::with_executor(config, CommandExecutor::new())
    }

    pub fn with_executor(config: Value, executor: CommandExecutor) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployer.json");
        write_config(&path, &config);

        let store = Arc::new(ConfigStore::open(&path).unwrap());
        let server = DeployerServer::new(store, Shutdown::new(), "127.0.0.1:0".parse().unwrap())
            .with_executor(executor);
        Self { dir, server }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("deployer.json")
    }

    /// Router for the current snapshot, as the serve loop would build it.
    pub fn router(&self) -> Router {
        let config = self.server.supervisor().store().snapshot();
        let peer: SocketAddr = TEST_PEER.parse().unwrap();
        build_router(&config, self.server.state()).layer(MockConnectInfo(peer))
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap()
}

/// Start a live server on `addr` with the config in `dir`.
pub async fn start_server(addr: SocketAddr, config_path: &Path) -> Shutdown {
    let store = Arc::new(ConfigStore::open(config_path).unwrap());
    let shutdown = Shutdown::new();
    let server = DeployerServer::new(store, shutdown.clone(), addr);
    tokio::spawn(server.run());
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
