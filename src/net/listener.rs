//! Listen address handling and TCP binding.

use std::net::SocketAddr;

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The listen address could not be parsed.
    Address(String),
    /// Failed to bind to address.
    Bind(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(addr) => write!(f, "Invalid listen address: {}", addr),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Parse a listen address. A bare `:port` binds every IPv4 interface.
pub fn parse_listen_addr(listen: &str) -> Result<SocketAddr, ListenerError> {
    let candidate = match listen.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => listen.to_string(),
    };
    candidate
        .parse()
        .map_err(|_| ListenerError::Address(listen.to_string()))
}

/// Bind a plain TCP listener for one serving cycle.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;
    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}
