//! TLS certificate loading.
//!
//! Material is read fresh at the start of every serving cycle, which is how
//! a renewed certificate takes effect after the watcher restarts the server.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

/// Load a rustls server config from PEM certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> io::Result<RustlsConfig> {
    for (what, path) in [("certificate", cert_path), ("private key", key_path)] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("TLS {} not found: {}", what, path.display()),
            ));
        }
    }
    RustlsConfig::from_pem_file(cert_path, key_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let err = load_tls_config(Path::new("/nonexistent/c.pem"), Path::new("/nonexistent/k.pem"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("certificate"));
    }
}
