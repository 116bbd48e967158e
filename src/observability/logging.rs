//! Structured logging.
//!
//! - `RUST_LOG` filters, default `mini_deployer=info,tower_http=info`
//! - Logs go to stdout, or appended to the configured log file through a
//!   non-blocking writer

use std::fs::OpenOptions;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "mini_deployer=info,tower_http=info";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process. Failing to open the log file is fatal.
pub fn init(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            Ok(None)
        }
    }
}
