use crate::config::Config;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over the configured
/// level. Events always go to stderr and are teed into the log file when
/// one is configured and can be opened.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level(|key| std::env::var(key).ok())));

    let log_file = config.log_file();
    let file = log_file.as_deref().and_then(|path| match open_append(path) {
        Ok(file) => Some(Arc::new(file)),
        Err(err) => {
            eprintln!("log_file_error: {}: {err}", path.display());
            None
        }
    });
    let teed = file.is_some();

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer(file))
        .try_init()
        .is_ok();
    if installed && teed {
        if let Some(path) = log_file {
            info!(event = "log_file_opened", path = %path.display());
        }
    }
}

fn make_writer(file: Option<Arc<File>>) -> BoxMakeWriter {
    match file {
        Some(file) => BoxMakeWriter::new(io::stderr.and(file)),
        None => BoxMakeWriter::new(io::stderr),
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
