use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use docsearch_core::config::{LogFormat, LoggingConfig};

/// `RUST_LOG` wins; otherwise the configured level, raised by `-v` flags.
/// Logs go to stderr so stdout stays clean for `--json`.
pub fn init(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let fallback = match verbose {
        0 => config.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&fallback))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);
    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    }
    .map_err(|e| anyhow!(e))
}
