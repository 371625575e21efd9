use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use shopfront_core::config::{AppConfig, LoadOptions, LogFormat};

/// Logging is best-effort here: if configuration fails to load, the command
/// itself reports that failure with the proper exit code, so a compact
/// fallback subscriber is enough.
fn init_tracing() {
    let (level, format) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("info".to_owned(), LogFormat::Compact),
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    init_tracing();
    shopfront_cli::run()
}
