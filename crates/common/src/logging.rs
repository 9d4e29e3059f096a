//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{DisplayError, DisplayResult};

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if the level is not
/// a valid filter or a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> DisplayResult<()> {
    let builder = fmt().with_env_filter(env_filter(&config.level)?).with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|err| DisplayError::config(format!("failed to install log subscriber: {err}")))
}

/// [`init_logging`] with the default configuration.
pub fn init_default_logging() -> DisplayResult<()> {
    init_logging(&LoggingConfig::default())
}

/// Route logs through the libtest capture. Safe to call from every test.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidmode=debug"));
    fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .ok();
}

fn env_filter(level: &str) -> DisplayResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|err| DisplayError::config(format!("invalid log level {level:?}: {err}")))
}
