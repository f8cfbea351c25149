use std::sync::Once;

use log::LevelFilter;

/// How much the renderer reports while working.
///
/// `filter` uses `env_logger` syntax, e.g. "debug" or "tiny_rasterizer::scene=debug".
/// When it is not set `RUST_LOG` is consulted, and after that `level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub level: LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        return Self {
            filter: None,
            level: LevelFilter::Info,
        };
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call does anything.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match config.filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => { builder.parse_filters(&filter); }
            None => { builder.filter_level(config.level); }
        }
        builder.format_timestamp_millis();
        // Tests may have installed a logger of their own already.
        if builder.try_init().is_err() {
            return;
        }
        log::debug!("logging initialized");
    });
}
