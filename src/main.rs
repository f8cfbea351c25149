mod app;
mod logging;
mod scene;

use std::env;
use std::path::PathBuf;

use logging::{init_logging, LoggingConfig};

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let mut params = app::Params::default();
    // Only the model is picked on the command line.
    if let Some(asset_path) = env::args().nth(1) {
        params.asset_path = PathBuf::from(asset_path);
    }

    app::run(params)?;

    return Ok(());
}
