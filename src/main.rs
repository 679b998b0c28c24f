#![cfg(not(tarpaulin_include))]

use eyetrack_dashboard::app;
use eyetrack_dashboard::config::Config;
use eyetrack_dashboard::loader::Dataset;

/// Main entry point for the dashboard server
///
/// Loads the fixation dataset once and serves the dashboard on the
/// configured address. A dataset that cannot be read stops the process
/// before the server binds.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::default();
    let dataset = Dataset::load(&config.data_path).map_err(|e| {
        log::error!("Cannot start without dataset {}: {}", config.data_path.display(), e);
        e
    })?;

    app::run(dataset, config).await
}
