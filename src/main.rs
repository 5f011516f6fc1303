use dotenvy::dotenv;
use relay_bot::config::Settings;
use relay_bot::{logging, runner};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Settings come first: the log directory is part of them
    let settings = match Settings::new() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init(&settings.log_dir).map_err(|e| {
        eprintln!("Failed to initialize logging: {e}");
        e
    })?;

    info!("Starting relay bot...");

    if let Err(e) = runner::run_bot(settings).await {
        error!("Critical error: {e:#}");
    }

    info!("Bot stopped.");
    Ok(())
}
