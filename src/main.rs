use networkk_search::config::Settings;
use networkk_search::services::{HttpDataSource, StaticLocation};
use networkk_search::session::SearchSession;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize logging; LOG_LEVEL / LOG_FORMAT override the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Networkk search...");

    let source = HttpDataSource::new(
        settings.data_source.base_url.clone(),
        settings.data_source.services_path.clone(),
        settings.data_source.timeout(),
    )?;
    let locator = StaticLocation(settings.location.coordinate());

    let session = SearchSession::spawn(settings.search.session_options())?;

    let version = match session.load(&source, &locator).await {
        Ok(version) => version,
        Err(e) => {
            error!("Search session could not load services: {}", e);
            session.shutdown().await;
            return Err(e.into());
        }
    };

    let view = session.wait_for_version(version).await?;

    info!(
        "Returning {} services (from {} candidates)",
        view.results.len(),
        view.results.total_candidates
    );

    println!("{}", serde_json::to_string_pretty(view.results.as_ref())?);

    session.shutdown().await;
    Ok(())
}
