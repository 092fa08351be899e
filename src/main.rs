use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use clash_rewrite::interfaces::fetch_and_rewrite;
use clash_rewrite::models::AppState;
use clash_rewrite::settings::{Settings, DEFAULT_SETTINGS_PATH};
use clash_rewrite::utils::{file_exists, file_write};
use clash_rewrite::web_handlers::interfaces;

/// Serve a Clash subscription with local proxies merged in
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (e.g., 127.0.0.1 or 0.0.0.0)
    #[arg(short, long, value_name = "ADDRESS")]
    address: Option<String>,

    /// Listen port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Route the merged profile is served on
    #[arg(long, value_name = "PATH")]
    path: Option<String>,

    /// Upstream subscription URL, overrides `url` from the configuration file
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Write the merged profile to this file once instead of starting the server
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or("");
    if config_path.is_empty() && !file_exists(DEFAULT_SETTINGS_PATH) {
        warn!(
            "No --config given and no {} in the working directory",
            DEFAULT_SETTINGS_PATH
        );
    }
    let mut settings = Settings::init(config_path).context("Failed to load settings")?;

    // Override settings with command line arguments if provided
    if let Some(address) = args.address {
        settings.listen_address = address;
    }
    if let Some(port) = args.port {
        settings.listen_port = port;
    }
    if let Some(path) = args.path {
        settings.path = path;
    }
    if let Some(url) = args.url {
        settings.url = url;
        settings.validate().context("Invalid --url")?;
    }

    if let Some(output_file) = args.output {
        info!(
            "Merging profile from {} into {}",
            settings.url, output_file
        );
        let content = fetch_and_rewrite(&settings)
            .await
            .context("Failed to build merged profile")?;
        file_write(&output_file, &content)
            .with_context(|| format!("Failed to write to output file {}", output_file))?;
        info!("Successfully wrote merged profile to {}", output_file);
        return Ok(());
    }

    let listen_address = settings.listen_addr();
    let route_path = settings.route_path();
    let workers = settings.workers;

    let app_state = Arc::new(AppState::new(settings));

    info!(
        "clash-rewrite starting on {}, serving {}",
        listen_address, route_path
    );

    let mut server = HttpServer::new(move || {
        let route_path = route_path.clone();
        App::new()
            // Add app state
            .app_data(web::Data::new(Arc::clone(&app_state)))
            // Register web handlers
            .configure(|cfg| interfaces::config(cfg, &route_path))
            // For health check
            .route("/", web::get().to(|| async { "clash-rewrite is running!" }))
    })
    .bind(&listen_address)
    .with_context(|| format!("Failed to bind {}", listen_address))?;

    if workers > 0 {
        server = server.workers(workers);
    }

    server.run().await?;
    Ok(())
}
