use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use picforward::{AppState, Settings, config_store::ConfigStore, create_app_with_state, startup_checks};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Overrides `app.log_level` from the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Download every external link of a collection into its directory
    CacheLinks {
        /// Collection name
        collection: String,
    },

    /// Print the configured endpoints
    Endpoints,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.app.log_level.clone());
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::CacheLinks { collection }) => cache_links(settings, &collection).await,
        Some(Commands::Endpoints) => print_endpoints(&settings).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(settings, &cli.config, port, host, quit_after).await,
        None => run_server(settings, &cli.config, None, None, None).await,
    }
}

async fn cache_links(settings: Settings, collection: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = AppState::new(settings);
    match app_state.collections.cache_external_links(collection).await {
        Some(report) => {
            println!(
                "Collection '{}': {} downloaded, {} already cached, {} failed",
                collection, report.downloaded, report.skipped, report.failed
            );
            Ok(())
        }
        None => Err(format!("Collection '{}' does not exist", collection).into()),
    }
}

async fn print_endpoints(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = ConfigStore::new(settings.storage.config_path.clone());
    let doc = store.get_config().await;

    if doc.api_urls.is_empty() {
        println!("No endpoints configured in {:?}", store.path());
        return Ok(());
    }

    println!("Endpoints in {:?}:", store.path());
    for (name, endpoint) in &doc.api_urls {
        let method = endpoint.method.map_or("disabled", |m| m.as_str());
        println!("  /{} [{}] -> {}", name, method, endpoint.url);
    }
    if !doc.base_tag.is_empty() {
        println!("Base tag: {}", doc.base_tag);
    }
    Ok(())
}

async fn run_server(
    settings: Settings,
    config_path: &std::path::Path,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    info!("Starting {} server", settings.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    info!("Picture directory: {:?}", settings.storage.picture_dir);
    info!("Endpoint configuration: {:?}", settings.storage.config_path);
    info!("Template directory: {:?}", settings.templates.directory);
    info!("Static files directory: {:?}", settings.static_files.directory);

    if let Err(errors) = startup_checks::perform_startup_checks(&settings).await {
        for error in &errors {
            tracing::error!("Startup check failed: {}", error);
        }

        if errors.iter().any(|e| e.is_critical()) {
            tracing::error!("Critical startup check failed, exiting");
            return Err("Critical startup check failed".into());
        }
        tracing::warn!("Non-critical startup checks failed, continuing");
    }

    let app = create_app_with_state(AppState::new(settings));

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
