use clap::Parser;
use harper_core::{AdminSecret, HarperConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use harper_server::{server, subsystems, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "harper.toml")]
    config: String,

    /// Check configuration and credentials, then exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience: production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match HarperConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let default_level = config
        .service
        .log_level
        .parse()
        .unwrap_or(tracing::Level::INFO);
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();

    let backend = match subsystems::chat::create_backend_from_config(&config) {
        Ok(b) => b,
        Err(e) => {
            eprintln!(
                "Failed to create completion client ({}): {}",
                config.completion.api_key_env, e
            );
            std::process::exit(1);
        }
    };

    let secret = match AdminSecret::from_env(&config.admin) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load admin secret: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(config.clone(), backend, secret);

    if args.health {
        let (structured, tabular) = state.log.paths();
        println!("✅ Completion model: {}", state.backend.model());
        println!("✅ Structured log:   {}", structured.display());
        println!("✅ Tabular log:      {}", tabular.display());
        if state.gate.secret_is_default() {
            println!("⚠️  Admin secret:     built-in default ({} unset)", config.admin.secret_env);
        } else {
            println!("✅ Admin secret:     set via {}", config.admin.secret_env);
        }
        println!("✅ Harper health check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    if config.http.enabled {
        let http_state = state.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = harper_server::http::start_http_server(http_state, http_shutdown).await
            {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    let socket_path = config.service.socket_path.clone();
    server::run_unix_server(&socket_path, state, tx.subscribe()).await?;

    Ok(())
}
