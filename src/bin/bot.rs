use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use knockbot::bot::command_dispatcher::CommandDispatcher;
use knockbot::bot::config::BotConfig;
use knockbot::db;
use knockbot::monitoring::sweep_service::SweepService;
use knockbot::probes::NetworkProber;
use knockbot::transport::telegram::TelegramTransport;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "knockbot.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    init_logging();
    dotenv().ok(); // Load .env file

    let config = match BotConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load bot configuration: {}", e);
            return Err(e.into());
        }
    };

    // --- Database Setup ---
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let pool = db::connect(&config.db_path).await?;
    db::init_schema(&pool).await?;
    info!(db_path = %config.db_path, "Database ready.");

    // --- Transport and Sweep Setup ---
    let transport = Arc::new(TelegramTransport::new(
        config.bot_token.clone(),
        config.bot_name.clone(),
    ));
    let prober = Arc::new(NetworkProber::new(config.probe_timeout()));

    let sweep_service = Arc::new(SweepService::new(
        pool.clone(),
        prober,
        Arc::clone(&transport),
        config.sweep_interval(),
        config.max_concurrent_probes,
    ));
    let sweep_task = tokio::spawn(Arc::clone(&sweep_service).start_periodic_sweeps());

    // --- Inbound Command Pipeline ---
    let (message_tx, message_rx) = mpsc::channel(100);
    let poll_transport = Arc::clone(&transport);
    let poll_task = tokio::spawn(async move {
        poll_transport.run_update_loop(message_tx).await;
    });

    let dispatcher = CommandDispatcher::new(pool.clone(), Arc::clone(&transport));
    let dispatch_task = tokio::spawn(async move {
        dispatcher.run(message_rx).await;
    });

    info!(bot_name = %config.bot_name, "knockbot is running.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping.");

    sweep_task.abort();
    poll_task.abort();
    dispatch_task.abort();

    Ok(())
}
