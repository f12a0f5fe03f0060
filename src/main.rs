use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use ghiseul_monitor::driver::{WebSessionConfig, WebSessionFactory};
use ghiseul_monitor::{
    MonitorConfig, MonitorEngine, SnapshotStore, StatusServer, StatusServerConfig,
};

#[derive(Parser)]
#[command(name = "ghiseul-monitor")]
#[command(version)]
#[command(about = "ghiseul.ro payment-portal availability monitor", long_about = None)]
struct Cli {
    /// Username used for signing in
    #[arg(long, env = "GHISEUL_USERNAME", default_value = "", hide_env_values = true)]
    username: String,

    /// Password used for signing in
    #[arg(long, env = "GHISEUL_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Institution id to monitor
    #[arg(long, env = "GHISEUL_INSTITUTION", default_value = "")]
    institution: String,

    /// How often to refresh the monitor, in minutes
    #[arg(long, env = "GHISEUL_REFRESH", default_value_t = 10)]
    refresh: u64,

    /// How long the browser waits for elements to render, in seconds
    #[arg(long, env = "GHISEUL_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Keep the same browser open across checks instead of creating a new
    /// one each time
    #[arg(
        long,
        env = "GHISEUL_PERSISTENT_DRIVER",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    persistent_driver: bool,

    /// Where to store browser profile data (keeps cookies across runs)
    #[arg(long, env = "GHISEUL_DRIVER_DIR", default_value = "/tmp/chrome")]
    driver_dir: PathBuf,

    /// Host to listen on for status queries
    #[arg(long, env = "GHISEUL_WEB_HOST", default_value = "0.0.0.0")]
    web_host: String,

    /// Port to listen on for status queries
    #[arg(long, env = "GHISEUL_WEB_PORT", default_value_t = 8080)]
    web_port: u16,

    /// Endpoint exposing the monitor output
    #[arg(long, env = "GHISEUL_WEB_ENDPOINT", default_value = "/monitor")]
    web_endpoint: String,

    /// Log level
    #[arg(long, env = "GHISEUL_LOG_LEVEL", value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Info,
    Warn,
    Debug,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.into())
        .init();

    println!("{} Starting ghiseul.ro monitor", "▶".green().bold());
    println!("  Institution: {}", cli.institution.cyan());
    println!("  Refresh: {}", format!("{}m", cli.refresh).cyan());
    println!(
        "  Persistent driver: {}",
        cli.persistent_driver.to_string().cyan()
    );
    println!(
        "  Status endpoint: {}",
        format!("http://{}:{}{}", cli.web_host, cli.web_port, cli.web_endpoint).cyan()
    );

    let store = Arc::new(SnapshotStore::new());

    let factory = Box::new(WebSessionFactory::new(WebSessionConfig {
        user_data_dir: cli.driver_dir.clone(),
        ..WebSessionConfig::default()
    }));

    let mut engine = MonitorEngine::new(
        MonitorConfig {
            username: cli.username,
            password: cli.password,
            institution: cli.institution,
            render_timeout: Duration::from_secs(cli.timeout),
            persistent_session: cli.persistent_driver,
        },
        factory,
        store.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh = Duration::from_secs(cli.refresh * 60);
    let engine_task = tokio::spawn(async move {
        engine.run(refresh, shutdown_rx).await;
    });

    let server = StatusServer::new(
        StatusServerConfig {
            host: cli.web_host,
            port: cli.web_port,
            endpoint: cli.web_endpoint,
        },
        store,
    );

    let outcome = tokio::select! {
        result = server.start() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received ctrl-c, shutting down...");
            Ok(())
        }
    };

    // Stop issuing cycles and wait for the engine to close its session.
    let _ = shutdown_tx.send(true);
    if let Err(e) = engine_task.await {
        warn!("Monitor task did not shut down cleanly: {}", e);
    }

    outcome
}
