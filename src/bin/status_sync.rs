//! status-sync daemon
//!
//! Polls the metrics feed and keeps one status message per category in the
//! configured Discord channel.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use status_sync::config::{config_path, Settings};
use status_sync::{ChatTransport, DiscordTransport, HttpFeedClient, InMemoryTransport, StatusSync};

/// Command-line options
struct Options {
    /// Config file; falls back to CONFIG_PATH, then ./config.yaml
    config: Option<PathBuf>,
    /// Log instead of posting to Discord
    dry_run: bool,
    /// Run a single cycle and exit
    once: bool,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config: None,
        dry_run: false,
        once: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    options.config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --config requires a value");
                    std::process::exit(1);
                }
            }
            "--dry-run" => {
                options.dry_run = true;
                i += 1;
            }
            "--once" => {
                options.once = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("status-sync - live monitor status messages for Discord");
                println!();
                println!("USAGE:");
                println!("    status-sync [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -c, --config <PATH>       Config file [default: $CONFIG_PATH or ./config.yaml]");
                println!("        --dry-run             Keep messages in memory instead of posting");
                println!("        --once                Run startup and a single cycle, then exit");
                println!("    -h, --help                Print help information");
                println!();
                println!("ENVIRONMENT:");
                println!("    DISCORD_TOKEN             Overrides discord.token");
                println!("    UPTIME_KUMA_API_KEY       Overrides uptimeKuma.apiKey");
                println!("    RUST_LOG                  Log filter [default: info]");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    options
}

/// Initialize logging to stderr, filtered by RUST_LOG (default: info).
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let options = parse_args();

    let env = |key: &str| std::env::var(key).ok();
    let path = options.config.unwrap_or_else(|| config_path(env));
    let settings = match Settings::load(&path, env) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(path = %path.display(), "Failed to load config: {e}");
            return Err(e.into());
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        categories = settings.categories.len(),
        interval_secs = settings.update_interval.as_secs(),
        dry_run = options.dry_run,
        "starting status-sync"
    );

    let feed = Arc::new(HttpFeedClient::new(
        settings.feed.url.clone(),
        settings.feed.api_key.clone(),
    )?);
    let transport: Arc<dyn ChatTransport> = if options.dry_run {
        Arc::new(InMemoryTransport::new(
            settings.discord.guild.clone(),
            settings.discord.channel.clone(),
        ))
    } else {
        Arc::new(DiscordTransport::new(settings.discord.token.clone())?)
    };

    let mut sync = StatusSync::new(
        transport,
        feed,
        settings.reconciler(),
        settings.discord.guild.clone(),
        settings.update_interval,
    );

    if options.once {
        sync.startup().await;
        if let Some(report) = sync.tick().await {
            for (category, outcome) in &report.outcomes {
                tracing::info!(%category, %outcome, "cycle result");
            }
        }
        return Ok(());
    }

    sync.run(async {
        let _ = signal::ctrl_c().await;
    })
    .await;

    Ok(())
}
