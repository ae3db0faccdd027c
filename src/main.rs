use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use turnstile::config::TurnstileConfig;
use turnstile::ratelimit::spawn_sweeper;

/// Read one client key per line from stdin and print the admission decision.
#[derive(Debug, Parser)]
#[command(name = "turnstile", version, about)]
struct Args {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strategy override: fixed or sliding
    #[arg(long)]
    strategy: Option<String>,

    /// Requests per window override
    #[arg(long)]
    max_requests: Option<u32>,

    /// Window length override, in milliseconds
    #[arg(long)]
    window_size_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Overlay command-line overrides on the loaded configuration.
    fn apply_overrides(&self, config: &mut TurnstileConfig) {
        if let Some(strategy) = &self.strategy {
            config.limiter.strategy = strategy.clone();
        }
        if let Some(max_requests) = self.max_requests {
            config.limiter.max_requests = max_requests;
        }
        if let Some(window_size_ms) = self.window_size_ms {
            config.limiter.window_size_ms = window_size_ms;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only decisions
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Turnstile");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = TurnstileConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;

    info!(
        strategy = %config.limiter.strategy,
        max_requests = config.limiter.max_requests,
        window_size_ms = config.limiter.window_size_ms,
        "Configuration loaded"
    );

    let limiter = config.limiter.build()?;

    let sweeper = config
        .eviction
        .enabled
        .then(|| spawn_sweeper(limiter.clone(), config.eviction.sweep_interval()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(client_key) = line? else {
                    info!("End of input");
                    break;
                };
                let decision = if limiter.admit(&client_key) { "admitted" } else { "rejected" };
                stdout
                    .write_all(format!("{}\t{}\n", client_key, decision).as_bytes())
                    .await?;
                stdout.flush().await?;
            }
            _ = &mut shutdown => break,
        }
    }

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!(clients = limiter.client_count(), "Turnstile stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_flag_matches_config_key() {
        let args = Args::try_parse_from(["turnstile", "--window-size-ms", "250"]).unwrap();
        let mut config = TurnstileConfig::default();

        args.apply_overrides(&mut config);

        assert_eq!(config.limiter.window_size_ms, 250);
        assert!(Args::try_parse_from(["turnstile", "--window-ms", "250"]).is_err());
    }

    #[test]
    fn test_overrides_leave_unset_values_alone() {
        let args = Args::try_parse_from(["turnstile", "--strategy", "Fixed", "--max-requests", "3"]).unwrap();
        let mut config = TurnstileConfig::default();

        args.apply_overrides(&mut config);

        assert_eq!(config.limiter.strategy, "Fixed");
        assert_eq!(config.limiter.max_requests, 3);
        assert_eq!(config.limiter.window_size_ms, 6000);
        assert!(config.validate().is_ok());
    }
}
