//! Pomodoro - a countdown service driven from the terminal
//!
//! This tool helps you stay focused using the Pomodoro Technique:
//! - 25 minutes of focused work
//! - 5 minutes of short break
//! - 15 minutes of long break after every 4 pomodoros

use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use pomodoro_service::cli::{Cli, Commands, Display, IpcClient, TagsAction};
use pomodoro_service::{Daemon, ServiceConfig};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(ServiceConfig::default_path);
    let loaded = ServiceConfig::from_file(&config_path);
    let log_filter = match &loaded {
        Ok(Some(config)) => config.log_filter.clone(),
        _ => None,
    };
    init_tracing(cli.verbose, log_filter.as_deref());

    let config = match loaded {
        Ok(Some(config)) => config,
        Ok(None) => ServiceConfig::default(),
        Err(e) => {
            tracing::warn!("Ignoring config {:?}: {:#}", config_path, e);
            ServiceConfig::default()
        }
    };

    if let Err(e) = execute(cli, config).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins, then the config filter, then `--verbose`.
fn init_tracing(verbose: bool, config_filter: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = config_filter.unwrap_or(if verbose { "info" } else { "warn" });
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli, config: ServiceConfig) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match &command {
        Commands::Daemon => return Daemon::build(&config).run().await,
        Commands::Completions { shell } => {
            generate_completions(*shell);
            return Ok(());
        }
        Commands::Watch { interval } => {
            let client = IpcClient::with_socket_path(&config.socket_path);
            return watch(&client, Duration::from_secs(*interval)).await;
        }
        _ => {}
    }

    let Some(request) = command.to_request() else {
        return Ok(());
    };
    let client = IpcClient::with_socket_path(&config.socket_path);
    let response = client.send(&request).await?;

    match command {
        Commands::Status => Display::show_status(&response),
        Commands::Durations(_) => Display::show_durations(&response),
        Commands::Options(_) => Display::show_options(&response),
        Commands::Tags {
            action: TagsAction::List,
        } => Display::show_tags(&response),
        Commands::Tags { .. } | Commands::Focus(_) => Display::show_message(&response),
        _ => Display::show_command_success(&response),
    }

    Ok(())
}

/// Polls the daemon and redraws the countdown until Ctrl-C.
async fn watch(client: &IpcClient, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let response = client.status().await?;
                Display::show_watch_line(&response);
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
