//! Glider Watchdog - Entry Point
//!
//! Watches the glider data root and keeps deployment records, NAVOCEANO
//! symlinks and ERDDAP reload flags in step with it.

use clap::Parser;

use glider_watchdog::admin::add_user;
use glider_watchdog::app::options::{load_settings, log_options, AppOptions, CliArgs};
use glider_watchdog::app::run::run;
use glider_watchdog::logs::init_logging;
use glider_watchdog::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    // Print version and exit
    if cli.version {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize version info: {e}"),
        }
        return;
    }

    let settings = match load_settings(cli.settings.as_deref()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings: {e}");
            std::process::exit(2);
        }
    };

    // Initialize logging; the guard flushes the log file on drop
    let _log_guard = match init_logging(log_options(&cli, &settings)) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = match AppOptions::resolve(&cli, &settings).await {
        Ok(options) => options,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Register a user and exit
    if let Some(username) = &cli.add_user {
        match add_user(&options, username).await {
            Ok(user) => match serde_json::to_string_pretty(&user) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize user: {e}"),
            },
            Err(e) => {
                error!("Failed to add user '{}': {e}", username);
                std::process::exit(1);
            }
        }
        return;
    }

    info!(version = %version_info().version, "Running glider watchdog with options: {:?}", options);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run the watchdog: {e}");
        std::process::exit(1);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, waiting for Ctrl+C only");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
