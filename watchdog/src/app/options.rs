//! Application configuration options

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::errors::WatchdogError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::logs::{LogLevel, LogOptions};
use crate::storage::layout::StoreLayout;
use crate::storage::settings::Settings;
use crate::watch::classify::IntakeDir;

/// Command line arguments
#[derive(Debug, Clone, Parser)]
#[command(
    name = "glider-watchdog",
    about = "Keeps glider deployment records in sync with the data directory tree"
)]
pub struct CliArgs {
    /// Data root holding `<username>/<deployment>` directories
    #[arg(value_name = "BASEDIR", env = "DATA_ROOT", default_value = ".")]
    pub basedir: PathBuf,

    /// ERDDAP flag directory
    #[arg(value_name = "FLAGSDIR", env = "FLAGS_DIR", default_value = ".")]
    pub flagsdir: PathBuf,

    /// Directory of the deployment store [default: <BASEDIR>/.watchdog]
    #[arg(long, env = "STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// JSON settings file
    #[arg(long, env = "WATCHDOG_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Also write daily rolling log files to this directory
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Print version information as JSON and exit
    #[arg(long)]
    pub version: bool,

    /// Register a user in the deployment store and exit
    #[arg(long, value_name = "USERNAME")]
    pub add_user: Option<String>,
}

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Canonical data root
    pub data_root: PathBuf,

    /// Canonical ERDDAP flag directory
    pub flags_dir: PathBuf,

    /// Deployment store layout
    pub store: StoreLayout,

    /// NAVOCEANO intake directory
    pub intake: IntakeDir,
}

impl AppOptions {
    /// Resolve the options from the command line and settings file.
    ///
    /// The data root must exist; the flag directory is created if needed.
    pub async fn resolve(cli: &CliArgs, settings: &Settings) -> Result<Self, WatchdogError> {
        let data_root = canonical(&cli.basedir, "data root").await?;

        Dir::new(&cli.flagsdir).create().await.map_err(|e| {
            WatchdogError::ConfigError(format!(
                "flag directory {}: {}",
                cli.flagsdir.display(),
                e
            ))
        })?;
        let flags_dir = canonical(&cli.flagsdir, "flag directory").await?;

        let store = match &cli.store_dir {
            Some(dir) => StoreLayout::new(dir),
            None => StoreLayout::under_data_root(&data_root),
        };

        Ok(Self {
            lifecycle: LifecycleOptions {
                max_shutdown_delay: Duration::from_secs(settings.shutdown_grace_secs),
            },
            data_root,
            flags_dir,
            store,
            intake: IntakeDir::parse(&settings.navoceano_intake)?,
        })
    }
}

async fn canonical(path: &Path, what: &str) -> Result<PathBuf, WatchdogError> {
    tokio::fs::canonicalize(path).await.map_err(|e| {
        WatchdogError::ConfigError(format!("{} {}: {}", what, path.display(), e))
    })
}

/// Lifecycle options for the watchdog
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Load the settings file, or defaults when none is given
pub async fn load_settings(path: Option<&Path>) -> Result<Settings, WatchdogError> {
    match path {
        Some(path) => File::new(path).read_json().await.map_err(|e| {
            WatchdogError::ConfigError(format!("settings file {}: {}", path.display(), e))
        }),
        None => Ok(Settings::default()),
    }
}

/// Logging options, command line first
pub fn log_options(cli: &CliArgs, settings: &Settings) -> LogOptions {
    LogOptions {
        log_level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| settings.log_level.clone()),
        stdout: true,
        log_dir: cli
            .log_dir
            .clone()
            .or_else(|| settings.log_dir.as_ref().map(PathBuf::from)),
        json_format: cli.json_logs || settings.json_logs,
    }
}
