//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Default NAVOCEANO intake directory, relative to the data root
pub const DEFAULT_NAVOCEANO_INTAKE: &str = "navoceano/hurricanes-unsorted-intake";

/// Optional settings file contents. Command line and environment win over these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON formatted logs
    #[serde(default)]
    pub json_logs: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<String>,

    /// NAVOCEANO intake directory, relative to the data root
    #[serde(default = "default_navoceano_intake")]
    pub navoceano_intake: String,

    /// Grace period for shutdown, in seconds
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_navoceano_intake() -> String {
    DEFAULT_NAVOCEANO_INTAKE.to_string()
}

fn default_shutdown_grace() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            log_dir: None,
            navoceano_intake: default_navoceano_intake(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}
