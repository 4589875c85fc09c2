use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Name of the environment variable that selects the build mode.
pub const MODE_ENV_VAR: &str = "NODE_ENV";

/// Which step lists the asset tasks use.
///
/// Read once at startup and threaded into every task through
/// [`crate::tasks::BuildContext`]; never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Minify, purge and prefix.
    Production,
    /// Prefix only; output is left readable.
    #[default]
    Development,
}

impl BuildMode {
    /// `"production"` selects [`BuildMode::Production`]; any other value,
    /// including an unset variable, selects development.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("production") => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }

    /// Read [`MODE_ENV_VAR`] from the process environment.
    pub fn from_env() -> Self {
        let value = std::env::var(MODE_ENV_VAR).ok();
        Self::from_env_value(value.as_deref())
    }

    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Production => f.write_str("production"),
            BuildMode::Development => f.write_str("development"),
        }
    }
}

/// Behaviour when a new trigger arrives while a task run is already in progress.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour).
/// - `Cancel`: drop any previously queued run and only keep the latest
///   trigger. Running builds are never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}
