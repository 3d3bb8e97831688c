//! Application Configuration
//!
//! Loaded from `teamhours.toml`, then adjusted by environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

/// Log filter used when neither the config file nor the environment sets one
pub const DEFAULT_LOG_FILTER: &str = "teamhours=info,service_registry=info";

/// Environment variable overriding the log filter
pub const ENV_LOG: &str = "TEAMHOURS_LOG";

/// Environment variable overriding the report interval
pub const ENV_REPORT_INTERVAL: &str = "TEAMHOURS_REPORT_INTERVAL_SECS";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidOverride { key: &'static str, value: String },
}

/// Top-level configuration (teamhours.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tracing filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub roster: RosterConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            roster: RosterConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Roster seed data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Month the hours are tracked for (e.g., "Aug 2019")
    #[serde(default = "default_month")]
    pub month: String,

    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

fn default_month() -> String {
    chrono::Utc::now().format("%b %Y").to_string()
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            month: default_month(),
            members: Vec::new(),
        }
    }
}

/// A single team member seeded into the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConfig {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub hours: u32,
}

/// Periodic report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_stop_timeout_ms() -> u64 {
    5000
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl ReportConfig {
    /// Report interval, never shorter than one second
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file is not an error: defaults are used instead.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        debug!(
            members = config.roster.members.len(),
            "Loaded config from {}",
            path.display()
        );

        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from the process environment
    ///
    /// Reads:
    /// - `TEAMHOURS_LOG`: Log filter
    /// - `TEAMHOURS_REPORT_INTERVAL_SECS`: Report interval in seconds
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }

        if let Some(value) = lookup(ENV_REPORT_INTERVAL) {
            self.report.interval_secs = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    key: ENV_REPORT_INTERVAL,
                    value,
                })?;
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log output in memory
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    const SAMPLE: &str = r#"
log_filter = "teamhours=debug"

[roster]
month = "Aug 2019"

[[roster.members]]
member_id = "1"
first_name = "Boris"
last_name = "Yakimov"
hours = 108

[[roster.members]]
member_id = "6"
first_name = "Krname6"
last_name = "name6"

[report]
interval_secs = 10
"#;

    #[tokio::test]
    async fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("teamhours.toml");
        fs::write(&path, SAMPLE).await.unwrap();

        let config = AppConfig::load(&path).await.unwrap();

        assert_eq!(config.log_filter, "teamhours=debug");
        assert_eq!(config.roster.month, "Aug 2019");
        assert_eq!(config.roster.members.len(), 2);
        assert_eq!(config.roster.members[0].hours, 108);
        assert_eq!(config.roster.members[1].hours, 0);
        assert_eq!(config.report.interval(), Duration::from_secs(10));
        assert_eq!(config.report.stop_timeout(), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(dir.path().join("absent.toml")).await.unwrap();

        assert_eq!(config.log_filter, default_log_filter());
        assert!(config.roster.members.is_empty());
        assert_eq!(config.report.interval_secs, 30);
    }

    #[tokio::test]
    async fn test_default_filter_shows_missing_file_notice() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(DEFAULT_LOG_FILTER))
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(dir.path().join("absent.toml")).await.unwrap();

        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(logs.contents().contains("absent.toml not found, using defaults"));
    }

    #[test]
    fn test_invalid_toml() {
        let result = AppConfig::from_toml("[report]\ninterval_secs = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_LOG, "trace"), (ENV_REPORT_INTERVAL, " 5 ")]);

        let config = AppConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.log_filter, "trace");
        assert_eq!(config.report.interval_secs, 5);
    }

    #[test]
    fn test_invalid_override() {
        let result = AppConfig::default().with_overrides(|key| {
            (key == ENV_REPORT_INTERVAL).then(|| "often".to_string())
        });

        assert!(matches!(
            result,
            Err(ConfigError::InvalidOverride { key: ENV_REPORT_INTERVAL, .. })
        ));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let report = ReportConfig {
            interval_secs: 0,
            stop_timeout_ms: 100,
        };
        assert_eq!(report.interval(), Duration::from_secs(1));
    }
}
