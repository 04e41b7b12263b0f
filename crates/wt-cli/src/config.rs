//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wt_core::{AnalysisConfig, ConfigError, DEFAULT_INACTIVITY_MINUTES};

use crate::cli::InputArgs;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Idle minutes that separate two work chunks.
    pub inactivity_minutes: i64,

    /// Developers below this many total hours are left out of reports.
    pub min_hours: f64,

    /// Directory scanned for log files when none are passed explicitly.
    pub logs_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inactivity_minutes: DEFAULT_INACTIVITY_MINUTES,
            min_hours: 0.0,
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Loads configuration from default locations, optionally layering a
    /// specific file on top.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WT_*)
        figment = figment.merge(Env::prefixed("WT_"));

        figment.extract()
    }

    /// Applies command-line overrides on top of the loaded values.
    #[must_use]
    pub fn with_overrides(mut self, input: &InputArgs) -> Self {
        if let Some(minutes) = input.inactivity {
            self.inactivity_minutes = minutes;
        }
        if let Some(min_hours) = input.min_hours {
            self.min_hours = min_hours;
        }
        if let Some(dir) = &input.logs_dir {
            self.logs_dir.clone_from(dir);
        }
        self
    }

    /// Validates the analysis parameters.
    pub fn analysis(&self) -> Result<AnalysisConfig, ConfigError> {
        AnalysisConfig::new(self.inactivity_minutes, self.min_hours)
    }
}

/// Returns the platform-specific config directory for worktime.
///
/// On Linux: `~/.config/worktime`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("worktime"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.inactivity_minutes, 30);
        assert!(config.min_hours.abs() < f64::EPSILON);
        assert_eq!(config.logs_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_dirs_config_path_ends_with_worktime() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "worktime");
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "inactivity_minutes = 45").unwrap();
        writeln!(file, "min_hours = 1.5").unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();

        assert_eq!(config.inactivity_minutes, 45);
        assert!((config.min_hours - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overrides_win_over_loaded_values() {
        let input = InputArgs {
            inactivity: Some(10),
            min_hours: Some(2.0),
            logs_dir: Some(PathBuf::from("/var/logs")),
            ..InputArgs::default()
        };

        let config = Config::default().with_overrides(&input);

        assert_eq!(config.inactivity_minutes, 10);
        assert!((config.min_hours - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.logs_dir, PathBuf::from("/var/logs"));
    }

    #[test]
    fn test_missing_overrides_keep_loaded_values() {
        let config = Config::default().with_overrides(&InputArgs::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_analysis_rejects_bad_values() {
        let config = Config {
            inactivity_minutes: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.analysis(),
            Err(ConfigError::NonPositiveThreshold { minutes: 0 })
        ));

        let config = Config {
            min_hours: -1.0,
            ..Config::default()
        };
        assert!(matches!(
            config.analysis(),
            Err(ConfigError::InvalidMinHours { .. })
        ));
    }
}
