use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Target, WriteStyle};
use log::{debug, info, LevelFilter};
use serde::{Deserialize, Serialize};

/// Available logging subsystems in the now-playing service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LoggingSubsystem {
    /// Main application logging
    #[serde(rename = "main")]
    Main,
    /// API server logging
    #[serde(rename = "api")]
    Api,
    /// Now-playing poller state machine
    #[serde(rename = "poller")]
    Poller,
    /// HTTP client operations and token exchange
    #[serde(rename = "http")]
    Http,
    /// Configuration loading and parsing
    #[serde(rename = "config")]
    Config,
    /// Third-party dependencies
    #[serde(rename = "deps")]
    Dependencies,
}

impl LoggingSubsystem {
    /// Get the module prefix for this subsystem
    pub fn module_prefix(&self) -> &'static str {
        match self {
            LoggingSubsystem::Main => "nowplaying",
            LoggingSubsystem::Api => "nowplaying::api",
            LoggingSubsystem::Poller => "nowplaying::poller",
            LoggingSubsystem::Http => {
                "nowplaying::helpers::http_client,nowplaying::helpers::token_provider,ureq"
            }
            LoggingSubsystem::Config => "nowplaying::config",
            LoggingSubsystem::Dependencies => "rocket,serde",
        }
    }

    fn parse(name: &str) -> Option<LoggingSubsystem> {
        match name.to_lowercase().as_str() {
            "main" => Some(LoggingSubsystem::Main),
            "api" => Some(LoggingSubsystem::Api),
            "poller" => Some(LoggingSubsystem::Poller),
            "http" => Some(LoggingSubsystem::Http),
            "config" => Some(LoggingSubsystem::Config),
            "deps" | "dependencies" => Some(LoggingSubsystem::Dependencies),
            _ => None,
        }
    }
}

/// Logging configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Target for log output (stdout, stderr)
    #[serde(default = "default_target")]
    pub target: String,

    /// Whether to include timestamps
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,

    /// Whether to use colored output
    #[serde(default = "default_colors")]
    pub colors: bool,

    /// Subsystem-specific log levels
    #[serde(default)]
    pub subsystems: HashMap<String, String>,

    /// Whether to include module paths in log output
    #[serde(default)]
    pub include_module_path: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target() -> String {
    "stdout".to_string()
}

fn default_timestamps() -> bool {
    true
}

fn default_colors() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            target: default_target(),
            timestamps: default_timestamps(),
            colors: default_colors(),
            subsystems: HashMap::new(),
            include_module_path: false,
        }
    }
}

impl LoggingConfig {
    /// Load logging configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read logging config file: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse logging config: {}", e))
    }

    /// Convert string log level to LevelFilter
    fn parse_log_level(level: &str) -> LevelFilter {
        match level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => {
                eprintln!("Warning: Unknown log level '{}', defaulting to 'info'", level);
                LevelFilter::Info
            }
        }
    }

    /// Initialize the logger with this configuration
    pub fn initialize_logger(&self) -> Result<(), String> {
        let mut builder = Builder::new();

        builder.parse_env("RUST_LOG");
        builder.filter(None, Self::parse_log_level(&self.level));

        // Subsystem-specific filters, shortest module path applied first so
        // the more specific paths win
        let mut filters = Vec::new();
        for (subsystem_name, level) in &self.subsystems {
            if let Some(subsystem) = LoggingSubsystem::parse(subsystem_name) {
                for prefix in subsystem.module_prefix().split(',') {
                    filters.push((prefix.trim().to_string(), level.clone()));
                }
            } else {
                // Allow custom module specifications
                filters.push((subsystem_name.clone(), level.clone()));
            }
        }
        filters.sort_by_key(|(path, _)| path.len());
        for (path, level) in filters {
            builder.filter(Some(&path), Self::parse_log_level(&level));
        }

        builder.write_style(if self.colors {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        });

        match self.target.to_lowercase().as_str() {
            "stdout" => {
                builder.target(Target::Stdout);
            }
            "stderr" => {
                builder.target(Target::Stderr);
            }
            _ => {
                return Err(format!("Unknown logging target: {}", self.target));
            }
        }

        let timestamps = self.timestamps;
        let include_module_path = self.include_module_path;
        builder.format(move |buf, record| {
            let mut output = String::new();

            if timestamps {
                output.push_str(&format!(
                    "[{}] ",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                ));
            }

            output.push_str(&format!("[{}] ", record.level()));

            if include_module_path {
                if let Some(module) = record.module_path() {
                    output.push_str(&format!("[{}] ", module));
                }
            }

            output.push_str(&format!("{}", record.args()));

            writeln!(buf, "{}", output)
        });

        builder
            .try_init()
            .map_err(|e| format!("Failed to initialize logger: {}", e))?;

        info!("Logging initialized at level '{}'", self.level);
        Ok(())
    }
}

/// Initialize logging from command line arguments and optional config file
pub fn initialize_logging_with_args(args: &[String], config_file: Option<&Path>) -> Result<(), String> {
    let debug_mode = args.iter().any(|arg| arg == "--debug" || arg == "-d");
    let verbose_mode = args.iter().any(|arg| arg == "--verbose" || arg == "-v");

    let mut config = if let Some(config_path) = config_file {
        if config_path.exists() {
            LoggingConfig::from_file(config_path)?
        } else {
            return Err(format!("Logging config file {:?} not found", config_path));
        }
    } else {
        LoggingConfig::default()
    };

    if debug_mode || verbose_mode {
        config.level = "debug".to_string();
        debug!("Debug logging enabled via command line");
    }

    config.initialize_logger()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.target, "stdout");
        assert!(config.timestamps);
    }

    #[test]
    fn test_parse_config_with_subsystems() {
        let json = r#"{
            "level": "warn",
            "subsystems": { "poller": "debug", "deps": "error" }
        }"#;
        let config: LoggingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.level, "warn");
        assert_eq!(config.subsystems["poller"], "debug");
        assert_eq!(config.subsystems["deps"], "error");
    }

    #[test]
    fn test_subsystem_module_prefixes() {
        assert_eq!(LoggingSubsystem::Main.module_prefix(), "nowplaying");
        assert!(LoggingSubsystem::Http
            .module_prefix()
            .contains("token_provider"));
        assert!(LoggingSubsystem::parse("POLLER").is_some());
        assert!(LoggingSubsystem::parse("nonsense").is_none());
    }
}
