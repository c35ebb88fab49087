// Configuration utilities for the now-playing service
//
// The configuration file is a JSON document with a "services" subtree
// (e.g. "webserver", "spotify", "nowplaying"). Top-level entries are
// accepted as a fallback for hand-written configs.

use log::{debug, info, warn};
use std::env;
use std::fs;
use std::path::Path;

/// Environment variables that override the credential configuration
pub const ENV_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_REFRESH_TOKEN: &str = "SPOTIFY_REFRESH_TOKEN";

/// Helper function to get a service configuration section
///
/// Looks for the service in the "services" subtree first, then at the
/// top level of the document.
///
/// # Arguments
/// * `config` - The configuration JSON object
/// * `service_name` - The name of the service to look up (e.g., "spotify", "webserver")
///
/// # Returns
/// * `Option<&serde_json::Value>` - The service configuration if found, None otherwise
pub fn get_service_config<'a>(
    config: &'a serde_json::Value,
    service_name: &str,
) -> Option<&'a serde_json::Value> {
    if let Some(services) = config.get("services") {
        if let Some(service_config) = services.get(service_name) {
            debug!("Found {} configuration in services section", service_name);
            return Some(service_config);
        }
    }

    if let Some(service_config) = config.get(service_name) {
        debug!("Found {} configuration at top level", service_name);
        return Some(service_config);
    }

    debug!("No {} configuration found", service_name);
    None
}

/// Load a configuration file and parse it as JSON
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<serde_json::Value, String> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| format!("Failed to read {}: {}", path.as_ref().display(), e))?;

    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.as_ref().display(), e))
}

/// The Spotify credential set: client id, client secret and the long-lived
/// refresh token. Immutable for the process lifetime and never exposed to
/// API clients.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    /// Build the credential set from the "spotify" service section with
    /// environment-variable overrides. Environment values win over the
    /// configuration file.
    pub fn from_config(config: &serde_json::Value) -> Self {
        let section = get_service_config(config, "spotify");

        let from_section = |key: &str| -> String {
            section
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let from_env = |var: &str, fallback: String| -> String {
            match env::var(var) {
                Ok(value) if !value.trim().is_empty() => {
                    info!("Using {} from environment", var);
                    value
                }
                _ => fallback,
            }
        };

        Credentials {
            client_id: from_env(ENV_CLIENT_ID, from_section("client_id")),
            client_secret: from_env(ENV_CLIENT_SECRET, from_section("client_secret")),
            refresh_token: from_env(ENV_REFRESH_TOKEN, from_section("refresh_token")),
        }
    }

    /// Check that all three credential values are present.
    ///
    /// Returns the list of missing keys in the error message so a
    /// misconfigured deployment can be fixed without guesswork.
    pub fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.client_secret.trim().is_empty() {
            missing.push("client_secret");
        }
        if self.refresh_token.trim().is_empty() {
            missing.push("refresh_token");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            warn!("Missing Spotify credentials: {}", missing.join(", "));
            Err(format!("Missing Spotify credentials: {}", missing.join(", ")))
        }
    }
}
