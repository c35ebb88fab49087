// Rocket API server setup

use std::sync::Arc;

use log::info;
use rocket::routes;
use serde_json::Value;

use crate::api::{nowplaying, token};
use crate::config::get_service_config;
use crate::helpers::token_provider::TokenProvider;
use crate::poller::NowPlayingPoller;

/// Default webserver port when no configuration is given
pub const DEFAULT_PORT: u16 = 1080;

/// Read the webserver port from the configuration
pub fn webserver_port(config: &Value) -> u16 {
    get_service_config(config, "webserver")
        .and_then(|ws| ws.get("port"))
        .and_then(|p| p.as_u64())
        .map(|p| p as u16)
        .unwrap_or(DEFAULT_PORT)
}

/// Build and launch the Rocket server.
///
/// The poller and token provider are managed state shared with the routes.
/// Runs until the process shuts down.
pub async fn start_rocket_server(
    poller: NowPlayingPoller,
    provider: Arc<TokenProvider>,
    config: &Value,
) -> Result<(), rocket::Error> {
    let port = webserver_port(config);

    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "0.0.0.0"))
        .merge(("log_level", "off"));

    info!("Starting API server on port {}", port);

    rocket::custom(figment)
        .manage(poller)
        .manage(provider)
        .mount(
            "/api",
            routes![
                token::refresh_token,
                nowplaying::nowplaying,
                nowplaying::poller_status,
            ],
        )
        .launch()
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_from_services_section() {
        let config = json!({"services": {"webserver": {"port": 8080}}});
        assert_eq!(webserver_port(&config), 8080);
    }

    #[test]
    fn test_port_default() {
        let config = json!({});
        assert_eq!(webserver_port(&config), DEFAULT_PORT);
    }

    #[test]
    fn test_port_top_level_fallback() {
        let config = json!({"webserver": {"port": 9000}});
        assert_eq!(webserver_port(&config), 9000);
    }
}
