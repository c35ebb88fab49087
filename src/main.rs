use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use nowplaying::api::server;
use nowplaying::config::{self, Credentials};
use nowplaying::logging;
use nowplaying::poller::DEFAULT_POLL_INTERVAL;
use nowplaying::{get_tokio_runtime, initialize_tokio_runtime, NowPlayingPoller, TokenProvider};

fn main() {
    // Initialize the Tokio runtime early
    initialize_tokio_runtime();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return;
    }

    let config_file_path = find_config_file_in_args(&args);
    let log_config_path = find_log_config_in_args(&args);

    // Initialize logging system
    if let Err(e) = logging::initialize_logging_with_args(&args, log_config_path.as_deref()) {
        eprintln!("Error: Failed to initialize logging configuration: {}", e);
        std::process::exit(1);
    }

    info!("Now-playing widget server starting");

    // Load the configuration file. A path given with -c must exist; the
    // default file is optional since credentials can come from the
    // environment alone.
    let service_config = match &config_file_path {
        Some(path) => match config::load_config(path) {
            Ok(value) => {
                info!("Loaded configuration from {}", path);
                value
            }
            Err(e) => {
                error!("{}", e);
                eprintln!("Error: {}", e);
                eprintln!("Cannot continue without a valid configuration file.");
                std::process::exit(1);
            }
        },
        None => {
            let default_path = "nowplaying.json";
            if Path::new(default_path).exists() {
                match config::load_config(default_path) {
                    Ok(value) => {
                        info!("Loaded configuration from {}", default_path);
                        value
                    }
                    Err(e) => {
                        error!("{}", e);
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                info!("No configuration file found, using defaults and environment");
                serde_json::json!({})
            }
        }
    };

    // Credentials come from the spotify section with environment overrides.
    // A missing value is not fatal here: the token endpoint reports it per
    // call and the poller surfaces it as the widget error state.
    let credentials = Credentials::from_config(&service_config);
    if let Err(e) = credentials.validate() {
        warn!("{}", e);
        warn!("The token endpoint will return errors until credentials are configured");
    }

    let provider = Arc::new(TokenProvider::new(credentials));

    let interval = config::get_service_config(&service_config, "nowplaying")
        .and_then(|np| np.get("interval_secs"))
        .and_then(|v| v.as_u64())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_POLL_INTERVAL);
    info!("Polling interval: {} seconds", interval.as_secs());

    let poller = NowPlayingPoller::new(Arc::clone(&provider), interval);
    if poller.start() {
        info!("Now-playing poller started");
    } else {
        warn!("Now-playing poller failed to start; the widget will report an error until restart");
    }

    // Set up a shared flag for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down...");
        r.store(false, Ordering::SeqCst);

        // Force exit if the graceful shutdown stalls
        let force_shutdown_delay = Duration::from_secs(5);
        let r_clone = r.clone();
        let _force_shutdown_thread = thread::spawn(move || {
            thread::sleep(force_shutdown_delay);
            if !r_clone.load(Ordering::SeqCst) {
                info!(
                    "Graceful shutdown timed out after {} seconds, forcing exit...",
                    force_shutdown_delay.as_secs()
                );
                std::process::exit(0);
            }
        });
    }) {
        eprintln!("Error: Failed to set Ctrl+C handler: {}", e);
        std::process::exit(1);
    }

    // Start the API server using the global Tokio runtime
    let api_poller = poller.clone();
    let api_provider = Arc::clone(&provider);
    let api_config = service_config.clone();
    let _api_thread = thread::spawn(move || {
        get_tokio_runtime().block_on(async {
            if let Err(e) = server::start_rocket_server(api_poller, api_provider, &api_config).await
            {
                error!("API server error: {}", e);
            }
        });
    });

    info!(
        "API server started on port {}",
        server::webserver_port(&service_config)
    );

    // Keep the main thread alive until Ctrl+C is received
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    poller.stop();
    info!("Exiting application");
}

/// Find config file path from command line arguments (-c option)
fn find_config_file_in_args(args: &[String]) -> Option<String> {
    let mut i = 1;
    while i < args.len() {
        if args[i] == "-c" && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

/// Find logging config file path from command line arguments (--log-config option)
fn find_log_config_in_args(args: &[String]) -> Option<PathBuf> {
    let mut i = 1;
    while i < args.len() {
        if (args[i] == "--log-config" || args[i] == "--logging-config") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
        i += 1;
    }

    // Check for default logging config files
    let default_paths = ["logging.json", "config/logging.json"];
    for path_str in &default_paths {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Print help information for command line usage
fn print_help() {
    println!("Now-Playing Widget Server");
    println!("=========================");
    println!();
    println!("USAGE:");
    println!("    nowplaying [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c <FILE>                   Specify configuration file path");
    println!("                                (default: nowplaying.json, optional)");
    println!();
    println!("    --log-config <FILE>         Specify logging configuration file");
    println!("    --logging-config <FILE>     (alternative form)");
    println!();
    println!("    -d, --debug                 Enable debug logging (if no log config)");
    println!();
    println!("    -h, --help                  Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    SPOTIFY_CLIENT_ID           Spotify application client id");
    println!("    SPOTIFY_CLIENT_SECRET       Spotify application client secret");
    println!("    SPOTIFY_REFRESH_TOKEN       Long-lived refresh token");
    println!();
    println!("    Environment values override the 'spotify' section of the");
    println!("    configuration file.");
    println!();
    println!("EXAMPLES:");
    println!("    nowplaying");
    println!("        Start with defaults and environment credentials");
    println!();
    println!("    nowplaying -c /etc/nowplaying/config.json");
    println!("        Start with a specific configuration file");
    println!();
    println!("    nowplaying --debug");
    println!("        Start with debug logging enabled");
}
