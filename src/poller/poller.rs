// Now-playing poller
//
// Owns the token acquisition and polling state machine:
//
//   Uninitialized -> Acquiring -> Polling -> Idle | Error
//
// A single sequential loop thread performs every acquire/poll cycle, so two
// polls never overlap and all state transitions happen in one place. Each
// cycle reports its outcome through `PollOutcome` instead of mutating
// anything mid-flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde::Serialize;

use crate::helpers::http_client::{new_http_client, HttpClient, HttpClientError};
use crate::helpers::token_provider::TokenProvider;
use crate::poller::model::{PlaybackStatus, WidgetSnapshot};

/// Spotify currently-playing endpoint
pub const CURRENTLY_PLAYING_URL: &str = "https://api.spotify.com/v1/me/player/currently-playing";

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

// User-facing messages, matching what the widget shows
const MSG_CONNECT_FAILED: &str = "Failed to connect to Spotify";
const MSG_FETCH_FAILED: &str = "Failed to fetch current track";

/// Lifecycle state of the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    /// Created but not started
    Uninitialized,
    /// Exchanging the refresh token for a bearer token
    Acquiring,
    /// Polling with an active track
    Polling,
    /// Polling, upstream reports no active session
    Idle,
    /// Halted after a fatal failure; requires a restart
    Error,
}

/// Outcome of one poll cycle
#[derive(Debug)]
pub enum PollOutcome {
    /// Upstream returned a playback status; fully replaces the prior one
    Updated(PlaybackStatus),
    /// Upstream reported no active playback (204)
    Idle,
    /// The bearer token was rejected (401); re-acquire and resume
    AuthExpired,
    /// Any other failure; polling halts
    Fatal(String),
}

/// The now-playing polling client.
///
/// Clones share state, so a clone can be handed to the polling thread and to
/// the API server. The bearer token lives inside the instance and is never
/// exposed; the token provider is passed in explicitly rather than read from
/// ambient state.
pub struct NowPlayingPoller {
    provider: Arc<TokenProvider>,
    http: Box<dyn HttpClient>,
    endpoint: String,
    interval: Duration,

    state: Arc<RwLock<PollerState>>,
    status: Arc<RwLock<Option<PlaybackStatus>>>,
    token: Arc<RwLock<Option<String>>>,
    error_message: Arc<RwLock<Option<String>>>,
    running: Arc<AtomicBool>,
}

impl Clone for NowPlayingPoller {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            interval: self.interval,
            state: Arc::clone(&self.state),
            status: Arc::clone(&self.status),
            token: Arc::clone(&self.token),
            error_message: Arc::clone(&self.error_message),
            running: Arc::clone(&self.running),
        }
    }
}

impl NowPlayingPoller {
    /// Create a poller against the real Spotify API
    pub fn new(provider: Arc<TokenProvider>, interval: Duration) -> Self {
        Self::with_http_client(provider, CURRENTLY_PLAYING_URL, interval, new_http_client(10))
    }

    /// Create a poller with a custom endpoint and HTTP client
    pub fn with_http_client(
        provider: Arc<TokenProvider>,
        endpoint: &str,
        interval: Duration,
        http: Box<dyn HttpClient>,
    ) -> Self {
        NowPlayingPoller {
            provider,
            http,
            endpoint: endpoint.to_string(),
            interval,
            state: Arc::new(RwLock::new(PollerState::Uninitialized)),
            status: Arc::new(RwLock::new(None)),
            token: Arc::new(RwLock::new(None)),
            error_message: Arc::new(RwLock::new(None)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PollerState {
        *self.state.read()
    }

    /// Render the current state into the widget view.
    ///
    /// Pure function of poller state: error banner, placeholder, or track.
    pub fn snapshot(&self) -> WidgetSnapshot {
        if *self.state.read() == PollerState::Error {
            let message = self
                .error_message
                .read()
                .clone()
                .unwrap_or_else(|| MSG_FETCH_FAILED.to_string());
            return WidgetSnapshot::Error { message };
        }

        match &*self.status.read() {
            Some(status) => WidgetSnapshot::from_status(status),
            None => WidgetSnapshot::NotPlaying,
        }
    }

    /// Start the poller.
    ///
    /// Acquires the first token, then spawns the polling loop. Returns false
    /// when the token could not be acquired; the poller is then in the Error
    /// state and will not retry until restarted.
    pub fn start(&self) -> bool {
        if self.running.load(Ordering::SeqCst) {
            warn!("Now-playing poller is already running");
            return true;
        }

        if !self.acquire_token() {
            return false;
        }

        *self.state.write() = PollerState::Polling;
        self.running.store(true, Ordering::SeqCst);

        let poller = self.clone();
        let running = Arc::clone(&self.running);
        thread::spawn(move || {
            info!("Now-playing polling loop started");
            Self::run_loop(poller, running);
            info!("Now-playing polling loop stopped");
        });

        true
    }

    /// Stop the polling loop. The current cycle finishes, no new one starts.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn run_loop(poller: NowPlayingPoller, running: Arc<AtomicBool>) {
        while running.load(Ordering::SeqCst) {
            if !poller.tick() {
                running.store(false, Ordering::SeqCst);
                break;
            }

            // Sleep in short steps so stop() takes effect promptly
            let mut remaining = poller.interval;
            while running.load(Ordering::SeqCst) && !remaining.is_zero() {
                let step = remaining.min(Duration::from_millis(100));
                thread::sleep(step);
                remaining = remaining.saturating_sub(step);
            }
        }
    }

    /// Run one poll cycle and apply its outcome.
    ///
    /// Returns false when polling must halt (fatal failure or failed token
    /// re-acquisition).
    fn tick(&self) -> bool {
        if *self.state.read() == PollerState::Error {
            return false;
        }

        match self.poll_once() {
            PollOutcome::Updated(new_status) => {
                debug!(
                    "Playback update: playing={}, track={}",
                    new_status.is_playing,
                    new_status
                        .track
                        .as_ref()
                        .map(|t| t.name.as_str())
                        .unwrap_or("<none>")
                );
                *self.status.write() = Some(new_status);
                *self.state.write() = PollerState::Polling;
                true
            }
            PollOutcome::Idle => {
                debug!("No active playback");
                *self.status.write() = Some(PlaybackStatus::idle());
                *self.state.write() = PollerState::Idle;
                true
            }
            PollOutcome::AuthExpired => {
                info!("Bearer token rejected, re-acquiring");
                // The rejected token is dropped and never sent again; the
                // abandoned cycle is not retried until the next tick.
                *self.token.write() = None;
                self.acquire_token()
            }
            PollOutcome::Fatal(message) => {
                error!("Polling failed: {}", message);
                self.set_error(MSG_FETCH_FAILED);
                false
            }
        }
    }

    /// Issue a single request to the currently-playing endpoint
    fn poll_once(&self) -> PollOutcome {
        let token = match self.token.read().clone() {
            Some(token) => token,
            None => return PollOutcome::Fatal("no bearer token held".to_string()),
        };

        let auth = format!("Bearer {}", token);
        let headers = [("Authorization", auth.as_str())];

        match self.http.get_json_with_headers(&self.endpoint, &headers) {
            Ok(value) => match serde_json::from_value::<PlaybackStatus>(value) {
                Ok(status) => PollOutcome::Updated(status),
                Err(e) => PollOutcome::Fatal(format!("failed to parse playback status: {}", e)),
            },
            Err(HttpClientError::EmptyResponse) => PollOutcome::Idle,
            Err(HttpClientError::Unauthorized(_)) => PollOutcome::AuthExpired,
            Err(e) => PollOutcome::Fatal(e.to_string()),
        }
    }

    /// Exchange the refresh token for a bearer token via the provider.
    ///
    /// On failure the poller enters the Error state; there is no automatic
    /// retry beyond this single attempt.
    fn acquire_token(&self) -> bool {
        *self.state.write() = PollerState::Acquiring;

        match self.provider.refresh_token_response() {
            Ok(response) => {
                debug!(
                    "Access token acquired, nominal lifetime {} seconds",
                    response.expires_in
                );
                *self.token.write() = Some(response.access_token);
                *self.state.write() = PollerState::Polling;
                true
            }
            Err(e) => {
                error!("Token acquisition failed: {}", e);
                self.set_error(MSG_CONNECT_FAILED);
                false
            }
        }
    }

    fn set_error(&self, message: &str) {
        *self.error_message.write() = Some(message.to_string());
        *self.state.write() = PollerState::Error;
    }
}
