// Now-playing API routes

use rocket::get;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;

use crate::poller::{NowPlayingPoller, PollerState, WidgetSnapshot};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: PollerState,
}

/// Get the current widget snapshot: error banner, placeholder, or track
#[get("/nowplaying")]
pub fn nowplaying(poller: &State<NowPlayingPoller>) -> Json<WidgetSnapshot> {
    Json(poller.snapshot())
}

/// Get the poller lifecycle state
#[get("/status")]
pub fn poller_status(poller: &State<NowPlayingPoller>) -> Json<StatusResponse> {
    Json(StatusResponse {
        state: poller.state(),
    })
}
