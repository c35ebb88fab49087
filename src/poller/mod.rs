pub mod model;
pub mod poller;

pub use model::{PlaybackStatus, Track, WidgetSnapshot};
pub use poller::{NowPlayingPoller, PollOutcome, PollerState, DEFAULT_POLL_INTERVAL};
