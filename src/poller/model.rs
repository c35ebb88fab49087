// Playback model for the now-playing widget
//
// These structures are a subset of the Spotify "currently playing" response.
// Each successful poll fully replaces the previous status; there is no merge
// logic and nothing here is persisted.

use serde::{Deserialize, Serialize};

/// Current playback status as reported by the upstream service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    #[serde(rename = "item")]
    pub track: Option<Track>,
}

impl PlaybackStatus {
    /// Status reported when nothing is playing (204 from upstream)
    pub fn idle() -> Self {
        PlaybackStatus {
            is_playing: false,
            track: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Track {
    /// Artist names joined with ", ", order preserved
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// URL of the first (largest) album image, if any
    pub fn album_art_url(&self) -> Option<&str> {
        self.album
            .as_ref()
            .and_then(|album| album.images.first())
            .map(|image| image.url.as_str())
    }
}

/// What the widget shows, derived purely from the current poller state.
///
/// `Error` renders the error banner, `NotPlaying` the placeholder, and
/// `Track` the title/artists/art row with a play or pause indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WidgetSnapshot {
    Error {
        message: String,
    },
    NotPlaying,
    Track {
        title: String,
        artists: String,
        album: Option<String>,
        album_art_url: Option<String>,
        duration_ms: Option<u64>,
        is_playing: bool,
    },
}

impl WidgetSnapshot {
    /// Render a playback status into the widget view
    pub fn from_status(status: &PlaybackStatus) -> Self {
        match &status.track {
            Some(track) => WidgetSnapshot::Track {
                title: track.name.clone(),
                artists: track.artist_names(),
                album: track.album.as_ref().map(|a| a.name.clone()),
                album_art_url: track.album_art_url().map(|url| url.to_string()),
                duration_ms: track.duration_ms,
                is_playing: status.is_playing,
            },
            None => WidgetSnapshot::NotPlaying,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_status() -> PlaybackStatus {
        serde_json::from_value(json!({
            "is_playing": true,
            "item": {
                "name": "Paranoid Android",
                "artists": [{"name": "Radiohead"}],
                "album": {
                    "name": "OK Computer",
                    "images": [
                        {"url": "https://img.test/640.jpg", "width": 640, "height": 640},
                        {"url": "https://img.test/300.jpg", "width": 300, "height": 300}
                    ]
                },
                "duration_ms": 383066
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_currently_playing_payload() {
        let status = sample_status();
        assert!(status.is_playing);
        let track = status.track.as_ref().unwrap();
        assert_eq!(track.name, "Paranoid Android");
        assert_eq!(track.album_art_url(), Some("https://img.test/640.jpg"));
        assert_eq!(track.duration_ms, Some(383066));
    }

    #[test]
    fn test_artist_names_join_preserves_order() {
        let track = Track {
            name: "Song".to_string(),
            artists: vec![
                Artist { name: "First".to_string() },
                Artist { name: "Second".to_string() },
                Artist { name: "Third".to_string() },
            ],
            album: None,
            duration_ms: None,
        };
        assert_eq!(track.artist_names(), "First, Second, Third");
    }

    #[test]
    fn test_snapshot_for_idle_status() {
        let snapshot = WidgetSnapshot::from_status(&PlaybackStatus::idle());
        assert_eq!(snapshot, WidgetSnapshot::NotPlaying);
    }

    #[test]
    fn test_snapshot_for_playing_track() {
        let snapshot = WidgetSnapshot::from_status(&sample_status());
        match snapshot {
            WidgetSnapshot::Track {
                title,
                artists,
                album,
                album_art_url,
                is_playing,
                ..
            } => {
                assert_eq!(title, "Paranoid Android");
                assert_eq!(artists, "Radiohead");
                assert_eq!(album.as_deref(), Some("OK Computer"));
                assert_eq!(album_art_url.as_deref(), Some("https://img.test/640.jpg"));
                assert!(is_playing);
            }
            other => panic!("expected Track snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let status = sample_status();
        let first = WidgetSnapshot::from_status(&status);
        let second = WidgetSnapshot::from_status(&status);
        assert_eq!(first, second);
    }

    #[test]
    fn test_track_without_album_images() {
        let status: PlaybackStatus = serde_json::from_value(json!({
            "is_playing": false,
            "item": {
                "name": "Rare Single",
                "artists": [{"name": "Someone"}],
                "album": {"name": "Unknown"},
                "duration_ms": 1000
            }
        }))
        .unwrap();

        let track = status.track.as_ref().unwrap();
        assert!(track.album_art_url().is_none());

        match WidgetSnapshot::from_status(&status) {
            WidgetSnapshot::Track { is_playing, album_art_url, .. } => {
                assert!(!is_playing);
                assert!(album_art_url.is_none());
            }
            other => panic!("expected Track snapshot, got {:?}", other),
        }
    }
}
