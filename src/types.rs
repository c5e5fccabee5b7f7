//! Data types for Resona tracks and task progress payloads.
//!
//! Everything here mirrors the JSON shapes produced by the backend: track
//! listings, search results, similarity scores, and the two task-kind
//! specific progress payloads carried inside a status snapshot.

use serde::{Deserialize, Serialize};

use crate::{ResonaError, Result};

/// A music track as returned by the library and search endpoints.
///
/// Progress payloads embed partial track objects (sometimes without a
/// database id), so `id` defaults to 0 when absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    /// Backend database id for this track
    #[serde(default)]
    pub id: i64,
    /// The track name/title
    pub name: String,
    /// The artist name
    pub artist: String,
}

/// A similarity search result for a seed track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarTrack {
    /// Backend database id for this track
    #[serde(default)]
    pub id: i64,
    /// The track name/title
    pub name: String,
    /// The artist name
    pub artist: String,
    /// Cosine similarity against the seed track, higher is closer
    pub similarity: f64,
}

/// Response of the task-start endpoints (`update_library`,
/// `generate_playlist`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedTask {
    /// Opaque task identifier issued by the backend
    pub task_id: String,
}

/// One point-in-time status response for a task.
///
/// `status` is the coarse lifecycle string reported by the task queue
/// (`pending`, `started`, `running`, `finished`, `failed`, open-ended).
/// `progress` is the task-kind specific payload, absent until the task has
/// published its first progress message. Extra fields such as `celery_state`
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusSnapshot {
    /// Coarse lifecycle state of the task
    pub status: String,
    /// Task-kind specific progress payload, if any has been published yet
    #[serde(default)]
    pub progress: Option<serde_json::Value>,
}

impl TaskStatusSnapshot {
    /// Whether the top-level status string alone marks this task terminal.
    pub fn is_terminal(&self) -> bool {
        self.status == "finished" || self.status == "failed"
    }
}

/// Lifecycle phase of a library-update task, as reported in its progress
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryPhase {
    /// A track is being downloaded and encoded
    Processing,
    /// A track finished encoding and can be shown immediately
    Encoded,
    /// All tracks have been handled
    Finished,
    /// A phase this client version does not know about
    #[serde(other)]
    Unknown,
}

/// Progress payload published by a library-update task.
///
/// The backend includes bookkeeping fields we do not model
/// (`preview_url_present` and friends); they are ignored on deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryProgress {
    /// Current phase
    pub status: LibraryPhase,
    /// 1-based index of the track currently being handled
    #[serde(default)]
    pub index: Option<u64>,
    /// Total number of tracks in this update
    #[serde(default)]
    pub total: Option<u64>,
    /// Number of tracks fully processed, reported on completion
    #[serde(default)]
    pub processed: Option<u64>,
    /// The track the current phase refers to
    #[serde(default)]
    pub track: Option<Track>,
    /// Human-readable completion or status message
    #[serde(default)]
    pub message: Option<String>,
}

impl LibraryProgress {
    /// Parse a library progress payload out of the raw `progress` value of a
    /// snapshot.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| ResonaError::Parse(e.to_string()))
    }
}

/// Lifecycle phase of a playlist-generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistPhase {
    /// Looking up tracks similar to the seed
    FindingSimilar,
    /// Authenticating against Spotify
    SpotifyAuth,
    /// Creating the playlist container
    CreatingPlaylist,
    /// Adding the selected tracks to the playlist
    AddingTracks,
    /// The playlist is ready
    Finished,
    /// The task gave up
    Failed,
    /// A phase this client version does not know about
    #[serde(other)]
    Unknown,
}

/// Progress payload published by a playlist-generation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistProgress {
    /// Current phase
    pub status: PlaylistPhase,
    /// Human-readable status or failure message
    #[serde(default)]
    pub message: Option<String>,
    /// Spotify playlist id, present once the playlist exists
    #[serde(default)]
    pub playlist_id: Option<String>,
    /// Embeddable playlist URL, present on completion
    #[serde(default)]
    pub embed_url: Option<String>,
}

impl PlaylistProgress {
    /// Parse a playlist progress payload out of the raw `progress` value of a
    /// snapshot.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| ResonaError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_processing_snapshot() {
        let json = r#"{
            "task_id": "abc-123",
            "status": "started",
            "celery_state": "STARTED",
            "progress": {
                "status": "processing",
                "index": 3,
                "total": 12,
                "track": {"id": 7, "name": "Holiday", "artist": "Bandit"},
                "preview_url_present": true
            }
        }"#;

        let snapshot: TaskStatusSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.status, "started");
        assert!(!snapshot.is_terminal());

        let progress = LibraryProgress::from_value(snapshot.progress.as_ref().unwrap()).unwrap();
        assert_eq!(progress.status, LibraryPhase::Processing);
        assert_eq!(progress.index, Some(3));
        assert_eq!(progress.total, Some(12));
        let track = progress.track.unwrap();
        assert_eq!(track.name, "Holiday");
        assert_eq!(track.artist, "Bandit");
        assert_eq!(track.id, 7);
    }

    #[test]
    fn test_parse_finished_library_progress() {
        let value = json!({
            "status": "finished",
            "processed": 9,
            "total": 12,
            "message": "Linked 3 pre-encoded tracks"
        });

        let progress = LibraryProgress::from_value(&value).unwrap();
        assert_eq!(progress.status, LibraryPhase::Finished);
        assert_eq!(progress.processed, Some(9));
        assert_eq!(progress.message.as_deref(), Some("Linked 3 pre-encoded tracks"));
        assert!(progress.track.is_none());
    }

    #[test]
    fn test_unknown_phase_does_not_fail() {
        let value = json!({"status": "reticulating_splines"});
        let progress = LibraryProgress::from_value(&value).unwrap();
        assert_eq!(progress.status, LibraryPhase::Unknown);
    }

    #[test]
    fn test_parse_playlist_progress_with_embed() {
        let value = json!({
            "status": "finished",
            "playlist_id": "37i9dQ",
            "embed_url": "https://open.spotify.com/embed/playlist/37i9dQ"
        });

        let progress = PlaylistProgress::from_value(&value).unwrap();
        assert_eq!(progress.status, PlaylistPhase::Finished);
        assert_eq!(
            progress.embed_url.as_deref(),
            Some("https://open.spotify.com/embed/playlist/37i9dQ")
        );
    }

    #[test]
    fn test_snapshot_without_progress() {
        let snapshot: TaskStatusSnapshot =
            serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert!(snapshot.progress.is_none());
        assert!(!snapshot.is_terminal());

        let terminal: TaskStatusSnapshot =
            serde_json::from_str(r#"{"status": "failed"}"#).unwrap();
        assert!(terminal.is_terminal());
    }

    #[test]
    fn test_track_id_defaults_to_zero() {
        let track: Track =
            serde_json::from_str(r#"{"name": "A", "artist": "B"}"#).unwrap();
        assert_eq!(track.id, 0);
    }
}
