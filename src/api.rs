use crate::types::{SimilarTrack, StartedTask, TaskStatusSnapshot, Track};
use crate::Result;
use async_trait::async_trait;

/// Trait for Resona backend operations that can be mocked for testing.
///
/// This abstracts the six HTTP endpoints the client consumes so that the
/// poller, search glue, and controller can be exercised against scripted
/// implementations. All methods that perform network operations are included.
///
/// # Mocking Support
///
/// When the `mock` feature is enabled, this crate provides `MockResonaApi`
/// implemented via the `mockall` library.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ResonaApi: Send + Sync {
    /// Fetch the user's fully encoded library tracks.
    ///
    /// This is also the canonical listing used for the reconciliation reload
    /// after a library update finishes.
    async fn encoded_tracks(&self) -> Result<Vec<Track>>;

    /// Fetch the tracks most similar to the given track.
    async fn similar_tracks(&self, track_id: i64) -> Result<Vec<SimilarTrack>>;

    /// Fetch one status snapshot for a running task.
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusSnapshot>;

    /// Start a library-update task, returning its id.
    async fn start_library_update(&self) -> Result<StartedTask>;

    /// Free-text track search.
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>>;

    /// Start a playlist-generation task seeded from the given track.
    async fn start_playlist_generation(&self, seed_track_id: i64) -> Result<StartedTask>;
}
