//! Rendering-agnostic UI surface.
//!
//! The poller and controller never touch a concrete UI. They talk to a
//! [`ProgressSink`] (outbound: text, progress, lists) and receive
//! [`UiEvent`]s (inbound: clicks and text input). A terminal front end, a
//! web view, or a test recorder can all sit behind these two types.

use crate::types::{SimilarTrack, Track};

/// Everything the client pushes at the UI.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// polling loop. All methods take `&self` so one sink can be shared across
/// concurrently running task kinds.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait ProgressSink: Send + Sync {
    /// Replace the progress status line.
    fn status_text(&self, text: &str);

    /// Set the progress bar, 0..=100.
    fn progress_percent(&self, percent: u8);

    /// Append one newly encoded track to the visible library list.
    ///
    /// Delivered at-least-once per track during a library update; the list is
    /// replaced wholesale by [`library_loaded`](Self::library_loaded) when the
    /// task finishes, so no client-side de-duplication happens here.
    fn track_encoded(&self, track: &Track);

    /// Replace the visible library list with the canonical listing.
    fn library_loaded(&self, tracks: &[Track]);

    /// Show search results for the current query.
    fn search_results(&self, tracks: &[Track]);

    /// Show similarity results for a track.
    fn similar_results(&self, tracks: &[SimilarTrack]);

    /// A generated playlist is ready; `embed_url` is present when the backend
    /// produced an embeddable player URL.
    fn playlist_ready<'a>(&self, embed_url: Option<&'a str>);

    /// Toggle the busy state of the task controls (disable the update button
    /// while a task runs, re-enable it when the poller tears down).
    fn controls_busy(&self, busy: bool);
}

/// Actions a click can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The "update my library" control.
    UpdateLibrary,
    /// A search result was chosen as the seed for playlist generation.
    SelectTrack(i64),
    /// The "find similar" control next to a library track.
    FindSimilar(i64),
}

/// Inbound UI events, independent of any rendering technology.
///
/// The capability set is deliberately small: clicks on known controls and
/// free-text input from the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Click(Action),
    Input(String),
}

/// Format a track the way list rows display it.
pub fn track_row(track: &Track) -> String {
    format!("{} — {}", track.name, track.artist)
}

/// Format a similarity result row with its score.
pub fn similar_row(track: &SimilarTrack) -> String {
    format!("{} — {} (score={:.3})", track.name, track.artist, track.similarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_row_format() {
        let track = Track {
            id: 1,
            name: "Karma Police".to_string(),
            artist: "Radiohead".to_string(),
        };
        assert_eq!(track_row(&track), "Karma Police — Radiohead");
    }

    #[test]
    fn test_similar_row_rounds_score() {
        let track = SimilarTrack {
            id: 2,
            name: "No Surprises".to_string(),
            artist: "Radiohead".to_string(),
            similarity: 0.98765,
        };
        assert_eq!(similar_row(&track), "No Surprises — Radiohead (score=0.988)");
    }
}
