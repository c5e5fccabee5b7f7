//! Controller glue between UI events, the API client, and the pollers.

use crate::api::ResonaApi;
use crate::poller::{PollerConfig, TaskKind, TaskPoller};
use crate::search::SearchDebouncer;
use crate::ui::{Action, ProgressSink, UiEvent};
use crate::{ResonaError, Result};
use std::sync::Arc;

/// Extract the mandatory `user_id` from a page query string.
///
/// The query string is the part after `?`, with or without the leading `?`.
/// Absence is fatal ([`ResonaError::MissingUserId`]); a value that is not an
/// integer is [`ResonaError::InvalidInput`].
///
/// ```
/// use resona_client::app::user_id_from_query;
///
/// assert_eq!(user_id_from_query("user_id=42&spotify_user_id=abc").unwrap(), 42);
/// assert!(user_id_from_query("spotify_user_id=abc").is_err());
/// ```
pub fn user_id_from_query(query: &str) -> Result<u64> {
    let query = query.strip_prefix('?').unwrap_or(query);
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key != "user_id" {
            continue;
        }
        let value = urlencoding::decode(value)
            .map_err(|e| ResonaError::InvalidInput(format!("undecodable user_id: {e}")))?;
        return value
            .parse::<u64>()
            .map_err(|_| ResonaError::InvalidInput(format!("user_id is not an integer: {value}")));
    }
    Err(ResonaError::MissingUserId)
}

/// Root controller owning one poller per task kind and the search debouncer.
///
/// All UI wiring goes through [`handle_event`](Self::handle_event); the
/// controller never talks to a concrete rendering technology.
pub struct AppController {
    api: Arc<dyn ResonaApi>,
    sink: Arc<dyn ProgressSink>,
    library_poller: TaskPoller,
    playlist_poller: TaskPoller,
    search: SearchDebouncer,
}

impl AppController {
    pub fn new(api: Arc<dyn ResonaApi>, sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_config(api, sink, PollerConfig::default())
    }

    pub fn with_config(
        api: Arc<dyn ResonaApi>,
        sink: Arc<dyn ProgressSink>,
        config: PollerConfig,
    ) -> Self {
        let library_poller = TaskPoller::with_config(
            TaskKind::LibraryUpdate,
            Arc::clone(&api),
            Arc::clone(&sink),
            config.clone(),
        );
        let playlist_poller = TaskPoller::with_config(
            TaskKind::PlaylistGeneration,
            Arc::clone(&api),
            Arc::clone(&sink),
            config,
        );
        let search = SearchDebouncer::new(Arc::clone(&api), Arc::clone(&sink));
        Self {
            api,
            sink,
            library_poller,
            playlist_poller,
            search,
        }
    }

    pub fn library_poller(&mut self) -> &mut TaskPoller {
        &mut self.library_poller
    }

    pub fn playlist_poller(&mut self) -> &mut TaskPoller {
        &mut self.playlist_poller
    }

    /// Initial page load: fetch and show the encoded library.
    pub async fn init(&self) -> Result<()> {
        match self.api.encoded_tracks().await {
            Ok(tracks) => {
                self.sink.library_loaded(&tracks);
                Ok(())
            }
            Err(e) => {
                log::error!("error loading encoded tracks: {e}");
                self.sink.status_text("Error loading tracks");
                Err(e)
            }
        }
    }

    /// Dispatch one UI event.
    pub async fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Click(Action::UpdateLibrary) => self.start_library_update().await,
            UiEvent::Click(Action::SelectTrack(track_id)) => {
                self.start_playlist_generation(track_id).await
            }
            UiEvent::Click(Action::FindSimilar(track_id)) => self.find_similar(track_id).await,
            UiEvent::Input(query) => self.search.on_input(&query),
        }
    }

    /// Tear down both pollers and any pending search.
    pub fn shutdown(&mut self) {
        self.library_poller.stop();
        self.playlist_poller.stop();
        self.search.cancel_pending();
    }

    async fn start_library_update(&mut self) {
        self.sink.controls_busy(true);
        self.sink.status_text("Starting task...");
        self.sink.progress_percent(0);
        match self.api.start_library_update().await {
            Ok(task) => self.library_poller.start(&task.task_id),
            Err(e) => {
                log::error!("error starting library update: {e}");
                self.sink.status_text(&format!("Error: {e}"));
                self.sink.controls_busy(false);
            }
        }
    }

    async fn start_playlist_generation(&mut self, seed_track_id: i64) {
        self.sink.controls_busy(true);
        self.sink.status_text("Starting playlist generation...");
        self.sink.progress_percent(0);
        match self.api.start_playlist_generation(seed_track_id).await {
            Ok(task) => self.playlist_poller.start(&task.task_id),
            Err(e) => {
                log::error!("error starting playlist generation: {e}");
                self.sink.status_text(&format!("Error: {e}"));
                self.sink.controls_busy(false);
            }
        }
    }

    async fn find_similar(&self, track_id: i64) {
        match self.api.similar_tracks(track_id).await {
            Ok(tracks) => self.sink.similar_results(&tracks),
            Err(e) => {
                log::error!("error fetching similar tracks: {e}");
                self.sink.status_text("Error fetching similar tracks");
            }
        }
    }
}
