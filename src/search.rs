//! Debounced search-as-you-type.

use crate::api::ResonaApi;
use crate::ui::ProgressSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delay between the last keystroke and the search request.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(250);

/// Default number of results requested per query.
const DEFAULT_LIMIT: u32 = 10;

/// Debounces free-text input into track-search requests.
///
/// Each new input aborts the previously scheduled lookup, so only the query
/// the user settled on reaches the backend. Results land on the sink; a
/// failed request is logged and abandoned, the results list simply does not
/// change for that query.
pub struct SearchDebouncer {
    api: Arc<dyn ResonaApi>,
    sink: Arc<dyn ProgressSink>,
    delay: Duration,
    limit: u32,
    pending: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    pub fn new(api: Arc<dyn ResonaApi>, sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_delay(api, sink, DEBOUNCE_DELAY)
    }

    pub fn with_delay(
        api: Arc<dyn ResonaApi>,
        sink: Arc<dyn ProgressSink>,
        delay: Duration,
    ) -> Self {
        Self {
            api,
            sink,
            delay,
            limit: DEFAULT_LIMIT,
            pending: None,
        }
    }

    /// Handle one input event from the search box.
    ///
    /// A whitespace-only query clears the result list without touching the
    /// backend.
    pub fn on_input(&mut self, query: &str) {
        self.cancel_pending();

        let query = query.trim().to_string();
        if query.is_empty() {
            self.sink.search_results(&[]);
            return;
        }

        let api = Arc::clone(&self.api);
        let sink = Arc::clone(&self.sink);
        let delay = self.delay;
        let limit = self.limit;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match api.search_tracks(&query, limit).await {
                Ok(tracks) => sink.search_results(&tracks),
                Err(e) => log::warn!("search for {query:?} failed: {e}"),
            }
        }));
    }

    /// Drop any scheduled or in-flight lookup.
    pub fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
