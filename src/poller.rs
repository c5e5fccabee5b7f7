//! Task-progress polling.
//!
//! A [`TaskPoller`] drives a fixed-interval status loop for one task kind,
//! translating each [`TaskStatusSnapshot`] into [`ProgressSink`] updates and
//! stopping itself exactly once when the task reaches a terminal state. The
//! loop is completion-chained (each tick awaits its response before sleeping),
//! so requests within one kind can never overlap, and every wait point
//! selects on a cancellation token so `stop` takes effect promptly, including
//! during the post-terminal linger pauses.

use crate::api::ResonaApi;
use crate::cancel::{cancelled, sleep_with_cancel, CancellationState};
use crate::events::{create_poll_event_channel, emit, PollEvent, PollEventReceiver, PollEventSender};
use crate::types::{LibraryPhase, LibraryProgress, PlaylistPhase, PlaylistProgress, TaskStatusSnapshot};
use crate::ui::ProgressSink;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default cadence between status requests.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long a finished or failed library update stays on screen before the
/// controls reset and the canonical list is reloaded.
const LIBRARY_LINGER: Duration = Duration::from_secs(3);

/// How long a terminal playlist message stays on screen before teardown.
const PLAYLIST_LINGER: Duration = Duration::from_secs(2);

/// The two long-running task kinds the backend exposes.
///
/// Both share the same polling mechanics but map status payloads to the UI
/// differently. At most one loop per kind is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    LibraryUpdate,
    PlaylistGeneration,
}

impl TaskKind {
    fn linger(self) -> Duration {
        match self {
            TaskKind::LibraryUpdate => LIBRARY_LINGER,
            TaskKind::PlaylistGeneration => PLAYLIST_LINGER,
        }
    }
}

/// Tuning knobs for a [`TaskPoller`].
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between status requests.
    pub interval: Duration,
    /// Give up after this many interval polls without a terminal state.
    ///
    /// `None` preserves the backend contract of polling indefinitely; a task
    /// that forever reports `running` keeps the loop alive.
    pub max_polls: Option<u32>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_polls: None,
        }
    }
}

/// What one status check means for the loop.
///
/// `Finished`, `Failed` and `Error` end the loop; anything else keeps it
/// alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    Continue,
    Finished,
    Failed,
    Error,
    Cancelled,
}

fn outcome_from_status(status: &str) -> PollOutcome {
    match status {
        "finished" => PollOutcome::Finished,
        "failed" => PollOutcome::Failed,
        _ => PollOutcome::Continue,
    }
}

/// Progress percentage for `index` of `total`, rounded and clamped.
///
/// ```
/// use resona_client::poller::percent;
///
/// assert_eq!(percent(3, 12), 25);
/// assert_eq!(percent(12, 12), 100);
/// assert_eq!(percent(5, 0), 0);
/// ```
pub fn percent(index: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (index as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Stateful polling controller for one task kind.
///
/// `start` cancels any previous loop for this kind before spawning the next
/// one, so two loops of the same kind never coexist. Pollers for different
/// kinds are independent and may run concurrently against a shared sink.
pub struct TaskPoller {
    kind: TaskKind,
    api: Arc<dyn ResonaApi>,
    sink: Arc<dyn ProgressSink>,
    config: PollerConfig,
    events: PollEventSender,
    cancel: CancellationState,
    handle: Option<JoinHandle<()>>,
}

impl TaskPoller {
    pub fn new(kind: TaskKind, api: Arc<dyn ResonaApi>, sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_config(kind, api, sink, PollerConfig::default())
    }

    pub fn with_config(
        kind: TaskKind,
        api: Arc<dyn ResonaApi>,
        sink: Arc<dyn ProgressSink>,
        config: PollerConfig,
    ) -> Self {
        let (events, _rx) = create_poll_event_channel();
        Self {
            kind,
            api,
            sink,
            config,
            events,
            cancel: CancellationState::new(),
            handle: None,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Subscribe to this poller's lifecycle events.
    pub fn subscribe(&self) -> PollEventReceiver {
        self.events.subscribe()
    }

    /// Whether a polling loop is currently running.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Start polling `task_id`, cancelling any loop already running for this
    /// kind.
    ///
    /// One immediate status check runs before the first interval tick so the
    /// user sees feedback without waiting a full interval.
    pub fn start(&mut self, task_id: &str) {
        self.stop();
        // Fresh token: resetting the old one could revive the loop it was
        // meant to kill before that loop observed the flag.
        self.cancel = CancellationState::new();

        let poll_loop = PollLoop {
            kind: self.kind,
            task_id: task_id.to_string(),
            api: Arc::clone(&self.api),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
            events: self.events.clone(),
            cancel_rx: self.cancel.subscribe(),
        };
        self.handle = Some(tokio::spawn(poll_loop.run()));
    }

    /// Cancel the running loop, if any.
    ///
    /// Cooperative: the loop exits at its next await point, abandoning any
    /// in-flight request or linger pause. Idempotent.
    pub fn stop(&mut self) {
        self.cancel.cancel();
    }

    /// Wait for the current loop to wind down.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TaskPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct PollLoop {
    kind: TaskKind,
    task_id: String,
    api: Arc<dyn ResonaApi>,
    sink: Arc<dyn ProgressSink>,
    config: PollerConfig,
    events: PollEventSender,
    cancel_rx: watch::Receiver<bool>,
}

impl PollLoop {
    async fn run(mut self) {
        emit(
            &self.events,
            PollEvent::Started {
                timestamp: Utc::now(),
                kind: self.kind,
                task_id: self.task_id.clone(),
            },
        );

        // Immediate out-of-band check. A terminal status here tears down as
        // usual, but a transport error does not end the loop: the first
        // request racing a task that has not registered yet is routine.
        match self.poll_once().await {
            PollOutcome::Finished => return self.finish().await,
            PollOutcome::Failed => return self.fail().await,
            PollOutcome::Cancelled => return,
            PollOutcome::Continue | PollOutcome::Error => {}
        }

        let mut polls: u32 = 0;
        loop {
            if sleep_with_cancel(self.cancel_rx.clone(), self.config.interval)
                .await
                .is_err()
            {
                return;
            }

            polls += 1;
            match self.poll_once().await {
                PollOutcome::Continue => {
                    if let Some(max) = self.config.max_polls {
                        if polls >= max {
                            log::warn!(
                                "giving up on {:?} task {} after {polls} polls",
                                self.kind,
                                self.task_id
                            );
                            self.sink.status_text("Gave up waiting for task");
                            self.sink.controls_busy(false);
                            emit(
                                &self.events,
                                PollEvent::GaveUp {
                                    timestamp: Utc::now(),
                                    kind: self.kind,
                                    polls,
                                },
                            );
                            return;
                        }
                    }
                }
                PollOutcome::Finished => return self.finish().await,
                PollOutcome::Failed => return self.fail().await,
                PollOutcome::Error => return,
                PollOutcome::Cancelled => return,
            }
        }
    }

    /// One status request, raced against cancellation so a stopped poller
    /// never applies a late snapshot.
    async fn poll_once(&mut self) -> PollOutcome {
        let result = tokio::select! {
            _ = cancelled(&mut self.cancel_rx) => return PollOutcome::Cancelled,
            result = self.api.task_status(&self.task_id) => result,
        };

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("error polling task {}: {e}", self.task_id);
                self.sink.status_text("Error checking task status");
                emit(
                    &self.events,
                    PollEvent::Errored {
                        timestamp: Utc::now(),
                        kind: self.kind,
                        error: e.to_string(),
                    },
                );
                return PollOutcome::Error;
            }
        };

        log::debug!("task {} status: {}", self.task_id, snapshot.status);
        emit(
            &self.events,
            PollEvent::Snapshot {
                timestamp: Utc::now(),
                kind: self.kind,
                status: snapshot.status.clone(),
            },
        );

        match self.kind {
            TaskKind::LibraryUpdate => self.apply_library(&snapshot),
            TaskKind::PlaylistGeneration => self.apply_playlist(&snapshot),
        }
    }

    fn apply_library(&self, snapshot: &TaskStatusSnapshot) -> PollOutcome {
        let Some(raw) = snapshot.progress.as_ref() else {
            // No progress yet: the task has not published anything, show the
            // raw lifecycle state.
            self.sink
                .status_text(&format!("Task status: {}", snapshot.status));
            return outcome_from_status(&snapshot.status);
        };

        let progress = match LibraryProgress::from_value(raw) {
            Ok(progress) => progress,
            Err(e) => {
                log::warn!("unrecognized library progress payload: {e}");
                return outcome_from_status(&snapshot.status);
            }
        };

        match progress.status {
            LibraryPhase::Processing => {
                let index = progress.index.unwrap_or(0);
                let total = progress.total.unwrap_or(0);
                match &progress.track {
                    Some(track) => self.sink.status_text(&format!(
                        "Processing {index}/{total}: {} — {}",
                        track.name, track.artist
                    )),
                    None => self
                        .sink
                        .status_text(&format!("Processing {index}/{total}")),
                }
                self.sink.progress_percent(percent(index, total));
                outcome_from_status(&snapshot.status)
            }
            LibraryPhase::Encoded => {
                let index = progress.index.unwrap_or(0);
                let total = progress.total.unwrap_or(0);
                let name = progress
                    .track
                    .as_ref()
                    .map(|track| track.name.as_str())
                    .unwrap_or("");
                self.sink
                    .status_text(&format!("Encoded {index}/{total}: {name}"));
                self.sink.progress_percent(percent(index, total));
                if let Some(track) = &progress.track {
                    self.sink.track_encoded(track);
                }
                outcome_from_status(&snapshot.status)
            }
            LibraryPhase::Finished => {
                self.sink.progress_percent(100);
                let message = progress.message.unwrap_or_else(|| {
                    format!(
                        "encoded {}/{}",
                        progress.processed.unwrap_or(0),
                        progress.total.unwrap_or(0)
                    )
                });
                self.sink.status_text(&format!("Finished: {message}"));
                PollOutcome::Finished
            }
            LibraryPhase::Unknown => outcome_from_status(&snapshot.status),
        }
    }

    fn apply_playlist(&self, snapshot: &TaskStatusSnapshot) -> PollOutcome {
        let progress = snapshot.progress.as_ref().and_then(|raw| {
            PlaylistProgress::from_value(raw)
                .map_err(|e| log::warn!("unrecognized playlist progress payload: {e}"))
                .ok()
        });
        let phase = progress.as_ref().map(|p| p.status);

        // Terminal states arrive both top-level and nested; accept either.
        if snapshot.status == "finished" || phase == Some(PlaylistPhase::Finished) {
            self.sink.progress_percent(100);
            let message = progress
                .as_ref()
                .and_then(|p| p.message.clone())
                .unwrap_or_else(|| "Playlist ready".to_string());
            self.sink.status_text(&message);
            self.sink
                .playlist_ready(progress.as_ref().and_then(|p| p.embed_url.as_deref()));
            return PollOutcome::Finished;
        }
        if snapshot.status == "failed" || phase == Some(PlaylistPhase::Failed) {
            let message = progress
                .as_ref()
                .and_then(|p| p.message.clone())
                .unwrap_or_else(|| "Playlist generation failed".to_string());
            self.sink.status_text(&message);
            return PollOutcome::Failed;
        }

        match phase {
            Some(PlaylistPhase::FindingSimilar) => {
                self.sink.status_text("Finding similar tracks...");
                self.sink.progress_percent(20);
            }
            Some(PlaylistPhase::SpotifyAuth) => {
                self.sink.status_text("Connecting to Spotify...");
                self.sink.progress_percent(30);
            }
            Some(PlaylistPhase::CreatingPlaylist) => {
                let message = progress
                    .as_ref()
                    .and_then(|p| p.message.clone())
                    .unwrap_or_else(|| "Creating playlist...".to_string());
                self.sink.status_text(&message);
                self.sink.progress_percent(60);
            }
            Some(PlaylistPhase::AddingTracks) => {
                let message = progress
                    .as_ref()
                    .and_then(|p| p.message.clone())
                    .unwrap_or_else(|| "Adding tracks...".to_string());
                self.sink.status_text(&message);
                self.sink.progress_percent(80);
            }
            // Finished and Failed returned above.
            _ => {
                self.sink
                    .status_text(&format!("Task status: {}", snapshot.status));
            }
        }
        PollOutcome::Continue
    }

    /// Terminal teardown: keep the final message on screen for the kind's
    /// linger, then reset the controls. A finished library update also
    /// reloads the canonical listing exactly once; the incremental list built
    /// from `encoded` events is not trusted as final.
    async fn finish(mut self) {
        emit(
            &self.events,
            PollEvent::Finished {
                timestamp: Utc::now(),
                kind: self.kind,
            },
        );

        if sleep_with_cancel(self.cancel_rx.clone(), self.kind.linger())
            .await
            .is_err()
        {
            return;
        }
        self.sink.controls_busy(false);

        if self.kind == TaskKind::LibraryUpdate {
            let result = tokio::select! {
                _ = cancelled(&mut self.cancel_rx) => return,
                result = self.api.encoded_tracks() => result,
            };
            match result {
                Ok(tracks) => self.sink.library_loaded(&tracks),
                Err(e) => {
                    log::error!("error reloading encoded tracks: {e}");
                    self.sink.status_text("Error loading tracks");
                }
            }
        }
    }

    async fn fail(self) {
        emit(
            &self.events,
            PollEvent::Failed {
                timestamp: Utc::now(),
                kind: self.kind,
            },
        );

        if self.kind == TaskKind::LibraryUpdate {
            self.sink.status_text("Task failed");
        }
        if sleep_with_cancel(self.cancel_rx.clone(), self.kind.linger())
            .await
            .is_err()
        {
            return;
        }
        self.sink.controls_busy(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(10, 10), 100);
    }

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(percent(5, 0), 0);
    }

    #[test]
    fn test_percent_clamps_overrun() {
        // A backend off-by-one must not overflow the bar.
        assert_eq!(percent(11, 10), 100);
    }

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(outcome_from_status("finished"), PollOutcome::Finished);
        assert_eq!(outcome_from_status("failed"), PollOutcome::Failed);
        assert_eq!(outcome_from_status("running"), PollOutcome::Continue);
        assert_eq!(outcome_from_status("pending"), PollOutcome::Continue);
        assert_eq!(outcome_from_status(""), PollOutcome::Continue);
    }
}
