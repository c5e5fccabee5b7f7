//! # Poll Lifecycle Events
//!
//! This module provides a broadcast channel for observing the lifecycle of a
//! polling loop without being its sink: when it starts, each snapshot it
//! receives, and how it ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::poller::TaskKind;

/// Events emitted by a [`TaskPoller`](crate::TaskPoller) while it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PollEvent {
    /// A polling loop was started for a task.
    Started {
        /// When the loop started
        timestamp: DateTime<Utc>,
        /// Which task kind this loop belongs to
        kind: TaskKind,
        /// The backend task id being polled
        task_id: String,
    },
    /// A status snapshot was received and applied to the sink.
    Snapshot {
        /// When the snapshot arrived
        timestamp: DateTime<Utc>,
        /// Which task kind this loop belongs to
        kind: TaskKind,
        /// Top-level status string of the snapshot
        status: String,
    },
    /// The task reached `finished` and the loop stopped.
    Finished {
        /// When the terminal state was observed
        timestamp: DateTime<Utc>,
        /// Which task kind this loop belongs to
        kind: TaskKind,
    },
    /// The task reached `failed` and the loop stopped.
    Failed {
        /// When the terminal state was observed
        timestamp: DateTime<Utc>,
        /// Which task kind this loop belongs to
        kind: TaskKind,
    },
    /// A status request failed and the loop stopped.
    Errored {
        /// When the error occurred
        timestamp: DateTime<Utc>,
        /// Which task kind this loop belongs to
        kind: TaskKind,
        /// Display form of the underlying error
        error: String,
    },
    /// The configured poll ceiling was hit before a terminal state.
    GaveUp {
        /// When the ceiling was hit
        timestamp: DateTime<Utc>,
        /// Which task kind this loop belongs to
        kind: TaskKind,
        /// Number of polls performed before giving up
        polls: u32,
    },
}

/// A handle for receiving poll lifecycle events.
pub type PollEventReceiver = broadcast::Receiver<PollEvent>;

/// A handle for sending poll lifecycle events. Used internally by the poller.
pub type PollEventSender = broadcast::Sender<PollEvent>;

/// Creates a new broadcast channel for poll lifecycle events.
///
/// The channel has a default capacity of 100 events; slow receivers lag
/// rather than block the poller.
pub fn create_poll_event_channel() -> (PollEventSender, PollEventReceiver) {
    broadcast::channel(100)
}

pub(crate) fn emit(sender: &PollEventSender, event: PollEvent) {
    // Send errors just mean nobody is listening.
    let _ = sender.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_subscriber() {
        let (tx, mut rx) = create_poll_event_channel();
        emit(
            &tx,
            PollEvent::Started {
                timestamp: Utc::now(),
                kind: TaskKind::LibraryUpdate,
                task_id: "abc".to_string(),
            },
        );

        match rx.recv().await.unwrap() {
            PollEvent::Started { kind, task_id, .. } => {
                assert_eq!(kind, TaskKind::LibraryUpdate);
                assert_eq!(task_id, "abc");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_emit_without_receivers_is_ignored() {
        let (tx, rx) = create_poll_event_channel();
        drop(rx);
        emit(
            &tx,
            PollEvent::Finished {
                timestamp: Utc::now(),
                kind: TaskKind::PlaylistGeneration,
            },
        );
    }
}
