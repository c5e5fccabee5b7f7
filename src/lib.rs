//! Client crate for the Resona music-library service.
//!
//! The core is the [`TaskPoller`]: a per-task-kind controller that polls the
//! backend's status endpoint on a fixed cadence, maps each snapshot onto a
//! rendering-agnostic [`ProgressSink`], and stops itself exactly once when
//! the task reaches a terminal state. Around it sit the [`ResonaClient`]
//! HTTP implementation of the [`ResonaApi`] trait, the debounced
//! [`SearchDebouncer`], the [`AppController`] event glue, and the batch
//! preview lookup in [`preview`].

pub mod api;
pub mod app;
pub mod cancel;
pub mod client;
pub mod error;
pub mod events;
pub mod poller;
pub mod preview;
pub mod search;
pub mod types;
pub mod ui;

pub use api::ResonaApi;
pub use app::{user_id_from_query, AppController};
pub use cancel::CancellationState;
pub use client::ResonaClient;
pub use error::ResonaError;
pub use events::{PollEvent, PollEventReceiver};
pub use poller::{PollerConfig, TaskKind, TaskPoller};
pub use preview::{PreviewFinder, PreviewReport, SeedTrack, SpotifyPreviewFinder};
pub use search::SearchDebouncer;
pub use types::{
    LibraryPhase, LibraryProgress, PlaylistPhase, PlaylistProgress, SimilarTrack, StartedTask,
    TaskStatusSnapshot, Track,
};
pub use ui::{Action, ProgressSink, UiEvent};

#[cfg(feature = "mock")]
pub use api::MockResonaApi;
#[cfg(feature = "mock")]
pub use preview::MockPreviewFinder;
#[cfg(feature = "mock")]
pub use ui::MockProgressSink;

pub type Result<T> = std::result::Result<T, ResonaError>;
