#![allow(dead_code)]

//! Shared test doubles: a scripted API, a recording sink, and a canned-route
//! HTTP client.

use async_trait::async_trait;
use http_client::{HttpClient, Request, Response};
use http_types::StatusCode;
use resona_client::{
    ResonaApi, ResonaError, Result, SimilarTrack, StartedTask, TaskStatusSnapshot, Track,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn track(id: i64, name: &str, artist: &str) -> Track {
    Track {
        id,
        name: name.to_string(),
        artist: artist.to_string(),
    }
}

pub fn running() -> TaskStatusSnapshot {
    TaskStatusSnapshot {
        status: "running".to_string(),
        progress: None,
    }
}

pub fn top_level(status: &str) -> TaskStatusSnapshot {
    TaskStatusSnapshot {
        status: status.to_string(),
        progress: None,
    }
}

pub fn processing(index: u64, total: u64, name: &str, artist: &str) -> TaskStatusSnapshot {
    TaskStatusSnapshot {
        status: "started".to_string(),
        progress: Some(json!({
            "status": "processing",
            "index": index,
            "total": total,
            "track": {"id": 1, "name": name, "artist": artist},
        })),
    }
}

pub fn encoded(index: u64, total: u64, name: &str, artist: &str) -> TaskStatusSnapshot {
    TaskStatusSnapshot {
        status: "started".to_string(),
        progress: Some(json!({
            "status": "encoded",
            "index": index,
            "total": total,
            "track": {"id": 2, "name": name, "artist": artist},
        })),
    }
}

pub fn library_finished(processed: u64, total: u64) -> TaskStatusSnapshot {
    TaskStatusSnapshot {
        status: "finished".to_string(),
        progress: Some(json!({
            "status": "finished",
            "processed": processed,
            "total": total,
        })),
    }
}

pub fn playlist_phase(phase: &str) -> TaskStatusSnapshot {
    TaskStatusSnapshot {
        status: "started".to_string(),
        progress: Some(json!({"status": phase})),
    }
}

pub fn playlist_finished(embed_url: &str) -> TaskStatusSnapshot {
    TaskStatusSnapshot {
        status: "started".to_string(),
        progress: Some(json!({
            "status": "finished",
            "playlist_id": "pl-1",
            "embed_url": embed_url,
        })),
    }
}

pub fn playlist_failed(message: &str) -> TaskStatusSnapshot {
    TaskStatusSnapshot {
        status: "started".to_string(),
        progress: Some(json!({
            "status": "failed",
            "message": message,
        })),
    }
}

/// One scripted answer of the status endpoint.
pub enum Step {
    Snapshot(TaskStatusSnapshot),
    TransportError,
}

/// [`ResonaApi`] double fed from a script of status answers.
///
/// Once the script runs dry, `fallback` is returned forever (defaults to a
/// bare `running` snapshot), which is how the never-terminating-backend tests
/// are built.
pub struct ScriptedApi {
    steps: Mutex<VecDeque<Step>>,
    fallback: TaskStatusSnapshot,
    library: Vec<Track>,
    search_hits: Vec<Track>,
    similar_hits: Vec<SimilarTrack>,
    pub status_calls: AtomicUsize,
    pub reload_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub polled_task_ids: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback: running(),
            library: vec![track(1, "Holiday", "Bandit")],
            search_hits: Vec::new(),
            similar_hits: Vec::new(),
            status_calls: AtomicUsize::new(0),
            reload_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            polled_task_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn always_running() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_library(mut self, library: Vec<Track>) -> Self {
        self.library = library;
        self
    }

    pub fn with_search_hits(mut self, hits: Vec<Track>) -> Self {
        self.search_hits = hits;
        self
    }

    pub fn with_similar_hits(mut self, hits: Vec<SimilarTrack>) -> Self {
        self.similar_hits = hits;
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn reload_calls(&self) -> usize {
        self.reload_calls.load(Ordering::SeqCst)
    }

    pub fn polls_for(&self, task_id: &str) -> usize {
        self.polled_task_ids
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }
}

#[async_trait]
impl ResonaApi for ScriptedApi {
    async fn encoded_tracks(&self) -> Result<Vec<Track>> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.library.clone())
    }

    async fn similar_tracks(&self, _track_id: i64) -> Result<Vec<SimilarTrack>> {
        Ok(self.similar_hits.clone())
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusSnapshot> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.polled_task_ids
            .lock()
            .unwrap()
            .push(task_id.to_string());
        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Snapshot(snapshot)) => Ok(snapshot),
            Some(Step::TransportError) => Err(ResonaError::Http("connection refused".to_string())),
            None => Ok(self.fallback.clone()),
        }
    }

    async fn start_library_update(&self) -> Result<StartedTask> {
        Ok(StartedTask {
            task_id: "scripted-library-task".to_string(),
        })
    }

    async fn search_tracks(&self, _query: &str, _limit: u32) -> Result<Vec<Track>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.search_hits.clone())
    }

    async fn start_playlist_generation(&self, _seed_track_id: i64) -> Result<StartedTask> {
        Ok(StartedTask {
            task_id: "scripted-playlist-task".to_string(),
        })
    }
}

/// Everything a sink saw, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Status(String),
    Percent(u8),
    TrackEncoded(String),
    LibraryLoaded(usize),
    SearchResults(Vec<String>),
    SimilarResults(usize),
    PlaylistReady(Option<String>),
    Busy(bool),
}

#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn push(&self, call: SinkCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl resona_client::ProgressSink for RecordingSink {
    fn status_text(&self, text: &str) {
        self.push(SinkCall::Status(text.to_string()));
    }

    fn progress_percent(&self, percent: u8) {
        self.push(SinkCall::Percent(percent));
    }

    fn track_encoded(&self, track: &Track) {
        self.push(SinkCall::TrackEncoded(track.name.clone()));
    }

    fn library_loaded(&self, tracks: &[Track]) {
        self.push(SinkCall::LibraryLoaded(tracks.len()));
    }

    fn search_results(&self, tracks: &[Track]) {
        self.push(SinkCall::SearchResults(
            tracks.iter().map(|t| t.name.clone()).collect(),
        ));
    }

    fn similar_results(&self, tracks: &[SimilarTrack]) {
        self.push(SinkCall::SimilarResults(tracks.len()));
    }

    fn playlist_ready(&self, embed_url: Option<&str>) {
        self.push(SinkCall::PlaylistReady(embed_url.map(str::to_string)));
    }

    fn controls_busy(&self, busy: bool) {
        self.push(SinkCall::Busy(busy));
    }
}

#[derive(Debug, Default)]
struct FakeInner {
    routes: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<String>>,
}

/// [`HttpClient`] double with canned routes, keyed `"METHOD /path?query"`.
///
/// Clones share state, so a clone kept outside the client under test can
/// inspect the request log afterwards. Unknown routes answer 404.
#[derive(Debug, Clone, Default)]
pub struct FakeHttpClient {
    inner: Arc<FakeInner>,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, key: &str, status: u16, body: &str) -> Self {
        self.inner
            .routes
            .lock()
            .unwrap()
            .insert(key.to_string(), (status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, key: &str) -> usize {
        self.inner
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.as_str() == key)
            .count()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn send(&self, req: Request) -> std::result::Result<Response, http_types::Error> {
        let key = match req.url().query() {
            Some(query) => format!("{} {}?{}", req.method(), req.url().path(), query),
            None => format!("{} {}", req.method(), req.url().path()),
        };
        self.inner.requests.lock().unwrap().push(key.clone());
        let found = self.inner.routes.lock().unwrap().get(&key).cloned();
        match found {
            Some((status, body)) => {
                let status = StatusCode::try_from(status).unwrap_or(StatusCode::Ok);
                let mut response = Response::new(status);
                response.set_body(body);
                Ok(response)
            }
            None => {
                let mut response = Response::new(StatusCode::NotFound);
                response.set_body(format!("no canned route for {key}"));
                Ok(response)
            }
        }
    }
}
