use crate::api::ResonaApi;
use crate::types::{SimilarTrack, StartedTask, TaskStatusSnapshot, Track};
use crate::{ResonaError, Result};
use async_trait::async_trait;
use http_client::{HttpClient, Request};
use http_types::{Method, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// How much response body to keep in an [`ResonaError::Api`] message.
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP implementation of [`ResonaApi`] against the Resona backend.
///
/// The client is scoped to one user; every request carries the user id the
/// page was opened with. Any [`HttpClient`] implementation can be injected,
/// which is also the seam the integration tests use.
///
/// # Examples
///
/// ```rust,no_run
/// use resona_client::{ResonaApi, ResonaClient, Result};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let http_client = http_client::native::NativeClient::new();
///     let client = ResonaClient::new(Box::new(http_client), 42);
///
///     let tracks = client.encoded_tracks().await?;
///     println!("{} tracks in the library", tracks.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ResonaClient {
    client: Arc<dyn HttpClient + Send + Sync>,
    base_url: String,
    user_id: u64,
}

impl ResonaClient {
    /// Create a client for the default local backend URL.
    pub fn new(client: Box<dyn HttpClient + Send + Sync>, user_id: u64) -> Self {
        Self::with_base_url(client, user_id, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a custom backend URL.
    ///
    /// Useful for testing and for deployments that are not on localhost.
    pub fn with_base_url(
        client: Box<dyn HttpClient + Send + Sync>,
        user_id: u64,
        base_url: String,
    ) -> Self {
        Self {
            client: Arc::from(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
        }
    }

    /// The user id this client is scoped to.
    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// The backend base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path_and_query);
        log::debug!("{method} {url}");
        let parsed = url
            .parse::<Url>()
            .map_err(|e| ResonaError::Http(format!("invalid URL {url}: {e}")))?;
        let request = Request::new(method, parsed);

        let mut response = self
            .client
            .send(request)
            .await
            .map_err(|e| ResonaError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .body_string()
            .await
            .map_err(|e| ResonaError::Http(e.to_string()))?;

        if !status.is_success() {
            log::warn!("{url} answered {status}");
            return Err(ResonaError::Api {
                status: status.into(),
                message: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| ResonaError::Parse(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        self.request_json(Method::Get, path_and_query).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        self.request_json(Method::Post, path_and_query).await
    }
}

#[async_trait]
impl ResonaApi for ResonaClient {
    async fn encoded_tracks(&self) -> Result<Vec<Track>> {
        self.get_json(&format!("/api/encoded_tracks/{}", self.user_id))
            .await
    }

    async fn similar_tracks(&self, track_id: i64) -> Result<Vec<SimilarTrack>> {
        self.get_json(&format!("/api/similar/{}/{}", self.user_id, track_id))
            .await
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusSnapshot> {
        self.get_json(&format!(
            "/api/task_status/{}",
            urlencoding::encode(task_id)
        ))
        .await
    }

    async fn start_library_update(&self) -> Result<StartedTask> {
        self.post_json(&format!("/api/update_library?user_id={}", self.user_id))
            .await
    }

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        self.get_json(&format!(
            "/api/search_tracks?q={}&limit={}",
            urlencoding::encode(query),
            limit
        ))
        .await
    }

    async fn start_playlist_generation(&self, seed_track_id: i64) -> Result<StartedTask> {
        self.post_json(&format!(
            "/api/generate_playlist?user_id={}&seed_track_id={}",
            self.user_id, seed_track_id
        ))
        .await
    }
}
