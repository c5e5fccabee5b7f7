//! Batch preview lookup.
//!
//! Reads a JSON array of `{name, artist}` seeds, asks a [`PreviewFinder`] for
//! a 30-second preview URL per seed, and produces a JSON map keyed
//! `"{name} - {artist}"`. The batch is partial-failure tolerant at the
//! granularity of one track: a failed or fruitless lookup records `null` and
//! processing moves on.

use crate::{ResonaError, Result};
use async_trait::async_trait;
use http_client::{HttpClient, Request};
use http_types::{Method, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Environment variable holding the Spotify application id.
pub const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
/// Environment variable holding the Spotify application secret.
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";

/// Pause between lookups so the batch stays under rate limits.
pub const LOOKUP_PAUSE: Duration = Duration::from_millis(500);

const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
const API_BASE_URL: &str = "https://api.spotify.com";

/// One input row of the batch: a track to find a preview for.
///
/// Both fields default to empty so partially filled rows still produce an
/// output key instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTrack {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
}

impl SeedTrack {
    /// Output-map key for this seed: `"{name} - {artist}"`, trimmed.
    pub fn key(&self) -> String {
        format!("{} - {}", self.name, self.artist)
            .trim()
            .to_string()
    }

    /// Whether the seed carries enough metadata to search with.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.artist.is_empty()
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreviewReport {
    /// Key to preview URL; `null` where no preview could be found.
    pub results: BTreeMap<String, Option<String>>,
    /// Number of seeds that resolved to a preview URL.
    pub found: usize,
    /// Number of seeds processed.
    pub processed: usize,
}

/// Looks up a preview URL for one track.
///
/// The matching itself belongs to the external search; this trait only
/// reports whether a preview exists.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PreviewFinder: Send + Sync {
    /// Find a preview URL for `name` by `artist`, `Ok(None)` when the search
    /// succeeded but no preview is available.
    async fn find_preview(&self, name: &str, artist: &str) -> Result<Option<String>>;
}

/// Run the batch: one lookup per seed, `pause` between lookups.
///
/// Seeds missing a name or artist record `null` without a lookup; lookup
/// errors are logged, record `null`, and do not stop the batch.
pub async fn find_previews(
    finder: &dyn PreviewFinder,
    seeds: &[SeedTrack],
    pause: Duration,
) -> PreviewReport {
    let mut report = PreviewReport::default();
    let total = seeds.len();

    for (i, seed) in seeds.iter().enumerate() {
        report.processed += 1;
        let key = seed.key();

        if !seed.is_complete() {
            log::warn!("skipping track {}/{total}: missing name or artist", i + 1);
            report.results.insert(key, None);
            continue;
        }

        log::info!("looking up track {}/{total}: {key}", i + 1);
        match finder.find_preview(&seed.name, &seed.artist).await {
            Ok(Some(url)) => {
                log::info!("preview found for {key}: {url}");
                report.found += 1;
                report.results.insert(key, Some(url));
            }
            Ok(None) => {
                log::info!("no preview available for {key}");
                report.results.insert(key, None);
            }
            Err(e) => {
                log::error!("lookup failed for {key}: {e}");
                report.results.insert(key, None);
            }
        }

        if i + 1 < total && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    report
}

/// Read and validate the seed file.
///
/// A missing, blank, or non-array file is fatal; the batch must not start.
pub fn load_seed_tracks(path: &Path) -> Result<Vec<SeedTrack>> {
    if !path.exists() {
        return Err(ResonaError::InvalidInput(format!(
            "{} not found",
            path.display()
        )));
    }
    let data = std::fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Err(ResonaError::InvalidInput(format!(
            "{} is empty",
            path.display()
        )));
    }
    serde_json::from_str(&data)
        .map_err(|e| ResonaError::Parse(format!("expected an array of tracks: {e}")))
}

/// Write the result map as pretty-printed JSON.
pub fn write_preview_results(
    path: &Path,
    results: &BTreeMap<String, Option<String>>,
) -> Result<()> {
    let json =
        serde_json::to_string_pretty(results).map_err(|e| ResonaError::Parse(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read the Spotify credentials from the environment.
///
/// Called before any file or network I/O; an absent or empty variable is
/// fatal for the batch.
pub fn spotify_credentials() -> Result<(String, String)> {
    Ok((require_env(CLIENT_ID_VAR)?, require_env(CLIENT_SECRET_VAR)?))
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ResonaError::MissingCredentials(name.to_string()))
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// [`PreviewFinder`] backed by the Spotify Web API.
///
/// Uses the client-credentials flow; the access token is cached until shortly
/// before it expires.
pub struct SpotifyPreviewFinder {
    client: Arc<dyn HttpClient + Send + Sync>,
    client_id: String,
    client_secret: String,
    limit: u32,
    accounts_base_url: String,
    api_base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyPreviewFinder {
    pub fn new(
        client: Box<dyn HttpClient + Send + Sync>,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self::with_base_urls(
            client,
            client_id,
            client_secret,
            ACCOUNTS_BASE_URL.to_string(),
            API_BASE_URL.to_string(),
        )
    }

    /// Create a finder against custom Spotify endpoints, for testing.
    pub fn with_base_urls(
        client: Box<dyn HttpClient + Send + Sync>,
        client_id: String,
        client_secret: String,
        accounts_base_url: String,
        api_base_url: String,
    ) -> Self {
        Self {
            client: Arc::from(client),
            client_id,
            client_secret,
            limit: 2,
            accounts_base_url,
            api_base_url,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/api/token", self.accounts_base_url);
        let parsed = url
            .parse::<Url>()
            .map_err(|e| ResonaError::Http(format!("invalid URL {url}: {e}")))?;
        let mut request = Request::new(Method::Post, parsed);
        request.insert_header("Content-Type", "application/x-www-form-urlencoded");
        request.set_body(format!(
            "grant_type=client_credentials&client_id={}&client_secret={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.client_secret)
        ));

        let body = self.send(request).await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ResonaError::Parse(e.to_string()))?;

        // Renew a minute early so a token never expires mid-request.
        let expires_at = Instant::now() + Duration::from_secs(token.expires_in.saturating_sub(60));
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });
        Ok(value)
    }

    async fn send(&self, request: Request) -> Result<String> {
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
            return Err(ResonaError::Api {
                status: status.into(),
                message: body.chars().take(200).collect(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl PreviewFinder for SpotifyPreviewFinder {
    async fn find_preview(&self, name: &str, artist: &str) -> Result<Option<String>> {
        let token = self.access_token().await?;

        let query = format!("track:{name} artist:{artist}");
        let url = format!(
            "{}/v1/search?q={}&type=track&limit={}",
            self.api_base_url,
            urlencoding::encode(&query),
            self.limit
        );
        let parsed = url
            .parse::<Url>()
            .map_err(|e| ResonaError::Http(format!("invalid URL {url}: {e}")))?;
        let mut request = Request::new(Method::Get, parsed);
        request.insert_header("Authorization", format!("Bearer {token}"));

        let body = self.send(request).await?;
        let response: SearchResponse =
            serde_json::from_str(&body).map_err(|e| ResonaError::Parse(e.to_string()))?;

        Ok(response
            .tracks
            .items
            .into_iter()
            .find_map(|item| item.preview_url))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: SearchTracks,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SearchTracks {
    items: Vec<SearchItem>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SearchItem {
    preview_url: Option<String>,
}
