use clap::{Parser, Subcommand};
use resona_client::preview::{
    find_previews, load_seed_tracks, spotify_credentials, write_preview_results, SpotifyPreviewFinder,
    CLIENT_ID_VAR, CLIENT_SECRET_VAR, LOOKUP_PAUSE,
};
use resona_client::ui::{similar_row, track_row};
use resona_client::{ProgressSink, ResonaApi, ResonaClient, SimilarTrack, TaskKind, TaskPoller, Track};
use std::path::PathBuf;
use std::sync::Arc;

/// Resona music-library client
#[derive(Parser)]
#[command(
    name = "resona",
    about = "Resona music-library client: task polling, search, and preview lookup",
    long_about = None
)]
struct Cli {
    /// Show detailed debug information
    #[arg(long, global = true)]
    verbose: bool,

    /// Backend base URL
    #[arg(long, global = true, default_value = "http://localhost:8000")]
    base_url: String,

    /// User id the backend issued at login (required for API commands)
    #[arg(long, global = true)]
    user_id: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the user's encoded library tracks
    Tracks,
    /// Search tracks by free text
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show tracks similar to the given track
    Similar {
        /// Track id to compare against
        track_id: i64,
    },
    /// Start a library update and follow it to completion
    Update,
    /// Generate a playlist seeded from the given track and follow it
    Playlist {
        /// Seed track id
        seed_track_id: i64,
    },
    /// Look up preview URLs for a JSON track list
    Previews {
        /// Input JSON array of {name, artist}
        #[arg(long, default_value = "data/tracks.json")]
        input: PathBuf,
        /// Output JSON map of "name - artist" to preview URL
        #[arg(long, default_value = "data/preview_urls.json")]
        output: PathBuf,
    },
}

/// Sink that renders progress as plain terminal lines.
struct TerminalSink;

impl ProgressSink for TerminalSink {
    fn status_text(&self, text: &str) {
        println!("{text}");
    }

    fn progress_percent(&self, percent: u8) {
        let filled = (percent / 5) as usize;
        println!("[{}{}] {percent}%", "#".repeat(filled), ".".repeat(20 - filled));
    }

    fn track_encoded(&self, track: &Track) {
        println!("  + {}", track_row(track));
    }

    fn library_loaded(&self, tracks: &[Track]) {
        println!("Library ({} tracks):", tracks.len());
        for track in tracks {
            println!("  {}", track_row(track));
        }
    }

    fn search_results(&self, tracks: &[Track]) {
        for track in tracks {
            println!("  [{}] {}", track.id, track_row(track));
        }
    }

    fn similar_results(&self, tracks: &[SimilarTrack]) {
        println!("Top similar:");
        for track in tracks {
            println!("  {}", similar_row(track));
        }
    }

    fn playlist_ready(&self, embed_url: Option<&str>) {
        match embed_url {
            Some(url) => println!("Playlist ready: {url}"),
            None => println!("Playlist ready"),
        }
    }

    fn controls_busy(&self, _busy: bool) {}
}

fn require_user_id(user_id: Option<u64>) -> u64 {
    match user_id {
        Some(user_id) => user_id,
        None => {
            eprintln!("❌ Error: missing user id");
            eprintln!();
            eprintln!("Pass --user-id with the id the backend issued at login.");
            std::process::exit(1);
        }
    }
}

fn build_client(base_url: &str, user_id: u64) -> ResonaClient {
    let http_client = http_client::native::NativeClient::new();
    ResonaClient::with_base_url(Box::new(http_client), user_id, base_url.to_string())
}

async fn follow_task(api: Arc<dyn ResonaApi>, kind: TaskKind, task_id: &str) {
    let sink: Arc<dyn ProgressSink> = Arc::new(TerminalSink);
    let mut poller = TaskPoller::new(kind, api, sink);
    poller.start(task_id);
    poller.join().await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    match args.command {
        Commands::Tracks => {
            let client = build_client(&args.base_url, require_user_id(args.user_id));
            let tracks = client.encoded_tracks().await?;
            TerminalSink.library_loaded(&tracks);
        }
        Commands::Search { query, limit } => {
            let client = build_client(&args.base_url, require_user_id(args.user_id));
            let tracks = client.search_tracks(&query, limit).await?;
            if tracks.is_empty() {
                println!("No matches for {query:?}");
            } else {
                TerminalSink.search_results(&tracks);
            }
        }
        Commands::Similar { track_id } => {
            let client = build_client(&args.base_url, require_user_id(args.user_id));
            let similar = client.similar_tracks(track_id).await?;
            TerminalSink.similar_results(&similar);
        }
        Commands::Update => {
            let client = build_client(&args.base_url, require_user_id(args.user_id));
            let task = client.start_library_update().await?;
            println!("Started library update task {}", task.task_id);
            follow_task(Arc::new(client), TaskKind::LibraryUpdate, &task.task_id).await;
        }
        Commands::Playlist { seed_track_id } => {
            let client = build_client(&args.base_url, require_user_id(args.user_id));
            let task = client.start_playlist_generation(seed_track_id).await?;
            println!("Started playlist task {}", task.task_id);
            follow_task(Arc::new(client), TaskKind::PlaylistGeneration, &task.task_id).await;
        }
        Commands::Previews { input, output } => {
            // Credentials are checked before any file or network I/O.
            let (client_id, client_secret) = match spotify_credentials() {
                Ok(credentials) => credentials,
                Err(e) => {
                    eprintln!("❌ Error: {e}");
                    eprintln!();
                    eprintln!("Please set the following environment variables:");
                    eprintln!("  {CLIENT_ID_VAR}=your_spotify_client_id");
                    eprintln!("  {CLIENT_SECRET_VAR}=your_spotify_client_secret");
                    eprintln!();
                    eprintln!("You can also put them in a .env file next to the binary.");
                    std::process::exit(1);
                }
            };

            let seeds = match load_seed_tracks(&input) {
                Ok(seeds) => seeds,
                Err(e) => {
                    eprintln!("❌ Error: {e}");
                    std::process::exit(1);
                }
            };
            println!("Found {} tracks to process", seeds.len());

            let http_client = http_client::native::NativeClient::new();
            let finder =
                SpotifyPreviewFinder::new(Box::new(http_client), client_id, client_secret);
            let report = find_previews(&finder, &seeds, LOOKUP_PAUSE).await;
            write_preview_results(&output, &report.results)?;

            println!(
                "Found previews for {} out of {} tracks.",
                report.found,
                seeds.len()
            );
            println!("Results saved to {}", output.display());
        }
    }

    Ok(())
}
