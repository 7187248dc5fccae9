use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use scrobble_mend::{
    AppConfig, AppState, BulkEditOrchestrator, DeletePolicy, EditCriteria, EditHistoryStore,
    HistoryFetcher, LastFmApiClient, ScrobbleDeleter, ScrobbleRecreator, SessionCredentials,
};

/// Scrobble reconciliation and bulk-edit tool
#[derive(Parser)]
#[command(
    name = "scrobble-mend",
    about = "Scrobble reconciliation and bulk-edit tool",
    long_about = None
)]
struct Cli {
    /// Path to a configuration file (defaults to scrobble-mend.toml or
    /// the XDG config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server the dashboard UI talks to
    Serve,

    /// Run a bulk edit from the command line
    ///
    /// Finds every scrobble in the 14-day editable window matching the
    /// original artist/album/track exactly, deletes them one by one, and
    /// recreates them under the corrected metadata with their original
    /// timestamps.
    Edit {
        /// Account username
        #[arg(long)]
        username: String,

        /// Session key from the auth flow
        #[arg(long)]
        session_key: String,

        /// Raw browser cookie string for the delete endpoint
        #[arg(long)]
        cookies: String,

        /// Artist name to match
        #[arg(long)]
        original_artist: String,

        /// Album name to match
        #[arg(long)]
        original_album: String,

        /// Track name to match
        #[arg(long)]
        original_track: String,

        /// Replacement artist name
        #[arg(long)]
        corrected_artist: String,

        /// Replacement album name
        #[arg(long)]
        corrected_album: String,

        /// Replacement track name
        #[arg(long)]
        corrected_track: String,
    },

    /// Inspect or prune the local edit history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List stored edits for a user
    List {
        /// Account username
        #[arg(long)]
        username: String,
    },
    /// Remove one stored edit by its original triple
    Remove {
        /// Account username
        #[arg(long)]
        username: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        album: String,
        #[arg(long)]
        track: String,
    },
}

fn build_state(config: AppConfig) -> AppState {
    let http_client = http_client::native::NativeClient::new();
    let api = LastFmApiClient::with_api_url(
        Box::new(http_client),
        config.lastfm.api_key.clone(),
        config.lastfm.api_secret.clone(),
        config.lastfm.api_url.clone(),
    );

    let deleter = ScrobbleDeleter::new(api.http(), config.lastfm.www_url.clone())
        .with_policy(DeletePolicy::with_delay_ms(config.delete.delay_ms));
    let orchestrator = BulkEditOrchestrator::new(
        HistoryFetcher::new(api.clone()),
        deleter.clone(),
        ScrobbleRecreator::new(api.clone()),
    );

    AppState {
        api,
        deleter: Arc::new(deleter),
        orchestrator: Arc::new(orchestrator),
        config: Arc::new(config),
    }
}

fn load_config(path: Option<&PathBuf>) -> AppConfig {
    match AppConfig::load_with_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Set the upstream credentials via a config file or environment:");
            eprintln!("  SCROBBLE_MEND__LASTFM__API_KEY=your_api_key");
            eprintln!("  SCROBBLE_MEND__LASTFM__API_SECRET=your_api_secret");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Cli::parse();

    match args.command {
        Commands::Serve => {
            let config = load_config(args.config.as_ref());
            let bind = config.server.bind.clone();
            let state = build_state(config);
            scrobble_mend::web::serve(state, &bind).await?;
        }

        Commands::Edit {
            username,
            session_key,
            cookies,
            original_artist,
            original_album,
            original_track,
            corrected_artist,
            corrected_album,
            corrected_track,
        } => {
            let config = load_config(args.config.as_ref());
            let state = build_state(config);
            let session = SessionCredentials::new(username, session_key);
            let criteria = EditCriteria {
                original_track,
                original_album,
                original_artist,
                corrected_track,
                corrected_album,
                corrected_artist,
            };

            match state.orchestrator.run(&session, &criteria, &cookies).await {
                Ok(outcome) => {
                    println!(
                        "Edited {} scrobbles ({} deleted, {} recreated)",
                        outcome.matched, outcome.deleted, outcome.created
                    );
                    if outcome.matched == 0 {
                        println!("No scrobbles in the last 14 days matched the original values.");
                    }
                }
                Err(e) => {
                    eprintln!("Bulk edit failed: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::History { command } => match command {
            HistoryCommands::List { username } => {
                let store = EditHistoryStore::open_for_user(&username)?;
                if store.entries().is_empty() {
                    println!("No stored edits for {username}");
                } else {
                    for entry in store.entries() {
                        println!(
                            "{} - {} [{}]  ->  {} - {} [{}]  (at {})",
                            entry.original_artist,
                            entry.original_track,
                            entry.original_album,
                            entry.corrected_artist,
                            entry.corrected_track,
                            entry.corrected_album,
                            entry.edited_at
                        );
                    }
                }
            }
            HistoryCommands::Remove {
                username,
                artist,
                album,
                track,
            } => {
                let mut store = EditHistoryStore::open_for_user(&username)?;
                if store.remove(&artist, &album, &track)? {
                    println!("Removed stored edit for '{track}' by '{artist}'");
                } else {
                    println!("No stored edit found for '{track}' by '{artist}'");
                }
            }
        },
    }

    Ok(())
}
