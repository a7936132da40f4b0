//! DocShare Client
//!
//! Command-line front end for the DocShare document-sharing service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use client::auth::SIGNUP_SUCCESS_MESSAGE;
use client::backend::{FileSource, StatsSource};
use client::catalog::{now_secs, CatalogPhase, CatalogView};
use client::config::default_config_path;
use client::upload::UploadStatus;
use client::{
    AuthOutcome, AuthSession, Capability, ClientConfig, DownloadGuard, DownloadOutcome,
    FileCatalog, HttpBackend, RecordingOpener, SessionStore, StoredSession, SubmitOutcome,
    UploadWorkflow, UserSession,
};
use futures_util::future::join_all;
use protocol::{Role, UploadFile};

/// DocShare - share office documents between ops and client users.
#[derive(Parser, Debug)]
#[command(name = "docshare")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Must match --password
        #[arg(long)]
        confirm_password: String,

        /// Account role (ops or client)
        #[arg(long, default_value = "client")]
        role: Role,
    },

    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Role to sign in as (ops or client)
        #[arg(long, default_value = "client")]
        role: Role,
    },

    /// Forget the stored session
    Logout,

    /// Upload a document (ops users only)
    Upload {
        /// Files to upload; only the first is sent
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List shared files (client users only)
    List,

    /// Generate secure download links (client users only)
    Download {
        /// File IDs as shown by `list`
        #[arg(required = true)]
        file_ids: Vec<String>,
    },

    /// Show live service statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = ClientConfig::load(&config_path)?;

    // Apply environment variable overrides
    config.apply_env_overrides();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.client.log_level.to_lowercase()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!("Using config file: {:?}", config_path);

    let store = SessionStore::new(config.session_path());

    // Handle commands
    match cli.command {
        Commands::Signup {
            email,
            password,
            confirm_password,
            role,
        } => {
            let auth = AuthSession::new(HttpBackend::new(&config.server.api_url));
            match auth.signup(&email, &password, &confirm_password, role).await {
                AuthOutcome::Registered => println!("{}", SIGNUP_SUCCESS_MESSAGE),
                other => bail!(outcome_message(&other)),
            }
        }
        Commands::Login {
            email,
            password,
            role,
        } => {
            let backend = Arc::new(HttpBackend::new(&config.server.api_url));
            let auth = AuthSession::new(Arc::clone(&backend));
            match auth.login(&email, &password, role).await {
                AuthOutcome::LoggedIn(session) => {
                    let token = backend
                        .token()
                        .context("Backend did not issue an access token")?;
                    store.save(&StoredSession::new(&session, token))?;
                    println!("Logged in as {} ({})", session.email, session.role);
                }
                other => {
                    // A failed login ends any previous session.
                    store.clear()?;
                    bail!(outcome_message(&other));
                }
            }
        }
        Commands::Logout => {
            if store.clear()? {
                tracing::info!("Logged out");
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }
        Commands::Upload { paths } => {
            let (backend, session) = open_session(&config, &store, Capability::Upload)?;
            if paths.len() > 1 {
                tracing::warn!(count = paths.len(), "Only the first file is uploaded");
            }
            let Some(path) = paths.first() else {
                bail!("No file given");
            };

            let candidate = load_candidate(path).await?;
            let workflow = UploadWorkflow::new(backend);
            tracing::debug!(email = %session.email, file = %candidate.name, "Submitting upload");

            match workflow.select_files(vec![candidate]).await {
                SubmitOutcome::Uploaded => {
                    if let UploadStatus::Success { file_name } = workflow.view().status {
                        println!("Uploaded {}", file_name);
                    }
                }
                SubmitOutcome::Rejected(err) => bail!(err),
                _ => match workflow.view().status.error_message() {
                    Some(reason) => bail!(reason.to_string()),
                    None => bail!("Upload did not start"),
                },
            }
        }
        Commands::List => {
            let (backend, _session) = open_session(&config, &store, Capability::Browse)?;
            let files = backend.list_files().await?;

            let mut catalog = FileCatalog::mount_with(files, config.catalog.timing(), now_secs);
            let mut state = catalog.subscribe();
            state
                .wait_for(|s| s.phase == CatalogPhase::Ready)
                .await
                .context("Catalog closed before it was ready")?;

            print_catalog(&catalog.render(now_secs(), |_| false));
            catalog.dispose();
        }
        Commands::Download { file_ids } => {
            let (backend, _session) = open_session(&config, &store, Capability::Download)?;
            let guard = DownloadGuard::new(backend, RecordingOpener::new(), &config.server.origin);

            let outcomes = join_all(file_ids.iter().map(|id| guard.request_download(id))).await;

            let mut failures = 0;
            for (id, outcome) in file_ids.iter().zip(outcomes) {
                match outcome {
                    DownloadOutcome::Opened(url) => println!("{}  {}", id, url),
                    DownloadOutcome::AlreadyInFlight => {
                        tracing::debug!(file_id = %id, "Duplicate id skipped");
                    }
                    DownloadOutcome::Failed(reason) => {
                        failures += 1;
                        eprintln!("{}  failed: {}", id, reason);
                    }
                }
            }
            if failures > 0 {
                bail!("{} download(s) failed", failures);
            }
        }
        Commands::Stats => {
            let stats = HttpBackend::new(&config.server.api_url).live_stats().await?;
            println!("Total files:  {}", stats.total_files);
            println!("Active users: {}", stats.active_users);
        }
    }

    Ok(())
}

/// Restore the stored session and check it grants `capability`.
fn open_session(
    config: &ClientConfig,
    store: &SessionStore,
    capability: Capability,
) -> anyhow::Result<(Arc<HttpBackend>, UserSession)> {
    let stored = store
        .load()?
        .context("Not logged in. Run `docshare login` first.")?;

    let backend =
        Arc::new(HttpBackend::new(&config.server.api_url).with_token(stored.token.clone()));
    let auth = AuthSession::new(Arc::clone(&backend));
    auth.resume(stored.user());

    let session = auth.require(capability)?;
    Ok((backend, session))
}

/// Read a file as an upload candidate.
///
/// Oversized or disallowed files are returned without contents; the upload
/// workflow rejects them before anything is sent.
async fn load_candidate(path: &Path) -> anyhow::Result<UploadFile> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {}", path.display()))?;

    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if !metadata.is_file() {
        bail!("Not a regular file: {}", path.display());
    }

    if client::validate_file(&name, metadata.len()).is_err() {
        return Ok(UploadFile::metadata(name, metadata.len()));
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(UploadFile::from_bytes(name, bytes))
}

/// User-facing message for an unsuccessful auth outcome.
fn outcome_message(outcome: &AuthOutcome) -> String {
    match outcome {
        AuthOutcome::Invalid(msg) | AuthOutcome::Failed(msg) => msg.clone(),
        AuthOutcome::Busy => "Another attempt is in progress".to_string(),
        AuthOutcome::Registered => SIGNUP_SUCCESS_MESSAGE.to_string(),
        AuthOutcome::LoggedIn(session) => format!("Logged in as {}", session.email),
    }
}

/// Print the rendered catalog as a table.
fn print_catalog(view: &CatalogView) {
    match view {
        CatalogView::Loading => println!("Loading files..."),
        CatalogView::Empty => {
            println!("No files available yet");
            println!("Files will appear here in real-time when uploaded");
        }
        CatalogView::List {
            header,
            last_updated,
            rows,
        } => {
            println!("{} (last updated {})", header, last_updated);
            println!();

            let id_width = rows.iter().map(|r| r.id.chars().count()).max().unwrap_or(2).max(2);
            let name_width = 40;

            println!(
                "{:<id_width$}  {:<name_width$}  {:<20}  {:>10}  {:>14}",
                "ID", "NAME", "UPLOADED BY", "SIZE", "UPLOADED",
            );
            for row in rows {
                println!(
                    "{:<id_width$}  {:<name_width$}  {:<20}  {:>10}  {:>14}",
                    row.id,
                    truncate_str(&row.name, name_width),
                    truncate_str(&row.uploaded_by, 20),
                    row.size,
                    row.uploaded,
                );
            }
        }
    }
}

/// Truncate a string to a maximum length in characters, adding "..." if truncated.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
