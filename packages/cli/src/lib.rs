//! Command line host for the shellcache worker.
//!
//! Every invocation is one short-lived host process. `install` and
//! `activate` run a fresh worker generation against the on-disk caches;
//! `fetch` and `message` resume a generation that already activated.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shellcache_disk_store::DiskCacheStorage;
use shellcache_net::{FetchError, ReqwestFetcher};
use shellcache_store::{CacheStorage, CacheStore, Error as StoreError, Request, Url};
use shellcache_worker::{
    manifest_record_key, ActivationError, ActivationOutcome, BuildManifest, ConfigError,
    ControlMessage, FetchOutcome, HostSignals, MessageOutcome, ResourceManifest, ServiceWorker,
    WorkerConfig, WorkerError,
};

/// shellcache - keep a web application shell cached offline
#[derive(Parser, Debug)]
#[command(name = "shellcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the caches [default: <user cache dir>/shellcache]
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Build manifest JSON: {"resources": {...}, "shell": [...]}
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Origin the application is served from
    #[arg(long, global = true, default_value = "http://localhost:8080")]
    pub origin: Url,

    /// Network timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the shell files into the staging cache
    Install,
    /// Install, then reconcile and commit the caches
    Activate,
    /// Serve a request the way an activated worker would
    Fetch { url: Url },
    /// Send a control message (force-activate, download-offline)
    Message { signal: String },
    /// Show the caches and the persisted manifest record
    Status,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no cache directory given and no user cache directory found")]
    NoCacheDir,

    #[error("--manifest is required for this command")]
    MissingManifest,

    #[error("failed to read {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("activation failed, caches were wiped: {0}")]
    Wiped(#[source] ActivationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Install the log subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run one command and return what it prints.
pub async fn execute(cli: &Cli) -> Result<String, CliError> {
    let storage = Arc::new(open_storage(cli)?);

    match &cli.command {
        Command::Install => {
            let worker = open_worker(cli, storage, false)?;
            let staged = worker.install().await?;
            Ok(format!("installed {} shell files", staged))
        }
        Command::Activate => {
            let worker = open_worker(cli, storage, false)?;
            let staged = worker.install().await?;
            match worker.activate().await? {
                ActivationOutcome::Committed(report) => Ok(format!(
                    "installed {} shell files\nactivated: {} promoted, {} retained, {} evicted{}",
                    staged,
                    report.promoted,
                    report.retained,
                    report.evicted,
                    if report.bootstrap { " (fresh cache)" } else { "" }
                )),
                ActivationOutcome::Wiped(err) => Err(CliError::Wiped(err)),
            }
        }
        Command::Fetch { url } => {
            let worker = open_worker(cli, storage, true)?;
            match worker.handle_fetch(&Request::get(url.clone())).await? {
                FetchOutcome::Respond(response) => Ok(format!(
                    "{} {} ({} bytes)",
                    response.status,
                    response.status_text,
                    response.body.len()
                )),
                FetchOutcome::Passthrough => Ok("passthrough".to_string()),
            }
        }
        Command::Message { signal } => {
            let worker = open_worker(cli, storage, true)?;
            let message = ControlMessage::parse(signal);
            match worker.handle_message(message).await? {
                MessageOutcome::SkipWaitingRequested => Ok("skip waiting requested".to_string()),
                MessageOutcome::Activated(ActivationOutcome::Committed(_)) => {
                    Ok("activated".to_string())
                }
                MessageOutcome::Activated(ActivationOutcome::Wiped(err)) => {
                    Err(CliError::Wiped(err))
                }
                MessageOutcome::Downloaded(report) => Ok(format!(
                    "downloaded {} of {} missing resources",
                    report.downloaded, report.requested
                )),
                MessageOutcome::Ignored => Ok(format!("ignored unknown message '{}'", signal)),
            }
        }
        Command::Status => status(cli, storage.as_ref()).await,
    }
}

fn open_storage(cli: &Cli) -> Result<DiskCacheStorage, CliError> {
    let dir = match &cli.cache_dir {
        Some(dir) => dir.clone(),
        None => dirs::cache_dir()
            .map(|p| p.join("shellcache"))
            .ok_or(CliError::NoCacheDir)?,
    };
    info!(dir = %dir.display(), "opening cache storage");
    Ok(DiskCacheStorage::new(dir)?)
}

fn load_config(cli: &Cli) -> Result<WorkerConfig, CliError> {
    let path = cli.manifest.as_ref().ok_or(CliError::MissingManifest)?;
    let json = std::fs::read_to_string(path).map_err(|source| CliError::ReadManifest {
        path: path.clone(),
        source,
    })?;
    let build = BuildManifest::from_json(&json)?;
    Ok(WorkerConfig::from_build_manifest(cli.origin.clone(), build)?)
}

/// A worker over the disk caches. `activated` resumes a generation that
/// activated in an earlier run.
fn open_worker(
    cli: &Cli,
    storage: Arc<DiskCacheStorage>,
    activated: bool,
) -> Result<ServiceWorker, CliError> {
    let config = load_config(cli)?;
    let fetcher = Arc::new(ReqwestFetcher::new(Duration::from_secs(cli.timeout_secs))?);
    let host = Arc::new(HostSignals::new());

    Ok(if activated {
        ServiceWorker::resume(config, storage, fetcher, host)
    } else {
        ServiceWorker::new(config, storage, fetcher, host)
    })
}

async fn status(cli: &Cli, storage: &DiskCacheStorage) -> Result<String, CliError> {
    let names = storage.names().await?;
    let mut lines = Vec::with_capacity(names.len() + 1);

    for name in &names {
        let store = storage.open(name).await?;
        lines.push(format!("{}: {} entries", name, store.len().await?));
    }

    let record_name = match cli.manifest {
        Some(_) => load_config(cli)?.cache_names().manifest_record.clone(),
        None => shellcache_worker::CacheNames::default().manifest_record,
    };

    let record = if names.contains(&record_name) {
        let store = storage.open(&record_name).await?;
        store.lookup(&manifest_record_key(&cli.origin)?).await?
    } else {
        None
    };

    match record {
        Some(response) => {
            let manifest = ResourceManifest::from_response(&response).map_err(StoreError::from)?;
            lines.push(format!("manifest record: {} resources", manifest.len()));
        }
        None => lines.push("manifest record: none".to_string()),
    }

    Ok(lines.join("\n"))
}
