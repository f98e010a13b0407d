//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use harufilm_api_client::{HttpControlPlane, HttpObjectStorage};
use harufilm_protocol::Timestamp;
use harufilm_session_store::{FileBackend, SessionStore, SystemClock, UploadSession};
use harufilm_uploader::{
    BatchUploader, ResumableUploader, UploadController, UploadEvent, UploadMode, UploadRequest,
    UploadStrategy,
};
use tracing::{info, warn};

use crate::config::CliConfig;

/// Sessions idle longer than this are purged.
const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct UploadArgs<'a> {
    pub video: &'a Path,
    pub thumbnail: &'a Path,
    pub timestamps: Option<&'a str>,
    pub mode: UploadMode,
    pub retries: u32,
}

fn open_store(config: &CliConfig) -> anyhow::Result<SessionStore> {
    let dir = config.session_dir()?;
    SessionStore::open(FileBackend::new(&dir))
        .with_context(|| format!("opening session store in {}", dir.display()))
}

pub async fn upload(config: &CliConfig, args: UploadArgs<'_>) -> anyhow::Result<()> {
    let video = tokio::fs::read(args.video)
        .await
        .with_context(|| format!("reading video {}", args.video.display()))?;
    let thumbnail = tokio::fs::read(args.thumbnail)
        .await
        .with_context(|| format!("reading thumbnail {}", args.thumbnail.display()))?;
    let timestamps = match args.timestamps {
        Some(raw) => load_timestamps(raw)?,
        None => Vec::new(),
    };

    let control = Arc::new(HttpControlPlane::new(&config.api_url, config.token())?);
    let storage = Arc::new(HttpObjectStorage::new()?);
    let strategy: Arc<dyn UploadStrategy> = match args.mode {
        UploadMode::Resumable => Arc::new(ResumableUploader::new(
            control,
            storage,
            Arc::new(open_store(config)?),
            config.uploader_config(),
        )?),
        UploadMode::Batch => Arc::new(BatchUploader::new(control, storage, Arc::new(SystemClock))),
    };

    let mut controller = UploadController::new(strategy);
    if let Some(mut events) = controller.take_events() {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    UploadEvent::Started { attempt } => info!(attempt, "attempt started"),
                    UploadEvent::Progress { percent } => info!(percent, "progress"),
                    UploadEvent::Completed => info!("upload finished"),
                    UploadEvent::Failed { error } => warn!(%error, "attempt failed"),
                }
            }
        });
    }

    let request = UploadRequest {
        video: Bytes::from(video),
        thumbnail: Bytes::from(thumbnail),
        timestamps,
    };
    info!(
        mode = %args.mode,
        bytes = request.video.len(),
        api = %config.api_url,
        "uploading {}",
        args.video.display()
    );

    let mut result = controller.start(request).await;
    let mut retried = 0;
    while result.is_err() && retried < args.retries {
        retried += 1;
        warn!(retry = retried, of = args.retries, "retrying upload");
        result = controller.retry().await;
    }

    let receipt = result?;
    println!(
        "uploaded {} ({} part(s), {} reused) as transfer {}",
        args.video.display(),
        receipt.part_count,
        receipt.reused_parts,
        receipt.transfer_id
    );
    Ok(())
}

/// Parses timestamps given inline (`[...]`) or as a path to a JSON file.
pub fn load_timestamps(raw: &str) -> anyhow::Result<Vec<Timestamp>> {
    let json = if raw.trim_start().starts_with('[') {
        raw.to_string()
    } else {
        std::fs::read_to_string(raw).with_context(|| format!("reading timestamps {raw}"))?
    };
    serde_json::from_str(&json).context("parsing timestamps")
}

pub fn list_sessions(config: &CliConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let now_ms = chrono::Utc::now().timestamp_millis();
    let sessions = store.sessions();
    if sessions.is_empty() {
        println!("no upload sessions");
        return Ok(());
    }
    for (key, session) in sessions {
        println!("{}", format_session(&key, &session, now_ms));
    }
    Ok(())
}

pub fn clear_expired(config: &CliConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let purged = store.clear_expired_sessions(SESSION_TTL)?;
    println!("purged {} expired session(s)", purged.len());
    for key in purged {
        println!("  {key}");
    }
    Ok(())
}

pub fn remove_session(config: &CliConfig, file_key: &str) -> anyhow::Result<()> {
    let store = open_store(config)?;
    match store.remove_session(file_key)? {
        Some(session) => println!("removed {file_key} (transfer {})", session.transfer_id),
        None => println!("no session for {file_key}"),
    }
    Ok(())
}

/// One `sessions list` line.
pub fn format_session(key: &str, session: &UploadSession, now_ms: i64) -> String {
    let age_min = now_ms.saturating_sub(session.last_updated).max(0) / 60_000;
    let expired = if session.is_expired(now_ms, SESSION_TTL) {
        "  (expired)"
    } else {
        ""
    };
    format!(
        "{key}  transfer={}  parts={}/{}  age={}h{:02}m{expired}",
        session.transfer_id,
        session.completed_count(),
        session.part_count,
        age_min / 60,
        age_min % 60,
    )
}
