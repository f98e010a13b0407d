//! Caller-facing upload state and manual retry.
//!
//! Wraps one [`UploadStrategy`], remembers the last request so a failed
//! upload can be retried with identical inputs, and streams lifecycle
//! events over a channel.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::UploadError;
use crate::strategy::{UploadReceipt, UploadStrategy};
use crate::types::{UploadMode, UploadRequest};

/// Lifecycle of the controller's current upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Succeeded,
    Failed(String),
}

/// Events emitted while uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// An attempt started (1-based across `start` and `retry`).
    Started { attempt: u32 },
    /// Progress changed.
    Progress { percent: u8 },
    Completed,
    Failed { error: String },
}

#[derive(Default)]
struct ControllerState {
    status: UploadStatus,
    last_request: Option<UploadRequest>,
    attempts: u32,
}

pub struct UploadController {
    strategy: Arc<dyn UploadStrategy>,
    state: Mutex<ControllerState>,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

impl UploadController {
    pub fn new(strategy: Arc<dyn UploadStrategy>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);

        let progress_tx = events_tx.clone();
        strategy.progress().on_progress(Box::new(move |percent| {
            // Dropped when the receiver lags; the next report carries the state.
            let _ = progress_tx.try_send(UploadEvent::Progress { percent });
        }));

        Self {
            strategy,
            state: Mutex::new(ControllerState::default()),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn status(&self) -> UploadStatus {
        self.lock().status.clone()
    }

    pub fn is_uploading(&self) -> bool {
        self.status() == UploadStatus::Uploading
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    pub fn progress(&self) -> u8 {
        self.strategy.progress().current()
    }

    pub fn mode(&self) -> UploadMode {
        self.strategy.mode()
    }

    /// Starts an upload, remembering `request` for [`retry`](Self::retry).
    pub async fn start(&self, request: UploadRequest) -> Result<UploadReceipt, UploadError> {
        self.lock().last_request = Some(request.clone());
        self.run(&request).await
    }

    /// Re-runs the last request with identical inputs.
    pub async fn retry(&self) -> Result<UploadReceipt, UploadError> {
        let request = self
            .lock()
            .last_request
            .clone()
            .ok_or(UploadError::NothingToRetry)?;
        self.run(&request).await
    }

    async fn run(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        let attempt = {
            let mut state = self.lock();
            state.attempts += 1;
            state.status = UploadStatus::Uploading;
            state.attempts
        };
        self.emit(UploadEvent::Started { attempt });
        info!(mode = %self.strategy.mode(), attempt, "upload started");

        let result = self.strategy.upload(request).await;
        match &result {
            Ok(receipt) => {
                self.lock().status = UploadStatus::Succeeded;
                self.emit(UploadEvent::Completed);
                info!(
                    transfer_id = %receipt.transfer_id,
                    parts = receipt.part_count,
                    reused = receipt.reused_parts,
                    "upload completed"
                );
            }
            Err(e) => {
                let message = e.to_string();
                self.lock().status = UploadStatus::Failed(message.clone());
                self.emit(UploadEvent::Failed {
                    error: message.clone(),
                });
                error!(attempt, error = %message, "upload failed");
            }
        }
        result
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.events_tx.try_send(event);
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
