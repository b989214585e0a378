// src/store.rs
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::board::{AdminConfig, ShiftBoard};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the whole board document lives.
pub trait StateStore: Send + Sync {
    /// `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<ShiftBoard>, StoreError>;
    fn save(&self, board: &ShiftBoard) -> Result<(), StoreError>;
}

/// Stores the board as one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<ShiftBoard>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let board: ShiftBoard = serde_json::from_str(&contents)?;
        info!(
            "Loaded {} staff, {} task(s), {} month(s) from {}",
            board.staff.len(),
            board.tasks.len(),
            board.schedule.len(),
            self.path.display()
        );
        Ok(Some(board))
    }

    /// Writes a sibling temp file and renames it over the target.
    fn save(&self, board: &ShiftBoard) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(board)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

/// Loads the stored board, or seeds and saves a fresh one on first run.
/// Returns the board and whether it was just seeded.
pub fn load_or_seed(
    store: &dyn StateStore,
    admin_config: AdminConfig,
) -> Result<(ShiftBoard, bool), StoreError> {
    if let Some(board) = store.load()? {
        return Ok((board, false));
    }
    let board = ShiftBoard::seeded(admin_config);
    store.save(&board)?;
    info!("First run: saved a seeded board with {} task(s)", board.tasks.len());
    Ok((board, true))
}

// --- Debounced Saving ---

/// Persists the most recent snapshot once no new one has arrived for the
/// debounce delay. Failures are logged, never returned to the submitter.
pub struct DebouncedSaver {
    sender: mpsc::UnboundedSender<ShiftBoard>,
    handle: JoinHandle<()>,
}

fn persist(store: &dyn StateStore, board: &ShiftBoard) {
    if let Err(e) = store.save(board) {
        error!("Failed to save shift board: {}", e);
    }
}

impl DebouncedSaver {
    pub fn spawn(store: Arc<dyn StateStore>, delay: Duration) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ShiftBoard>();
        let handle = tokio::spawn(async move {
            let mut pending: Option<ShiftBoard> = None;
            loop {
                let next = if pending.is_some() {
                    tokio::select! {
                        next = receiver.recv() => next,
                        _ = sleep(delay) => {
                            if let Some(board) = pending.take() {
                                persist(store.as_ref(), &board);
                            }
                            continue;
                        }
                    }
                } else {
                    receiver.recv().await
                };
                match next {
                    Some(board) => pending = Some(board),
                    None => break,
                }
            }
            // Channel closed: flush whatever is left.
            if let Some(board) = pending.take() {
                persist(store.as_ref(), &board);
            }
            debug!("Debounced saver stopped");
        });
        Self { sender, handle }
    }

    /// Queues a snapshot. Never blocks.
    pub fn submit(&self, board: ShiftBoard) {
        if self.sender.send(board).is_err() {
            error!("Debounced saver is gone, snapshot dropped");
        }
    }

    /// Flushes any pending snapshot and waits for the saver to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.handle.await {
            error!("Debounced saver task failed: {}", e);
        }
    }
}
