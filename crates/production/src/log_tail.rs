//! Follow a growing log file.
//!
//! Starts at the current end of the file, so nothing already written is
//! replayed. Survives logrotate-style rotation (the path now names a new
//! file) and copytruncate-style truncation (the file shrank). Incomplete
//! trailing lines are held back until their newline arrives.

use chrono::{DateTime, Utc};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Errors while following the log.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is no longer accessible: {source}", path.display())]
    Vanished {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading {} failed: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What the tail task delivers to its consumer.
#[derive(Debug)]
pub enum TailEvent {
    Line {
        line: String,
        received_at: DateTime<Utc>,
    },
    /// The stream is broken. Repeated on every poll until it recovers.
    Failed(TailError),
}

/// Identity of the file behind a path, used to detect rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
}

impl FileId {
    #[cfg(unix)]
    fn of(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }

    #[cfg(not(unix))]
    fn of(_meta: &std::fs::Metadata) -> Self {
        Self {}
    }
}

/// Incremental reader over one log path.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    file: File,
    id: FileId,
    pos: u64,
    partial: Vec<u8>,
}

impl LogTail {
    /// Open `path` positioned at its current end.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TailError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).await.map_err(|source| TailError::Open {
            path: path.clone(),
            source,
        })?;
        let meta = file.metadata().await.map_err(|source| TailError::Open {
            path: path.clone(),
            source,
        })?;
        let pos = file
            .seek(SeekFrom::End(0))
            .await
            .map_err(|source| TailError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file,
            id: FileId::of(&meta),
            pos,
            partial: Vec::new(),
        })
    }

    /// Read everything appended since the last call and return the complete
    /// lines.
    pub async fn poll(&mut self) -> Result<Vec<String>, TailError> {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|source| TailError::Vanished {
                path: self.path.clone(),
                source,
            })?;

        let mut lines = Vec::new();

        if FileId::of(&meta) != self.id {
            // Drain what the old file still had, then switch.
            self.read_available(&mut lines).await?;
            if !self.partial.is_empty() {
                lines.push(take_line(&mut self.partial));
            }
            self.reopen().await?;
            info!(path = %self.path.display(), "Log file rotated, following new file");
        } else if meta.len() < self.pos {
            debug!(
                path = %self.path.display(),
                was = self.pos,
                now = meta.len(),
                "Log file truncated, reading from start"
            );
            self.file
                .seek(SeekFrom::Start(0))
                .await
                .map_err(|source| self.read_error(source))?;
            self.pos = 0;
            self.partial.clear();
        }

        self.read_available(&mut lines).await?;
        Ok(lines)
    }

    async fn reopen(&mut self) -> Result<(), TailError> {
        let file = File::open(&self.path).await.map_err(|source| TailError::Open {
            path: self.path.clone(),
            source,
        })?;
        let meta = file.metadata().await.map_err(|source| TailError::Open {
            path: self.path.clone(),
            source,
        })?;
        self.file = file;
        self.id = FileId::of(&meta);
        self.pos = 0;
        self.partial.clear();
        Ok(())
    }

    async fn read_available(&mut self, lines: &mut Vec<String>) -> Result<(), TailError> {
        let mut buf = Vec::new();
        let n = self
            .file
            .read_to_end(&mut buf)
            .await
            .map_err(|source| self.read_error(source))?;
        self.pos += n as u64;

        for byte in buf {
            if byte == b'\n' {
                lines.push(take_line(&mut self.partial));
            } else {
                self.partial.push(byte);
            }
        }
        Ok(())
    }

    fn read_error(&self, source: std::io::Error) -> TailError {
        TailError::Read {
            path: self.path.clone(),
            source,
        }
    }
}

fn take_line(partial: &mut Vec<u8>) -> String {
    let bytes = std::mem::take(partial);
    let line = String::from_utf8_lossy(&bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

/// Run a tail loop until the consumer goes away.
///
/// If `tail` is `None` or a poll fails, the path is reopened on the next
/// poll. Reopening after a failure starts at the end of the new file.
pub async fn run_tail(
    path: PathBuf,
    mut tail: Option<LogTail>,
    poll_interval: Duration,
    tx: mpsc::Sender<TailEvent>,
) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if tail.is_none() {
            match LogTail::open(&path).await {
                Ok(reopened) => {
                    info!(path = %path.display(), "Log file reopened");
                    tail = Some(reopened);
                }
                Err(e) => {
                    if tx.send(TailEvent::Failed(e)).await.is_err() {
                        return;
                    }
                    continue;
                }
            }
        }
        let Some(current) = tail.as_mut() else {
            continue;
        };

        match current.poll().await {
            Ok(lines) => {
                let received_at = Utc::now();
                for line in lines {
                    if tx.send(TailEvent::Line { line, received_at }).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Log tail failed");
                tail = None;
                if tx.send(TailEvent::Failed(e)).await.is_err() {
                    return;
                }
            }
        }
    }
}
