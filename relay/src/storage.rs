//! Flat on-disk store for uploaded proof files.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::submission::{Attachment, UploadedFile};

const MAX_NAME_ATTEMPTS: u32 = 1024;

/// Writes uploads as `{unix-timestamp}_{original-filename}` into one directory.
///
/// Files are created with create-new semantics. When the name is already
/// taken (two identical uploads in the same second) a counter is appended to
/// the timestamp, `{unix-timestamp}-{n}_{original-filename}`, so an existing
/// upload is never overwritten.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Write one upload to disk and return where it landed.
    pub async fn persist(&self, file: &UploadedFile) -> Result<Attachment> {
        let timestamp = Utc::now().timestamp();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{timestamp}_{}", file.original_name)
            } else {
                format!("{timestamp}-{attempt}_{}", file.original_name)
            };
            let path = self.dir.join(name);

            let handle = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(handle) => handle,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::Storage(e)),
            };

            fill(&path, handle, &file.content).await?;

            tracing::debug!(path = %path.display(), bytes = file.content.len(), "stored upload");
            return Ok(Attachment {
                original_name: file.original_name.clone(),
                storage_path: path,
            });
        }

        Err(Error::Storage(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free storage name for {:?}", file.original_name),
        )))
    }

    /// Remove previously persisted uploads, logging instead of failing.
    pub async fn discard(&self, attachments: &[Attachment]) {
        for attachment in attachments {
            if let Err(e) = fs::remove_file(&attachment.storage_path).await {
                tracing::warn!(
                    path = %attachment.storage_path.display(),
                    "failed to remove upload: {e}"
                );
            }
        }
    }
}

/// Write `content` into the freshly created file at `path`.
///
/// A failed write leaves no partial upload behind.
async fn fill<W>(path: &Path, mut handle: W, content: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match handle.write_all(content).await {
        Ok(()) => handle.flush().await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        drop(handle);
        if let Err(remove) = fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), "failed to remove partial upload: {remove}");
        }
        return Err(Error::Storage(e));
    }
    Ok(())
}
