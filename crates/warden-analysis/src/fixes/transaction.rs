//! Per-file transaction: locked reads and writes, backup, rollback.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;

use warden_core::errors::FixError;
use warden_core::types::{ContentHash, Span};

/// Sibling path used for a file's pre-batch backup.
pub fn backup_path_for(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct AppliedChange {
    pub before: ContentHash,
    pub after: ContentHash,
    pub content: String,
}

#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    Applied(AppliedChange),
    /// Live text at the span no longer matches the expected hash.
    Stale,
}

/// All edits to one file within a batch.
///
/// Every read and write takes the file's `fd-lock` for the duration of
/// that operation only. A backup is written before the first edit and
/// removed by `finish`. Dropping an unfinished transaction that wrote a
/// backup leaves it in place for recovery.
#[derive(Debug)]
pub struct FileTransaction {
    path: PathBuf,
    backup_path: PathBuf,
    snapshots: Vec<(String, String)>,
    backup_written: bool,
    dirty: bool,
    finished: bool,
}

fn io_err(path: &Path, source: std::io::Error) -> FixError {
    FixError::ApplyIo {
        path: path.to_path_buf(),
        source,
    }
}

fn overwrite(file: &mut File, content: &str) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

impl FileTransaction {
    pub fn begin(path: impl Into<PathBuf>, backup_suffix: &str) -> Self {
        let path = path.into();
        let backup_path = backup_path_for(&path, backup_suffix);
        Self {
            path,
            backup_path,
            snapshots: Vec::new(),
            backup_written: false,
            dirty: false,
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn has_backup(&self) -> bool {
        self.backup_written
    }

    /// Read the current content under a shared lock.
    pub fn read(&self) -> Result<String, FixError> {
        let file = File::open(&self.path).map_err(|e| io_err(&self.path, e))?;
        let lock = RwLock::new(file);
        let guard = lock.read().map_err(|e| io_err(&self.path, e))?;
        let mut content = String::new();
        (&*guard)
            .read_to_string(&mut content)
            .map_err(|e| io_err(&self.path, e))?;
        Ok(content)
    }

    /// Replace `live` with `replacement` if the text there still hashes to
    /// `expected`. Writes the backup first when this is the file's first edit.
    pub fn apply(
        &mut self,
        candidate_id: &str,
        live: Span,
        expected: ContentHash,
        replacement: &str,
    ) -> Result<ApplyOutcome, FixError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        let mut lock = RwLock::new(file);
        let mut guard = lock.write().map_err(|e| io_err(&self.path, e))?;

        let mut content = String::new();
        guard
            .read_to_string(&mut content)
            .map_err(|e| io_err(&self.path, e))?;

        match live.slice(&content) {
            Some(text) if ContentHash::of_str(text) == expected => {}
            _ => return Ok(ApplyOutcome::Stale),
        }

        if !self.backup_written {
            self.write_backup(&content)?;
        }

        let mut updated = String::with_capacity(content.len() + replacement.len());
        updated.push_str(&content[..live.start]);
        updated.push_str(replacement);
        updated.push_str(&content[live.end..]);

        if let Err(e) = overwrite(&mut guard, &updated) {
            if let Err(restore) = overwrite(&mut guard, &content) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %restore,
                    "could not restore content after failed write; backup retained"
                );
                self.dirty = true;
            }
            return Err(io_err(&self.path, e));
        }

        let change = AppliedChange {
            before: ContentHash::of_str(&content),
            after: ContentHash::of_str(&updated),
            content: updated,
        };
        self.snapshots.push((candidate_id.to_string(), content));
        Ok(ApplyOutcome::Applied(change))
    }

    /// Restore the content captured just before `candidate_id` was applied.
    /// Returns the hash of the restored content.
    pub fn rollback(&mut self, candidate_id: &str) -> Result<ContentHash, FixError> {
        let Some(pos) = self.snapshots.iter().rposition(|(id, _)| id == candidate_id) else {
            return Err(io_err(
                &self.path,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no snapshot for {candidate_id}"),
                ),
            ));
        };
        let (_, snapshot) = self.snapshots.remove(pos);
        if let Err(e) = Self::restore(&self.path, &snapshot) {
            self.dirty = true;
            return Err(e);
        }
        Ok(ContentHash::of_str(&snapshot))
    }

    /// Overwrite `path` with `content` under an exclusive lock.
    pub fn restore(path: &Path, content: &str) -> Result<(), FixError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        let mut lock = RwLock::new(file);
        let mut guard = lock.write().map_err(|e| io_err(path, e))?;
        overwrite(&mut guard, content).map_err(|e| io_err(path, e))
    }

    /// Mark the file as left in a state only the backup can repair.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Complete the transaction, removing the backup unless the file was
    /// left dirty.
    pub fn finish(mut self) -> Result<(), FixError> {
        self.finished = true;
        if self.backup_written && !self.dirty {
            std::fs::remove_file(&self.backup_path).map_err(|e| io_err(&self.backup_path, e))?;
        }
        Ok(())
    }

    /// Refuses to replace an existing backup: that file belongs to an
    /// interrupted batch and is only consumed by recovery.
    fn write_backup(&mut self, content: &str) -> Result<(), FixError> {
        let mut backup = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.backup_path)
            .map_err(|e| io_err(&self.backup_path, e))?;
        backup
            .write_all(content.as_bytes())
            .and_then(|_| backup.sync_all())
            .map_err(|e| io_err(&self.backup_path, e))?;
        self.backup_written = true;
        Ok(())
    }
}

impl Drop for FileTransaction {
    fn drop(&mut self) {
        if !self.finished && self.backup_written {
            tracing::warn!(
                path = %self.path.display(),
                backup = %self.backup_path.display(),
                "transaction not finished; backup retained for recovery"
            );
        }
    }
}
