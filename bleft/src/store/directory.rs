//! Store backed by a directory on the local filesystem
// (c) 2026 Ross Younger

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::debug;

use super::{DirectoryEntry, Store, StoreError, components};
use crate::protocol::FLAG_DIRECTORY;
use crate::util::time::SystemTimeExt as _;

/// A [`Store`] which serves a directory on the local filesystem.
///
/// Protocol paths are resolved beneath the root directory; `.` and `..` components are rejected,
/// so requests cannot reach outside it.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

fn map_io(e: std::io::Error, path: &str) -> StoreError {
    let path = path.to_string();
    match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound(path),
        ErrorKind::NotADirectory => StoreError::NotADirectory(path),
        ErrorKind::IsADirectory => StoreError::IsADirectory(path),
        ErrorKind::DirectoryNotEmpty => StoreError::DirectoryNotEmpty(path),
        ErrorKind::AlreadyExists => StoreError::AlreadyExists(path),
        _ => StoreError::Io(e),
    }
}

/// Applies a modification time to a file or directory
async fn set_modified(path: &Path, modification_time: u64) -> std::io::Result<()> {
    // tokio has no async set_times; see https://github.com/tokio-rs/tokio/issues/6368
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&path)?;
        file.set_modified(SystemTime::from_unix_nanos(modification_time))
    })
    .await
    .map_err(std::io::Error::other)?
}

async fn modified(path: &Path) -> std::io::Result<u64> {
    Ok(tokio::fs::metadata(path).await?.modified()?.to_unix_nanos())
}

impl DirectoryStore {
    /// Serves the given directory, which must exist
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::NotADirectory(root.display().to_string()));
        }
        Ok(Self { root })
    }

    /// The directory being served
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let mut resolved = self.root.clone();
        resolved.extend(components(path)?);
        Ok(resolved)
    }

    /// Checks that the parent of `path` exists and is a directory
    async fn check_parent(&self, local: &Path, path: &str) -> Result<(), StoreError> {
        let Some(parent) = local.parent() else {
            return Ok(());
        };
        match tokio::fs::metadata(parent).await {
            Ok(md) if md.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::NotADirectory(path.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NoSuchDirectory(path.to_string()))
            }
            Err(e) => Err(map_io(e, path)),
        }
    }
}

#[async_trait]
impl Store for DirectoryStore {
    async fn read_file(&mut self, path: &str) -> Result<Vec<u8>, StoreError> {
        let local = self.resolve(path)?;
        let md = tokio::fs::metadata(&local)
            .await
            .map_err(|e| map_io(e, path))?;
        if md.is_dir() {
            return Err(StoreError::IsADirectory(path.to_string()));
        }
        tokio::fs::read(&local).await.map_err(|e| map_io(e, path))
    }

    async fn write_file(
        &mut self,
        path: &str,
        contents: Vec<u8>,
        modification_time: u64,
    ) -> Result<u64, StoreError> {
        let local = self.resolve(path)?;
        if local == self.root {
            return Err(StoreError::IsADirectory(path.to_string()));
        }
        self.check_parent(&local, path).await?;
        if tokio::fs::metadata(&local)
            .await
            .is_ok_and(|md| md.is_dir())
        {
            return Err(StoreError::IsADirectory(path.to_string()));
        }
        tokio::fs::write(&local, contents)
            .await
            .map_err(|e| map_io(e, path))?;
        set_modified(&local, modification_time)
            .await
            .map_err(|e| map_io(e, path))?;
        modified(&local).await.map_err(|e| map_io(e, path))
    }

    async fn create_directory(
        &mut self,
        path: &str,
        modification_time: u64,
    ) -> Result<u64, StoreError> {
        let local = self.resolve(path)?;
        match tokio::fs::metadata(&local).await {
            Ok(md) if md.is_dir() => {
                return modified(&local).await.map_err(|e| map_io(e, path));
            }
            Ok(_) => return Err(StoreError::AlreadyExists(path.to_string())),
            Err(_) => (),
        }
        tokio::fs::create_dir_all(&local)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotADirectory => StoreError::AlreadyExists(path.to_string()),
                _ => map_io(e, path),
            })?;
        if let Err(e) = set_modified(&local, modification_time).await {
            // not every platform lets us set directory times
            debug!("could not set modification time of {path}: {e}");
        }
        modified(&local).await.map_err(|e| map_io(e, path))
    }

    async fn list_directory(&mut self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError> {
        let local = self.resolve(path)?;
        let md = tokio::fs::metadata(&local)
            .await
            .map_err(|e| map_io(e, path))?;
        if !md.is_dir() {
            return Err(StoreError::NotADirectory(path.to_string()));
        }
        let mut reader = tokio::fs::read_dir(&local)
            .await
            .map_err(|e| map_io(e, path))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| map_io(e, path))? {
            let md = entry.metadata().await.map_err(|e| map_io(e, path))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let modification_time = md.modified().map_or(0, |t| t.to_unix_nanos());
            entries.push(if md.is_dir() {
                DirectoryEntry::new(name, 0, FLAG_DIRECTORY, modification_time)
            } else {
                DirectoryEntry::new(
                    name,
                    u32::try_from(md.len()).unwrap_or(u32::MAX),
                    0,
                    modification_time,
                )
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        let local = self.resolve(path)?;
        if local == self.root {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let md = tokio::fs::symlink_metadata(&local)
            .await
            .map_err(|e| map_io(e, path))?;
        let result = if md.is_dir() {
            tokio::fs::remove_dir(&local).await
        } else {
            tokio::fs::remove_file(&local).await
        };
        result.map_err(|e| map_io(e, path))
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        let from_parts = components(from)?;
        let to_parts = components(to)?;
        if from_parts.is_empty() || to_parts.is_empty() {
            return Err(StoreError::InvalidPath(format!("{from} -> {to}")));
        }
        if to_parts.len() > from_parts.len() && to_parts.starts_with(&from_parts) {
            return Err(StoreError::InvalidPath(format!(
                "cannot move {from} inside itself"
            )));
        }
        let source = self.resolve(from)?;
        let dest = self.resolve(to)?;
        let _ = tokio::fs::symlink_metadata(&source)
            .await
            .map_err(|e| map_io(e, from))?;
        if tokio::fs::symlink_metadata(&dest).await.is_ok() {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }
        self.check_parent(&dest, to).await?;
        tokio::fs::rename(&source, &dest)
            .await
            .map_err(|e| map_io(e, from))
    }
}
