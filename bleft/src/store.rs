// (c) 2026 Ross Younger

//! Backing stores served by the [`Responder`](crate::Responder)
//!
//! Paths are absolute, `/`-separated UTF-8 strings. A trailing `/` is permitted on directories.

use async_trait::async_trait;

use crate::protocol::{FLAG_DIRECTORY, Status};

mod directory;
mod memory;
pub use directory::DirectoryStore;
pub use memory::MemoryStore;

/// Failures reported by a [`Store`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing exists at the path
    #[error("not found: {0}")]
    NotFound(String),
    /// A parent directory of the path does not exist
    #[error("no such directory: {0}")]
    NoSuchDirectory(String),
    /// A component of the path is a file where a directory was needed
    #[error("not a directory: {0}")]
    NotADirectory(String),
    /// The path is a directory where a file was needed
    #[error("is a directory: {0}")]
    IsADirectory(String),
    /// The directory cannot be deleted because it has children
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),
    /// Something already exists at the path
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// The path is malformed, or the operation is not permitted on it
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Any other failure from the underlying storage
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StoreError> for Status {
    fn from(value: &StoreError) -> Self {
        match value {
            StoreError::NotFound(_) | StoreError::NoSuchDirectory(_) => Status::ErrorNoFile,
            _ => Status::Error,
        }
    }
}

/// One entry in a directory listing
#[derive(Clone, Debug, PartialEq, Eq, derive_more::Constructor)]
pub struct DirectoryEntry {
    /// Entry name (not the full path)
    pub name: String,
    /// File size in bytes; zero for directories
    pub file_size: u32,
    /// Flag bits; see [`FLAG_DIRECTORY`]
    pub flags: u32,
    /// Modification time in nanoseconds since the Unix epoch
    pub modification_time: u64,
}

impl DirectoryEntry {
    /// Is this entry a directory?
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.flags & FLAG_DIRECTORY != 0
    }
}

/// The filesystem-like store a [`Responder`](crate::Responder) serves
#[async_trait]
pub trait Store: Send {
    /// Returns the contents of a file
    async fn read_file(&mut self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Creates or replaces a file. The parent directory must exist.
    ///
    /// Returns the modification time actually stored, which may be coarser than requested.
    async fn write_file(
        &mut self,
        path: &str,
        contents: Vec<u8>,
        modification_time: u64,
    ) -> Result<u64, StoreError>;

    /// Creates a directory, and any missing parents. It is not an error for the directory to exist already.
    ///
    /// Returns the modification time actually stored.
    async fn create_directory(
        &mut self,
        path: &str,
        modification_time: u64,
    ) -> Result<u64, StoreError>;

    /// Lists the children of a directory, sorted by name
    async fn list_directory(&mut self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError>;

    /// Deletes a file or an empty directory
    async fn delete(&mut self, path: &str) -> Result<(), StoreError>;

    /// Moves a file or directory. The destination must not exist, but its parent must.
    async fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreError>;
}

/// Splits an absolute path into its components, ignoring empty components
/// (so a trailing `/` is permitted). `.` and `..` are rejected.
pub(crate) fn components(path: &str) -> Result<Vec<&str>, StoreError> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(StoreError::InvalidPath(path.to_string()));
    };
    let parts: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if parts.iter().any(|p| *p == "." || *p == "..") {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

/// Truncates a modification time to a store's resolution
pub(crate) fn truncate_time(time: u64, resolution: u64) -> u64 {
    if resolution <= 1 {
        time
    } else {
        time - time % resolution
    }
}
