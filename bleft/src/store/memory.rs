//! In-memory store
// (c) 2026 Ross Younger

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{DirectoryEntry, Store, StoreError, components, truncate_time};
use crate::protocol::FLAG_DIRECTORY;

#[derive(Clone, Debug)]
enum Node {
    File {
        contents: Vec<u8>,
        modification_time: u64,
    },
    Directory {
        entries: BTreeMap<String, Node>,
        modification_time: u64,
    },
}

impl Node {
    fn empty_directory(modification_time: u64) -> Self {
        Node::Directory {
            entries: BTreeMap::new(),
            modification_time,
        }
    }
}

/// A [`Store`] held entirely in memory.
///
/// Listings are sorted by name. Modification times are truncated to a configurable resolution
/// (1ns by default, i.e. stored exactly) to model stores with coarse timestamps.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    root: Node,
    resolution: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store, containing only the root directory
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::empty_directory(0),
            resolution: 1,
        }
    }

    /// Sets the resolution of stored modification times, in nanoseconds
    #[must_use]
    pub fn with_time_resolution(mut self, nanos: u64) -> Self {
        self.resolution = nanos;
        self
    }

    /// Does anything exist at this path?
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        components(path).is_ok_and(|parts| self.node(&parts, path).is_ok())
    }

    fn node(&self, parts: &[&str], path: &str) -> Result<&Node, StoreError> {
        let mut current = &self.root;
        for (i, part) in parts.iter().enumerate() {
            let Node::Directory { entries, .. } = current else {
                return Err(StoreError::NotADirectory(path.to_string()));
            };
            current = match entries.get(*part) {
                Some(n) => n,
                None if i + 1 == parts.len() => {
                    return Err(StoreError::NotFound(path.to_string()));
                }
                None => return Err(StoreError::NoSuchDirectory(path.to_string())),
            };
        }
        Ok(current)
    }

    /// Finds the entries of the directory named by `parts`
    fn directory_mut(
        &mut self,
        parts: &[&str],
        path: &str,
    ) -> Result<&mut BTreeMap<String, Node>, StoreError> {
        let mut current = &mut self.root;
        for part in parts {
            current = match current {
                Node::Directory { entries, .. } => entries
                    .get_mut(*part)
                    .ok_or_else(|| StoreError::NoSuchDirectory(path.to_string()))?,
                Node::File { .. } => return Err(StoreError::NotADirectory(path.to_string())),
            };
        }
        match current {
            Node::Directory { entries, .. } => Ok(entries),
            Node::File { .. } => Err(StoreError::NotADirectory(path.to_string())),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read_file(&mut self, path: &str) -> Result<Vec<u8>, StoreError> {
        let parts = components(path)?;
        match self.node(&parts, path)? {
            Node::File { contents, .. } => Ok(contents.clone()),
            Node::Directory { .. } => Err(StoreError::IsADirectory(path.to_string())),
        }
    }

    async fn write_file(
        &mut self,
        path: &str,
        contents: Vec<u8>,
        modification_time: u64,
    ) -> Result<u64, StoreError> {
        let parts = components(path)?;
        let Some((name, parents)) = parts.split_last() else {
            return Err(StoreError::IsADirectory(path.to_string()));
        };
        let modification_time = truncate_time(modification_time, self.resolution);
        let dir = self.directory_mut(parents, path)?;
        if let Some(Node::Directory { .. }) = dir.get(*name) {
            return Err(StoreError::IsADirectory(path.to_string()));
        }
        let _ = dir.insert(
            (*name).to_string(),
            Node::File {
                contents,
                modification_time,
            },
        );
        Ok(modification_time)
    }

    async fn create_directory(
        &mut self,
        path: &str,
        modification_time: u64,
    ) -> Result<u64, StoreError> {
        let parts = components(path)?;
        let modification_time = truncate_time(modification_time, self.resolution);
        let mut current = &mut self.root;
        for part in parts {
            current = match current {
                Node::Directory { entries, .. } => entries
                    .entry(part.to_string())
                    .or_insert_with(|| Node::empty_directory(modification_time)),
                Node::File { .. } => return Err(StoreError::AlreadyExists(path.to_string())),
            };
        }
        match current {
            Node::Directory {
                modification_time, ..
            } => Ok(*modification_time),
            Node::File { .. } => Err(StoreError::AlreadyExists(path.to_string())),
        }
    }

    async fn list_directory(&mut self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError> {
        let parts = components(path)?;
        let Node::Directory { entries, .. } = self.node(&parts, path)? else {
            return Err(StoreError::NotADirectory(path.to_string()));
        };
        Ok(entries
            .iter()
            .map(|(name, node)| match node {
                Node::File {
                    contents,
                    modification_time,
                } => DirectoryEntry::new(
                    name.clone(),
                    u32::try_from(contents.len()).unwrap_or(u32::MAX),
                    0,
                    *modification_time,
                ),
                Node::Directory {
                    modification_time, ..
                } => DirectoryEntry::new(name.clone(), 0, FLAG_DIRECTORY, *modification_time),
            })
            .collect())
    }

    async fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        let parts = components(path)?;
        let Some((name, parents)) = parts.split_last() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };
        let dir = self.directory_mut(parents, path)?;
        match dir.get(*name) {
            None => return Err(StoreError::NotFound(path.to_string())),
            Some(Node::Directory { entries, .. }) if !entries.is_empty() => {
                return Err(StoreError::DirectoryNotEmpty(path.to_string()));
            }
            Some(_) => (),
        }
        let _ = dir.remove(*name);
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        let from_parts = components(from)?;
        let to_parts = components(to)?;
        let (Some((from_name, from_parents)), Some((to_name, to_parents))) =
            (from_parts.split_last(), to_parts.split_last())
        else {
            return Err(StoreError::InvalidPath(format!("{from} -> {to}")));
        };
        if to_parts.len() > from_parts.len() && to_parts.starts_with(&from_parts) {
            return Err(StoreError::InvalidPath(format!(
                "cannot move {from} inside itself"
            )));
        }
        let _ = self.node(&from_parts, from)?;
        let Node::Directory { entries, .. } = self.node(to_parents, to).map_err(|e| match e {
            StoreError::NotFound(p) => StoreError::NoSuchDirectory(p),
            e => e,
        })?
        else {
            return Err(StoreError::NotADirectory(to.to_string()));
        };
        if entries.contains_key(*to_name) {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }

        let node = self
            .directory_mut(from_parents, from)?
            .remove(*from_name)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        let _ = self
            .directory_mut(to_parents, to)?
            .insert((*to_name).to_string(), node);
        Ok(())
    }
}
