//! Listdir command
// (c) 2026 Ross Younger

use async_trait::async_trait;
use tracing::{debug, trace};

use super::handler::{CommandHandler, HandlerContext, RequestContext};
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::header::{ListdirEntry, ListdirRequest};
use crate::protocol::{Status, path::path_length};
use crate::store::{DirectoryEntry, Store};
use crate::transport::PacketTransport;

pub(crate) struct ListdirHandler;

#[async_trait]
impl CommandHandler for ListdirHandler {
    /// The directory to list
    type Args = String;
    type Output = Vec<DirectoryEntry>;
    type Request = ListdirRequest;
    type Response = ListdirEntry;

    fn failure(status: Status) -> ListdirEntry {
        ListdirEntry::failure(status)
    }

    async fn send_impl<'a, T: PacketTransport>(
        &self,
        inner: &mut RequestContext<'a, T>,
        path: String,
    ) -> Result<Vec<DirectoryEntry>> {
        let request = ListdirRequest {
            path_length: path_length(&path)?,
        };
        let ex = &mut inner.exchange;
        ex.send_with_payload(&request, path.as_bytes()).await?;

        let mut entries = Vec::new();
        loop {
            let entry: ListdirEntry = ex.receive_header().await?;
            if entry.status != Status::Ok {
                return Err(Error::new(
                    ErrorKind::InvalidPath,
                    format!("listdir {path}: {}", entry.status),
                ));
            }
            if entry.is_sentinel() {
                if entry.path_length != 0 {
                    return Err(Error::protocol("listing sentinel carries a name"));
                }
                if entry.total as usize != entries.len() {
                    return Err(Error::protocol(format!(
                        "listing ended after {} of {} entries",
                        entries.len(),
                        entry.total
                    )));
                }
                trace!("listdir {path}: {} entries", entries.len());
                return Ok(entries);
            }
            if entry.index as usize != entries.len() {
                return Err(Error::protocol(format!(
                    "expected entry {}, got {}",
                    entries.len(),
                    entry.index
                )));
            }
            let name = ex.read_path(entry.path_length.into()).await?;
            entries.push(DirectoryEntry::new(
                name,
                entry.file_size,
                entry.flags,
                entry.modification_time,
            ));
        }
    }

    async fn handle_impl<'a, T: PacketTransport, S: Store>(
        &self,
        inner: &mut HandlerContext<'a, T, S>,
        request: ListdirRequest,
    ) -> Result<()> {
        let path = inner.read_path::<Self>(request.path_length).await?;
        let listing = match inner.store.list_directory(&path).await {
            Ok(l) => l,
            Err(e) => {
                debug!("listdir {path}: {e}");
                return inner.refuse::<Self>(Status::from(&e)).await;
            }
        };
        let Ok(total) = u32::try_from(listing.len()) else {
            return inner.refuse::<Self>(Status::Error).await;
        };
        // A listing cannot be abandoned part way, so every name must fit before any is sent
        let mut lengths = Vec::with_capacity(listing.len());
        for item in &listing {
            match path_length(&item.name) {
                Ok(l) => lengths.push(l),
                Err(e) => {
                    debug!("listdir {path}: {e}");
                    return inner.refuse::<Self>(Status::Error).await;
                }
            }
        }

        let ex = &mut inner.exchange;
        for ((index, item), name_length) in (0..total).zip(listing).zip(lengths) {
            let header = ListdirEntry {
                status: Status::Ok,
                path_length: name_length,
                index,
                total,
                flags: item.flags,
                modification_time: item.modification_time,
                file_size: item.file_size,
            };
            ex.send_with_payload(&header, item.name.as_bytes()).await?;
        }
        ex.send_header(&ListdirEntry::sentinel(total)).await
    }
}
