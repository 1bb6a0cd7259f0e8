//! Requester side of a connection
// (c) 2026 Ross Younger

use bytes::Bytes;
use tracing::{Instrument as _, debug, trace_span};

use crate::config::Configuration;
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::{Compatibility, Feature, OUR_COMPATIBILITY_LEVEL};
use crate::session::{
    CommandHandler, DeleteHandler, ListdirHandler, MkdirArgs, MkdirHandler, MoveArgs, MoveHandler,
    ReadArgs, ReadHandler, RequestContext, WriteArgs, WriteHandler,
};
use crate::store::DirectoryEntry;
use crate::transport::PacketTransport;

/// Performs file operations against a remote responder.
///
/// One operation is in flight at a time; each method borrows the client mutably
/// and does not return until the operation completes or fails.
/// A failed operation leaves the connection usable for the next.
#[derive(Debug)]
pub struct FileTransferClient<T: PacketTransport> {
    transport: T,
    compat: Compatibility,
    config: Configuration,
}

impl<T: PacketTransport> FileTransferClient<T> {
    /// Sets up a client over a connected transport.
    ///
    /// The peer's protocol version is read once, here. A peer too old to speak the current header set is refused.
    pub async fn connect(mut transport: T, config: Configuration) -> Result<Self> {
        let version = transport.read_version().await?;
        let compat = Compatibility::from(version);
        debug!("peer protocol {compat}; ours is {OUR_COMPATIBILITY_LEVEL}");
        if !compat.supports(Feature::ModificationTimes) {
            return Err(Error::new(
                ErrorKind::UnsupportedByPeer,
                format!(
                    "peer speaks protocol {compat}, at least {} is required",
                    Feature::ModificationTimes.level()
                ),
            ));
        }
        Ok(Self {
            transport,
            compat,
            config,
        })
    }

    /// The protocol version the peer reported
    #[must_use]
    pub fn compatibility(&self) -> Compatibility {
        self.compat
    }

    /// Releases the transport
    #[must_use]
    pub fn into_inner(self) -> T {
        self.transport
    }

    async fn run<H: CommandHandler>(&mut self, handler: H, args: H::Args) -> Result<H::Output> {
        let mut ctx = RequestContext::new(&mut self.transport, self.compat, &self.config);
        handler.send_impl(&mut ctx, args).await
    }

    /// Reads a file, starting at `offset`, returning its contents from there to the end
    pub async fn read(&mut self, path: &str, offset: u32) -> Result<Vec<u8>> {
        let args = ReadArgs {
            path: path.into(),
            offset,
        };
        self.run(ReadHandler, args)
            .instrument(trace_span!("read", path))
            .await
    }

    /// Writes `contents` into a file at `offset`.
    ///
    /// The file ends up exactly `offset + contents.len()` bytes long: anything already present
    /// before `offset` is kept, a gap is zero-filled and anything beyond is truncated.
    /// The modification time defaults to now.
    ///
    /// Returns the modification time the responder stored, which may have been truncated
    /// to its resolution.
    pub async fn write(
        &mut self,
        path: &str,
        contents: &[u8],
        offset: u32,
        modification_time: Option<u64>,
    ) -> Result<u64> {
        let args = WriteArgs {
            path: path.into(),
            contents: Bytes::copy_from_slice(contents),
            offset,
            modification_time,
        };
        self.run(WriteHandler, args)
            .instrument(trace_span!("write", path))
            .await
    }

    /// Creates a directory, and any missing parents. Returns the stored modification time.
    pub async fn mkdir(&mut self, path: &str, modification_time: Option<u64>) -> Result<u64> {
        let args = MkdirArgs {
            path: path.into(),
            modification_time,
        };
        self.run(MkdirHandler, args)
            .instrument(trace_span!("mkdir", path))
            .await
    }

    /// Lists a directory
    pub async fn listdir(&mut self, path: &str) -> Result<Vec<DirectoryEntry>> {
        self.run(ListdirHandler, path.into())
            .instrument(trace_span!("listdir", path))
            .await
    }

    /// Deletes a file or an empty directory
    pub async fn delete(&mut self, path: &str) -> Result<()> {
        self.run(DeleteHandler, path.into())
            .instrument(trace_span!("delete", path))
            .await
    }

    /// Moves (renames) a file or directory. The destination must not exist.
    ///
    /// Needs protocol version 4; against an older peer this fails without sending anything.
    pub async fn move_path(&mut self, from: &str, to: &str) -> Result<()> {
        let args = MoveArgs {
            from: from.into(),
            to: to.into(),
        };
        self.run(MoveHandler, args)
            .instrument(trace_span!("move", from, to))
            .await
    }
}
