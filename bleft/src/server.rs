//! Responder event loop
// (c) 2026 Ross Younger

use tracing::{Instrument as _, debug, trace, trace_span, warn};

use crate::config::Configuration;
use crate::error::Result;
use crate::protocol::Message;
use crate::session::{
    CommandHandler, DeleteHandler, HandlerContext, ListdirHandler, MkdirHandler, MoveHandler,
    ReadHandler, WriteHandler,
};
use crate::store::Store;
use crate::transport::PacketTransport;

/// Serves file transfer requests from a peer against a [`Store`].
///
/// The responder is idle between requests. Each request it receives runs to completion
/// before the next is read.
#[derive(Debug)]
pub struct Responder<S: Store> {
    store: S,
    config: Configuration,
}

impl<S: Store> Responder<S> {
    /// Constructor.
    ///
    /// A `config` which does not [`validate`](Configuration::validate) is used anyway, with a warning;
    /// a `max_chunk_size` of zero is treated as 1.
    #[must_use]
    pub fn new(store: S, config: Configuration) -> Self {
        if let Err(e) = config.validate() {
            warn!("{e}");
        }
        Self { store, config }
    }

    /// Accessor
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Takes back the store
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Serves requests until the transport disconnects.
    ///
    /// A request which fails for protocol reasons is logged and serving continues.
    /// Disconnection ends serving cleanly; any other transport failure is returned.
    pub async fn serve<T: PacketTransport>(&mut self, transport: &mut T) -> Result<()> {
        loop {
            match self.serve_one(transport).await {
                Ok(()) => (),
                Err(e) if e.is_disconnect() => {
                    debug!("peer disconnected");
                    return Ok(());
                }
                Err(e) if e.kind().is_some() => warn!("request failed: {e}"),
                Err(e) => return Err(e),
            }
        }
    }

    /// Receives and serves exactly one request.
    ///
    /// Anything that is not a request is logged and discarded.
    pub async fn serve_one<T: PacketTransport>(&mut self, transport: &mut T) -> Result<()> {
        let mut ctx = HandlerContext::new(transport, &mut self.store, &self.config);
        let message = match ctx.exchange.receive_message().await {
            Ok(m) => m,
            Err(e) if e.kind().is_some() => {
                let dropped = ctx.exchange.discard();
                warn!("discarding {dropped} bytes: {e}");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let command = message.command();
        trace!("received {command}");
        let span = trace_span!("request", %command);
        match message {
            Message::Read(r) => ReadHandler.handle_impl(&mut ctx, r).instrument(span).await,
            Message::Write(r) => WriteHandler.handle_impl(&mut ctx, r).instrument(span).await,
            Message::Mkdir(r) => MkdirHandler.handle_impl(&mut ctx, r).instrument(span).await,
            Message::Delete(r) => DeleteHandler.handle_impl(&mut ctx, r).instrument(span).await,
            Message::Listdir(r) => {
                ListdirHandler
                    .handle_impl(&mut ctx, r)
                    .instrument(span)
                    .await
            }
            Message::Move(r) => MoveHandler.handle_impl(&mut ctx, r).instrument(span).await,
            other => {
                let dropped = ctx.exchange.discard();
                warn!("ignoring unexpected {} (and {dropped} further bytes)", other.command());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use super::Responder;
    use crate::config::Configuration;
    use crate::protocol::header::{DeleteRequest, DeleteStatus, WriteData};
    use crate::protocol::{OUR_COMPATIBILITY_LEVEL, Status};
    use crate::store::{MemoryStore, Store as _};
    use crate::transport::{Exchange, LoopbackTransport};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn stops_on_disconnect() {
        let (a, mut b) = LoopbackTransport::pair(OUR_COMPATIBILITY_LEVEL);
        drop(a);
        let mut responder = Responder::new(MemoryStore::new(), Configuration::default());
        responder.serve(&mut b).await.unwrap();
    }

    #[tokio::test]
    async fn junk_is_discarded() {
        let (mut a, mut b) = LoopbackTransport::pair(OUR_COMPATIBILITY_LEVEL);
        let script = async move {
            let mut ex = Exchange::new(&mut a);
            // unknown command
            ex.send(&[0x99, 1, 2, 3]).await.unwrap();
            // a late poison message
            let poison = WriteData {
                status: Status::ErrorProtocol,
                offset: 0,
                free_space: 0,
            };
            ex.send_header(&poison).await.unwrap();
            // something that does get served
            let request = DeleteRequest { path_length: 2 };
            ex.send_with_payload(&request, b"/x").await.unwrap();
            ex.receive_header::<DeleteStatus>().await.unwrap()
        };
        let mut responder = Responder::new(MemoryStore::new(), Configuration::default());
        let (reply, served) = tokio::join!(script, responder.serve(&mut b));
        served.unwrap();
        assert_eq!(reply.status, Status::ErrorNoFile);
        // nothing was written
        assert!(!responder.store().exists("/x"));
        let mut store = responder.into_store();
        assert!(store.list_directory("/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_configuration_is_tolerated() {
        let config = Configuration {
            read_chunk_size: 0,
            max_chunk_size: 0,
        };
        let mut store = MemoryStore::new();
        let _ = store.write_file("/f", b"abc".to_vec(), 0).await.unwrap();
        let mut responder = Responder::new(store, config);
        let (mut a, mut b) = LoopbackTransport::pair(OUR_COMPATIBILITY_LEVEL);
        let script = async move {
            let mut ex = Exchange::new(&mut a);
            let request = DeleteRequest { path_length: 2 };
            ex.send_with_payload(&request, b"/f").await.unwrap();
            ex.receive_header::<DeleteStatus>().await.unwrap()
        };
        let (reply, served) = tokio::join!(script, responder.serve(&mut b));
        served.unwrap();
        assert_eq!(reply.status, Status::Ok);
        assert!(!responder.store().exists("/f"));
    }
}
