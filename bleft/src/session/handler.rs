//! Generic command handler trait and its contexts
// (c) 2026 Ross Younger

use async_trait::async_trait;

use crate::config::Configuration;
use crate::error::Result;
use crate::protocol::{Compatibility, Status, WireHeader};
use crate::store::Store;
use crate::transport::{Exchange, PacketTransport};

/// Trait for command-specific behaviour - the extension point for new commands.
///
/// Each command has a requester half (`send_impl`) and a responder half (`handle_impl`).
#[async_trait]
pub(crate) trait CommandHandler: Send + Sync {
    /// Arguments to the requester half
    type Args: Send;
    /// What the requester half yields on success
    type Output: Send;
    /// The header which introduces this command
    type Request: WireHeader + Send;
    /// The header the responder sends back first
    type Response: WireHeader + Send + Sync;

    /// Constructs a response which refuses the request
    fn failure(status: Status) -> Self::Response;

    /// Requester side: sends the command and drives it to completion
    async fn send_impl<'a, T: PacketTransport>(
        &self,
        inner: &mut RequestContext<'a, T>,
        args: Self::Args,
    ) -> Result<Self::Output>;

    /// Responder side: serves a request whose header has already been received.
    ///
    /// Returns an error only if the requester misbehaved or the transport failed;
    /// a request which the store could not satisfy has been answered, so is `Ok`.
    async fn handle_impl<'a, T: PacketTransport, S: Store>(
        &self,
        inner: &mut HandlerContext<'a, T, S>,
        request: Self::Request,
    ) -> Result<()>;
}

/// Everything a requester half needs for one operation
#[derive(Debug)]
pub(crate) struct RequestContext<'a, T: PacketTransport> {
    pub(crate) exchange: Exchange<'a, T>,
    /// Protocol version spoken by the peer
    pub(crate) compat: Compatibility,
    pub(crate) config: &'a Configuration,
}

impl<'a, T: PacketTransport> RequestContext<'a, T> {
    pub(crate) fn new(
        transport: &'a mut T,
        compat: Compatibility,
        config: &'a Configuration,
    ) -> Self {
        Self {
            exchange: Exchange::new(transport),
            compat,
            config,
        }
    }
}

/// Everything a responder half needs for one operation
pub(crate) struct HandlerContext<'a, T: PacketTransport, S: Store> {
    pub(crate) exchange: Exchange<'a, T>,
    pub(crate) store: &'a mut S,
    pub(crate) config: &'a Configuration,
}

impl<T: PacketTransport, S: Store> std::fmt::Debug for HandlerContext<'_, T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("exchange", &self.exchange)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, T: PacketTransport, S: Store> HandlerContext<'a, T, S> {
    pub(crate) fn new(
        transport: &'a mut T,
        store: &'a mut S,
        config: &'a Configuration,
    ) -> Self {
        Self {
            exchange: Exchange::new(transport),
            store,
            config,
        }
    }

    /// Receives the path which follows a request header.
    ///
    /// If it cannot be decoded, the request is refused with `ErrorProtocol` before the error is returned.
    pub(crate) async fn read_path<H: CommandHandler>(&mut self, length: u16) -> Result<String> {
        match self.exchange.read_path(length.into()).await {
            Ok(p) => Ok(p),
            Err(e) if e.kind().is_some() => {
                self.exchange
                    .send_header(&H::failure(Status::ErrorProtocol))
                    .await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Refuses the request with the given status
    pub(crate) async fn refuse<H: CommandHandler>(&mut self, status: Status) -> Result<()> {
        self.exchange.send_header(&H::failure(status)).await
    }
}
