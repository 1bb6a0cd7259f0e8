// (c) 2026 Ross Younger

//! Packet transport boundary
//!
//! The protocol runs over anything which can send and receive discrete packets of bounded size,
//! in order and reliably. That is described by [`PacketTransport`].
//!
//! [`Exchange`] sits on top of a transport for the duration of one operation. It splits outgoing
//! messages into packets and reassembles incoming messages from however many packets they arrive in.

use async_trait::async_trait;
use bytes::{Buf as _, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{Command, Message, PathAssembler, WireHeader, header::unexpected};

mod loopback;
pub use loopback::LoopbackTransport;

/// Failures reported by a [`PacketTransport`]
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The link has gone away
    #[error("peer disconnected")]
    Disconnected,
    /// The next packet is larger than the buffer offered to receive it.
    ///
    /// The packet remains queued; a subsequent read with a large enough buffer will return it.
    #[error("packet of {packet} bytes does not fit in a {capacity} byte buffer")]
    Oversized {
        /// Size of the waiting packet
        packet: usize,
        /// Size of the buffer that was offered
        capacity: usize,
    },
    /// Any other I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A packet-oriented link to the peer, such as a pair of BLE characteristics.
///
/// Packets are delivered whole, reliably and in order. Each direction has its own maximum packet size.
#[async_trait]
pub trait PacketTransport: Send {
    /// Largest packet we may send
    fn outgoing_packet_length(&self) -> usize;
    /// Largest packet the peer may send us
    fn incoming_packet_length(&self) -> usize;

    /// Sends one packet, which must be no longer than [`outgoing_packet_length`](Self::outgoing_packet_length)
    async fn write_packet(&mut self, packet: &[u8]) -> Result<(), TransportError>;

    /// Receives one packet into `buf`, returning its length.
    ///
    /// A return of zero means nothing was read, and the caller should try again.
    /// If the packet does not fit, returns [`TransportError::Oversized`] and leaves the packet queued.
    async fn read_packet_into(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Reads the protocol version advertised by the peer
    async fn read_version(&mut self) -> Result<u32, TransportError>;
}

/// Message-level I/O over a [`PacketTransport`], for the duration of one operation.
///
/// Received bytes which have not yet been consumed are held in an internal buffer, so a packet
/// may carry the end of one message and the start of the next. Anything left over is discarded
/// when the `Exchange` is dropped.
pub(crate) struct Exchange<'a, T: PacketTransport> {
    transport: &'a mut T,
    inbound: BytesMut,
}

impl<T: PacketTransport> std::fmt::Debug for Exchange<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("inbound", &self.inbound.len())
            .finish_non_exhaustive()
    }
}

impl<'a, T: PacketTransport> Exchange<'a, T> {
    pub(crate) fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            inbound: BytesMut::new(),
        }
    }

    /////////////////////////////////////////////////////////////////////////////////////////
    // SENDING

    /// Sends a complete message, split into as many packets as necessary
    pub(crate) async fn send(&mut self, message: &[u8]) -> Result<()> {
        let max = self.transport.outgoing_packet_length().max(1);
        trace!(
            "send {} bytes ({} packets)",
            message.len(),
            message.len().div_ceil(max)
        );
        for packet in message.chunks(max) {
            self.transport.write_packet(packet).await?;
        }
        Ok(())
    }

    /// Sends a header with no payload
    pub(crate) async fn send_header<H: WireHeader>(&mut self, header: &H) -> Result<()> {
        trace!("send {}", H::COMMAND);
        self.send(&header.encode()).await
    }

    /// Sends a header followed immediately by its payload
    pub(crate) async fn send_with_payload<H: WireHeader>(
        &mut self,
        header: &H,
        payload: &[u8],
    ) -> Result<()> {
        trace!("send {} + {} bytes", H::COMMAND, payload.len());
        let mut buf = header.encode_with_capacity(payload.len());
        buf.extend_from_slice(payload);
        self.send(&buf).await
    }

    /////////////////////////////////////////////////////////////////////////////////////////
    // RECEIVING

    /// Receives one packet onto the end of the inbound buffer.
    ///
    /// `wanted` is the number of bytes the caller expects; a buffer of that size
    /// (capped at the incoming packet length) is provisioned.
    async fn receive_packet(&mut self, wanted: usize) -> Result<()> {
        let max = self.transport.incoming_packet_length().max(1);
        let mut buf = BytesMut::zeroed(wanted.clamp(1, max));
        loop {
            match self.transport.read_packet_into(&mut buf).await {
                Ok(0) => {
                    trace!("empty read, retrying");
                }
                Ok(n) => {
                    self.inbound.extend_from_slice(&buf[..n]);
                    return Ok(());
                }
                Err(TransportError::Oversized { packet, capacity }) if capacity < max => {
                    debug!("{packet} byte packet overflowed {capacity} byte buffer, retrying");
                    buf = BytesMut::zeroed(max);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Ensures at least `count` bytes are buffered
    async fn fill(&mut self, count: usize) -> Result<()> {
        while self.inbound.len() < count {
            self.receive_packet(count - self.inbound.len()).await?;
        }
        Ok(())
    }

    /// Receives the next message header, which must be of type `H`
    pub(crate) async fn receive_header<H: WireHeader>(&mut self) -> Result<H> {
        if self.inbound.is_empty() {
            self.receive_packet(H::SIZE).await?;
        }
        let tag = self.inbound[0];
        if tag != u8::from(H::COMMAND) {
            return Err(unexpected(H::COMMAND, tag));
        }
        self.fill(H::SIZE).await?;
        let header = H::decode(&self.inbound)?;
        self.inbound.advance(H::SIZE);
        trace!("received {}", H::COMMAND);
        Ok(header)
    }

    /// Receives the next message header, whatever it is
    pub(crate) async fn receive_message(&mut self) -> Result<Message> {
        if self.inbound.is_empty() {
            let max = self.transport.incoming_packet_length();
            self.receive_packet(max).await?;
        }
        let command = Command::try_from(self.inbound[0])?;
        let Some(size) = Message::header_size(command) else {
            return Err(Error::protocol("invalid command byte"));
        };
        self.fill(size).await?;
        let message = Message::decode(&self.inbound)?;
        self.inbound.advance(size);
        trace!("received {command}");
        Ok(message)
    }

    /// Receives exactly `count` payload bytes
    pub(crate) async fn take(&mut self, count: usize) -> Result<Bytes> {
        self.fill(count).await?;
        Ok(self.inbound.split_to(count).freeze())
    }

    /// Receives a path of the given declared length
    pub(crate) async fn read_path(&mut self, length: usize) -> Result<String> {
        let mut assembler = PathAssembler::new(length);
        loop {
            let used = assembler.push(&self.inbound);
            self.inbound.advance(used);
            if assembler.is_complete() {
                return assembler.finish();
            }
            self.receive_packet(assembler.remaining()).await?;
        }
    }

    /// Throws away any buffered bytes, returning how many there were
    pub(crate) fn discard(&mut self) -> usize {
        let n = self.inbound.len();
        self.inbound.clear();
        n
    }
}
