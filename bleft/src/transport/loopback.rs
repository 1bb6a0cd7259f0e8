//! In-memory packet transport
// (c) 2026 Ross Younger

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::{PacketTransport, TransportError};

/// Default maximum packet size, in each direction
pub(crate) const DEFAULT_PACKET_LENGTH: usize = 512;

/// One end of an in-memory [`PacketTransport`] link.
///
/// Create a connected pair with [`LoopbackTransport::pair`].
/// Packet sizes and injected empty reads are set per end with the builder methods.
#[derive(Debug)]
pub struct LoopbackTransport {
    tx: UnboundedSender<Bytes>,
    rx: UnboundedReceiver<Bytes>,
    /// A packet which was too big for the last buffer offered
    held: Option<Bytes>,
    outgoing: usize,
    incoming: usize,
    peer_version: u32,
    empty_reads: usize,
    empty_reads_pending: usize,
    sent: Arc<AtomicUsize>,
}

impl LoopbackTransport {
    /// Creates a connected pair. Each end reports `version` as its peer's protocol version.
    #[must_use]
    pub fn pair(version: u32) -> (Self, Self) {
        let (tx_a, rx_b) = unbounded_channel();
        let (tx_b, rx_a) = unbounded_channel();
        (Self::new(tx_a, rx_a, version), Self::new(tx_b, rx_b, version))
    }

    fn new(tx: UnboundedSender<Bytes>, rx: UnboundedReceiver<Bytes>, version: u32) -> Self {
        Self {
            tx,
            rx,
            held: None,
            outgoing: DEFAULT_PACKET_LENGTH,
            incoming: DEFAULT_PACKET_LENGTH,
            peer_version: version,
            empty_reads: 0,
            empty_reads_pending: 0,
            sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets the maximum packet sizes for this end.
    ///
    /// The peer's packets must not exceed `incoming`, so set both ends consistently.
    #[must_use]
    pub fn with_packet_lengths(mut self, outgoing: usize, incoming: usize) -> Self {
        self.outgoing = outgoing;
        self.incoming = incoming;
        self
    }

    /// Makes this end return `count` zero-length reads before every packet it delivers
    #[must_use]
    pub fn with_empty_reads(mut self, count: usize) -> Self {
        self.empty_reads = count;
        self.empty_reads_pending = count;
        self
    }

    /// Overrides the protocol version this end reports for its peer
    #[must_use]
    pub fn with_peer_version(mut self, version: u32) -> Self {
        self.peer_version = version;
        self
    }

    /// How many packets this end has sent so far
    #[must_use]
    pub fn packets_sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }

    /// Returns a handle which reports how many packets this end has sent,
    /// and can be read after the transport has been moved elsewhere.
    #[must_use]
    pub fn sent_counter(&self) -> Arc<AtomicUsize> {
        self.sent.clone()
    }
}

#[async_trait]
impl PacketTransport for LoopbackTransport {
    fn outgoing_packet_length(&self) -> usize {
        self.outgoing
    }

    fn incoming_packet_length(&self) -> usize {
        self.incoming
    }

    async fn write_packet(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        if packet.len() > self.outgoing {
            return Err(TransportError::Oversized {
                packet: packet.len(),
                capacity: self.outgoing,
            });
        }
        self.tx
            .send(Bytes::copy_from_slice(packet))
            .map_err(|_| TransportError::Disconnected)?;
        let _ = self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn read_packet_into(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.empty_reads_pending > 0 {
            self.empty_reads_pending -= 1;
            return Ok(0);
        }
        let packet = match self.held.take() {
            Some(p) => p,
            None => self.rx.recv().await.ok_or(TransportError::Disconnected)?,
        };
        if packet.len() > buf.len() {
            let capacity = buf.len();
            let size = packet.len();
            self.held = Some(packet);
            return Err(TransportError::Oversized {
                packet: size,
                capacity,
            });
        }
        buf[..packet.len()].copy_from_slice(&packet);
        self.empty_reads_pending = self.empty_reads;
        Ok(packet.len())
    }

    async fn read_version(&mut self) -> Result<u32, TransportError> {
        Ok(self.peer_version)
    }
}
