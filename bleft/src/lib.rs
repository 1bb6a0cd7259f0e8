// (c) 2026 Ross Younger

#![allow(clippy::doc_markdown)]
//! `bleft` is a protocol engine for paced file transfer over narrow packet links,
//! such as a pair of Bluetooth Low Energy characteristics.
//!
//! ## Overview
//!
//! One side (the _requester_) reads, writes, lists, creates, deletes and moves files
//! held by the other side (the _responder_). Both sides speak a compact binary protocol of
//! fixed-layout headers, each optionally followed by a path or a chunk of file data.
//! Messages are split across as many packets as the link needs, and reassembled on receipt.
//!
//! Transfers are paced by the receiver of the data. A reader tells the sender how much it
//! wants next; a writer sends no more than the responder has just granted. Neither side
//! ever has to buffer more than it asked for.
//!
//! ## 🧰 Getting Started
//!
//! * Implement [`PacketTransport`] for your link. [`LoopbackTransport`] is an in-memory one,
//!   useful for testing.
//! * On the requester, [`FileTransferClient::connect`] over the transport and call its methods.
//! * On the responder, construct a [`Responder`] over a [`Store`] and call
//!   [`serve`](Responder::serve). [`MemoryStore`] and [`DirectoryStore`] are provided.
//!
//! ```
//! use bleft::{Configuration, FileTransferClient, LoopbackTransport, MemoryStore, Responder};
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let (near, mut far) = LoopbackTransport::pair(bleft::protocol::OUR_COMPATIBILITY_LEVEL);
//! let mut responder = Responder::new(MemoryStore::new(), Configuration::default());
//! let requester = async move {
//!     let mut client = FileTransferClient::connect(near, Configuration::default()).await?;
//!     let _ = client.write("/hello.txt", b"hello", 0, None).await?;
//!     client.read("/hello.txt", 0).await
//! };
//! let (contents, served) = tokio::join!(requester, responder.serve(&mut far));
//! assert_eq!(contents.unwrap(), b"hello");
//! served.unwrap();
//! # });
//! ```
//!
//! ## 📖 Documentation
//!
//! * [About the protocol](protocol)
//! * [Configuration](config)

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod client;
pub use client::FileTransferClient;

pub mod config;
pub use config::Configuration;

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod protocol;

mod server;
pub use server::Responder;

pub(crate) mod session;

pub mod store;
pub use store::{DirectoryEntry, DirectoryStore, MemoryStore, Store};

pub mod transport;
pub use transport::{LoopbackTransport, PacketTransport, TransportError};

pub mod util;
