// (c) 2026 Ross Younger

//! 📖 The file transfer protocol
//!
//! ## Overview
//!
//! Two peers share a narrow, packet-oriented link which delivers whole packets, in order,
//! each no longer than a maximum size fixed for each direction (typically a BLE characteristic).
//! The **requester** issues file operations; the **responder** owns the filesystem-like store
//! and serves them.
//!
//! Every message begins with a one-byte [`Command`] tag and a fixed-layout header
//! (see [`header`]). Some messages carry a trailing payload whose length is always declared
//! in the header, never inferred from packet boundaries. A message longer than the link's
//! maximum packet size is sent as several successive packets; the receiver keeps reading
//! until it has the declared number of bytes.
//!
//! Only one operation is in flight on a connection at a time.
//!
//! ## Operations
//!
//! | Request | Response(s) |
//! |---|---|
//! | `Read` + path | `ReadData` + chunk, then (`ReadPacing`, `ReadData` + chunk)* |
//! | `Write` + path | `WritePacing`, then (`WriteData` + chunk, `WritePacing`)* |
//! | `Mkdir` + path | `MkdirStatus` |
//! | `Delete` + path | `DeleteStatus` |
//! | `Listdir` + path | (`ListdirEntry` + name)*, then a sentinel `ListdirEntry` |
//! | `Move` + old path + space + new path | `MoveStatus` |
//!
//! ### Reading
//!
//! The requester proposes a chunk size; the responder decides how many bytes to send each round.
//! After each chunk the requester acknowledges the offset it has reached and proposes the next
//! chunk size, until the whole file (from the requested offset) has been sent.
//!
//! ### Writing
//!
//! The requester declares the total length the file will have and the offset it is writing from.
//! The responder grants a number of bytes (`free_space`) each round and the requester sends exactly
//! that many. When everything has arrived the responder commits the file and sends a final
//! `WritePacing` at the total length, with zero free space and the modification time it stored.
//!
//! Either side may abandon a write by sending a non-`Ok` status. The responder commits nothing
//! unless the write completes.
//!
//! ### Listing
//!
//! The responder sends one `ListdirEntry` per child of the directory, each with an index and the
//! total count, followed by a sentinel entry whose index equals the total and which carries no name.
//!
//! ## Versions
//!
//! The transport reports the peer's protocol version when the connection is set up.
//! Version 3 introduced the current header set (with 64-bit modification times in nanoseconds
//! since the Unix epoch); older peers are not supported. `Move` requires version 4.
//! See [`Feature`].

mod command;
pub use command::{Command, FLAG_DIRECTORY, Status};

pub mod compat;
pub use compat::{Compatibility, Feature, OUR_COMPATIBILITY_LEVEL};

pub mod header;
pub use header::{Message, WireHeader};

pub mod path;
pub use path::PathAssembler;
