//! Fixed-layout message headers
// (c) 2026 Ross Younger
//!
//! Every message begins with a one-byte [`Command`] tag followed by a header whose layout is
//! fixed for that command. All multi-byte integers are little-endian. Padding bytes are sent as
//! zero and ignored on receipt.
//!
//! Any trailing payload (a path, file data, an entry name) follows the header; its length is
//! always given by a header field.

use bytes::{Buf as _, BufMut as _, BytesMut};
use static_assertions::const_assert_eq;

use super::{Command, Status};
use crate::error::{Error, Result};

/// Provides encoding and decoding for the header structs of the protocol.
///
/// Implementors supply the field layout; callers use [`encode`](Self::encode) and
/// [`decode`](Self::decode), which take care of the command tag and length checks.
pub trait WireHeader: Sized {
    /// The command tag that introduces this header
    const COMMAND: Command;
    /// On-wire size of the header, including the command tag
    const SIZE: usize;

    /// Writes the fields that follow the command tag
    fn put_fields(&self, buf: &mut BytesMut);
    /// Reads the fields that follow the command tag.
    /// The slice is exactly `SIZE - 1` bytes long.
    fn get_fields(buf: &mut &[u8]) -> Result<Self>;

    /// Serializes this header into a fresh buffer with room for `payload` more bytes
    fn encode_with_capacity(&self, payload: usize) -> BytesMut {
        let mut buf = BytesMut::with_capacity(Self::SIZE + payload);
        buf.put_u8(Self::COMMAND.into());
        self.put_fields(&mut buf);
        debug_assert_eq!(buf.len(), Self::SIZE);
        buf
    }

    /// Serializes this header
    fn encode(&self) -> BytesMut {
        self.encode_with_capacity(0)
    }

    /// Deserializes this header from the start of `bytes`.
    ///
    /// Anything after the header is ignored. A short buffer or a mismatched command tag
    /// is a protocol error.
    fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(&tag) = bytes.first() else {
            return Err(Error::protocol(format!(
                "expected {}, got an empty message",
                Self::COMMAND
            )));
        };
        if tag != u8::from(Self::COMMAND) {
            return Err(unexpected(Self::COMMAND, tag));
        }
        if bytes.len() < Self::SIZE {
            return Err(Error::protocol(format!(
                "{} header truncated ({} of {} bytes)",
                Self::COMMAND,
                bytes.len(),
                Self::SIZE
            )));
        }
        let mut fields = &bytes[1..Self::SIZE];
        Self::get_fields(&mut fields)
    }
}

/// The error for a message which began with `tag` when `expected` was due
pub(crate) fn unexpected(expected: Command, tag: u8) -> Error {
    let got = Command::from_repr(tag).map_or_else(|| format!("{tag:#04x}"), |c| c.to_string());
    Error::protocol(format!("expected {expected}, got {got}"))
}

fn get_status(buf: &mut &[u8]) -> Result<Status> {
    Status::try_from(buf.get_u8())
}

/////////////////////////////////////////////////////////////////////////////////////////////
// READ

/// `Read` request: pad, path length, offset, proposed chunk size; then the path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadRequest {
    /// Length of the path which follows
    pub path_length: u16,
    /// Byte offset to start reading from
    pub offset: u32,
    /// The requester's proposed first chunk size (advisory)
    pub chunk_size: u32,
}

impl WireHeader for ReadRequest {
    const COMMAND: Command = Command::Read;
    const SIZE: usize = 12;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(0);
        buf.put_u16_le(self.path_length);
        buf.put_u32_le(self.offset);
        buf.put_u32_le(self.chunk_size);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        buf.advance(1);
        Ok(Self {
            path_length: buf.get_u16_le(),
            offset: buf.get_u32_le(),
            chunk_size: buf.get_u32_le(),
        })
    }
}

/// `ReadData` response: status, pad×2, offset, total length, chunk length; then the chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadData {
    /// Outcome
    pub status: Status,
    /// Offset of the first byte of this chunk
    pub offset: u32,
    /// Total length of the file
    pub total_length: u32,
    /// Number of data bytes which follow
    pub chunk_length: u32,
}

impl ReadData {
    /// Constructs a failure response
    #[must_use]
    pub fn failure(status: Status) -> Self {
        Self {
            status,
            offset: 0,
            total_length: 0,
            chunk_length: 0,
        }
    }
}

impl WireHeader for ReadData {
    const COMMAND: Command = Command::ReadData;
    const SIZE: usize = 16;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
        buf.put_bytes(0, 2);
        buf.put_u32_le(self.offset);
        buf.put_u32_le(self.total_length);
        buf.put_u32_le(self.chunk_length);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        let status = get_status(buf)?;
        buf.advance(2);
        Ok(Self {
            status,
            offset: buf.get_u32_le(),
            total_length: buf.get_u32_le(),
            chunk_length: buf.get_u32_le(),
        })
    }
}

/// `ReadPacing`: status, pad×2, offset, next chunk size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadPacing {
    /// Outcome
    pub status: Status,
    /// The offset the requester has reached
    pub offset: u32,
    /// Proposed size of the next chunk
    pub chunk_size: u32,
}

impl WireHeader for ReadPacing {
    const COMMAND: Command = Command::ReadPacing;
    const SIZE: usize = 12;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
        buf.put_bytes(0, 2);
        buf.put_u32_le(self.offset);
        buf.put_u32_le(self.chunk_size);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        let status = get_status(buf)?;
        buf.advance(2);
        Ok(Self {
            status,
            offset: buf.get_u32_le(),
            chunk_size: buf.get_u32_le(),
        })
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////
// WRITE

/// `Write` request: pad, path length, offset, modification time, total length; then the path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteRequest {
    /// Length of the path which follows
    pub path_length: u16,
    /// Byte offset to start writing at
    pub offset: u32,
    /// Modification time to apply, in nanoseconds since the Unix epoch
    pub modification_time: u64,
    /// Length the file will have once the write completes
    pub total_length: u32,
}

impl WireHeader for WriteRequest {
    const COMMAND: Command = Command::Write;
    const SIZE: usize = 20;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(0);
        buf.put_u16_le(self.path_length);
        buf.put_u32_le(self.offset);
        buf.put_u64_le(self.modification_time);
        buf.put_u32_le(self.total_length);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        buf.advance(1);
        Ok(Self {
            path_length: buf.get_u16_le(),
            offset: buf.get_u32_le(),
            modification_time: buf.get_u64_le(),
            total_length: buf.get_u32_le(),
        })
    }
}

/// `WritePacing`: status, pad×2, offset, modification time, free space
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WritePacing {
    /// Outcome
    pub status: Status,
    /// The offset the responder expects next
    pub offset: u32,
    /// On the final message of a write, the modification time actually stored.
    /// Zero on intermediate messages.
    pub modification_time: u64,
    /// How many bytes the requester may send next. Zero on the final message.
    pub free_space: u32,
}

impl WritePacing {
    /// Constructs a failure response
    #[must_use]
    pub fn failure(status: Status) -> Self {
        Self {
            status,
            offset: 0,
            modification_time: 0,
            free_space: 0,
        }
    }
}

impl WireHeader for WritePacing {
    const COMMAND: Command = Command::WritePacing;
    const SIZE: usize = 20;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
        buf.put_bytes(0, 2);
        buf.put_u32_le(self.offset);
        buf.put_u64_le(self.modification_time);
        buf.put_u32_le(self.free_space);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        let status = get_status(buf)?;
        buf.advance(2);
        Ok(Self {
            status,
            offset: buf.get_u32_le(),
            modification_time: buf.get_u64_le(),
            free_space: buf.get_u32_le(),
        })
    }
}

/// `WriteData`: status, pad×2, offset, data length; then the data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteData {
    /// Outcome. Anything other than `Ok` aborts the write.
    pub status: Status,
    /// Offset of the first byte of this chunk
    pub offset: u32,
    /// Number of data bytes which follow
    pub free_space: u32,
}

impl WireHeader for WriteData {
    const COMMAND: Command = Command::WriteData;
    const SIZE: usize = 12;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
        buf.put_bytes(0, 2);
        buf.put_u32_le(self.offset);
        buf.put_u32_le(self.free_space);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        let status = get_status(buf)?;
        buf.advance(2);
        Ok(Self {
            status,
            offset: buf.get_u32_le(),
            free_space: buf.get_u32_le(),
        })
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////
// MKDIR

/// `Mkdir` request: pad, path length, pad×4, modification time; then the path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MkdirRequest {
    /// Length of the path which follows
    pub path_length: u16,
    /// Modification time to apply, in nanoseconds since the Unix epoch
    pub modification_time: u64,
}

impl WireHeader for MkdirRequest {
    const COMMAND: Command = Command::Mkdir;
    const SIZE: usize = 16;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(0);
        buf.put_u16_le(self.path_length);
        buf.put_bytes(0, 4);
        buf.put_u64_le(self.modification_time);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        buf.advance(1);
        let path_length = buf.get_u16_le();
        buf.advance(4);
        Ok(Self {
            path_length,
            modification_time: buf.get_u64_le(),
        })
    }
}

/// `MkdirStatus`: status, pad×6, modification time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MkdirStatus {
    /// Outcome
    pub status: Status,
    /// The modification time the responder stored
    pub modification_time: u64,
}

impl WireHeader for MkdirStatus {
    const COMMAND: Command = Command::MkdirStatus;
    const SIZE: usize = 16;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
        buf.put_bytes(0, 6);
        buf.put_u64_le(self.modification_time);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        let status = get_status(buf)?;
        buf.advance(6);
        Ok(Self {
            status,
            modification_time: buf.get_u64_le(),
        })
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////
// DELETE, LISTDIR, MOVE

/// `Delete` request: pad, path length; then the path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Length of the path which follows
    pub path_length: u16,
}

impl WireHeader for DeleteRequest {
    const COMMAND: Command = Command::Delete;
    const SIZE: usize = 4;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(0);
        buf.put_u16_le(self.path_length);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        buf.advance(1);
        Ok(Self {
            path_length: buf.get_u16_le(),
        })
    }
}

/// `DeleteStatus`: status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteStatus {
    /// Outcome
    pub status: Status,
}

impl WireHeader for DeleteStatus {
    const COMMAND: Command = Command::DeleteStatus;
    const SIZE: usize = 2;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        Ok(Self {
            status: get_status(buf)?,
        })
    }
}

/// `Listdir` request: pad, path length; then the path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListdirRequest {
    /// Length of the path which follows
    pub path_length: u16,
}

impl WireHeader for ListdirRequest {
    const COMMAND: Command = Command::Listdir;
    const SIZE: usize = 4;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(0);
        buf.put_u16_le(self.path_length);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        buf.advance(1);
        Ok(Self {
            path_length: buf.get_u16_le(),
        })
    }
}

/// `ListdirEntry`: status, name length, index, total, flags, modification time, size; then the name
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListdirEntry {
    /// Outcome
    pub status: Status,
    /// Length of the entry name which follows
    pub path_length: u16,
    /// Position of this entry in the listing. Equal to `total` for the terminating sentinel.
    pub index: u32,
    /// Number of entries in the listing
    pub total: u32,
    /// Flag bits; see [`FLAG_DIRECTORY`](super::FLAG_DIRECTORY)
    pub flags: u32,
    /// Modification time, in nanoseconds since the Unix epoch
    pub modification_time: u64,
    /// File size in bytes (zero for directories)
    pub file_size: u32,
}

impl ListdirEntry {
    /// Constructs the sentinel which terminates a listing of `total` entries
    #[must_use]
    pub fn sentinel(total: u32) -> Self {
        Self {
            status: Status::Ok,
            path_length: 0,
            index: total,
            total,
            flags: 0,
            modification_time: 0,
            file_size: 0,
        }
    }

    /// Constructs a failure response
    #[must_use]
    pub fn failure(status: Status) -> Self {
        Self {
            status,
            ..Self::sentinel(0)
        }
    }

    /// Is this the terminating sentinel?
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.index >= self.total
    }
}

impl WireHeader for ListdirEntry {
    const COMMAND: Command = Command::ListdirEntry;
    const SIZE: usize = 28;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
        buf.put_u16_le(self.path_length);
        buf.put_u32_le(self.index);
        buf.put_u32_le(self.total);
        buf.put_u32_le(self.flags);
        buf.put_u64_le(self.modification_time);
        buf.put_u32_le(self.file_size);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        Ok(Self {
            status: get_status(buf)?,
            path_length: buf.get_u16_le(),
            index: buf.get_u32_le(),
            total: buf.get_u32_le(),
            flags: buf.get_u32_le(),
            modification_time: buf.get_u64_le(),
            file_size: buf.get_u32_le(),
        })
    }
}

/// `Move` request: pad, old path length, new path length; then `old path`, a space, `new path`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveRequest {
    /// Length of the existing path
    pub old_path_length: u16,
    /// Length of the new path
    pub new_path_length: u16,
}

impl WireHeader for MoveRequest {
    const COMMAND: Command = Command::Move;
    const SIZE: usize = 6;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(0);
        buf.put_u16_le(self.old_path_length);
        buf.put_u16_le(self.new_path_length);
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        buf.advance(1);
        Ok(Self {
            old_path_length: buf.get_u16_le(),
            new_path_length: buf.get_u16_le(),
        })
    }
}

/// `MoveStatus`: status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveStatus {
    /// Outcome
    pub status: Status,
}

impl WireHeader for MoveStatus {
    const COMMAND: Command = Command::MoveStatus;
    const SIZE: usize = 2;

    fn put_fields(&self, buf: &mut BytesMut) {
        buf.put_u8(self.status.into());
    }

    fn get_fields(buf: &mut &[u8]) -> Result<Self> {
        Ok(Self {
            status: get_status(buf)?,
        })
    }
}

// Changing any of these is a breaking protocol change.
const_assert_eq!(<ReadData as WireHeader>::SIZE, 16);
const_assert_eq!(<WriteRequest as WireHeader>::SIZE, 20);
const_assert_eq!(<WritePacing as WireHeader>::SIZE, 20);
const_assert_eq!(<ListdirEntry as WireHeader>::SIZE, 28);

/////////////////////////////////////////////////////////////////////////////////////////////
// MESSAGE

/// Any protocol message header, tagged by its command.
///
/// This is used where the receiver cannot know in advance which message comes next
/// (for example, a responder waiting for a request). Trailing payloads are not included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[allow(missing_docs)]
pub enum Message {
    Read(ReadRequest),
    ReadData(ReadData),
    ReadPacing(ReadPacing),
    Write(WriteRequest),
    WritePacing(WritePacing),
    WriteData(WriteData),
    Delete(DeleteRequest),
    DeleteStatus(DeleteStatus),
    Mkdir(MkdirRequest),
    MkdirStatus(MkdirStatus),
    Listdir(ListdirRequest),
    ListdirEntry(ListdirEntry),
    Move(MoveRequest),
    MoveStatus(MoveStatus),
}

impl Message {
    /// The on-wire header size for a given command, or `None` for [`Command::Invalid`]
    #[must_use]
    pub fn header_size(command: Command) -> Option<usize> {
        Some(match command {
            Command::Invalid => return None,
            Command::Read => ReadRequest::SIZE,
            Command::ReadData => ReadData::SIZE,
            Command::ReadPacing => ReadPacing::SIZE,
            Command::Write => WriteRequest::SIZE,
            Command::WritePacing => WritePacing::SIZE,
            Command::WriteData => WriteData::SIZE,
            Command::Delete => DeleteRequest::SIZE,
            Command::DeleteStatus => DeleteStatus::SIZE,
            Command::Mkdir => MkdirRequest::SIZE,
            Command::MkdirStatus => MkdirStatus::SIZE,
            Command::Listdir => ListdirRequest::SIZE,
            Command::ListdirEntry => ListdirEntry::SIZE,
            Command::Move => MoveRequest::SIZE,
            Command::MoveStatus => MoveStatus::SIZE,
        })
    }

    /// Decodes whichever header starts `bytes`, dispatching on the command tag.
    /// Unknown tags are a protocol error.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let tag = *bytes
            .first()
            .ok_or_else(|| Error::protocol("empty message"))?;
        Ok(match Command::try_from(tag)? {
            Command::Invalid => return Err(Error::protocol("invalid command byte")),
            Command::Read => Message::Read(ReadRequest::decode(bytes)?),
            Command::ReadData => Message::ReadData(ReadData::decode(bytes)?),
            Command::ReadPacing => Message::ReadPacing(ReadPacing::decode(bytes)?),
            Command::Write => Message::Write(WriteRequest::decode(bytes)?),
            Command::WritePacing => Message::WritePacing(WritePacing::decode(bytes)?),
            Command::WriteData => Message::WriteData(WriteData::decode(bytes)?),
            Command::Delete => Message::Delete(DeleteRequest::decode(bytes)?),
            Command::DeleteStatus => Message::DeleteStatus(DeleteStatus::decode(bytes)?),
            Command::Mkdir => Message::Mkdir(MkdirRequest::decode(bytes)?),
            Command::MkdirStatus => Message::MkdirStatus(MkdirStatus::decode(bytes)?),
            Command::Listdir => Message::Listdir(ListdirRequest::decode(bytes)?),
            Command::ListdirEntry => Message::ListdirEntry(ListdirEntry::decode(bytes)?),
            Command::Move => Message::Move(MoveRequest::decode(bytes)?),
            Command::MoveStatus => Message::MoveStatus(MoveStatus::decode(bytes)?),
        })
    }

    /// The command tag of this message
    #[must_use]
    pub fn command(&self) -> Command {
        match self {
            Message::Read(_) => Command::Read,
            Message::ReadData(_) => Command::ReadData,
            Message::ReadPacing(_) => Command::ReadPacing,
            Message::Write(_) => Command::Write,
            Message::WritePacing(_) => Command::WritePacing,
            Message::WriteData(_) => Command::WriteData,
            Message::Delete(_) => Command::Delete,
            Message::DeleteStatus(_) => Command::DeleteStatus,
            Message::Mkdir(_) => Command::Mkdir,
            Message::MkdirStatus(_) => Command::MkdirStatus,
            Message::Listdir(_) => Command::Listdir,
            Message::ListdirEntry(_) => Command::ListdirEntry,
            Message::Move(_) => Command::Move,
            Message::MoveStatus(_) => Command::MoveStatus,
        }
    }

    /// Serializes the header of this message
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        match self {
            Message::Read(h) => h.encode(),
            Message::ReadData(h) => h.encode(),
            Message::ReadPacing(h) => h.encode(),
            Message::Write(h) => h.encode(),
            Message::WritePacing(h) => h.encode(),
            Message::WriteData(h) => h.encode(),
            Message::Delete(h) => h.encode(),
            Message::DeleteStatus(h) => h.encode(),
            Message::Mkdir(h) => h.encode(),
            Message::MkdirStatus(h) => h.encode(),
            Message::Listdir(h) => h.encode(),
            Message::ListdirEntry(h) => h.encode(),
            Message::Move(h) => h.encode(),
            Message::MoveStatus(h) => h.encode(),
        }
    }
}
