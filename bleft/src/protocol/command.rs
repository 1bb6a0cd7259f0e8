//! Command and status codes
// (c) 2026 Ross Younger

use crate::error::{Error, Result};

/// The leading byte of every protocol message.
///
/// Requests from the requester are paired with a fixed response command from the responder.
/// Values are fixed; any change is a breaking protocol change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum_macros::Display, strum_macros::FromRepr)]
#[repr(u8)]
pub enum Command {
    /// Never legitimately sent
    #[default]
    Invalid = 0x00,
    /// Requester asks to read a file (from an offset)
    Read = 0x10,
    /// Responder sends a chunk of file data
    ReadData = 0x11,
    /// Requester acknowledges a chunk and proposes the next chunk size
    ReadPacing = 0x12,
    /// Requester asks to write a file (from an offset)
    Write = 0x20,
    /// Responder announces how much data it can accept next
    WritePacing = 0x21,
    /// Requester sends a chunk of file data
    WriteData = 0x22,
    /// Requester asks to delete a file or empty directory
    Delete = 0x30,
    /// Responder reports the outcome of a delete
    DeleteStatus = 0x31,
    /// Requester asks to create a directory
    Mkdir = 0x40,
    /// Responder reports the outcome of a mkdir
    MkdirStatus = 0x41,
    /// Requester asks for a directory listing
    Listdir = 0x50,
    /// Responder sends one directory entry (or the terminating sentinel)
    ListdirEntry = 0x51,
    /// Requester asks to move (rename) a file or directory
    Move = 0x60,
    /// Responder reports the outcome of a move
    MoveStatus = 0x61,
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match Command::from_repr(value) {
            Some(Command::Invalid) | None => {
                Err(Error::protocol(format!("unknown command byte {value:#04x}")))
            }
            Some(c) => Ok(c),
        }
    }
}

/// Outcome code carried by every response (and by pacing/data messages)
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display, strum_macros::FromRepr)]
#[repr(u8)]
pub enum Status {
    /// Success
    Ok = 0x01,
    /// General failure
    Error = 0x02,
    /// The requested file does not exist
    ErrorNoFile = 0x03,
    /// The peer violated the protocol; the operation is abandoned
    ErrorProtocol = 0x04,
}

impl From<Status> for u8 {
    fn from(value: Status) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Status {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Status::from_repr(value)
            .ok_or_else(|| Error::protocol(format!("unknown status byte {value:#04x}")))
    }
}

/// Directory entry flag: the entry is a directory
pub const FLAG_DIRECTORY: u32 = 0x01;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use super::{Command, Status};
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_bytes() {
        assert_eq!(u8::from(Command::ListdirEntry), 0x51);
        assert_eq!(Command::try_from(0x22).unwrap(), Command::WriteData);
        assert_eq!(Command::Move.to_string(), "Move");
    }

    #[test]
    fn invalid_command_is_rejected() {
        for b in [0x00u8, 0x13, 0xff] {
            let e = Command::try_from(b).unwrap_err();
            assert_eq!(e.kind(), Some(ErrorKind::Protocol));
        }
    }

    #[test]
    fn status_bytes() {
        assert_eq!(Status::try_from(1).unwrap(), Status::Ok);
        assert_eq!(u8::from(Status::ErrorProtocol), 4);
        assert!(Status::try_from(0).is_err());
        assert!(Status::try_from(5).is_err());
    }
}
