//! Path reassembly and the two-path `Move` payload
// (c) 2026 Ross Younger

use bytes::{BufMut as _, BytesMut};

use crate::error::{Error, ErrorKind, Result};

/// Separator between the old and new paths of a `Move` payload
pub const MOVE_SEPARATOR: u8 = b' ';

/// Accumulates a path whose length was declared in a header, from however many
/// packet fragments it arrives in.
#[derive(Debug, Default)]
pub struct PathAssembler {
    declared: usize,
    buf: Vec<u8>,
}

impl PathAssembler {
    /// Starts assembling a path of `declared` bytes
    #[must_use]
    pub fn new(declared: usize) -> Self {
        Self {
            declared,
            buf: Vec::with_capacity(declared),
        }
    }

    /// How many more bytes are needed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.declared - self.buf.len()
    }

    /// Is the path complete?
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Takes as many bytes from `fragment` as the path still needs.
    ///
    /// Returns the number of bytes consumed; anything beyond that belongs to whatever follows the path.
    pub fn push(&mut self, fragment: &[u8]) -> usize {
        let n = fragment.len().min(self.remaining());
        self.buf.extend_from_slice(&fragment[..n]);
        n
    }

    /// Returns the completed path.
    ///
    /// It is a protocol error to call this before the path is complete, or if the path is not valid UTF-8.
    pub fn finish(self) -> Result<String> {
        if !self.is_complete() {
            return Err(Error::protocol(format!(
                "path incomplete ({} of {} bytes)",
                self.buf.len(),
                self.declared
            )));
        }
        String::from_utf8(self.buf).map_err(|e| Error::protocol(format!("path is not UTF-8: {e}")))
    }
}

/// Checks that a path fits in a header length field
pub fn path_length(path: &str) -> Result<u16> {
    u16::try_from(path.len()).map_err(|_| {
        Error::new(
            ErrorKind::InvalidPath,
            format!("path too long ({} bytes)", path.len()),
        )
    })
}

/// Builds the payload of a `Move` request: old path, one space, new path
#[must_use]
pub fn encode_move_payload(old_path: &str, new_path: &str) -> BytesMut {
    let mut buf = BytesMut::with_capacity(old_path.len() + 1 + new_path.len());
    buf.put_slice(old_path.as_bytes());
    buf.put_u8(MOVE_SEPARATOR);
    buf.put_slice(new_path.as_bytes());
    buf
}

/// Splits a complete `Move` payload into its two paths, using the lengths declared in the header
pub fn split_move_payload(
    payload: &[u8],
    old_length: usize,
    new_length: usize,
) -> Result<(String, String)> {
    if payload.len() != old_length + 1 + new_length {
        return Err(Error::protocol(format!(
            "move payload is {} bytes, expected {}",
            payload.len(),
            old_length + 1 + new_length
        )));
    }
    if payload[old_length] != MOVE_SEPARATOR {
        return Err(Error::protocol("move payload has no separator"));
    }
    let to_string = |b: &[u8]| {
        String::from_utf8(b.to_vec())
            .map_err(|e| Error::protocol(format!("path is not UTF-8: {e}")))
    };
    Ok((
        to_string(&payload[..old_length])?,
        to_string(&payload[old_length + 1..])?,
    ))
}
