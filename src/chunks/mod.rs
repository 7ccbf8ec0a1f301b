//! Chunk decoding for the two on-disk domains
//!
//! Mesh and skeleton files are separate top-level formats with their own
//! chunk-id spaces; they only meet through the mesh's optional skeleton
//! file reference, which the caller resolves. Each domain gets its own
//! closed chunk enum and reader ([`mesh`], [`skeleton`]).
//!
//! A chunk header is a `u16` id followed by a `u32` total length that
//! includes the header itself. The file-header chunk is the one exception:
//! it carries no length field at all.

use crate::error::LoadError;
use crate::stream::DataStream;

pub mod mesh;
pub mod skeleton;

/// Encoded size of a regular chunk header (`u16` id + `u32` length).
pub const CHUNK_HEADER_SIZE: u32 = 6;

/// Read the next chunk id without consuming it.
///
/// Implemented as read-then-rewind; the id is always the first two bytes
/// of a chunk regardless of domain.
pub fn peek_id(cursor: &mut DataStream) -> Result<u16, LoadError> {
    let id = cursor.read_u16()?;
    cursor.rewind(2);
    Ok(id)
}

/// Read a chunk's declared length and convert it to a body length.
///
/// Fails when the declared length cannot even cover its own header, which
/// only happens on corrupt input.
pub(crate) fn read_body_len(cursor: &mut DataStream) -> Result<u32, LoadError> {
    let total = cursor.read_u32()?;
    total
        .checked_sub(CHUNK_HEADER_SIZE)
        .ok_or(LoadError::InsufficientData("chunk length smaller than its header"))
}

/// Whether a chunk body still has unread bytes.
///
/// The wire format infers optional trailing fields (bone scale, keyframe
/// scale) purely from the declared body length; every call site of that
/// rule goes through here. `body_start` is the cursor position right after
/// the chunk header.
pub(crate) fn body_has_remaining(cursor: &DataStream, body_start: usize, body_len: u32) -> bool {
    cursor.position() - body_start < body_len as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_does_not_consume() {
        let data = [0x00, 0x30, 0xFF];
        let mut s = DataStream::new(&data);
        assert_eq!(peek_id(&mut s).unwrap(), 0x3000);
        assert_eq!(peek_id(&mut s).unwrap(), 0x3000);
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn test_peek_truncated() {
        let mut s = DataStream::new(&[0x42]);
        assert!(matches!(
            peek_id(&mut s),
            Err(LoadError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_body_len_underflow() {
        let data = 4u32.to_le_bytes();
        let mut s = DataStream::new(&data);
        assert!(matches!(
            read_body_len(&mut s),
            Err(LoadError::InsufficientData(_))
        ));
    }
}
