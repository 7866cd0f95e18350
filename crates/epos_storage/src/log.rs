//! Frame format of the durable record log.
//!
//! ```text
//! | len (4) | kind (1) | name_len (2) | name (N) | id (8) | header_crc (4) | payload (M) | payload_crc (4) |
//! ```
//!
//! All integers are little-endian. `len` counts the whole frame. The header
//! checksum covers `len` through `id`, so a frame whose header verifies has a
//! trustworthy length and key even when its payload is damaged. The payload
//! checksum covers the payload alone.

use crate::error::{StorageError, StorageResult};

/// Frame bytes that do not depend on the name or payload.
pub(crate) const FRAME_OVERHEAD: usize = 4 + 1 + 2 + 8 + 4 + 4;

/// Longest collection name a frame can carry.
pub(crate) const MAX_NAME_LEN: usize = u16::MAX as usize;

/// Bytes before the name: `len`, `kind` and `name_len`.
const PREFIX_LEN: usize = 4 + 1 + 2;

/// What a frame records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    /// A record was stored.
    Put = 1,
    /// A record was removed.
    Delete = 2,
    /// The collection's high-water mark is at least `id`.
    Watermark = 3,
}

impl FrameKind {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Delete),
            3 => Some(Self::Watermark),
            _ => None,
        }
    }
}

/// A decoded frame borrowing from the log buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame<'a> {
    pub kind: FrameKind,
    pub collection: &'a str,
    pub id: u64,
    pub payload: &'a [u8],
}

/// Outcome of reading one frame from the front of a buffer.
#[derive(Debug)]
pub(crate) enum ReadFrame<'a> {
    /// A fully verified frame and its total length.
    Complete(Frame<'a>, usize),
    /// The header verified but the payload failed its checksum.
    ///
    /// The frame's length, kind, collection and id can be trusted.
    DamagedPayload {
        frame: Frame<'a>,
        len: usize,
        stored: u32,
        computed: u32,
    },
    /// A verified header describes a frame that runs past the end of the
    /// buffer.
    Truncated,
    /// The header is cut short or fails its checksum. Nothing in it,
    /// including its length, can be trusted.
    BadHeader,
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

/// Encodes a frame.
pub(crate) fn encode_frame(
    kind: FrameKind,
    collection: &str,
    id: u64,
    payload: &[u8],
) -> StorageResult<Vec<u8>> {
    let name = collection.as_bytes();
    let name_len = u16::try_from(name.len()).map_err(|_| StorageError::NameTooLong {
        len: name.len(),
        max: MAX_NAME_LEN,
    })?;
    let total = FRAME_OVERHEAD + name.len() + payload.len();
    let total_u32 = u32::try_from(total).map_err(|_| {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("record of {} bytes is too large for a log frame", payload.len()),
        ))
    })?;

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&total_u32.to_le_bytes());
    buf.push(kind as u8);
    buf.extend_from_slice(&name_len.to_le_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(&id.to_le_bytes());
    let header_crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&header_crc.to_le_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    Ok(buf)
}

/// Reads the frame at the front of `data`.
///
/// `offset` is the position of `data` in the log and is only used for
/// error reporting.
///
/// # Errors
///
/// A frame whose header verifies but describes an impossible layout is
/// corruption. Damage the header checksum cannot vouch for is reported as
/// [`ReadFrame::BadHeader`] so the caller can decide whether it is a torn
/// tail.
pub(crate) fn read_frame(data: &[u8], offset: u64) -> StorageResult<ReadFrame<'_>> {
    if data.len() < PREFIX_LEN {
        return Ok(ReadFrame::BadHeader);
    }
    let name_len = u16::from_le_bytes([data[5], data[6]]) as usize;
    let name_end = PREFIX_LEN + name_len;
    let id_end = name_end + 8;
    let header_end = id_end + 4;
    let Some(header) = data.get(..header_end) else {
        return Ok(ReadFrame::BadHeader);
    };
    if le_u32(&header[id_end..]) != crc32fast::hash(&header[..id_end]) {
        return Ok(ReadFrame::BadHeader);
    }

    let len = le_u32(header) as usize;
    if len < header_end + 4 {
        return Err(StorageError::corrupted(
            offset,
            format!("frame length {len} is shorter than its header"),
        ));
    }
    let kind = FrameKind::from_byte(header[4])
        .ok_or_else(|| StorageError::corrupted(offset, format!("unknown frame kind {}", header[4])))?;
    let collection = std::str::from_utf8(&header[PREFIX_LEN..name_end])
        .map_err(|_| StorageError::corrupted(offset, "collection name is not UTF-8"))?;
    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&header[name_end..id_end]);

    let Some(frame_bytes) = data.get(..len) else {
        return Ok(ReadFrame::Truncated);
    };
    let payload = &frame_bytes[header_end..len - 4];
    let frame = Frame {
        kind,
        collection,
        id: u64::from_le_bytes(id_bytes),
        payload,
    };

    let stored = le_u32(&frame_bytes[len - 4..]);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Ok(ReadFrame::DamagedPayload {
            frame,
            len,
            stored,
            computed,
        });
    }
    Ok(ReadFrame::Complete(frame, len))
}

/// Finds the first offset after `pos` where an intact frame header starts.
///
/// Used to tell a torn tail, which nothing follows, from a damaged frame in
/// the middle of the log.
pub(crate) fn next_frame_after(data: &[u8], pos: usize) -> Option<usize> {
    (pos + 1..data.len()).find(|&at| {
        matches!(
            read_frame(&data[at..], at as u64),
            Ok(ReadFrame::Complete(..) | ReadFrame::DamagedPayload { .. })
        )
    })
}
