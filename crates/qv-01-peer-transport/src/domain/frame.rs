//! Frame tags and header encoding.

use std::time::Duration;

use super::errors::{TransportError, Violation};

/// Tag byte announcing a length-prefixed control message.
pub const TAG_MESSAGE: u8 = 0x01;

/// Tag byte announcing a length-prefixed raw content stream.
pub const TAG_STREAM: u8 = 0x02;

/// Tag byte plus `u32` body length.
pub const MESSAGE_HEADER_LEN: usize = 1 + 4;

/// Tag byte plus `i64` stream length.
pub const STREAM_HEADER_LEN: usize = 1 + 8;

/// Default upper bound for a control message body.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Default window in which an announced stream must be opened, and in which
/// an open stream must make progress.
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time a read or write may stall without moving a byte.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Kind of logical unit that follows a tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameTag {
    /// Control message (encoded envelope).
    Message = TAG_MESSAGE,
    /// Raw content stream.
    Stream = TAG_STREAM,
}

impl TryFrom<u8> for FrameTag {
    type Error = Violation;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            TAG_MESSAGE => Ok(Self::Message),
            TAG_STREAM => Ok(Self::Stream),
            other => Err(Violation::UnexpectedTag(other)),
        }
    }
}

/// Per-connection framing limits.
#[derive(Debug, Clone, Copy)]
pub struct FrameLimits {
    /// Largest accepted control message body.
    pub max_message_size: usize,
    /// Window in which a pending stream must be opened or make progress.
    pub stream_timeout: Duration,
    /// Longest a single read or write inside a unit may stall.
    pub io_timeout: Duration,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// One inbound control message, as delivered on the consume channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rpc {
    /// Remote address of the originating peer.
    pub from: String,
    /// Encoded message body, without the frame header.
    pub payload: Vec<u8>,
}

/// Build the header for a control message of `body_len` bytes.
///
/// # Errors
///
/// Returns `Violation::MessageTooLarge` if the body does not fit the limit.
pub fn message_header(
    body_len: usize,
    max: usize,
) -> Result<[u8; MESSAGE_HEADER_LEN], TransportError> {
    if body_len > max || body_len > u32::MAX as usize {
        return Err(Violation::MessageTooLarge {
            size: body_len,
            max,
        }
        .into());
    }

    let mut header = [0u8; MESSAGE_HEADER_LEN];
    header[0] = TAG_MESSAGE;
    header[1..].copy_from_slice(&(body_len as u32).to_le_bytes());
    Ok(header)
}

/// Validate a received message length header against the limit.
pub fn message_body_len(raw: [u8; 4], max: usize) -> Result<usize, Violation> {
    let size = u32::from_le_bytes(raw) as usize;
    if size > max {
        return Err(Violation::MessageTooLarge { size, max });
    }
    Ok(size)
}

/// Build the header for a stream of `length` bytes.
///
/// Lengths are carried as a signed 64-bit value; anything above `i64::MAX`
/// cannot be represented and saturates, which the receiver will then see as
/// a truncated stream.
pub fn stream_header(length: u64) -> [u8; STREAM_HEADER_LEN] {
    let signed = i64::try_from(length).unwrap_or(i64::MAX);
    let mut header = [0u8; STREAM_HEADER_LEN];
    header[0] = TAG_STREAM;
    header[1..].copy_from_slice(&signed.to_le_bytes());
    header
}

/// Decode a received stream length header.
pub fn parse_stream_length(raw: [u8; 8]) -> Result<u64, Violation> {
    let length = i64::from_le_bytes(raw);
    u64::try_from(length).map_err(|_| Violation::NegativeStreamLength(length))
}
