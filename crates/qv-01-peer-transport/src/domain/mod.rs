//! # Domain Layer
//!
//! Pure framing logic for the peer transport. No I/O happens here: the
//! functions build and validate headers, the adapters move the bytes.
//!
//! ## Modules
//!
//! - `frame` - Tag bytes, header encoding, size limits
//! - `errors` - Transport errors and protocol violations

mod errors;
mod frame;

pub use errors::{TransportError, Violation};
pub use frame::{
    message_body_len, message_header, parse_stream_length, stream_header, FrameLimits, FrameTag,
    Rpc, DEFAULT_IO_TIMEOUT, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_STREAM_TIMEOUT, MESSAGE_HEADER_LEN,
    STREAM_HEADER_LEN, TAG_MESSAGE, TAG_STREAM,
};
