//! CTMP frame layout, validation and checksum.
//!
//! A frame is an 8-byte header followed by `length` payload bytes:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 1 | magic (`0xCC`) |
//! | 1 | 1 | flags (`0x40` = sensitive) |
//! | 2 | 2 | payload length, big-endian |
//! | 4 | 2 | checksum, big-endian, sensitive frames only |
//! | 6 | 2 | reserved |
//! | 8 | length | payload |
//!
//! Nothing in this module performs I/O or touches shared state.

pub mod checksum;
pub mod encode;
pub mod header;
pub mod validate;

pub use checksum::{CKSM_REPLACEMENT, SEED};
pub use encode::{EncodeError, encode};
pub use header::FrameHeader;
pub use validate::{Frame, Rejection, validate};

/// Sentinel carried in the first byte of every frame.
pub const MAGIC: u8 = 0xCC;

/// Flag bit marking a frame whose checksum must be verified.
pub const SENSITIVE_FLAG: u8 = 0x40;

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 8;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Largest frame the relay will ever receive in one read.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN;
