//! Accept/reject decision for a received buffer.

use thiserror::Error;

use super::{FrameHeader, HEADER_LEN, MAGIC, checksum};

/// Reason a buffer was not accepted as a frame.
///
/// Rejections are per-frame drops, not connection errors: the sender gets no
/// negative acknowledgement and the connection keeps being serviced.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    /// The buffer cannot hold a header.
    #[error("buffer of {len} bytes is shorter than the {HEADER_LEN}-byte header")]
    TooShort {
        /// Bytes received.
        len: usize,
    },
    /// The first byte is not the frame sentinel.
    #[error("bad magic byte {found:#04x}")]
    BadMagic {
        /// Byte found at offset 0.
        found: u8,
    },
    /// The length field disagrees with the bytes received.
    #[error("declared payload length {declared} but received {actual} payload bytes")]
    LengthMismatch {
        /// Value of the length field.
        declared: u16,
        /// Bytes received after the header.
        actual: usize,
    },
    /// A sensitive frame failed checksum verification.
    #[error("checksum mismatch: transmitted {transmitted:#06x}, computed {computed:#06x}")]
    ChecksumMismatch {
        /// Checksum carried in the header.
        transmitted: u16,
        /// Checksum computed over the received payload.
        computed: u16,
    },
}

impl Rejection {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "too_short",
            Self::BadMagic { .. } => "bad_magic",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
        }
    }
}

/// A buffer that passed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    header: FrameHeader,
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Decoded header.
    #[must_use]
    pub const fn header(&self) -> &FrameHeader { &self.header }

    /// The complete frame, header included, exactly as received.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] { self.bytes }

    /// Payload bytes following the header.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] { self.bytes.get(HEADER_LEN..).unwrap_or_default() }
}

/// Decide whether `buf` is a well-formed frame.
///
/// Checks run in order and stop at the first failure: header size, magic,
/// length cross-check, then the checksum for sensitive frames. `buf` is never
/// modified.
///
/// # Errors
///
/// Returns the [`Rejection`] describing the first failed check.
///
/// # Examples
///
/// ```
/// use ctmp_relay::frame::{Rejection, validate};
///
/// let frame = [0xCC, 0x00, 0x00, 0x02, 0xFF, 0xFF, 0x00, 0x00, 0xDE, 0xAD];
/// assert!(validate(&frame).is_ok());
/// assert_eq!(
///     validate(&frame[..9]),
///     Err(Rejection::LengthMismatch { declared: 2, actual: 1 })
/// );
/// ```
pub fn validate(buf: &[u8]) -> Result<Frame<'_>, Rejection> {
    let too_short = Rejection::TooShort { len: buf.len() };
    let (head, payload) = buf.split_at_checked(HEADER_LEN).ok_or(too_short)?;
    match head.first() {
        Some(&MAGIC) => {}
        Some(&found) => return Err(Rejection::BadMagic { found }),
        None => return Err(too_short),
    }
    let header = FrameHeader::parse(head).ok_or(too_short)?;

    if usize::from(header.length) != payload.len() {
        return Err(Rejection::LengthMismatch {
            declared: header.length,
            actual: payload.len(),
        });
    }

    if header.is_sensitive() {
        let computed = checksum::compute(header.length, payload);
        if computed != header.checksum {
            return Err(Rejection::ChecksumMismatch {
                transmitted: header.checksum,
                computed,
            });
        }
    }

    Ok(Frame { header, bytes: buf })
}
