//! Frame construction for producers.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::{FrameHeader, HEADER_LEN, MAGIC, MAX_PAYLOAD_LEN, checksum};

/// Errors raised while building a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// The payload does not fit the 16-bit length field.
    #[error("payload of {len} bytes exceeds the {MAX_PAYLOAD_LEN}-byte limit")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
    },
}

/// Build a frame carrying `payload` with the given `flags`.
///
/// When `flags` has the sensitive bit set the checksum is computed and
/// embedded; otherwise the checksum field is zero. Reserved bytes are zero.
///
/// # Errors
///
/// Returns [`EncodeError::PayloadTooLarge`] if `payload` is longer than
/// [`MAX_PAYLOAD_LEN`].
///
/// # Examples
///
/// ```
/// use ctmp_relay::frame::{SENSITIVE_FLAG, encode, validate};
///
/// let frame = encode(SENSITIVE_FLAG, b"ping").expect("payload fits");
/// assert!(validate(&frame).is_ok());
/// ```
pub fn encode(flags: u8, payload: &[u8]) -> Result<Bytes, EncodeError> {
    let length = u16::try_from(payload.len())
        .map_err(|_| EncodeError::PayloadTooLarge { len: payload.len() })?;
    let mut header = FrameHeader {
        flags,
        length,
        checksum: 0,
        reserved: [0, 0],
    };
    if header.is_sensitive() {
        header.checksum = checksum::compute(length, payload);
    }

    let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
    out.put_slice(&header.to_bytes(MAGIC));
    out.put_slice(payload);
    Ok(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SENSITIVE_FLAG;

    #[test]
    fn plain_frame_has_zero_checksum() {
        let frame = encode(0, &[1, 2, 3, 4]).expect("encode");
        assert_eq!(&frame[..], &[0xCC, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 1, 2, 3, 4]);
    }

    #[test]
    fn sensitive_frame_embeds_checksum() {
        let frame = encode(SENSITIVE_FLAG, &[1, 2, 3, 4]).expect("encode");
        assert_eq!(&frame[4..6], &[0x62, 0xE8]);
    }

    #[test]
    fn oversized_payload_is_refused() {
        let payload = vec![0; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            encode(0, &payload),
            Err(EncodeError::PayloadTooLarge {
                len: MAX_PAYLOAD_LEN + 1
            })
        );
    }
}
