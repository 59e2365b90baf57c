//! One's-complement checksum for sensitive frames.
//!
//! The sum covers a pseudo-header instead of the raw header bytes: the first
//! header word is fixed at [`SEED`] (magic plus the sensitive flag), the
//! length field is added as decoded, and [`CKSM_REPLACEMENT`] stands in for
//! the checksum field. The transmitted checksum bytes are never summed.

use super::FrameHeader;
use crate::byte_order::read_network_u16;

/// Pseudo-header word standing in for the magic byte and the sensitive flag.
pub const SEED: u16 = 0xCC40;

/// Value summed in place of the transmitted checksum field.
pub const CKSM_REPLACEMENT: u16 = 0xCCCC;

const LOW_16: u32 = 0xFFFF;

/// Fold one carry out of bit 16 back into the low word.
fn fold_once(sum: u32) -> u32 {
    if sum > LOW_16 {
        (sum & LOW_16) + 1
    } else {
        sum
    }
}

/// Compute the checksum of a sensitive frame.
///
/// `length` is the decoded length field and `payload` the bytes that follow
/// the header. An odd trailing byte is treated as the high byte of a final
/// word.
///
/// # Examples
///
/// ```
/// use ctmp_relay::frame::checksum::compute;
///
/// assert_eq!(compute(4, &[0x01, 0x02, 0x03, 0x04]), 0x62E8);
/// ```
#[must_use]
pub fn compute(length: u16, payload: &[u8]) -> u16 {
    let mut sum = u32::from(SEED);
    sum = fold_once(sum + u32::from(length));
    sum = fold_once(sum + u32::from(CKSM_REPLACEMENT));

    // A 32-bit accumulator cannot overflow here: at most 32768 words of
    // 0xFFFF are added to a value below 0x10000.
    let mut words = payload.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(read_network_u16([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
    }

    while sum > LOW_16 {
        sum = (sum & LOW_16) + (sum >> 16);
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "carries have been folded, so the sum fits in 16 bits"
    )]
    let folded = sum as u16;
    !folded
}

/// Check the transmitted checksum of `header` against `payload`.
#[must_use]
pub fn verify(header: &FrameHeader, payload: &[u8]) -> bool {
    compute(header.length, payload) == header.checksum
}
