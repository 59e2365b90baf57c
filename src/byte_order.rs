//! Helpers for explicit network byte-order conversions.
//!
//! CTMP header fields are big-endian on the wire. These helpers keep the
//! Clippy expectations scoped to the conversion points and give header
//! parsing a bounds-checked way to pull a field out of a buffer.

/// Serialise a `u16` in network byte order (big-endian).
///
/// # Examples
///
/// ```
/// use ctmp_relay::byte_order::write_network_u16;
///
/// assert_eq!(write_network_u16(0x0004), [0x00, 0x04]);
/// ```
#[must_use]
pub fn write_network_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Parse a network-order `u16` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use ctmp_relay::byte_order::read_network_u16;
///
/// assert_eq!(read_network_u16([0xCC, 0x40]), 0xCC40);
/// ```
#[must_use]
pub fn read_network_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u16::from_be_bytes(bytes)
}

/// Read the network-order `u16` starting at `offset`.
///
/// Returns `None` when `buf` does not hold two bytes at `offset`.
///
/// # Examples
///
/// ```
/// use ctmp_relay::byte_order::read_network_u16_at;
///
/// let header = [0xCC, 0x00, 0x00, 0x04];
/// assert_eq!(read_network_u16_at(&header, 2), Some(4));
/// assert_eq!(read_network_u16_at(&header, 3), None);
/// ```
#[must_use]
pub fn read_network_u16_at(buf: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let field: [u8; 2] = buf.get(offset..end)?.try_into().ok()?;
    Some(read_network_u16(field))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{read_network_u16, read_network_u16_at, write_network_u16};

    #[test]
    fn u16_uses_big_endian_layout() {
        assert_eq!(write_network_u16(0x1234), [0x12, 0x34]);
        assert_eq!(read_network_u16([0x12, 0x34]), 0x1234);
    }

    #[rstest]
    #[case::start(&[0xAB, 0xCD, 0x00][..], 0, Some(0xABCD))]
    #[case::tail(&[0x00, 0xAB, 0xCD][..], 1, Some(0xABCD))]
    #[case::past_end(&[0x00, 0xAB][..], 1, None)]
    #[case::empty(&[][..], 0, None)]
    #[case::overflowing_offset(&[0x00, 0xAB][..], usize::MAX, None)]
    fn reads_are_bounds_checked(
        #[case] buf: &[u8],
        #[case] offset: usize,
        #[case] expected: Option<u16>,
    ) {
        assert_eq!(read_network_u16_at(buf, offset), expected);
    }
}
