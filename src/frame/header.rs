//! Fixed-size CTMP frame header.

use super::{HEADER_LEN, SENSITIVE_FLAG};
use crate::byte_order::{read_network_u16_at, write_network_u16};

const MAGIC_OFFSET: usize = 0;
const FLAGS_OFFSET: usize = 1;
const LENGTH_OFFSET: usize = 2;
const CHECKSUM_OFFSET: usize = 4;
const RESERVED_OFFSET: usize = 6;

/// Decoded header fields of a CTMP frame.
///
/// The magic byte is not stored: a header is only ever produced for buffers
/// whose magic has already been checked or is being written by [`encode`].
///
/// [`encode`]: super::encode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw flag bits.
    pub flags: u8,
    /// Declared payload length.
    pub length: u16,
    /// Transmitted checksum. Only meaningful when [`Self::is_sensitive`].
    pub checksum: u16,
    /// Reserved bytes, carried verbatim.
    pub reserved: [u8; 2],
}

impl FrameHeader {
    /// Parse the header fields from the front of `buf`.
    ///
    /// Returns `None` when `buf` is shorter than [`HEADER_LEN`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ctmp_relay::frame::FrameHeader;
    ///
    /// let header = FrameHeader::parse(&[0xCC, 0x40, 0x00, 0x04, 0x12, 0x34, 0, 0])
    ///     .expect("eight bytes form a header");
    /// assert!(header.is_sensitive());
    /// assert_eq!(header.length, 4);
    /// assert_eq!(header.checksum, 0x1234);
    /// ```
    #[must_use]
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let flags = *buf.get(FLAGS_OFFSET)?;
        let length = read_network_u16_at(buf, LENGTH_OFFSET)?;
        let checksum = read_network_u16_at(buf, CHECKSUM_OFFSET)?;
        let reserved = buf
            .get(RESERVED_OFFSET..HEADER_LEN)?
            .try_into()
            .ok()?;
        Some(Self {
            flags,
            length,
            checksum,
            reserved,
        })
    }

    /// Whether the sensitive flag requests checksum verification.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool { self.flags & SENSITIVE_FLAG != 0 }

    /// Serialise the header, prefixed with `magic`.
    #[must_use]
    pub fn to_bytes(&self, magic: u8) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[MAGIC_OFFSET] = magic;
        out[FLAGS_OFFSET] = self.flags;
        out[LENGTH_OFFSET..CHECKSUM_OFFSET].copy_from_slice(&write_network_u16(self.length));
        out[CHECKSUM_OFFSET..RESERVED_OFFSET].copy_from_slice(&write_network_u16(self.checksum));
        out[RESERVED_OFFSET..HEADER_LEN].copy_from_slice(&self.reserved);
        out
    }
}
