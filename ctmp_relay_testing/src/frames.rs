//! Reading frames back from consumer connections.

use std::{io, time::Duration};

use bytes::{Bytes, BytesMut};
use ctmp_relay::{byte_order::read_network_u16_at, frame::HEADER_LEN};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::timeout,
};

/// Read one complete frame: the header, then as many payload bytes as it
/// declares.
///
/// # Errors
///
/// Returns any read error, including `UnexpectedEof` if the relay closes
/// the connection mid-frame.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut frame = BytesMut::zeroed(HEADER_LEN);
    reader.read_exact(&mut frame).await?;
    let declared = read_network_u16_at(&frame, 2)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "short header"))?;
    frame.resize(HEADER_LEN + usize::from(declared), 0);
    reader.read_exact(&mut frame[HEADER_LEN..]).await?;
    Ok(frame.freeze())
}

/// Assert that nothing arrives on `reader` for `window`.
///
/// # Panics
///
/// Panics if any byte arrives, or the connection closes, within the window.
pub async fn assert_silent<R>(reader: &mut R, window: Duration)
where
    R: AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    match timeout(window, reader.read(&mut byte)).await {
        Err(_) => {}
        Ok(Ok(0)) => panic!("connection closed while expecting silence"),
        Ok(Ok(_)) => panic!("unexpected byte {:#04x} while expecting silence", byte[0]),
        Ok(Err(e)) => panic!("read failed while expecting silence: {e}"),
    }
}
