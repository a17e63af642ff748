//! Delimits frames on a byte stream using the length prefix every frame
//! starts with.

use skein::constants::FRAME_LENGTH_PREFIX_SIZE;
use skein::frame::FrameCodec;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads one complete frame.
///
/// Returns `Ok(None)` on a clean end of stream between frames. A stream that
/// ends mid-frame is an [`io::ErrorKind::UnexpectedEof`] error, and a frame
/// announcing more than `max_frame_size` bytes is
/// [`io::ErrorKind::InvalidData`] since the stream cannot be resynchronised
/// without reading it.
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; FRAME_LENGTH_PREFIX_SIZE];
    let mut filled = 0;
    while filled < prefix.len() {
        let n = reader.read(&mut prefix[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside a frame length prefix",
            ));
        }
        filled += n;
    }

    let frame_len = FrameCodec::frame_length(&prefix)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if frame_len > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {frame_len} bytes exceeds the {max_frame_size} byte limit"),
        ));
    }

    let mut frame = vec![0u8; frame_len];
    frame[..FRAME_LENGTH_PREFIX_SIZE].copy_from_slice(&prefix);
    reader
        .read_exact(&mut frame[FRAME_LENGTH_PREFIX_SIZE..])
        .await?;

    tracing::trace!(frame_len, "read frame");
    Ok(Some(frame))
}

/// Writes one encoded frame and flushes it.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    tracing::trace!(frame_len = frame.len(), "wrote frame");
    Ok(())
}
