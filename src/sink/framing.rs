//! Inbound frame reading

use crate::sink::config::Framing;
use crate::sink::error::{SinkError, SinkResult};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read the next frame from an agent connection.
///
/// Returns `Ok(None)` once the peer has closed the connection. `buf` must be
/// at least `max_frame_size` bytes and is reused between calls.
pub async fn read_frame<R>(
    reader: &mut R,
    framing: Framing,
    buf: &mut [u8],
    max_frame_size: usize,
) -> SinkResult<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    match framing {
        Framing::PerRead => {
            let limit = max_frame_size.min(buf.len());
            let n = reader.read(&mut buf[..limit]).await?;
            if n == 0 {
                return Ok(None);
            }
            Ok(Some(Bytes::copy_from_slice(&buf[..n])))
        }
        Framing::LengthPrefixed => {
            // A close is only clean at a frame boundary
            let mut header = [0u8; 4];
            let mut filled = 0;
            while filled < header.len() {
                let n = reader.read(&mut header[filled..]).await?;
                if n == 0 {
                    if filled == 0 {
                        return Ok(None);
                    }
                    return Err(SinkError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("connection closed after {} of 4 length bytes", filled),
                    )));
                }
                filled += n;
            }
            let len = u32::from_be_bytes(header) as usize;

            if len > max_frame_size {
                return Err(SinkError::MessageTooLarge {
                    size: len,
                    limit: max_frame_size,
                });
            }

            let mut frame = vec![0u8; len];
            reader.read_exact(&mut frame).await?;
            Ok(Some(Bytes::from(frame)))
        }
    }
}

/// Prefix a payload with its 4 byte big-endian length
pub fn encode_length_prefixed(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}
