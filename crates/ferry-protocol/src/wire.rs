//! Framing helpers over any async byte stream.
//!
//! The original wire format relied on a multi-second idle timeout to
//! detect the end of an uploaded file; content here is length-prefixed
//! instead, so "transfer complete" is explicit and a stalled peer is a
//! transport error rather than a normal end-of-stream.

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};
use crate::opcode::OpCode;
use crate::status::Status;

/// Transfer chunk size for file content, in bytes.
pub const CHUNK_SIZE: usize = 4096;

/// Read the two-byte opcode that opens a conversation.
pub async fn read_opcode<R: AsyncRead + Unpin>(reader: &mut R) -> ProtocolResult<OpCode> {
    let mut code = [0u8; 2];
    reader.read_exact(&mut code).await?;
    OpCode::from_bytes(code)
}

pub async fn write_opcode<W: AsyncWrite + Unpin>(
    writer: &mut W,
    op: OpCode,
) -> ProtocolResult<()> {
    writer.write_all(&op.as_bytes()).await?;
    Ok(())
}

/// Read one newline-terminated filename, at most `max_len` bytes before
/// the terminator.
pub async fn read_filename<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_len: usize,
) -> ProtocolResult<String> {
    let mut raw = Vec::with_capacity(64);
    loop {
        let byte = reader.read_u8().await?;
        if byte == b'\n' {
            break;
        }
        if raw.len() == max_len {
            return Err(ProtocolError::FilenameTooLong { max: max_len });
        }
        raw.push(byte);
    }
    String::from_utf8(raw).map_err(|_| ProtocolError::FilenameNotUtf8)
}

pub async fn write_filename<W: AsyncWrite + Unpin>(
    writer: &mut W,
    name: &str,
) -> ProtocolResult<()> {
    writer.write_all(name.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

/// Send a `y`/`n` byte.
pub async fn write_answer<W: AsyncWrite + Unpin>(
    writer: &mut W,
    yes: bool,
) -> ProtocolResult<()> {
    writer.write_all(if yes { b"y" } else { b"n" }).await?;
    Ok(())
}

/// Read a `y`/`n` byte; anything else is a protocol violation.
pub async fn read_answer<R: AsyncRead + Unpin>(reader: &mut R) -> ProtocolResult<bool> {
    match reader.read_u8().await? {
        b'y' => Ok(true),
        b'n' => Ok(false),
        other => Err(ProtocolError::BadAnswer(other)),
    }
}

pub async fn write_status<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: Status,
) -> ProtocolResult<()> {
    writer.write_all(&status.as_bytes()).await?;
    Ok(())
}

pub async fn read_status<R: AsyncRead + Unpin>(reader: &mut R) -> ProtocolResult<Status> {
    let mut raw = [0u8; 3];
    reader.read_exact(&mut raw).await?;
    Status::from_bytes(raw)
}

/// Stream file content: length prefix, then the bytes in 4 KiB chunks.
pub async fn write_content<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> ProtocolResult<()> {
    writer.write_u64(data.len() as u64).await?;
    for chunk in data.chunks(CHUNK_SIZE) {
        writer.write_all(chunk).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Bound one read on a peer that owes us bytes. Expiry maps to a
/// `TimedOut` I/O error.
async fn idle_read<T, F>(limit: Duration, fut: F) -> ProtocolResult<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ProtocolError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "peer went silent mid-transfer",
        ))),
    }
}

/// Receive length-prefixed file content, refusing anything over
/// `max_size` before a single content byte is read.
///
/// `idle` bounds the wait for each arrival of bytes, not the transfer
/// as a whole: the clock resets every time the peer delivers something,
/// so a slow sender that keeps sending is never cut off, while one that
/// goes silent for `idle` is.
pub async fn read_content<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_size: u64,
    idle: Duration,
) -> ProtocolResult<Bytes> {
    let size = idle_read(idle, reader.read_u64()).await?;
    if size > max_size {
        return Err(ProtocolError::PayloadTooLarge {
            size,
            max: max_size,
        });
    }
    let mut data = BytesMut::with_capacity(size.min(CHUNK_SIZE as u64 * 16) as usize);
    let mut remaining = size as usize;
    let mut chunk = [0u8; CHUNK_SIZE];
    while remaining > 0 {
        let take = remaining.min(CHUNK_SIZE);
        let got = idle_read(idle, reader.read(&mut chunk[..take])).await?;
        if got == 0 {
            return Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "peer closed mid-content",
            )));
        }
        data.extend_from_slice(&chunk[..got]);
        remaining -= got;
    }
    Ok(data.freeze())
}
