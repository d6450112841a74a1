// crates/cockpit-channel/src/framing.rs
// ============================================================================
// Module: Frame Codec
// Description: Content-Length framed payloads over byte streams.
// Purpose: Delimit JSON messages on a stream with a hard size limit.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Each frame is `Content-Length: N\r\n\r\n` followed by `N` bytes of JSON.
//! Frames over the configured limit are rejected before the body is read.
//! Header lines share a fixed byte budget and carry exactly one length.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::BufRead;
use std::io::Read;
use std::io::Write;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum bytes of header lines, including the blank separator, per frame.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Frame codec errors.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream mid-frame.
    #[error("stream closed")]
    Closed,
    /// A read or write exceeded its timeout.
    #[error("timed out")]
    TimedOut,
    /// The frame header is malformed.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// The frame body exceeds the limit.
    #[error("payload too large: {0} bytes")]
    TooLarge(usize),
    /// Any other I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::TimedOut,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Closed,
            _ => Self::Io(err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Reads one framed payload.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new frame starts.
///
/// # Errors
///
/// Returns [`FrameError`] when the frame is malformed, too large, or the
/// stream fails mid-frame. Headers over [`MAX_HEADER_BYTES`] and repeated
/// `Content-Length` lines are malformed.
pub fn read_frame(
    reader: &mut impl BufRead,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, FrameError> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    let mut header_bytes = 0usize;
    loop {
        line.clear();
        let remaining = MAX_HEADER_BYTES.saturating_sub(header_bytes);
        let budget = u64::try_from(remaining).unwrap_or(u64::MAX);
        let bytes = Read::take(&mut *reader, budget).read_line(&mut line)?;
        header_bytes += bytes;
        if !line.ends_with('\n') {
            if header_bytes >= MAX_HEADER_BYTES {
                return Err(FrameError::Malformed(format!(
                    "frame headers exceed {MAX_HEADER_BYTES} bytes"
                )));
            }
            if header_bytes == 0 {
                return Ok(None);
            }
            return Err(FrameError::Closed);
        }
        if line.trim().is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| FrameError::Malformed("invalid content length".to_string()))?;
            if content_length.replace(parsed).is_some() {
                return Err(FrameError::Malformed("duplicate content length".to_string()));
            }
        }
    }
    let len =
        content_length.ok_or_else(|| FrameError::Malformed("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(FrameError::TooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}

/// Writes one framed payload and flushes.
///
/// # Errors
///
/// Returns [`FrameError`] when the write fails.
pub fn write_frame(writer: &mut impl Write, payload: &[u8]) -> Result<(), FrameError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
