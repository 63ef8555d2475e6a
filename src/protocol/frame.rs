//! Frame encoding on byte streams
//!
//! Each frame is a single JSON header line followed by the raw payload:
//!
//! ```text
//! {"cmd":"store_file","arg":"frame_0001.jpg","len":52311}\n
//! <52311 payload bytes>
//! ```
//!
//! Headers are parsed with JSON5 so hand-typed requests (netcat, tests)
//! may use unquoted keys.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::ProtocolError;
use super::traits::ProtocolResult;
use super::types::Frame;

/// Largest payload accepted in a single frame (1 GiB)
pub const MAX_PAYLOAD_LEN: u64 = 1 << 30;

/// Longest header line accepted, newline included (64 KiB)
pub const MAX_HEADER_LEN: u64 = 64 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct FrameHeader {
	cmd: String,
	#[serde(default)]
	arg: String,
	#[serde(default)]
	len: u64,
}

/// Read the next frame
///
/// Returns `Ok(None)` on a clean EOF before any header byte.
pub async fn read_frame<R>(reader: &mut R) -> ProtocolResult<Option<Frame>>
where
	R: AsyncBufRead + Unpin,
{
	let mut line = String::new();
	loop {
		line.clear();
		let n = (&mut *reader).take(MAX_HEADER_LEN).read_line(&mut line).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::InvalidData {
				ProtocolError::ProtocolViolation("header is not valid UTF-8".to_string())
			} else {
				ProtocolError::Io(e)
			}
		})?;
		if n == 0 {
			return Ok(None);
		}
		if n as u64 == MAX_HEADER_LEN && !line.ends_with('\n') {
			return Err(ProtocolError::ProtocolViolation(format!(
				"header exceeds {} bytes",
				MAX_HEADER_LEN
			)));
		}

		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}

		let header: FrameHeader = json5::from_str(trimmed)?;
		if header.len > MAX_PAYLOAD_LEN {
			return Err(ProtocolError::ProtocolViolation(format!(
				"payload of {} bytes exceeds limit of {}",
				header.len, MAX_PAYLOAD_LEN
			)));
		}

		let mut payload = vec![0u8; header.len as usize];
		reader.read_exact(&mut payload).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::UnexpectedEof {
				ProtocolError::ProtocolViolation(format!(
					"stream ended inside {} byte payload of {}",
					header.len, header.cmd
				))
			} else {
				ProtocolError::Io(e)
			}
		})?;

		return Ok(Some(Frame { command: header.cmd, argument: header.arg, payload }));
	}
}

/// Write one frame and flush
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> ProtocolResult<()>
where
	W: AsyncWrite + Unpin,
{
	let header = FrameHeader {
		cmd: frame.command.clone(),
		arg: frame.argument.clone(),
		len: frame.payload.len() as u64,
	};
	let mut encoded = serde_json::to_vec(&header)?;
	encoded.push(b'\n');
	writer.write_all(&encoded).await?;
	if !frame.payload.is_empty() {
		writer.write_all(&frame.payload).await?;
	}
	writer.flush().await?;
	Ok(())
}


// vim: ts=4
