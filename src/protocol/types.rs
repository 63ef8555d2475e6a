//! Protocol message types
//!
//! A `Frame` is the raw three-part message that travels on the wire.
//! `Request` and `Reply` are the typed views used by clients and handlers.

use serde::{Deserialize, Serialize};

use super::error::ProtocolError;
use super::traits::ProtocolResult;
use crate::state::Report;

/// Command and reply names used on the wire
pub mod command {
	pub const LIST_FILES: &str = "list_files";
	pub const STORE_FILE: &str = "store_file";
	pub const DELETE_FILE: &str = "delete_file";
	pub const REPORT: &str = "report";

	pub const FILE_LIST: &str = "file_list";
	pub const OK: &str = "ok";
	pub const FAILED: &str = "failed";
}

/// Raw `(command, argument, payload)` message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
	pub command: String,
	pub argument: String,
	pub payload: Vec<u8>,
}

impl Frame {
	pub fn new(command: impl Into<String>, argument: impl Into<String>, payload: Vec<u8>) -> Self {
		Self { command: command.into(), argument: argument.into(), payload }
	}

	/// Frame with no argument and no payload
	pub fn bare(command: impl Into<String>) -> Self {
		Self::new(command, String::new(), Vec::new())
	}
}

/// JSON body of a `file_list` reply
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FileListPayload {
	pub files: Vec<String>,
}

/// Requests understood by destination and progress endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
	/// Enumerate the destination's managed directory
	ListFiles,
	/// Create or overwrite a file on the destination
	StoreFile { name: String, data: Vec<u8> },
	/// Remove a file from the destination
	DeleteFile { name: String },
	/// Ask the progress reporter for a snapshot
	Report,
}

impl Request {
	/// Wire name of this request
	pub fn command(&self) -> &'static str {
		match self {
			Request::ListFiles => command::LIST_FILES,
			Request::StoreFile { .. } => command::STORE_FILE,
			Request::DeleteFile { .. } => command::DELETE_FILE,
			Request::Report => command::REPORT,
		}
	}

	pub fn into_frame(self) -> Frame {
		match self {
			Request::ListFiles => Frame::bare(command::LIST_FILES),
			Request::StoreFile { name, data } => Frame::new(command::STORE_FILE, name, data),
			Request::DeleteFile { name } => Frame::new(command::DELETE_FILE, name, Vec::new()),
			Request::Report => Frame::bare(command::REPORT),
		}
	}

	/// Decode a received frame; arguments and payloads a command ignores are dropped
	pub fn from_frame(frame: Frame) -> ProtocolResult<Self> {
		match frame.command.as_str() {
			command::LIST_FILES => Ok(Request::ListFiles),
			command::STORE_FILE => Ok(Request::StoreFile { name: frame.argument, data: frame.payload }),
			command::DELETE_FILE => Ok(Request::DeleteFile { name: frame.argument }),
			command::REPORT => Ok(Request::Report),
			_ => Err(ProtocolError::UnknownCommand(frame.command)),
		}
	}
}

/// Replies sent back for every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
	/// Destination listing
	FileList(Vec<String>),
	/// Store or delete succeeded
	Ok,
	/// Progress snapshot
	Report(Report),
	/// Request failed; the string is a human-readable diagnostic
	Failed(String),
}

impl Reply {
	/// Wire name of this reply
	pub fn command(&self) -> &'static str {
		match self {
			Reply::FileList(_) => command::FILE_LIST,
			Reply::Ok => command::OK,
			Reply::Report(_) => command::REPORT,
			Reply::Failed(_) => command::FAILED,
		}
	}

	/// Build a `failed` reply from any error
	pub fn failed(err: impl std::fmt::Display) -> Self {
		Reply::Failed(err.to_string())
	}

	pub fn into_frame(self) -> Frame {
		match self {
			Reply::FileList(files) => {
				match serde_json::to_vec(&FileListPayload { files }) {
					Ok(payload) => Frame::new(command::FILE_LIST, String::new(), payload),
					Err(e) => Reply::failed(ProtocolError::from(e)).into_frame(),
				}
			}
			Reply::Ok => Frame::bare(command::OK),
			Reply::Report(report) => match serde_json::to_vec(&report) {
				Ok(payload) => Frame::new(command::REPORT, String::new(), payload),
				Err(e) => Reply::failed(ProtocolError::from(e)).into_frame(),
			},
			Reply::Failed(diagnostic) => Frame::new(command::FAILED, diagnostic, Vec::new()),
		}
	}

	pub fn from_frame(frame: Frame) -> ProtocolResult<Self> {
		match frame.command.as_str() {
			command::FILE_LIST => {
				let listing: FileListPayload = serde_json::from_slice(&frame.payload)?;
				Ok(Reply::FileList(listing.files))
			}
			command::OK => Ok(Reply::Ok),
			command::REPORT => Ok(Reply::Report(serde_json::from_slice(&frame.payload)?)),
			command::FAILED => Ok(Reply::Failed(frame.argument)),
			_ => Err(ProtocolError::UnknownCommand(frame.command)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_store_request_carries_name_and_bytes() {
		let frame = Request::StoreFile { name: "a.jpg".to_string(), data: vec![1, 2, 3] }.into_frame();
		assert_eq!(frame.command, "store_file");
		assert_eq!(frame.argument, "a.jpg");
		assert_eq!(frame.payload, vec![1, 2, 3]);
	}

	#[test]
	fn test_list_request_ignores_argument_and_payload() {
		let frame = Frame::new("list_files", "none", b"none".to_vec());
		assert_eq!(Request::from_frame(frame).unwrap(), Request::ListFiles);
	}

	#[test]
	fn test_unknown_request_command() {
		let err = Request::from_frame(Frame::bare("get_file_list")).unwrap_err();
		assert!(matches!(err, ProtocolError::UnknownCommand(ref c) if c == "get_file_list"));
	}

	#[test]
	fn test_file_list_payload_format() {
		let frame = Reply::FileList(vec!["a.jpg".to_string(), "b.jpg".to_string()]).into_frame();
		assert_eq!(frame.command, "file_list");
		let value: serde_json::Value = serde_json::from_slice(&frame.payload).unwrap();
		assert_eq!(value, serde_json::json!({"files": ["a.jpg", "b.jpg"]}));
	}

	#[test]
	fn test_failed_reply_puts_diagnostic_in_argument() {
		let frame = Reply::failed("disk full").into_frame();
		assert_eq!(frame.command, "failed");
		assert_eq!(frame.argument, "disk full");
		assert!(frame.payload.is_empty());
	}

	#[test]
	fn test_malformed_file_list_is_error() {
		let frame = Frame::new("file_list", "", b"{\"nope\": 1}".to_vec());
		assert!(matches!(Reply::from_frame(frame), Err(ProtocolError::Json(_))));
	}
}

// vim: ts=4
