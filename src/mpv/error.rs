//! Caller-facing error types.

use thiserror::Error;

use super::ipc::IpcError;
use super::process::ProcessError;
use super::protocol::{ErrorCode, Tag};
use super::pump::PumpError;

/// Errors surfaced by [`MpvContext`](super::MpvContext) and [`MpvPlayer`](super::MpvPlayer).
#[derive(Error, Debug)]
pub enum MpvError {
  #[error("Process error: {0}")]
  Process(#[from] ProcessError),

  #[error("IPC error: {0}")]
  Ipc(#[from] IpcError),

  #[error("Event pump error: {0}")]
  Pump(#[from] PumpError),

  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  /// The reply carried a failing error code and the caller asked for errors.
  #[error("{target} failed (tag {tag}): {message} ({code})")]
  Native {
    tag: Tag,
    target: String,
    code: ErrorCode,
    message: String,
  },

  /// The native client refused the request outright.
  #[error("{target} was rejected: {message} ({code})")]
  Submit {
    target: String,
    code: ErrorCode,
    message: String,
  },

  #[error("{target} timed out after {timeout_ms} ms (tag {tag})")]
  Timeout {
    tag: Tag,
    target: String,
    timeout_ms: i64,
  },

  /// The reply payload could not be interpreted as the requested type.
  #[error("Failed to decode reply to {target} (tag {tag}): {reason}")]
  Decode {
    tag: Tag,
    target: String,
    reason: String,
  },

  #[error("Context disposed")]
  Disposed,
}

impl MpvError {
  /// Native error code, if the error carries one.
  pub fn code(&self) -> Option<ErrorCode> {
    match self {
      MpvError::Native { code, .. } | MpvError::Submit { code, .. } => Some(*code),
      _ => None,
    }
  }

  pub fn is_timeout(&self) -> bool {
    matches!(self, MpvError::Timeout { .. })
  }
}
