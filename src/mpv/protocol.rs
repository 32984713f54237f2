//! mpv client protocol types.
//!
//! Event ids, error codes and data formats follow the numbering of the mpv client API.
//! Event payloads are carried as JSON nodes and decoded by the dispatcher.
//!
//! Reference: https://mpv.io/manual/master/#list-of-events

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation tag attached to a request and echoed back on its reply.
/// `0` means "no reply correlation".
pub type Tag = u64;

/// Error code reported by the native client. Negative values are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

const ERROR_MESSAGES: [(i32, &str); 21] = [
  (0, "success"),
  (-1, "event queue full"),
  (-2, "memory allocation failed"),
  (-3, "core not uninitialized"),
  (-4, "invalid parameter"),
  (-5, "option not found"),
  (-6, "unsupported format for accessing option"),
  (-7, "error setting option"),
  (-8, "property not found"),
  (-9, "unsupported format for accessing property"),
  (-10, "property unavailable"),
  (-11, "error accessing property"),
  (-12, "error running command"),
  (-13, "loading failed"),
  (-14, "audio output initialization failed"),
  (-15, "video output initialization failed"),
  (-16, "no audio or video data played"),
  (-17, "unrecognized file format"),
  (-18, "not supported"),
  (-19, "operation not implemented"),
  (-20, "something happened"),
];

impl ErrorCode {
  pub const SUCCESS: ErrorCode = ErrorCode(0);
  pub const EVENT_QUEUE_FULL: ErrorCode = ErrorCode(-1);
  pub const NOMEM: ErrorCode = ErrorCode(-2);
  pub const UNINITIALIZED: ErrorCode = ErrorCode(-3);
  pub const INVALID_PARAMETER: ErrorCode = ErrorCode(-4);
  pub const OPTION_NOT_FOUND: ErrorCode = ErrorCode(-5);
  pub const OPTION_FORMAT: ErrorCode = ErrorCode(-6);
  pub const OPTION_ERROR: ErrorCode = ErrorCode(-7);
  pub const PROPERTY_NOT_FOUND: ErrorCode = ErrorCode(-8);
  pub const PROPERTY_FORMAT: ErrorCode = ErrorCode(-9);
  pub const PROPERTY_UNAVAILABLE: ErrorCode = ErrorCode(-10);
  pub const PROPERTY_ERROR: ErrorCode = ErrorCode(-11);
  pub const COMMAND: ErrorCode = ErrorCode(-12);
  pub const LOADING_FAILED: ErrorCode = ErrorCode(-13);
  pub const AO_INIT_FAILED: ErrorCode = ErrorCode(-14);
  pub const VO_INIT_FAILED: ErrorCode = ErrorCode(-15);
  pub const NOTHING_TO_PLAY: ErrorCode = ErrorCode(-16);
  pub const UNKNOWN_FORMAT: ErrorCode = ErrorCode(-17);
  pub const UNSUPPORTED: ErrorCode = ErrorCode(-18);
  pub const NOT_IMPLEMENTED: ErrorCode = ErrorCode(-19);
  pub const GENERIC: ErrorCode = ErrorCode(-20);

  /// Check if the code reports success.
  pub fn is_success(self) -> bool {
    self.0 >= 0
  }

  /// Check if the code reports a failure.
  pub fn is_failure(self) -> bool {
    self.0 < 0
  }

  /// Human-readable description, as the native library words it.
  pub fn message(self) -> &'static str {
    ERROR_MESSAGES
      .iter()
      .find(|(code, _)| *code == self.0)
      .map(|(_, message)| *message)
      .unwrap_or("unknown error")
  }

  /// Reverse lookup of [`ErrorCode::message`]. Unrecognized text maps to `GENERIC`.
  pub fn from_message(message: &str) -> Self {
    ERROR_MESSAGES
      .iter()
      .find(|(_, text)| *text == message)
      .map(|(code, _)| ErrorCode(*code))
      .unwrap_or(ErrorCode::GENERIC)
  }
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Data format used when reading or writing a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
  None,
  String,
  OsdString,
  Flag,
  Int64,
  Double,
  Node,
  NodeArray,
  NodeMap,
  ByteArray,
}

impl Format {
  /// Native format id.
  pub fn id(self) -> u32 {
    match self {
      Format::None => 0,
      Format::String => 1,
      Format::OsdString => 2,
      Format::Flag => 3,
      Format::Int64 => 4,
      Format::Double => 5,
      Format::Node => 6,
      Format::NodeArray => 7,
      Format::NodeMap => 8,
      Format::ByteArray => 9,
    }
  }

  pub fn from_id(id: u32) -> Option<Self> {
    Some(match id {
      0 => Format::None,
      1 => Format::String,
      2 => Format::OsdString,
      3 => Format::Flag,
      4 => Format::Int64,
      5 => Format::Double,
      6 => Format::Node,
      7 => Format::NodeArray,
      8 => Format::NodeMap,
      9 => Format::ByteArray,
      _ => return None,
    })
  }

  /// Validate `data` against this format.
  ///
  /// Returns `Ok(None)` for [`Format::None`] (no data), the value itself when it
  /// matches, and a description of the mismatch otherwise.
  pub fn check(self, data: Value) -> Result<Option<Value>, String> {
    let matches = match self {
      Format::None => return Ok(None),
      Format::String | Format::OsdString => data.is_string(),
      Format::Flag => data.is_boolean(),
      Format::Int64 => data.is_i64() || data.is_u64(),
      Format::Double => data.is_number(),
      Format::Node => true,
      Format::NodeArray | Format::ByteArray => data.is_array(),
      Format::NodeMap => data.is_object(),
    };
    if matches {
      Ok(Some(data))
    } else {
      Err(format!("expected {:?} data, got {}", self, json_kind(&data)))
    }
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "map",
  }
}

/// Event kinds produced by the native event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
  None,
  Shutdown,
  LogMessage,
  GetPropertyReply,
  SetPropertyReply,
  CommandReply,
  StartFile,
  EndFile,
  FileLoaded,
  Idle,
  Tick,
  ClientMessage,
  VideoReconfig,
  AudioReconfig,
  Seek,
  PlaybackRestart,
  PropertyChange,
  QueueOverflow,
  Hook,
}

impl EventKind {
  /// Native event id.
  pub fn id(self) -> u32 {
    match self {
      EventKind::None => 0,
      EventKind::Shutdown => 1,
      EventKind::LogMessage => 2,
      EventKind::GetPropertyReply => 3,
      EventKind::SetPropertyReply => 4,
      EventKind::CommandReply => 5,
      EventKind::StartFile => 6,
      EventKind::EndFile => 7,
      EventKind::FileLoaded => 8,
      EventKind::Idle => 11,
      EventKind::Tick => 14,
      EventKind::ClientMessage => 16,
      EventKind::VideoReconfig => 17,
      EventKind::AudioReconfig => 18,
      EventKind::Seek => 20,
      EventKind::PlaybackRestart => 21,
      EventKind::PropertyChange => 22,
      EventKind::QueueOverflow => 24,
      EventKind::Hook => 25,
    }
  }

  pub fn from_id(id: u32) -> Option<Self> {
    EventKind::ALL.iter().copied().find(|kind| kind.id() == id)
  }

  /// Event name as used by the JSON IPC protocol (e.g. "property-change").
  pub fn name(self) -> &'static str {
    match self {
      EventKind::None => "none",
      EventKind::Shutdown => "shutdown",
      EventKind::LogMessage => "log-message",
      EventKind::GetPropertyReply => "get-property-reply",
      EventKind::SetPropertyReply => "set-property-reply",
      EventKind::CommandReply => "command-reply",
      EventKind::StartFile => "start-file",
      EventKind::EndFile => "end-file",
      EventKind::FileLoaded => "file-loaded",
      EventKind::Idle => "idle",
      EventKind::Tick => "tick",
      EventKind::ClientMessage => "client-message",
      EventKind::VideoReconfig => "video-reconfig",
      EventKind::AudioReconfig => "audio-reconfig",
      EventKind::Seek => "seek",
      EventKind::PlaybackRestart => "playback-restart",
      EventKind::PropertyChange => "property-change",
      EventKind::QueueOverflow => "event-queue-overflow",
      EventKind::Hook => "hook",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    EventKind::ALL.iter().copied().find(|kind| kind.name() == name)
  }

  /// Check if this kind answers a tagged request.
  pub fn is_reply(self) -> bool {
    matches!(
      self,
      EventKind::CommandReply | EventKind::GetPropertyReply | EventKind::SetPropertyReply
    )
  }

  const ALL: [EventKind; 19] = [
    EventKind::None,
    EventKind::Shutdown,
    EventKind::LogMessage,
    EventKind::GetPropertyReply,
    EventKind::SetPropertyReply,
    EventKind::CommandReply,
    EventKind::StartFile,
    EventKind::EndFile,
    EventKind::FileLoaded,
    EventKind::Idle,
    EventKind::Tick,
    EventKind::ClientMessage,
    EventKind::VideoReconfig,
    EventKind::AudioReconfig,
    EventKind::Seek,
    EventKind::PlaybackRestart,
    EventKind::PropertyChange,
    EventKind::QueueOverflow,
    EventKind::Hook,
  ];
}

/// Undecoded event as delivered by an [`EventSource`](super::EventSource).
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
  /// Native event id; see [`EventKind::id`].
  pub kind: u32,
  /// Request tag for replies, observer id for property changes, 0 otherwise.
  pub tag: Tag,
  pub error: ErrorCode,
  /// Kind-specific payload node.
  pub payload: Value,
}

impl RawEvent {
  pub fn new(kind: EventKind, tag: Tag, error: ErrorCode, payload: Value) -> Self {
    Self {
      kind: kind.id(),
      tag,
      error,
      payload,
    }
  }

  /// Unsolicited event with no tag and no error.
  pub fn notification(kind: EventKind, payload: Value) -> Self {
    Self::new(kind, 0, ErrorCode::SUCCESS, payload)
  }

  pub fn kind(&self) -> Option<EventKind> {
    EventKind::from_id(self.kind)
  }
}

/// Which request a reply answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
  Command,
  GetProperty,
  SetProperty,
}

impl ReplyKind {
  pub fn event_kind(self) -> EventKind {
    match self {
      ReplyKind::Command => EventKind::CommandReply,
      ReplyKind::GetProperty => EventKind::GetPropertyReply,
      ReplyKind::SetProperty => EventKind::SetPropertyReply,
    }
  }
}

/// Decoded reply body.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyData {
  /// No data (failed request, command without result, unknown property format).
  Empty,
  Value(Value),
  /// Payload could not be interpreted; carries the reason.
  Malformed(String),
}

/// Typed reply record routed to the correlation registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
  pub tag: Tag,
  pub kind: ReplyKind,
  pub error: ErrorCode,
  pub data: ReplyData,
}

/// Payload of get-property replies and property-change events.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyData {
  pub name: String,
  #[serde(default)]
  pub format: u32,
  #[serde(default)]
  pub data: Value,
}

/// Payload of command replies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandResult {
  #[serde(default)]
  pub result: Value,
}

/// Log line emitted by the player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogMessage {
  pub prefix: String,
  pub level: String,
  pub text: String,
}

impl LogMessage {
  /// Map the player's log level onto the `log` crate's levels.
  pub fn log_level(&self) -> Option<log::Level> {
    match self.level.as_str() {
      "fatal" | "error" => Some(log::Level::Error),
      "warn" => Some(log::Level::Warn),
      "info" => Some(log::Level::Info),
      "status" | "v" => Some(log::Level::Debug),
      "debug" | "trace" => Some(log::Level::Trace),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartFile {
  #[serde(default)]
  pub playlist_entry_id: i64,
}

/// Why playback of a file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndFileReason {
  Eof,
  Stop,
  Quit,
  Error,
  Redirect,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndFile {
  pub reason: EndFileReason,
  /// Set when `reason` is `Error`.
  #[serde(default)]
  pub error: ErrorCode,
  #[serde(default)]
  pub playlist_entry_id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientMessage {
  #[serde(default)]
  pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hook {
  pub name: String,
  /// Id to pass back when continuing the hook.
  pub id: u64,
}

/// Observed property changed value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
  /// Observer id given to `observe_property`.
  pub id: Tag,
  pub name: String,
  pub value: PropertyValue,
}

/// Typed property values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
  Bool(bool),
  Number(f64),
  String(String),
  /// Arrays and maps keep their node structure.
  Node(Value),
  Null,
}

impl From<Value> for PropertyValue {
  fn from(value: Value) -> Self {
    match value {
      Value::Bool(b) => PropertyValue::Bool(b),
      Value::Number(n) => PropertyValue::Number(n.as_f64().unwrap_or(0.0)),
      Value::String(s) => PropertyValue::String(s),
      Value::Array(_) | Value::Object(_) => PropertyValue::Node(value),
      Value::Null => PropertyValue::Null,
    }
  }
}

/// Unsolicited notification delivered to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
  Shutdown,
  LogMessage(LogMessage),
  StartFile(StartFile),
  EndFile(EndFile),
  FileLoaded,
  Idle,
  Tick,
  ClientMessage(ClientMessage),
  VideoReconfig,
  AudioReconfig,
  Seek,
  PlaybackRestart,
  PropertyChange(PropertyChange),
  QueueOverflow,
  Hook(Hook),
}

impl Notification {
  pub fn kind(&self) -> EventKind {
    match self {
      Notification::Shutdown => EventKind::Shutdown,
      Notification::LogMessage(_) => EventKind::LogMessage,
      Notification::StartFile(_) => EventKind::StartFile,
      Notification::EndFile(_) => EventKind::EndFile,
      Notification::FileLoaded => EventKind::FileLoaded,
      Notification::Idle => EventKind::Idle,
      Notification::Tick => EventKind::Tick,
      Notification::ClientMessage(_) => EventKind::ClientMessage,
      Notification::VideoReconfig => EventKind::VideoReconfig,
      Notification::AudioReconfig => EventKind::AudioReconfig,
      Notification::Seek => EventKind::Seek,
      Notification::PlaybackRestart => EventKind::PlaybackRestart,
      Notification::PropertyChange(_) => EventKind::PropertyChange,
      Notification::QueueOverflow => EventKind::QueueOverflow,
      Notification::Hook(_) => EventKind::Hook,
    }
  }
}
