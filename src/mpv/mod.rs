//! MPV client engine: correlates asynchronous replies with the requests that caused them.
//!
//! Architecture:
//! - `protocol.rs` - error codes, data formats, raw events and typed payloads
//! - `native.rs` - the native client surface (`NativeClient` + `EventSource`) and an
//!   in-memory event queue
//! - `registry.rs` - per-tag reply cells
//! - `dispatch.rs` - decodes raw events and routes replies and notifications
//! - `observer.rs` - notification callbacks and the `events()` stream
//! - `pump.rs` - event pump strategies (inline, dedicated thread, shared service)
//! - `context.rs` - the request API
//! - `ipc.rs` - JSON IPC backend (Named Pipes on Windows, Unix Sockets on Linux/macOS)
//! - `process.rs` / `player.rs` - spawning and managing an external player

mod context;
mod dispatch;
mod error;
mod ipc;
mod native;
mod observer;
mod player;
mod process;
mod protocol;
mod pump;
mod registry;

#[cfg(test)]
mod test_support;

pub use context::{Completion, MpvContext};
pub use dispatch::{Dispatcher, PLAYER_LOG_TARGET};
pub use error::MpvError;
pub use ipc::{IpcError, MpvIpc};
pub use native::{EventQueue, EventSource, NativeClient};
pub use observer::{ObserverId, Observers};
pub use player::MpvPlayer;
pub use process::{find_player, unique_ipc_path, LaunchOptions, ProcessError};
pub use protocol::{
  ClientMessage, CommandResult, EndFile, EndFileReason, ErrorCode, EventKind, Format, Hook,
  LogMessage, Notification, PropertyChange, PropertyData, PropertyValue, RawEvent, Reply,
  ReplyData, ReplyKind, StartFile, Tag,
};
pub use pump::{EventPump, PumpError, PumpState, SharedPumpService};
pub use registry::{CorrelationRegistry, WaitOutcome};
