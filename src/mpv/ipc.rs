//! JSON IPC transport to an external player process.
//!
//! Handles platform-specific socket/pipe connections and adapts the line protocol to
//! [`NativeClient`] + [`EventSource`]: requests go out as JSON commands carrying their
//! tag as `request_id`, and every inbound line becomes a [`RawEvent`] in an
//! [`EventQueue`] that the event pump drains.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

use super::native::{EventQueue, EventSource, NativeClient};
use super::protocol::{ErrorCode, EventKind, Format, RawEvent, ReplyKind, Tag};

#[derive(Error, Debug)]
pub enum IpcError {
  #[error("Connection failed: {0}")]
  ConnectionFailed(String),
  #[error("Write failed: {0}")]
  WriteFailed(#[from] std::io::Error),
  #[error("Disconnected")]
  Disconnected,
}

/// Command line sent to the player.
#[derive(Debug, Serialize)]
struct IpcCommand {
  command: Vec<Value>,
  request_id: Tag,
}

/// What a tagged request asked for, so its response can be typed.
#[derive(Debug, Clone)]
struct PendingReply {
  kind: ReplyKind,
  property: Option<String>,
}

/// Tagged requests still expecting a response, and whether the connection is gone.
#[derive(Default)]
struct PendingState {
  replies: HashMap<Tag, PendingReply>,
  closed: bool,
}

type PendingReplies = Arc<Mutex<PendingState>>;

/// Mark the connection closed and return what was still outstanding.
fn drain_pending(pending: &PendingReplies) -> Vec<(Tag, PendingReply)> {
  let mut state = pending.lock();
  state.closed = true;
  state.replies.drain().collect()
}

/// Writer channel message.
enum WriteMessage {
  Command(Vec<u8>),
  Close,
}

/// Player IPC connection.
pub struct MpvIpc {
  queue: Arc<EventQueue>,
  pending: PendingReplies,
  write_tx: async_channel::Sender<WriteMessage>,
  _reader_handle: JoinHandle<()>,
  _writer_handle: JoinHandle<()>,
}

impl MpvIpc {
  /// Connect to the IPC socket/pipe, retrying with a growing delay.
  pub async fn connect(path: &str, retry_count: u32) -> Result<Self, IpcError> {
    let mut last_error = None;

    for attempt in 0..retry_count {
      if attempt > 0 {
        tokio::time::sleep(Duration::from_millis(100 * (attempt as u64 + 1))).await;
      }

      match Self::try_connect(path).await {
        Ok(ipc) => return Ok(ipc),
        Err(e) => {
          log::debug!("IPC connect attempt {} failed: {}", attempt + 1, e);
          last_error = Some(e);
        }
      }
    }

    Err(last_error.unwrap_or_else(|| IpcError::ConnectionFailed("no attempts made".into())))
  }

  #[cfg(windows)]
  async fn try_connect(path: &str) -> Result<Self, IpcError> {
    use tokio::net::windows::named_pipe::ClientOptions;

    let client = ClientOptions::new()
      .open(path)
      .map_err(|e| IpcError::ConnectionFailed(format!("Failed to open pipe: {}", e)))?;

    let (reader, writer) = tokio::io::split(client);
    Ok(Self::setup(reader, writer))
  }

  #[cfg(not(windows))]
  async fn try_connect(path: &str) -> Result<Self, IpcError> {
    use tokio::net::UnixStream;

    let stream = UnixStream::connect(path)
      .await
      .map_err(|e| IpcError::ConnectionFailed(e.to_string()))?;

    let (reader, writer) = tokio::io::split(stream);
    Ok(Self::setup(reader, writer))
  }

  fn setup<R, W>(reader: R, writer: W) -> Self
  where
    R: tokio::io::AsyncRead + Send + Unpin + 'static,
    W: tokio::io::AsyncWrite + Send + Unpin + 'static,
  {
    let queue = Arc::new(EventQueue::new());
    let pending: PendingReplies = Arc::new(Mutex::new(PendingState::default()));
    let (write_tx, write_rx) = async_channel::unbounded::<WriteMessage>();

    let reader_queue = queue.clone();
    let reader_pending = pending.clone();
    let reader_handle = tokio::spawn(async move {
      Self::reader_loop(reader, reader_pending, reader_queue).await;
    });

    let writer_handle = tokio::spawn(async move {
      Self::writer_loop(writer, write_rx).await;
    });

    Self {
      queue,
      pending,
      write_tx,
      _reader_handle: reader_handle,
      _writer_handle: writer_handle,
    }
  }

  async fn reader_loop<R: tokio::io::AsyncRead + Unpin>(
    reader: R,
    pending: PendingReplies,
    queue: Arc<EventQueue>,
  ) {
    log::info!("MPV IPC reader loop started");
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
      line.clear();
      match buf_reader.read_line(&mut line).await {
        Ok(0) => {
          log::info!("MPV IPC connection closed");
          break;
        }
        Ok(_) => {
          let trimmed = line.trim();
          if trimmed.is_empty() {
            continue;
          }
          match parse_line(trimmed, &pending) {
            Ok(Some(event)) => queue.push(event),
            Ok(None) => {}
            Err(e) => log::warn!("Failed to parse MPV message: {} - {}", e, trimmed),
          }
        }
        Err(e) => {
          log::error!("MPV IPC read error: {}", e);
          break;
        }
      }
    }

    // the player is gone: fail whatever is still waiting, then tell observers
    let orphans = drain_pending(&pending);
    if !orphans.is_empty() {
      log::warn!("Failing {} requests left on a closed MPV IPC connection", orphans.len());
    }
    for (tag, reply) in orphans {
      queue.push(RawEvent::new(
        reply.kind.event_kind(),
        tag,
        ErrorCode::UNINITIALIZED,
        Value::Null,
      ));
    }
    queue.push(RawEvent::notification(EventKind::Shutdown, Value::Null));
  }

  async fn writer_loop<W: tokio::io::AsyncWrite + Unpin>(
    mut writer: W,
    write_rx: async_channel::Receiver<WriteMessage>,
  ) {
    log::info!("MPV IPC writer loop started");

    while let Ok(msg) = write_rx.recv().await {
      match msg {
        WriteMessage::Command(mut data) => {
          data.push(b'\n');
          if let Err(e) = writer.write_all(&data).await {
            log::error!("MPV IPC write error: {}", e);
            break;
          }
          if let Err(e) = writer.flush().await {
            log::error!("MPV IPC flush error: {}", e);
            break;
          }
        }
        WriteMessage::Close => {
          log::info!("MPV IPC writer closing");
          break;
        }
      }
    }
  }

  /// Queue one command line. Tagged requests remember what they asked for.
  fn send(&self, tag: Tag, command: Vec<Value>, reply: PendingReply) -> Result<(), ErrorCode> {
    let json = serde_json::to_vec(&IpcCommand {
      command,
      request_id: tag,
    })
    .map_err(|e| {
      log::error!("Failed to serialize MPV command: {}", e);
      ErrorCode::INVALID_PARAMETER
    })?;

    {
      let mut state = self.pending.lock();
      if state.closed {
        log::debug!("MPV IPC connection is closed, rejecting request {}", tag);
        return Err(ErrorCode::UNINITIALIZED);
      }
      if tag != 0 {
        state.replies.insert(tag, reply);
      }
    }
    if self.write_tx.try_send(WriteMessage::Command(json)).is_err() {
      log::error!("MPV IPC writer is gone, dropping request {}", tag);
      self.pending.lock().replies.remove(&tag);
      return Err(ErrorCode::UNINITIALIZED);
    }
    Ok(())
  }

  /// Number of tagged requests still expecting a response.
  pub fn pending_requests(&self) -> usize {
    self.pending.lock().replies.len()
  }

  /// Close the connection. Later requests are rejected.
  pub fn close(&self) {
    drain_pending(&self.pending);
    let _ = self.write_tx.try_send(WriteMessage::Close);
    self.queue.wakeup();
  }
}

impl NativeClient for MpvIpc {
  fn submit_command(&self, tag: Tag, args: &[String]) -> Result<(), ErrorCode> {
    let command = args.iter().map(|arg| Value::from(arg.as_str())).collect();
    self.send(
      tag,
      command,
      PendingReply {
        kind: ReplyKind::Command,
        property: None,
      },
    )
  }

  fn submit_get_property(&self, tag: Tag, name: &str, _format: Format) -> Result<(), ErrorCode> {
    // the IPC protocol always answers with a node
    self.send(
      tag,
      vec!["get_property".into(), name.into()],
      PendingReply {
        kind: ReplyKind::GetProperty,
        property: Some(name.to_string()),
      },
    )
  }

  fn submit_set_property(
    &self,
    tag: Tag,
    name: &str,
    _format: Format,
    data: &Value,
  ) -> Result<(), ErrorCode> {
    self.send(
      tag,
      vec!["set_property".into(), name.into(), data.clone()],
      PendingReply {
        kind: ReplyKind::SetProperty,
        property: Some(name.to_string()),
      },
    )
  }

  fn observe_property(&self, id: Tag, name: &str, _format: Format) -> Result<(), ErrorCode> {
    self.send(
      0,
      vec!["observe_property".into(), id.into(), name.into()],
      PendingReply {
        kind: ReplyKind::Command,
        property: None,
      },
    )
  }

  fn unobserve_property(&self, id: Tag) -> Result<(), ErrorCode> {
    self.send(
      0,
      vec!["unobserve_property".into(), id.into()],
      PendingReply {
        kind: ReplyKind::Command,
        property: None,
      },
    )
  }

  fn release(&self, tag: Tag) {
    self.pending.lock().replies.remove(&tag);
  }
}

impl EventSource for MpvIpc {
  fn wait_event(&self, timeout: Duration) -> Option<RawEvent> {
    self.queue.wait_event(timeout)
  }

  fn wakeup(&self) {
    self.queue.wakeup();
  }
}

/// Turn one IPC line into a raw event. Unknown event names yield `None`.
fn parse_line(line: &str, pending: &PendingReplies) -> Result<Option<RawEvent>, serde_json::Error> {
  let message: Map<String, Value> = serde_json::from_str(line)?;
  if message.contains_key("request_id") && !message.contains_key("event") {
    return Ok(Some(response_event(message, pending)));
  }
  Ok(notification_event(message))
}

fn response_event(mut message: Map<String, Value>, pending: &PendingReplies) -> RawEvent {
  let tag = message
    .get("request_id")
    .and_then(Value::as_u64)
    .unwrap_or(0);
  let error = match message.get("error").and_then(Value::as_str) {
    Some(text) => ErrorCode::from_message(text),
    None => ErrorCode::SUCCESS,
  };
  let data = message.remove("data").unwrap_or(Value::Null);

  let reply = if tag == 0 {
    None
  } else {
    pending.lock().replies.remove(&tag)
  };
  let reply = reply.unwrap_or(PendingReply {
    kind: ReplyKind::Command,
    property: None,
  });

  let payload = match reply.kind {
    ReplyKind::Command => json!({ "result": data }),
    ReplyKind::GetProperty => json!({
      "name": reply.property.unwrap_or_default(),
      "format": Format::Node.id(),
      "data": data,
    }),
    ReplyKind::SetProperty => Value::Null,
  };
  RawEvent::new(reply.kind.event_kind(), tag, error, payload)
}

fn notification_event(mut message: Map<String, Value>) -> Option<RawEvent> {
  let name = message.get("event").and_then(Value::as_str)?.to_string();
  let Some(kind) = EventKind::from_name(&name) else {
    log::debug!("Ignoring unsupported MPV event {}", name);
    return None;
  };
  let tag = message.get("id").and_then(Value::as_u64).unwrap_or(0);

  match kind {
    EventKind::PropertyChange => {
      let format = if message.contains_key("data") {
        Format::Node
      } else {
        Format::None
      };
      message.insert("format".to_string(), format.id().into());
    }
    EventKind::EndFile => {
      if let Some(text) = message.get("file_error").and_then(Value::as_str) {
        let code = ErrorCode::from_message(text);
        message.insert("error".to_string(), code.0.into());
      }
    }
    EventKind::Hook => {
      if let Some(hook_id) = message.get("hook_id").cloned() {
        message.insert("id".to_string(), hook_id);
      }
    }
    _ => {}
  }

  Some(RawEvent::new(
    kind,
    tag,
    ErrorCode::SUCCESS,
    Value::Object(message),
  ))
}
