//! Event dispatcher: decodes raw events and routes them.
//!
//! Replies go to the correlation registry, unsolicited notifications go to observers.
//! Routing is a fixed table from event kind to decoder; nothing here ever fails the
//! caller. Unknown or malformed notifications are logged and dropped.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::observer::Observers;
use super::protocol::{
  ClientMessage, CommandResult, EndFile, EventKind, Format, Hook, LogMessage, Notification,
  PropertyChange, PropertyData, PropertyValue, RawEvent, Reply, ReplyData, ReplyKind, StartFile,
};
use super::registry::CorrelationRegistry;

/// Target used when re-emitting the player's own log lines.
pub const PLAYER_LOG_TARGET: &str = "mpv";

enum Decoded {
  Reply(Reply),
  Notification(Notification),
}

type Decoder = fn(&RawEvent) -> Result<Decoded, String>;

fn decoder(kind: EventKind) -> Option<Decoder> {
  let decode: Decoder = match kind {
    EventKind::None => return None,
    EventKind::CommandReply => decode_command_reply,
    EventKind::GetPropertyReply => decode_get_property_reply,
    EventKind::SetPropertyReply => decode_set_property_reply,
    EventKind::LogMessage => {
      |e| payload(e).map(Notification::LogMessage).map(Decoded::Notification)
    }
    EventKind::StartFile => {
      |e| payload(e).map(Notification::StartFile).map(Decoded::Notification)
    }
    EventKind::EndFile => {
      |e| payload::<EndFile>(e).map(Notification::EndFile).map(Decoded::Notification)
    }
    EventKind::ClientMessage => {
      |e| payload::<ClientMessage>(e).map(Notification::ClientMessage).map(Decoded::Notification)
    }
    EventKind::Hook => |e| payload::<Hook>(e).map(Notification::Hook).map(Decoded::Notification),
    EventKind::PropertyChange => decode_property_change,
    EventKind::Shutdown => |_| Ok(Decoded::Notification(Notification::Shutdown)),
    EventKind::FileLoaded => |_| Ok(Decoded::Notification(Notification::FileLoaded)),
    EventKind::Idle => |_| Ok(Decoded::Notification(Notification::Idle)),
    EventKind::Tick => |_| Ok(Decoded::Notification(Notification::Tick)),
    EventKind::VideoReconfig => |_| Ok(Decoded::Notification(Notification::VideoReconfig)),
    EventKind::AudioReconfig => |_| Ok(Decoded::Notification(Notification::AudioReconfig)),
    EventKind::Seek => |_| Ok(Decoded::Notification(Notification::Seek)),
    EventKind::PlaybackRestart => |_| Ok(Decoded::Notification(Notification::PlaybackRestart)),
    EventKind::QueueOverflow => |_| Ok(Decoded::Notification(Notification::QueueOverflow)),
  };
  Some(decode)
}

fn payload<T: DeserializeOwned>(event: &RawEvent) -> Result<T, String> {
  serde_json::from_value(event.payload.clone()).map_err(|e| e.to_string())
}

fn reply(event: &RawEvent, kind: ReplyKind, data: ReplyData) -> Decoded {
  Decoded::Reply(Reply {
    tag: event.tag,
    kind,
    error: event.error,
    data,
  })
}

fn decode_command_reply(event: &RawEvent) -> Result<Decoded, String> {
  let data = match &event.payload {
    Value::Null => ReplyData::Empty,
    _ => match payload::<CommandResult>(event) {
      Ok(CommandResult { result: Value::Null }) => ReplyData::Empty,
      Ok(CommandResult { result }) => ReplyData::Value(result),
      Err(reason) => ReplyData::Malformed(reason),
    },
  };
  Ok(reply(event, ReplyKind::Command, data))
}

fn decode_get_property_reply(event: &RawEvent) -> Result<Decoded, String> {
  if event.error.is_failure() {
    return Ok(reply(event, ReplyKind::GetProperty, ReplyData::Empty));
  }
  let data = match payload::<PropertyData>(event) {
    Ok(property) => match Format::from_id(property.format) {
      None => {
        log::debug!(
          "Property {} has unknown format {}, treating as empty",
          property.name,
          property.format
        );
        ReplyData::Empty
      }
      Some(format) => match format.check(property.data) {
        Ok(Some(value)) => ReplyData::Value(value),
        Ok(None) => ReplyData::Empty,
        Err(reason) => ReplyData::Malformed(format!("property {}: {}", property.name, reason)),
      },
    },
    Err(reason) => ReplyData::Malformed(reason),
  };
  Ok(reply(event, ReplyKind::GetProperty, data))
}

fn decode_set_property_reply(event: &RawEvent) -> Result<Decoded, String> {
  // acknowledgement only; the unit value decodes as `()` for the caller
  Ok(reply(event, ReplyKind::SetProperty, ReplyData::Value(Value::Null)))
}

fn decode_property_change(event: &RawEvent) -> Result<Decoded, String> {
  let property: PropertyData = payload(event)?;
  let value = match Format::from_id(property.format) {
    Some(format) => format
      .check(property.data)?
      .map(PropertyValue::from)
      .unwrap_or(PropertyValue::Null),
    None => PropertyValue::Null,
  };
  Ok(Decoded::Notification(Notification::PropertyChange(
    PropertyChange {
      id: event.tag,
      name: property.name,
      value,
    },
  )))
}

/// Routes decoded events to the registry or to observers.
pub struct Dispatcher {
  registry: Arc<CorrelationRegistry>,
  observers: Arc<Observers>,
}

impl Dispatcher {
  pub fn new(registry: Arc<CorrelationRegistry>, observers: Arc<Observers>) -> Self {
    Self {
      registry,
      observers,
    }
  }

  /// Decode and handle one event. Runs on the pump thread.
  pub fn dispatch(&self, event: RawEvent) {
    let Some(kind) = event.kind() else {
      log::warn!("Dropping event with unknown kind {}", event.kind);
      return;
    };
    let Some(decode) = decoder(kind) else {
      return;
    };

    match decode(&event) {
      Ok(Decoded::Reply(reply)) => self.route_reply(reply),
      Ok(Decoded::Notification(notification)) => {
        if let Notification::LogMessage(message) = &notification {
          emit_player_log(message);
        }
        log::debug!("Dispatching {} notification", kind.name());
        self.observers.notify(notification);
      }
      Err(reason) => log::warn!("Dropping malformed {} event: {}", kind.name(), reason),
    }
  }

  fn route_reply(&self, reply: Reply) {
    if reply.tag == 0 {
      log::debug!("Ignoring uncorrelated {:?} reply", reply.kind);
      return;
    }
    if reply.error.is_failure() {
      log::debug!(
        "Reply for tag {} failed: {} ({})",
        reply.tag,
        reply.error.message(),
        reply.error
      );
    }
    self.registry.publish(reply);
  }
}

fn emit_player_log(message: &LogMessage) {
  if let Some(level) = message.log_level() {
    log::log!(
      target: PLAYER_LOG_TARGET,
      level,
      "[{}] {}",
      message.prefix,
      message.text.trim_end()
    );
  }
}
