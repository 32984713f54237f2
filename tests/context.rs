//! End-to-end request correlation through the public API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mpvctl::{
  Completion, ContextConfig, ErrorCode, EventKind, EventQueue, EventSource, Format, MpvContext,
  MpvError, NativeClient, Notification, PumpStrategy, RawEvent, RequestOptions,
  SharedPumpService, Tag,
};
use serde_json::{json, Value};

/// A player that answers property reads from a fixed table, with tags starting at an
/// arbitrary offset to prove replies are matched by tag alone.
struct FakePlayer {
  queue: EventQueue,
  last_tag: AtomicU64,
}

impl FakePlayer {
  fn new() -> Arc<Self> {
    Arc::new(Self {
      queue: EventQueue::new(),
      last_tag: AtomicU64::new(0),
    })
  }

  fn property(name: &str) -> Result<Value, ErrorCode> {
    match name {
      "pause" => Ok(json!(true)),
      "volume" => Ok(json!(75.5)),
      "media-title" => Ok(json!("Big Buck Bunny")),
      _ => Err(ErrorCode::PROPERTY_NOT_FOUND),
    }
  }
}

impl NativeClient for FakePlayer {
  fn submit_command(&self, tag: Tag, args: &[String]) -> Result<(), ErrorCode> {
    self.last_tag.store(tag, Ordering::SeqCst);
    let (error, result) = match args[0].as_str() {
      "expand-text" => (ErrorCode::SUCCESS, json!(args[1..].join(" "))),
      _ => (ErrorCode::COMMAND, Value::Null),
    };
    self.queue.push(RawEvent::new(
      EventKind::CommandReply,
      tag,
      error,
      json!({ "result": result }),
    ));
    Ok(())
  }

  fn submit_get_property(&self, tag: Tag, name: &str, _format: Format) -> Result<(), ErrorCode> {
    self.last_tag.store(tag, Ordering::SeqCst);
    let (error, data) = match Self::property(name) {
      Ok(data) => (ErrorCode::SUCCESS, data),
      Err(code) => (code, Value::Null),
    };
    self.queue.push(RawEvent::new(
      EventKind::GetPropertyReply,
      tag,
      error,
      json!({ "name": name, "format": Format::Node.id(), "data": data }),
    ));
    Ok(())
  }

  fn submit_set_property(
    &self,
    tag: Tag,
    _name: &str,
    _format: Format,
    _data: &Value,
  ) -> Result<(), ErrorCode> {
    self.last_tag.store(tag, Ordering::SeqCst);
    self.queue.push(RawEvent::new(
      EventKind::SetPropertyReply,
      tag,
      ErrorCode::SUCCESS,
      Value::Null,
    ));
    Ok(())
  }

  fn observe_property(&self, _id: Tag, _name: &str, _format: Format) -> Result<(), ErrorCode> {
    Ok(())
  }

  fn unobserve_property(&self, _id: Tag) -> Result<(), ErrorCode> {
    Ok(())
  }
}

impl EventSource for FakePlayer {
  fn wait_event(&self, timeout: Duration) -> Option<RawEvent> {
    self.queue.wait_event(timeout)
  }

  fn wakeup(&self) {
    self.queue.wakeup();
  }
}

fn started(player: &Arc<FakePlayer>, config: ContextConfig) -> MpvContext {
  let context = MpvContext::from_handle(player.clone(), config).unwrap();
  context.start().unwrap();
  context
}

#[tokio::test]
async fn test_property_read_resolves() {
  let player = FakePlayer::new();
  let context = started(&player, ContextConfig::default());

  let title: Completion<String> = context
    .get_property("media-title", RequestOptions::new())
    .await
    .unwrap();
  assert_eq!(title, Completion::Value("Big Buck Bunny".to_string()));

  let volume: Completion<f64> = context
    .get_property("volume", RequestOptions::new())
    .await
    .unwrap();
  assert_eq!(volume, Completion::Value(75.5));
  assert_eq!(player.last_tag.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_property_with_throw() {
  let player = FakePlayer::new();
  let context = started(&player, ContextConfig::default());

  let err = context
    .get_property::<Value>("no-such", RequestOptions::new().with_throw_on_error(true))
    .await
    .unwrap_err();
  assert_eq!(err.code(), Some(ErrorCode::PROPERTY_NOT_FOUND));

  let quiet = context
    .get_property::<Value>("no-such", RequestOptions::new())
    .await
    .unwrap();
  assert!(quiet.is_empty());
}

#[tokio::test]
async fn test_context_default_throw() {
  let player = FakePlayer::new();
  let config = ContextConfig {
    defaults: RequestOptions::new().with_throw_on_error(true),
    ..ContextConfig::default()
  };
  let context = started(&player, config);

  let err = context
    .run_command::<Value>(&["frobnicate"], RequestOptions::new())
    .await
    .unwrap_err();
  assert!(matches!(err, MpvError::Native { .. }));

  let text: Completion<String> = context
    .run_command(&["expand-text", "hello", "world"], RequestOptions::new())
    .await
    .unwrap();
  assert_eq!(text.value().as_deref(), Some("hello world"));
}

#[tokio::test]
async fn test_set_property_round() {
  let player = FakePlayer::new();
  let context = started(&player, ContextConfig::default());

  let done = context
    .set_property("pause", false, RequestOptions::new())
    .await
    .unwrap();
  assert_eq!(done, Completion::Value(()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_inline_pump() {
  let player = FakePlayer::new();
  let config = ContextConfig {
    pump: PumpStrategy::Inline,
    ..ContextConfig::default()
  };
  let context = started(&player, config);

  let paused: Completion<bool> = context
    .get_property("pause", RequestOptions::new())
    .await
    .unwrap();
  assert_eq!(paused, Completion::Value(true));
  context.shutdown();
}

#[tokio::test]
async fn test_shared_pump_serves_two_contexts() {
  let service = SharedPumpService::start("mpv-shared-test").unwrap();
  let first_player = FakePlayer::new();
  let second_player = FakePlayer::new();

  let first = MpvContext::with_shared_pump(
    first_player.clone(),
    first_player.clone(),
    ContextConfig::default(),
    &service,
  )
  .unwrap();
  let second = MpvContext::with_shared_pump(
    second_player.clone(),
    second_player.clone(),
    ContextConfig::default(),
    &service,
  )
  .unwrap();
  first.start().unwrap();
  second.start().unwrap();

  let (a, b) = tokio::join!(
    first.get_property::<bool>("pause", RequestOptions::new()),
    second.get_property::<f64>("volume", RequestOptions::new()),
  );
  assert_eq!(a.unwrap(), Completion::Value(true));
  assert_eq!(b.unwrap(), Completion::Value(75.5));

  first.shutdown();
  second.shutdown();
  service.shutdown();
}

#[tokio::test]
async fn test_shutdown_notification_reaches_stream() {
  let player = FakePlayer::new();
  let context = started(&player, ContextConfig::default());
  let events = context.events();

  player
    .queue
    .push(RawEvent::notification(EventKind::Shutdown, Value::Null));

  let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(event, Notification::Shutdown);
}
