//! Client context: owns the event pump and exposes the asynchronous request API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_channel::Receiver;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::dispatch::Dispatcher;
use super::error::MpvError;
use super::native::{EventSource, NativeClient};
use super::observer::{ObserverId, Observers};
use super::protocol::{ErrorCode, Format, Notification, Reply, ReplyData, ReplyKind, Tag};
use super::pump::{
  DedicatedPump, EventPump, InlinePump, PumpCore, PumpState, SharedPump, SharedPumpService,
};
use super::registry::{CorrelationRegistry, WaitOutcome};
use crate::config::{ContextConfig, PumpStrategy, RequestOptions, ResolvedOptions};

/// Result of a request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
  /// The reply carried a value.
  Value(T),
  /// No value: fire-and-forget, a failed reply with `throw_on_error` off, or a reply
  /// without data.
  Empty,
  /// The caller's cancellation token fired first.
  Cancelled,
}

impl<T> Completion<T> {
  pub fn value(self) -> Option<T> {
    match self {
      Completion::Value(value) => Some(value),
      _ => None,
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Completion::Empty)
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, Completion::Cancelled)
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
    match self {
      Completion::Value(value) => Completion::Value(f(value)),
      Completion::Empty => Completion::Empty,
      Completion::Cancelled => Completion::Cancelled,
    }
  }
}

/// A request before submission.
enum Request<'a> {
  Command(Vec<String>),
  GetProperty(&'a str),
  SetProperty(&'a str, Value),
}

impl Request<'_> {
  fn kind(&self) -> ReplyKind {
    match self {
      Request::Command(_) => ReplyKind::Command,
      Request::GetProperty(_) => ReplyKind::GetProperty,
      Request::SetProperty(..) => ReplyKind::SetProperty,
    }
  }

  fn describe(&self) -> String {
    match self {
      Request::Command(args) => {
        format!("command {:?}", args.first().map(String::as_str).unwrap_or(""))
      }
      Request::GetProperty(name) => format!("get property {:?}", name),
      Request::SetProperty(name, _) => format!("set property {:?}", name),
    }
  }

  fn submit(&self, native: &dyn NativeClient, tag: Tag) -> Result<(), ErrorCode> {
    match self {
      Request::Command(args) => native.submit_command(tag, args),
      Request::GetProperty(name) => native.submit_get_property(tag, name, Format::Node),
      Request::SetProperty(name, value) => {
        native.submit_set_property(tag, name, Format::Node, value)
      }
    }
  }
}

/// Hands a tag back to the native client when its wait ends, however it ends.
struct TagRelease<'a> {
  native: &'a dyn NativeClient,
  tag: Tag,
}

impl Drop for TagRelease<'_> {
  fn drop(&mut self) {
    self.native.release(self.tag);
  }
}

/// Bookkeeping for a request awaiting its reply.
struct PendingRequest {
  tag: Tag,
  kind: ReplyKind,
  target: String,
  submitted_at: Instant,
  options: ResolvedOptions,
}

/// Client context over one native handle.
///
/// Many requests may be in flight at once, from any number of tasks or threads; each
/// gets its own tag and waits only for its own reply.
pub struct MpvContext {
  native: Arc<dyn NativeClient>,
  registry: Arc<CorrelationRegistry>,
  observers: Arc<Observers>,
  pump: Box<dyn EventPump>,
  next_tag: AtomicU64,
  defaults: RwLock<RequestOptions>,
  disposed: AtomicBool,
}

impl MpvContext {
  /// Create a context. The pump strategy comes from `config`; `Shared` uses the
  /// process-wide [`SharedPumpService`].
  pub fn new(
    native: Arc<dyn NativeClient>,
    source: Arc<dyn EventSource>,
    config: ContextConfig,
  ) -> Result<Self, MpvError> {
    let service = match config.pump {
      PumpStrategy::Shared => Some(SharedPumpService::global()?),
      _ => None,
    };
    Self::build(native, source, config, service)
  }

  /// Create a context driven by an explicit shared pump service, whatever the
  /// configured strategy.
  pub fn with_shared_pump(
    native: Arc<dyn NativeClient>,
    source: Arc<dyn EventSource>,
    config: ContextConfig,
    service: &SharedPumpService,
  ) -> Result<Self, MpvError> {
    Self::build(native, source, config, Some(service.clone()))
  }

  /// Create a context from a handle that is both request sink and event source.
  pub fn from_handle<H>(handle: Arc<H>, config: ContextConfig) -> Result<Self, MpvError>
  where
    H: NativeClient + EventSource + 'static,
  {
    let native: Arc<dyn NativeClient> = handle.clone();
    let source: Arc<dyn EventSource> = handle;
    Self::new(native, source, config)
  }

  fn build(
    native: Arc<dyn NativeClient>,
    source: Arc<dyn EventSource>,
    config: ContextConfig,
    service: Option<SharedPumpService>,
  ) -> Result<Self, MpvError> {
    config.validate().map_err(MpvError::Config)?;

    let registry = Arc::new(CorrelationRegistry::new());
    let observers = Arc::new(Observers::new(config.event_capacity));
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), observers.clone()));
    let core = PumpCore::new(source, dispatcher, config.wait_slice());

    let pump: Box<dyn EventPump> = match (service, config.pump) {
      (Some(service), _) => Box::new(SharedPump::new(core, service)),
      (None, PumpStrategy::Inline) => Box::new(InlinePump::new(core)),
      (None, _) => Box::new(DedicatedPump::new(core, config.thread_name.clone())),
    };

    Ok(Self {
      native,
      registry,
      observers,
      pump,
      next_tag: AtomicU64::new(1),
      defaults: RwLock::new(config.defaults),
      disposed: AtomicBool::new(false),
    })
  }

  /// Start pumping events.
  pub fn start(&self) -> Result<(), MpvError> {
    self.ensure_alive()?;
    self.pump.start()?;
    log::info!("MPV context started");
    Ok(())
  }

  /// Tear the context down: stop the pump, then release every outstanding request with
  /// [`MpvError::Disposed`]. Later requests fail immediately. Idempotent.
  pub fn shutdown(&self) {
    if self.disposed.swap(true, Ordering::SeqCst) {
      return;
    }
    log::info!("Shutting down MPV context");
    self.pump.stop();
    self.registry.close();
    self.observers.close();
  }

  pub fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::SeqCst)
  }

  pub fn pump_state(&self) -> PumpState {
    self.pump.state()
  }

  /// Context-wide request defaults.
  pub fn default_options(&self) -> RequestOptions {
    *self.defaults.read()
  }

  pub fn set_default_options(&self, options: RequestOptions) {
    *self.defaults.write() = options;
  }

  /// Number of requests currently awaiting a reply.
  pub fn pending_requests(&self) -> usize {
    self.registry.len()
  }

  /// Register a callback for unsolicited notifications. Runs on the pump thread.
  pub fn subscribe<F>(&self, callback: F) -> ObserverId
  where
    F: Fn(&Notification) + Send + Sync + 'static,
  {
    self.observers.subscribe(callback)
  }

  pub fn unsubscribe(&self, id: ObserverId) -> bool {
    self.observers.unsubscribe(id)
  }

  /// Get event receiver for property changes and other notifications.
  pub fn events(&self) -> Receiver<Notification> {
    self.observers.events()
  }

  /// Observe a property; changes arrive as [`Notification::PropertyChange`] with `id`.
  pub fn observe_property(&self, id: Tag, name: &str, format: Format) -> Result<(), MpvError> {
    self.ensure_alive()?;
    self
      .native
      .observe_property(id, name, format)
      .map_err(|code| self.submit_error(format!("observe property {:?}", name), code))
  }

  pub fn unobserve_property(&self, id: Tag) -> Result<(), MpvError> {
    self.ensure_alive()?;
    self
      .native
      .unobserve_property(id)
      .map_err(|code| self.submit_error(format!("unobserve {}", id), code))
  }

  /// Run a command, e.g. `["loadfile", url]`.
  pub async fn run_command<T: DeserializeOwned>(
    &self,
    args: &[&str],
    options: RequestOptions,
  ) -> Result<Completion<T>, MpvError> {
    self
      .run_command_with_cancel(args, options, &CancellationToken::new())
      .await
  }

  pub async fn run_command_with_cancel<T: DeserializeOwned>(
    &self,
    args: &[&str],
    options: RequestOptions,
    cancel: &CancellationToken,
  ) -> Result<Completion<T>, MpvError> {
    if args.is_empty() {
      return Err(MpvError::InvalidArgument(
        "command needs at least one argument".to_string(),
      ));
    }
    let args = args.iter().map(|arg| arg.to_string()).collect();
    self.request(Request::Command(args), options, cancel).await
  }

  /// Read a property, decoded as `T`.
  pub async fn get_property<T: DeserializeOwned>(
    &self,
    name: &str,
    options: RequestOptions,
  ) -> Result<Completion<T>, MpvError> {
    self
      .get_property_with_cancel(name, options, &CancellationToken::new())
      .await
  }

  pub async fn get_property_with_cancel<T: DeserializeOwned>(
    &self,
    name: &str,
    options: RequestOptions,
    cancel: &CancellationToken,
  ) -> Result<Completion<T>, MpvError> {
    self.request(Request::GetProperty(name), options, cancel).await
  }

  /// Write a property. Success completes with `Completion::Value(())`.
  pub async fn set_property<V: Serialize>(
    &self,
    name: &str,
    value: V,
    options: RequestOptions,
  ) -> Result<Completion<()>, MpvError> {
    self
      .set_property_with_cancel(name, value, options, &CancellationToken::new())
      .await
  }

  pub async fn set_property_with_cancel<V: Serialize>(
    &self,
    name: &str,
    value: V,
    options: RequestOptions,
    cancel: &CancellationToken,
  ) -> Result<Completion<()>, MpvError> {
    let value = serde_json::to_value(value)
      .map_err(|e| MpvError::InvalidArgument(format!("property {:?}: {}", name, e)))?;
    self
      .request(Request::SetProperty(name, value), options, cancel)
      .await
  }

  fn ensure_alive(&self) -> Result<(), MpvError> {
    if self.is_disposed() {
      return Err(MpvError::Disposed);
    }
    Ok(())
  }

  pub(crate) fn next_tag(&self) -> Tag {
    self.next_tag.fetch_add(1, Ordering::SeqCst)
  }

  fn submit_error(&self, target: String, code: ErrorCode) -> MpvError {
    MpvError::Submit {
      target,
      code,
      message: self.native.error_string(code),
    }
  }

  /// Shared request path for all three operations.
  async fn request<T: DeserializeOwned>(
    &self,
    request: Request<'_>,
    options: RequestOptions,
    cancel: &CancellationToken,
  ) -> Result<Completion<T>, MpvError> {
    self.ensure_alive()?;
    let options = options.resolve(&self.default_options());

    if !options.wait_for_response {
      request
        .submit(self.native.as_ref(), 0)
        .map_err(|code| self.submit_error(request.describe(), code))?;
      return Ok(Completion::Empty);
    }

    let pending = PendingRequest {
      tag: self.next_tag(),
      kind: request.kind(),
      target: request.describe(),
      submitted_at: Instant::now(),
      options,
    };
    if !self.registry.register(pending.tag) {
      return Err(MpvError::Disposed);
    }
    if let Err(code) = request.submit(self.native.as_ref(), pending.tag) {
      self.registry.forget(pending.tag);
      return Err(self.submit_error(pending.target, code));
    }
    log::debug!("Submitted {} with tag {}", pending.target, pending.tag);
    let _release = TagRelease {
      native: self.native.as_ref(),
      tag: pending.tag,
    };

    let outcome = self
      .registry
      .wait(pending.tag, pending.options.timeout, cancel)
      .await;
    self.complete(pending, outcome)
  }

  /// Translate a wait outcome into the caller-visible result.
  fn complete<T: DeserializeOwned>(
    &self,
    pending: PendingRequest,
    outcome: WaitOutcome,
  ) -> Result<Completion<T>, MpvError> {
    let reply: Reply = match outcome {
      WaitOutcome::Reply(reply) => reply,
      WaitOutcome::TimedOut => {
        log::warn!(
          "{} timed out after {} ms (tag {})",
          pending.target,
          pending.options.timeout_millis(),
          pending.tag
        );
        return Err(MpvError::Timeout {
          tag: pending.tag,
          target: pending.target,
          timeout_ms: pending.options.timeout_millis(),
        });
      }
      WaitOutcome::Cancelled => {
        log::debug!("{} cancelled (tag {})", pending.target, pending.tag);
        return Ok(Completion::Cancelled);
      }
      WaitOutcome::Closed => return Err(MpvError::Disposed),
    };

    log::debug!(
      "Reply for tag {} after {:?}",
      pending.tag,
      pending.submitted_at.elapsed()
    );
    if reply.kind != pending.kind {
      log::warn!(
        "Tag {} expected a {:?} reply, got {:?}",
        pending.tag,
        pending.kind,
        reply.kind
      );
    }

    if reply.error.is_failure() {
      if pending.options.throw_on_error {
        return Err(MpvError::Native {
          tag: pending.tag,
          target: pending.target,
          code: reply.error,
          message: self.native.error_string(reply.error),
        });
      }
      return Ok(Completion::Empty);
    }

    match reply.data {
      ReplyData::Empty => Ok(Completion::Empty),
      ReplyData::Value(value) => serde_json::from_value(value)
        .map(Completion::Value)
        .map_err(|e| MpvError::Decode {
          tag: pending.tag,
          target: pending.target,
          reason: e.to_string(),
        }),
      ReplyData::Malformed(reason) => Err(MpvError::Decode {
        tag: pending.tag,
        target: pending.target,
        reason,
      }),
    }
  }
}

impl Drop for MpvContext {
  fn drop(&mut self) {
    self.shutdown();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mpv::protocol::{EventKind, PropertyChange, PropertyValue, RawEvent};
  use crate::mpv::test_support::{ScriptedNative, Submission};
  use serde_json::json;
  use std::collections::HashSet;
  use std::time::Duration;

  fn context(native: &Arc<ScriptedNative>) -> MpvContext {
    let context = MpvContext::from_handle(native.clone(), ContextConfig::default()).unwrap();
    context.start().unwrap();
    context
  }

  fn property_reply(tag: Tag, error: ErrorCode, data: Value) -> RawEvent {
    RawEvent::new(
      EventKind::GetPropertyReply,
      tag,
      error,
      json!({"name": "pause", "format": Format::Flag.id(), "data": data}),
    )
  }

  #[tokio::test]
  async fn test_get_property_resolves_value() {
    let native = ScriptedNative::with_responder(|submission| match submission {
      Submission::GetProperty { tag, .. } => {
        vec![property_reply(*tag, ErrorCode::SUCCESS, json!(true))]
      }
      _ => vec![],
    });
    let context = context(&native);

    let paused: Completion<bool> = context
      .get_property("pause", RequestOptions::new())
      .await
      .unwrap();
    assert_eq!(paused, Completion::Value(true));
    assert_eq!(context.pending_requests(), 0);
  }

  #[tokio::test]
  async fn test_native_error_with_throw() {
    let native = ScriptedNative::with_responder(|submission| match submission {
      Submission::GetProperty { tag, .. } => {
        vec![property_reply(*tag, ErrorCode(-5), Value::Null)]
      }
      _ => vec![],
    });
    let context = context(&native);

    let err = context
      .get_property::<bool>("pause", RequestOptions::new().with_throw_on_error(true))
      .await
      .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode(-5)));
    assert!(matches!(err, MpvError::Native { .. }));
  }

  #[tokio::test]
  async fn test_native_error_without_throw_is_empty() {
    let native = ScriptedNative::with_responder(|submission| match submission {
      Submission::GetProperty { tag, .. } => {
        vec![property_reply(*tag, ErrorCode::PROPERTY_UNAVAILABLE, Value::Null)]
      }
      _ => vec![],
    });
    let context = context(&native);

    let result = context
      .get_property::<bool>("pause", RequestOptions::new())
      .await
      .unwrap();
    assert!(result.is_empty());
  }

  #[tokio::test]
  async fn test_timeout_names_tag_and_target() {
    let native = ScriptedNative::silent();
    let context = context(&native);

    let err = context
      .get_property::<f64>("volume", RequestOptions::new().with_timeout_millis(30))
      .await
      .unwrap_err();
    match err {
      MpvError::Timeout {
        tag,
        target,
        timeout_ms,
      } => {
        assert_eq!(tag, 1);
        assert!(target.contains("volume"));
        assert_eq!(timeout_ms, 30);
      }
      other => panic!("Expected timeout, got {:?}", other),
    }
    assert_eq!(context.pending_requests(), 0);
  }

  #[tokio::test]
  async fn test_every_awaited_tag_is_released() {
    let native = ScriptedNative::with_responder(|submission| match submission {
      Submission::GetProperty { tag, name, .. } if name == "pause" => {
        vec![property_reply(*tag, ErrorCode::SUCCESS, json!(false))]
      }
      _ => vec![],
    });
    let context = context(&native);

    context
      .get_property::<bool>("pause", RequestOptions::new())
      .await
      .unwrap();
    let err = context
      .get_property::<f64>("volume", RequestOptions::new().with_timeout_millis(5))
      .await
      .unwrap_err();
    assert!(err.is_timeout());
    context
      .run_command::<Value>(&["stop"], RequestOptions::fire_and_forget())
      .await
      .unwrap();

    assert_eq!(native.released(), vec![1, 2]);
  }

  #[tokio::test]
  async fn test_decode_error_ignores_throw_flag() {
    let native = ScriptedNative::with_responder(|submission| match submission {
      Submission::Command { tag, .. } => vec![RawEvent::new(
        EventKind::CommandReply,
        *tag,
        ErrorCode::SUCCESS,
        json!({"result": "not a number"}),
      )],
      _ => vec![],
    });
    let context = context(&native);

    let err = context
      .run_command::<i64>(&["expand-text", "x"], RequestOptions::new())
      .await
      .unwrap_err();
    assert!(matches!(err, MpvError::Decode { .. }));
  }

  #[tokio::test]
  async fn test_fire_and_forget_leaves_registry_empty() {
    let native = ScriptedNative::silent();
    let context = context(&native);

    for _ in 0..25 {
      let result = context
        .run_command::<Value>(&["seek", "10"], RequestOptions::fire_and_forget())
        .await
        .unwrap();
      assert!(result.is_empty());
      assert_eq!(context.pending_requests(), 0);
    }
    assert!(native.submissions().iter().all(|s| s.tag() == 0));
  }

  #[tokio::test]
  async fn test_empty_command_rejected_before_tag() {
    let native = ScriptedNative::silent();
    let context = context(&native);

    let err = context
      .run_command::<Value>(&[], RequestOptions::new())
      .await
      .unwrap_err();
    assert!(matches!(err, MpvError::InvalidArgument(_)));
    assert!(native.submissions().is_empty());
    assert_eq!(context.next_tag(), 1);
  }

  #[tokio::test]
  async fn test_set_property_acknowledged() {
    let native = ScriptedNative::with_responder(|submission| match submission {
      Submission::SetProperty { tag, .. } => vec![RawEvent::new(
        EventKind::SetPropertyReply,
        *tag,
        ErrorCode::SUCCESS,
        Value::Null,
      )],
      _ => vec![],
    });
    let context = context(&native);

    let result = context
      .set_property("volume", 50, RequestOptions::new())
      .await
      .unwrap();
    assert_eq!(result, Completion::Value(()));
    match &native.submissions()[0] {
      Submission::SetProperty { name, data, .. } => {
        assert_eq!(name, "volume");
        assert_eq!(data, &json!(50));
      }
      other => panic!("Unexpected submission {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_submit_failure_is_reported() {
    let native = ScriptedNative::silent();
    native.reject_with(ErrorCode::UNINITIALIZED);
    let context = context(&native);

    let err = context
      .run_command::<Value>(&["stop"], RequestOptions::new())
      .await
      .unwrap_err();
    assert!(matches!(err, MpvError::Submit { .. }));
    assert_eq!(err.code(), Some(ErrorCode::UNINITIALIZED));
    assert_eq!(context.pending_requests(), 0);
  }

  #[tokio::test]
  async fn test_cancellation_is_not_an_error() {
    let native = ScriptedNative::silent();
    let context = context(&native);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(10)).await;
      trigger.cancel();
    });

    let result = context
      .get_property_with_cancel::<bool>(
        "pause",
        RequestOptions::new().with_timeout_millis(-1),
        &cancel,
      )
      .await
      .unwrap();
    assert!(result.is_cancelled());
    assert_eq!(context.pending_requests(), 0);
  }

  #[tokio::test]
  async fn test_context_defaults_apply() {
    let native = ScriptedNative::silent();
    let context = context(&native);
    context.set_default_options(RequestOptions::new().with_wait_for_response(false));

    let result = context
      .get_property::<bool>("pause", RequestOptions::new())
      .await
      .unwrap();
    assert!(result.is_empty());
    assert_eq!(native.submissions()[0].tag(), 0);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_requests_get_distinct_tags() {
    let native = ScriptedNative::with_responder(|submission| match submission {
      Submission::GetProperty { tag, .. } => vec![RawEvent::new(
        EventKind::GetPropertyReply,
        *tag,
        ErrorCode::SUCCESS,
        json!({"name": "time-pos", "format": Format::Int64.id(), "data": *tag}),
      )],
      _ => vec![],
    });
    let context = Arc::new(context(&native));

    let mut tasks = Vec::new();
    for _ in 0..32 {
      let context = context.clone();
      tasks.push(tokio::spawn(async move {
        context
          .get_property::<u64>("time-pos", RequestOptions::new())
          .await
      }));
    }

    let mut tags = HashSet::new();
    for task in tasks {
      let tag = task.await.unwrap().unwrap().value().unwrap();
      assert!(tags.insert(tag));
    }
    assert_eq!(tags.len(), 32);
    assert!(tags.iter().all(|tag| (1..=32).contains(tag)));
  }

  #[test]
  fn test_tags_increase_monotonically() {
    let native = ScriptedNative::silent();
    let context = MpvContext::from_handle(native, ContextConfig::default()).unwrap();
    let tags: Vec<Tag> = (0..5).map(|_| context.next_tag()).collect();
    assert_eq!(tags, vec![1, 2, 3, 4, 5]);
  }

  #[tokio::test]
  async fn test_shutdown_releases_waiters() {
    let native = ScriptedNative::silent();
    let context = Arc::new(context(&native));

    let waiter = context.clone();
    let task = tokio::spawn(async move {
      waiter
        .get_property::<bool>("pause", RequestOptions::new().with_timeout_millis(-1))
        .await
    });
    while context.pending_requests() == 0 {
      tokio::time::sleep(Duration::from_millis(2)).await;
    }
    context.shutdown();

    assert!(matches!(task.await.unwrap(), Err(MpvError::Disposed)));
    assert_eq!(context.pump_state(), PumpState::Stopped);
    assert!(matches!(
      context
        .get_property::<bool>("pause", RequestOptions::new())
        .await,
      Err(MpvError::Disposed)
    ));
  }

  #[tokio::test]
  async fn test_property_change_notifications() {
    let native = ScriptedNative::silent();
    let context = context(&native);
    context
      .observe_property(42, "volume", Format::Double)
      .unwrap();
    native.push(RawEvent::new(
      EventKind::PropertyChange,
      42,
      ErrorCode::SUCCESS,
      json!({"name": "volume", "format": Format::Double.id(), "data": 80.0}),
    ));

    let event = tokio::time::timeout(Duration::from_secs(5), context.events().recv())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(
      event,
      Notification::PropertyChange(PropertyChange {
        id: 42,
        name: "volume".to_string(),
        value: PropertyValue::Number(80.0),
      })
    );
    assert!(matches!(
      native.submissions()[0],
      Submission::Observe { id: 42, .. }
    ));
  }
}
