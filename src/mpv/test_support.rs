//! Scripted native handle for tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use super::native::{EventQueue, EventSource, NativeClient};
use super::protocol::{ErrorCode, Format, RawEvent, Tag};

/// A request as it reached the native surface.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Submission {
  Command {
    tag: Tag,
    args: Vec<String>,
  },
  GetProperty {
    tag: Tag,
    name: String,
    format: Format,
  },
  SetProperty {
    tag: Tag,
    name: String,
    format: Format,
    data: Value,
  },
  Observe {
    id: Tag,
    name: String,
    format: Format,
  },
  Unobserve {
    id: Tag,
  },
}

impl Submission {
  pub(crate) fn tag(&self) -> Tag {
    match self {
      Submission::Command { tag, .. }
      | Submission::GetProperty { tag, .. }
      | Submission::SetProperty { tag, .. } => *tag,
      Submission::Observe { id, .. } | Submission::Unobserve { id } => *id,
    }
  }
}

type Responder = Box<dyn Fn(&Submission) -> Vec<RawEvent> + Send + Sync>;

/// Records every submission and answers through its own event queue.
pub(crate) struct ScriptedNative {
  queue: EventQueue,
  submissions: Mutex<Vec<Submission>>,
  responder: Responder,
  reject: Mutex<Option<ErrorCode>>,
  released: Mutex<Vec<Tag>>,
}

impl ScriptedNative {
  /// Answer each submission with the events `responder` returns.
  pub(crate) fn with_responder<F>(responder: F) -> Arc<Self>
  where
    F: Fn(&Submission) -> Vec<RawEvent> + Send + Sync + 'static,
  {
    Arc::new(Self {
      queue: EventQueue::new(),
      submissions: Mutex::new(Vec::new()),
      responder: Box::new(responder),
      reject: Mutex::new(None),
      released: Mutex::new(Vec::new()),
    })
  }

  /// Never answer anything.
  pub(crate) fn silent() -> Arc<Self> {
    Self::with_responder(|_| Vec::new())
  }

  /// Refuse every later submission with `code`.
  pub(crate) fn reject_with(&self, code: ErrorCode) {
    *self.reject.lock() = Some(code);
  }

  pub(crate) fn push(&self, event: RawEvent) {
    self.queue.push(event);
  }

  pub(crate) fn submissions(&self) -> Vec<Submission> {
    self.submissions.lock().clone()
  }

  /// Tags handed back by the context, in order.
  pub(crate) fn released(&self) -> Vec<Tag> {
    self.released.lock().clone()
  }

  fn record(&self, submission: Submission) -> Result<(), ErrorCode> {
    if let Some(code) = *self.reject.lock() {
      return Err(code);
    }
    let replies = (self.responder)(&submission);
    self.submissions.lock().push(submission);
    for event in replies {
      self.queue.push(event);
    }
    Ok(())
  }
}

impl NativeClient for ScriptedNative {
  fn submit_command(&self, tag: Tag, args: &[String]) -> Result<(), ErrorCode> {
    self.record(Submission::Command {
      tag,
      args: args.to_vec(),
    })
  }

  fn submit_get_property(&self, tag: Tag, name: &str, format: Format) -> Result<(), ErrorCode> {
    self.record(Submission::GetProperty {
      tag,
      name: name.to_string(),
      format,
    })
  }

  fn submit_set_property(
    &self,
    tag: Tag,
    name: &str,
    format: Format,
    data: &Value,
  ) -> Result<(), ErrorCode> {
    self.record(Submission::SetProperty {
      tag,
      name: name.to_string(),
      format,
      data: data.clone(),
    })
  }

  fn observe_property(&self, id: Tag, name: &str, format: Format) -> Result<(), ErrorCode> {
    self.record(Submission::Observe {
      id,
      name: name.to_string(),
      format,
    })
  }

  fn unobserve_property(&self, id: Tag) -> Result<(), ErrorCode> {
    self.record(Submission::Unobserve { id })
  }

  fn release(&self, tag: Tag) {
    self.released.lock().push(tag);
  }
}

impl EventSource for ScriptedNative {
  fn wait_event(&self, timeout: Duration) -> Option<RawEvent> {
    self.queue.wait_event(timeout)
  }

  fn wakeup(&self) {
    self.queue.wakeup();
  }
}
