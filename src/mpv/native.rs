//! Native client surface consumed by the correlation engine.
//!
//! The engine never talks to the player directly. It submits tagged requests through
//! [`NativeClient`] and pulls their answers from an [`EventSource`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;

use super::protocol::{ErrorCode, Format, RawEvent, Tag};

/// Blocking event queue of a native client handle.
pub trait EventSource: Send + Sync {
  /// Block until an event is available, `timeout` elapses or [`wakeup`](Self::wakeup)
  /// is called. Returns `None` in the latter two cases.
  fn wait_event(&self, timeout: Duration) -> Option<RawEvent>;

  /// Interrupt a blocked [`wait_event`](Self::wait_event) from another thread.
  fn wakeup(&self);
}

/// "Fire now, reply later" request submission.
///
/// Every call returns the immediate status only; the actual answer arrives as a reply
/// event carrying the same tag. Tag `0` asks for no reply correlation.
pub trait NativeClient: Send + Sync {
  fn submit_command(&self, tag: Tag, args: &[String]) -> Result<(), ErrorCode>;

  fn submit_get_property(&self, tag: Tag, name: &str, format: Format) -> Result<(), ErrorCode>;

  fn submit_set_property(
    &self,
    tag: Tag,
    name: &str,
    format: Format,
    data: &Value,
  ) -> Result<(), ErrorCode>;

  /// Subscribe to changes of `name`; notifications carry `id` as their tag.
  fn observe_property(&self, id: Tag, name: &str, format: Format) -> Result<(), ErrorCode>;

  fn unobserve_property(&self, id: Tag) -> Result<(), ErrorCode>;

  /// Nobody awaits `tag` any more, whether it was answered, timed out or cancelled.
  /// Drop any per-request state kept for it.
  fn release(&self, _tag: Tag) {}

  /// Human-readable text for an error code.
  fn error_string(&self, code: ErrorCode) -> String {
    code.message().to_string()
  }
}

struct QueueState {
  events: VecDeque<RawEvent>,
  woken: bool,
}

/// In-memory [`EventSource`] backed by a mutex and condition variable.
///
/// Transports push decoded wire messages into it; the event pump drains it.
pub struct EventQueue {
  state: Mutex<QueueState>,
  ready: Condvar,
}

impl EventQueue {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(QueueState {
        events: VecDeque::new(),
        woken: false,
      }),
      ready: Condvar::new(),
    }
  }

  /// Append an event and wake a waiting consumer.
  pub fn push(&self, event: RawEvent) {
    self.state.lock().events.push_back(event);
    self.ready.notify_one();
  }

  pub fn len(&self) -> usize {
    self.state.lock().events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for EventQueue {
  fn default() -> Self {
    Self::new()
  }
}

impl EventSource for EventQueue {
  fn wait_event(&self, timeout: Duration) -> Option<RawEvent> {
    let deadline = Instant::now().checked_add(timeout);
    let mut state = self.state.lock();

    loop {
      if let Some(event) = state.events.pop_front() {
        return Some(event);
      }
      if state.woken {
        state.woken = false;
        return None;
      }
      if timeout.is_zero() {
        return None;
      }
      match deadline {
        Some(deadline) => {
          if self.ready.wait_until(&mut state, deadline).timed_out() {
            return state.events.pop_front();
          }
        }
        None => self.ready.wait(&mut state),
      }
    }
  }

  fn wakeup(&self) {
    self.state.lock().woken = true;
    self.ready.notify_all();
  }
}
