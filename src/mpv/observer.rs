//! Delivery of unsolicited notifications to observers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use parking_lot::RwLock;

use super::protocol::Notification;

/// Handle returned by [`Observers::subscribe`].
pub type ObserverId = u64;

type Callback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Registered callbacks plus a bounded notification stream.
///
/// Callbacks run synchronously on the pump thread, in event order. The stream keeps the
/// most recent `capacity` notifications; when nobody drains it the oldest are dropped.
pub struct Observers {
  callbacks: RwLock<Arc<Vec<(ObserverId, Callback)>>>,
  next_id: AtomicU64,
  event_tx: Sender<Notification>,
  event_rx: Receiver<Notification>,
}

impl Observers {
  pub fn new(capacity: usize) -> Self {
    let (event_tx, event_rx) = async_channel::bounded(capacity.max(1));
    Self {
      callbacks: RwLock::new(Arc::new(Vec::new())),
      next_id: AtomicU64::new(1),
      event_tx,
      event_rx,
    }
  }

  /// Register a callback invoked for every notification.
  pub fn subscribe<F>(&self, callback: F) -> ObserverId
  where
    F: Fn(&Notification) + Send + Sync + 'static,
  {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let mut callbacks = self.callbacks.write();
    let mut updated = callbacks.as_ref().clone();
    updated.push((id, Arc::new(callback)));
    *callbacks = Arc::new(updated);
    id
  }

  /// Remove a callback. Returns false if it was not registered.
  pub fn unsubscribe(&self, id: ObserverId) -> bool {
    let mut callbacks = self.callbacks.write();
    if !callbacks.iter().any(|(existing, _)| *existing == id) {
      return false;
    }
    let updated: Vec<_> = callbacks
      .iter()
      .filter(|(existing, _)| *existing != id)
      .cloned()
      .collect();
    *callbacks = Arc::new(updated);
    true
  }

  /// Receiver for the notification stream.
  pub fn events(&self) -> Receiver<Notification> {
    self.event_rx.clone()
  }

  /// Deliver one notification to every callback, then to the stream.
  pub(crate) fn notify(&self, notification: Notification) {
    // snapshot so no lock is held while callbacks run
    let callbacks = self.callbacks.read().clone();
    for (_, callback) in callbacks.iter() {
      callback(&notification);
    }
    self.push_event(notification);
  }

  fn push_event(&self, notification: Notification) {
    let mut pending = notification;
    loop {
      match self.event_tx.try_send(pending) {
        Ok(()) => return,
        Err(TrySendError::Full(rejected)) => {
          if let Ok(dropped) = self.event_rx.try_recv() {
            log::debug!("Notification stream full, dropped {:?}", dropped.kind());
          }
          pending = rejected;
        }
        Err(TrySendError::Closed(_)) => return,
      }
    }
  }

  /// End the notification stream. Receivers drain what is left, then see it closed.
  pub(crate) fn close(&self) {
    self.event_tx.close();
  }
}
