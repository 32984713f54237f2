//! Correlation registry: rendezvous between the event pump and request callers.
//!
//! Each outstanding tag owns a single-assignment cell (a oneshot channel). The pump
//! thread publishes into the cell for the reply's tag, which wakes exactly the caller
//! awaiting that tag.

use std::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::protocol::{Reply, Tag};

/// Result of waiting for a tag.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
  Reply(Reply),
  TimedOut,
  Cancelled,
  /// The registry was closed, or the tag is already being awaited elsewhere.
  Closed,
}

struct Cell {
  tx: Option<oneshot::Sender<Reply>>,
  rx: Option<oneshot::Receiver<Reply>>,
}

impl Cell {
  fn new() -> Self {
    let (tx, rx) = oneshot::channel();
    Self {
      tx: Some(tx),
      rx: Some(rx),
    }
  }
}

/// Removes the tag's cell when a wait ends, however it ends.
struct CellGuard<'a> {
  cells: &'a DashMap<Tag, Cell>,
  tag: Tag,
}

impl Drop for CellGuard<'_> {
  fn drop(&mut self) {
    self.cells.remove(&self.tag);
  }
}

/// Thread-safe store of outstanding requests keyed by tag.
pub struct CorrelationRegistry {
  cells: DashMap<Tag, Cell>,
  closed: AtomicBool,
}

impl CorrelationRegistry {
  pub fn new() -> Self {
    Self {
      cells: DashMap::new(),
      closed: AtomicBool::new(false),
    }
  }

  /// Reserve a cell for `tag`. Must happen before the request is submitted so an early
  /// reply has somewhere to land. Returns false once the registry is closed.
  pub fn register(&self, tag: Tag) -> bool {
    if self.is_closed() {
      return false;
    }
    self.cells.insert(tag, Cell::new());
    // close() may have cleared the map between the check and the insert
    if self.is_closed() {
      self.cells.remove(&tag);
      return false;
    }
    true
  }

  /// Drop a reservation whose request was never submitted.
  pub fn forget(&self, tag: Tag) {
    self.cells.remove(&tag);
  }

  /// Deliver a reply to whoever awaits its tag.
  ///
  /// Replies for unknown or abandoned tags are discarded. Only the first reply for a tag
  /// is kept; later duplicates are dropped.
  pub fn publish(&self, reply: Reply) {
    let tag = reply.tag;
    let tx = match self.cells.get_mut(&tag) {
      Some(mut cell) => match cell.tx.take() {
        Some(tx) => tx,
        None => {
          log::warn!("Dropping duplicate reply for tag {}", tag);
          return;
        }
      },
      None => {
        log::debug!("Discarding reply for abandoned tag {}", tag);
        return;
      }
    };

    if tx.send(reply).is_err() {
      log::debug!("Waiter for tag {} went away before its reply", tag);
    }
  }

  /// Wait for the reply to `tag`.
  ///
  /// `timeout` of `None` waits indefinitely; `cancel` is honored in either case. When a
  /// reply races a timeout or cancellation exactly one outcome is returned, and the cell
  /// is removed on every path.
  pub async fn wait(
    &self,
    tag: Tag,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
  ) -> WaitOutcome {
    if self.is_closed() {
      return WaitOutcome::Closed;
    }
    let rx = self.cells.entry(tag).or_insert_with(Cell::new).rx.take();
    let Some(rx) = rx else {
      log::warn!("Tag {} is already being awaited", tag);
      return WaitOutcome::Closed;
    };
    let _guard = CellGuard {
      cells: &self.cells,
      tag,
    };
    if self.is_closed() {
      return WaitOutcome::Closed;
    }

    let deadline = async {
      match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => future::pending::<()>().await,
      }
    };

    tokio::select! {
      biased;
      reply = rx => match reply {
        Ok(reply) => WaitOutcome::Reply(reply),
        Err(_) => WaitOutcome::Closed,
      },
      _ = cancel.cancelled() => WaitOutcome::Cancelled,
      _ = deadline => WaitOutcome::TimedOut,
    }
  }

  /// Close the registry: every pending wait resolves to [`WaitOutcome::Closed`] and new
  /// registrations are refused.
  pub fn close(&self) {
    self.closed.store(true, Ordering::SeqCst);
    let outstanding = self.cells.len();
    self.cells.clear();
    if outstanding > 0 {
      log::info!("Released {} outstanding request(s)", outstanding);
    }
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::SeqCst)
  }

  /// Number of live cells.
  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }
}

impl Default for CorrelationRegistry {
  fn default() -> Self {
    Self::new()
  }
}
