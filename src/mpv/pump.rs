//! Event pump strategies.
//!
//! A pump drains an [`EventSource`] and hands every event to the [`Dispatcher`], one at
//! a time and in arrival order. Three strategies share the same core:
//! - [`InlinePump`] - loop runs on the Tokio blocking pool
//! - [`DedicatedPump`] - loop runs on its own named thread
//! - [`SharedPump`] - loop is driven by a [`SharedPumpService`] thread shared by many contexts

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use thiserror::Error;

use super::dispatch::Dispatcher;
use super::native::EventSource;

/// Maximum events drained from one context per pass of the shared service.
const SHARED_BATCH: usize = 64;

/// How long the shared service sleeps when no context had events.
const SHARED_IDLE: Duration = Duration::from_millis(5);

#[derive(Error, Debug)]
pub enum PumpError {
  #[error("Inline pump requires a Tokio runtime")]
  NoRuntime,
  #[error("Failed to spawn pump thread: {0}")]
  Spawn(#[from] std::io::Error),
}

/// Lifecycle of a pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
  NotStarted,
  Running,
  Stopped,
}

/// Start/stop interface shared by all strategies.
pub trait EventPump: Send + Sync {
  /// NotStarted -> Running. A no-op in any other state.
  fn start(&self) -> Result<(), PumpError>;

  /// Running -> Stopped. Interrupts a blocked wait; once this returns no handler runs
  /// again. Repeated calls are no-ops.
  fn stop(&self);

  fn state(&self) -> PumpState;
}

/// Source, dispatcher and the gate that serializes handler invocations.
pub(crate) struct PumpCore {
  source: Arc<dyn EventSource>,
  dispatcher: Arc<Dispatcher>,
  state: Mutex<PumpState>,
  gate: ReentrantMutex<()>,
  wait_slice: Duration,
}

impl PumpCore {
  pub(crate) fn new(
    source: Arc<dyn EventSource>,
    dispatcher: Arc<Dispatcher>,
    wait_slice: Duration,
  ) -> Arc<Self> {
    Arc::new(Self {
      source,
      dispatcher,
      state: Mutex::new(PumpState::NotStarted),
      gate: ReentrantMutex::new(()),
      wait_slice,
    })
  }

  fn state(&self) -> PumpState {
    *self.state.lock()
  }

  fn is_running(&self) -> bool {
    self.state() == PumpState::Running
  }

  /// NotStarted -> Running. Returns false if the pump was already started or stopped.
  fn begin(&self) -> bool {
    let mut state = self.state.lock();
    if *state != PumpState::NotStarted {
      return false;
    }
    *state = PumpState::Running;
    true
  }

  /// Wait up to `timeout` for one event and dispatch it.
  /// Returns true if a handler ran.
  fn pump_once(&self, timeout: Duration) -> bool {
    if !self.is_running() {
      return false;
    }
    let Some(event) = self.source.wait_event(timeout) else {
      return false;
    };

    let _gate = self.gate.lock();
    if !self.is_running() {
      log::debug!("Dropping event received after stop");
      return false;
    }
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| self.dispatcher.dispatch(event))) {
      log::error!("Event handler panicked: {}", panic_message(&*panic));
    }
    true
  }

  fn run(&self) {
    log::info!("Event pump loop started");
    while self.is_running() {
      self.pump_once(self.wait_slice);
    }
    log::info!("Event pump loop exited");
  }

  /// Move to Stopped, wake the source and wait out any handler still running.
  /// Returns true if this call performed the transition.
  fn halt(&self) -> bool {
    {
      let mut state = self.state.lock();
      if *state == PumpState::Stopped {
        return false;
      }
      *state = PumpState::Stopped;
    }
    self.source.wakeup();
    // reentrant, so a handler stopping its own context does not deadlock
    drop(self.gate.lock());
    true
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message.clone()
  } else {
    "non-string panic payload".to_string()
  }
}

/// Pump loop running on the Tokio blocking pool of the runtime that started it.
pub struct InlinePump {
  core: Arc<PumpCore>,
  task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl InlinePump {
  pub(crate) fn new(core: Arc<PumpCore>) -> Self {
    Self {
      core,
      task: Mutex::new(None),
    }
  }
}

impl EventPump for InlinePump {
  fn start(&self) -> Result<(), PumpError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| PumpError::NoRuntime)?;
    if !self.core.begin() {
      return Ok(());
    }
    let core = self.core.clone();
    *self.task.lock() = Some(runtime.spawn_blocking(move || core.run()));
    Ok(())
  }

  fn stop(&self) {
    if self.core.halt() {
      // the loop observes Stopped on its next iteration and returns on its own
      self.task.lock().take();
      log::info!("Inline event pump stopped");
    }
  }

  fn state(&self) -> PumpState {
    self.core.state()
  }
}

/// Pump loop on a dedicated, named OS thread.
pub struct DedicatedPump {
  core: Arc<PumpCore>,
  thread_name: String,
  thread: Mutex<Option<JoinHandle<()>>>,
}

impl DedicatedPump {
  pub(crate) fn new(core: Arc<PumpCore>, thread_name: impl Into<String>) -> Self {
    Self {
      core,
      thread_name: thread_name.into(),
      thread: Mutex::new(None),
    }
  }
}

impl EventPump for DedicatedPump {
  fn start(&self) -> Result<(), PumpError> {
    if !self.core.begin() {
      return Ok(());
    }
    let core = self.core.clone();
    let spawned = thread::Builder::new()
      .name(self.thread_name.clone())
      .spawn(move || core.run());

    match spawned {
      Ok(handle) => {
        *self.thread.lock() = Some(handle);
        Ok(())
      }
      Err(e) => {
        log::error!("Failed to spawn {} thread: {}", self.thread_name, e);
        self.core.halt();
        Err(PumpError::Spawn(e))
      }
    }
  }

  fn stop(&self) {
    if !self.core.halt() {
      return;
    }
    let Some(handle) = self.thread.lock().take() else {
      return;
    };
    if handle.thread().id() == thread::current().id() {
      // stopped from inside a handler; the loop exits when the handler returns
      return;
    }
    if handle.join().is_err() {
      log::error!("{} thread panicked", self.thread_name);
    }
    log::info!("Dedicated event pump stopped");
  }

  fn state(&self) -> PumpState {
    self.core.state()
  }
}

struct ServiceInner {
  members: Mutex<Vec<Weak<PumpCore>>>,
  shutdown: AtomicBool,
  thread: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceInner {
  fn run(&self) {
    log::info!("Shared event pump service started");
    while !self.shutdown.load(Ordering::SeqCst) {
      let members: Vec<Arc<PumpCore>> = {
        let mut members = self.members.lock();
        members.retain(|member| {
          member
            .upgrade()
            .is_some_and(|core| core.state() == PumpState::Running)
        });
        members.iter().filter_map(Weak::upgrade).collect()
      };

      let mut busy = false;
      for core in &members {
        for _ in 0..SHARED_BATCH {
          if !core.pump_once(Duration::ZERO) {
            break;
          }
          busy = true;
        }
      }
      drop(members);

      if !busy {
        thread::park_timeout(SHARED_IDLE);
      }
    }
    log::info!("Shared event pump service stopped");
  }

  fn unpark(&self) {
    if let Some(handle) = self.thread.lock().as_ref() {
      handle.thread().unpark();
    }
  }
}

/// One service thread that drives any number of [`SharedPump`]s.
///
/// Members are held weakly; a context that is dropped without stopping simply falls out
/// of the rotation.
#[derive(Clone)]
pub struct SharedPumpService {
  inner: Arc<ServiceInner>,
}

static GLOBAL_SERVICE: Mutex<Option<SharedPumpService>> = Mutex::new(None);

impl SharedPumpService {
  /// Spawn a service thread.
  pub fn start(thread_name: &str) -> Result<Self, PumpError> {
    let inner = Arc::new(ServiceInner {
      members: Mutex::new(Vec::new()),
      shutdown: AtomicBool::new(false),
      thread: Mutex::new(None),
    });
    let runner = inner.clone();
    let handle = thread::Builder::new()
      .name(thread_name.to_string())
      .spawn(move || runner.run())?;
    *inner.thread.lock() = Some(handle);
    Ok(Self { inner })
  }

  /// Process-wide service, started on first use.
  pub fn global() -> Result<Self, PumpError> {
    let mut global = GLOBAL_SERVICE.lock();
    if let Some(service) = global.as_ref() {
      return Ok(service.clone());
    }
    let service = Self::start("mpv-shared-pump")?;
    *global = Some(service.clone());
    Ok(service)
  }

  fn attach(&self, core: &Arc<PumpCore>) {
    self.inner.members.lock().push(Arc::downgrade(core));
    self.inner.unpark();
  }

  /// Number of contexts currently driven by this service.
  pub fn member_count(&self) -> usize {
    self
      .inner
      .members
      .lock()
      .iter()
      .filter(|member| member.strong_count() > 0)
      .count()
  }

  /// Stop the service thread. Members stop receiving events.
  pub fn shutdown(&self) {
    if self.inner.shutdown.swap(true, Ordering::SeqCst) {
      return;
    }
    let handle = self.inner.thread.lock().take();
    if let Some(handle) = handle {
      handle.thread().unpark();
      if handle.thread().id() != thread::current().id() && handle.join().is_err() {
        log::error!("Shared event pump service panicked");
      }
    }
  }
}

/// Pump driven by a [`SharedPumpService`] instead of an owned thread.
pub struct SharedPump {
  core: Arc<PumpCore>,
  service: SharedPumpService,
}

impl SharedPump {
  pub(crate) fn new(core: Arc<PumpCore>, service: SharedPumpService) -> Self {
    Self { core, service }
  }
}

impl EventPump for SharedPump {
  fn start(&self) -> Result<(), PumpError> {
    if self.core.begin() {
      self.service.attach(&self.core);
    }
    Ok(())
  }

  fn stop(&self) {
    if self.core.halt() {
      log::info!("Shared event pump member stopped");
    }
  }

  fn state(&self) -> PumpState {
    self.core.state()
  }
}
