//! Context configuration and the request options cascade.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Built-in response timeout used when neither the call nor the context sets one.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: i64 = 3000;

/// Per-call (or per-context default) request behavior. Unset fields fall through to the
/// next level of the cascade: call -> context default -> built-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
  /// Wait for the reply (`true`) or fire and forget (`false`).
  #[serde(default)]
  pub wait_for_response: Option<bool>,

  /// Reply timeout in milliseconds. Negative waits indefinitely.
  #[serde(default)]
  pub response_timeout_millis: Option<i64>,

  /// Turn a failed reply into an error instead of an empty result.
  #[serde(default)]
  pub throw_on_error: Option<bool>,
}

impl RequestOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_wait_for_response(mut self, wait: bool) -> Self {
    self.wait_for_response = Some(wait);
    self
  }

  pub fn with_timeout_millis(mut self, millis: i64) -> Self {
    self.response_timeout_millis = Some(millis);
    self
  }

  pub fn with_throw_on_error(mut self, throw: bool) -> Self {
    self.throw_on_error = Some(throw);
    self
  }

  /// Shorthand for `with_wait_for_response(false)`.
  pub fn fire_and_forget() -> Self {
    Self::new().with_wait_for_response(false)
  }

  /// Resolve every knob against `defaults`, then the built-in values.
  pub fn resolve(&self, defaults: &RequestOptions) -> ResolvedOptions {
    let timeout_ms = self
      .response_timeout_millis
      .or(defaults.response_timeout_millis)
      .unwrap_or(DEFAULT_RESPONSE_TIMEOUT_MS);

    ResolvedOptions {
      wait_for_response: self
        .wait_for_response
        .or(defaults.wait_for_response)
        .unwrap_or(true),
      timeout: u64::try_from(timeout_ms).ok().map(Duration::from_millis),
      throw_on_error: self
        .throw_on_error
        .or(defaults.throw_on_error)
        .unwrap_or(false),
    }
  }
}

/// Fully resolved request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
  pub wait_for_response: bool,
  /// `None` waits indefinitely.
  pub timeout: Option<Duration>,
  pub throw_on_error: bool,
}

impl ResolvedOptions {
  /// Timeout in milliseconds, `-1` when indefinite.
  pub fn timeout_millis(&self) -> i64 {
    self
      .timeout
      .map(|t| i64::try_from(t.as_millis()).unwrap_or(i64::MAX))
      .unwrap_or(-1)
  }
}

/// Which event pump strategy a context uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpStrategy {
  /// Loop on the Tokio blocking pool.
  Inline,
  /// Loop on a dedicated thread owned by the context.
  #[default]
  Dedicated,
  /// Loop on a service thread shared with other contexts.
  Shared,
}

/// Context configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
  /// Context-wide request defaults.
  #[serde(default)]
  pub defaults: RequestOptions,

  #[serde(default)]
  pub pump: PumpStrategy,

  /// Longest single blocking wait on the event source, in milliseconds.
  #[serde(default = "default_wait_slice_ms")]
  pub wait_slice_ms: u64,

  /// Notifications kept for `events()` receivers before the oldest are dropped.
  #[serde(default = "default_event_capacity")]
  pub event_capacity: usize,

  /// Name of the dedicated pump thread.
  #[serde(default = "default_thread_name")]
  pub thread_name: String,
}

fn default_wait_slice_ms() -> u64 {
  1000
}

fn default_event_capacity() -> usize {
  256
}

fn default_thread_name() -> String {
  "mpv-events".to_string()
}

impl Default for ContextConfig {
  fn default() -> Self {
    Self {
      defaults: RequestOptions::default(),
      pump: PumpStrategy::default(),
      wait_slice_ms: default_wait_slice_ms(),
      event_capacity: default_event_capacity(),
      thread_name: default_thread_name(),
    }
  }
}

impl ContextConfig {
  /// Parse a JSON configuration document. Missing fields take their defaults.
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if self.wait_slice_ms == 0 || self.wait_slice_ms > 60_000 {
      return Err("Wait slice must be between 1 and 60000 milliseconds".to_string());
    }
    if self.event_capacity == 0 {
      return Err("Event capacity must be at least 1".to_string());
    }
    if self.thread_name.trim().is_empty() {
      return Err("Pump thread name cannot be empty".to_string());
    }
    Ok(())
  }

  pub fn wait_slice(&self) -> Duration {
    Duration::from_millis(self.wait_slice_ms)
  }
}
