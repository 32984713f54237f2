//! Asynchronous request/reply client for an event-sourced media player.
//!
//! Requests are submitted with a unique tag and complete when the player's event loop
//! delivers the matching reply. See [`MpvContext`] for the request API and [`MpvPlayer`]
//! for driving an external player over JSON IPC.

mod config;
mod mpv;

pub use config::{
  ContextConfig, PumpStrategy, RequestOptions, ResolvedOptions, DEFAULT_RESPONSE_TIMEOUT_MS,
};
pub use mpv::*;
