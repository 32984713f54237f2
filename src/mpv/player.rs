//! Managed player process with a context over its IPC connection.

use std::process::Child;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use super::context::MpvContext;
use super::error::MpvError;
use super::ipc::MpvIpc;
use super::process::{cleanup_ipc, spawn_player, unique_ipc_path, LaunchOptions};
use crate::config::{ContextConfig, RequestOptions};

/// Connection attempts made after spawning the player.
const CONNECT_RETRIES: u32 = 10;

/// A spawned player and the context that talks to it.
pub struct MpvPlayer {
  context: MpvContext,
  ipc: Arc<MpvIpc>,
  process: Mutex<Option<Child>>,
  ipc_path: String,
}

impl MpvPlayer {
  /// Spawn the player, connect to its IPC server and start pumping events.
  pub async fn launch(options: LaunchOptions, config: ContextConfig) -> Result<Self, MpvError> {
    config.validate().map_err(MpvError::Config)?;

    let ipc_path = options.ipc_path.clone().unwrap_or_else(unique_ipc_path);
    cleanup_ipc(&ipc_path);

    let mut child = spawn_player(&options, &ipc_path)?;

    // Give the player a moment to create the socket
    tokio::time::sleep(Duration::from_millis(500)).await;

    let ipc = match MpvIpc::connect(&ipc_path, CONNECT_RETRIES).await {
      Ok(ipc) => Arc::new(ipc),
      Err(e) => {
        log::error!("Could not connect to player IPC at {}: {}", ipc_path, e);
        let _ = child.kill();
        let _ = child.wait();
        cleanup_ipc(&ipc_path);
        return Err(e.into());
      }
    };

    let context = MpvContext::from_handle(ipc.clone(), config)?;
    let player = Self {
      context,
      ipc,
      process: Mutex::new(Some(child)),
      ipc_path,
    };
    player.context.start()?;

    log::info!("Player connected at {}", player.ipc_path);
    Ok(player)
  }

  pub fn context(&self) -> &MpvContext {
    &self.context
  }

  pub fn ipc_path(&self) -> &str {
    &self.ipc_path
  }

  /// Check if the player process is still owned.
  pub fn is_running(&self) -> bool {
    self.process.lock().is_some()
  }

  /// Ask the player to quit, then tear everything down.
  pub async fn quit(&self) {
    if let Err(e) = self
      .context
      .run_command::<Value>(&["quit"], RequestOptions::fire_and_forget())
      .await
    {
      log::warn!("quit command failed: {}", e);
    }
    self.stop().await;
  }

  /// Shut down the context, close IPC and kill the process.
  /// This is async to avoid blocking on process kill/wait.
  pub async fn stop(&self) {
    self.context.shutdown();
    self.ipc.close();

    let child = self.process.lock().take();
    if let Some(mut child) = child {
      let pid = child.id();
      log::info!("Killing player process (pid: {})", pid);

      let result = tokio::task::spawn_blocking(move || {
        let kill_result = child.kill();
        let wait_result = child.wait();
        (kill_result, wait_result)
      })
      .await;

      match result {
        Ok((kill_result, wait_result)) => {
          if let Err(e) = kill_result {
            // already exited after quit
            log::debug!("kill() failed: {}", e);
          }
          match wait_result {
            Ok(status) => log::info!("Player process exited with: {}", status),
            Err(e) => log::error!("wait() failed: {}", e),
          }
        }
        Err(e) => {
          log::error!("spawn_blocking panicked during process cleanup: {}", e);
        }
      }
    }

    cleanup_ipc(&self.ipc_path);
    log::info!("Player stopped");
  }
}

impl Drop for MpvPlayer {
  fn drop(&mut self) {
    self.context.shutdown();
    self.ipc.close();
    if let Some(mut child) = self.process.lock().take() {
      let _ = child.kill();
      let _ = child.wait();
    }
    cleanup_ipc(&self.ipc_path);
  }
}
