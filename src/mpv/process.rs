//! Player process detection and spawning.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("Player executable not found")]
  NotFound,
  #[error("Failed to spawn player: {0}")]
  SpawnFailed(#[from] std::io::Error),
}

/// How to launch a player process.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
  /// Explicit executable. Falls back to [`find_player`].
  pub executable: Option<PathBuf>,
  /// Extra command-line arguments, appended after the IPC flags.
  pub extra_args: Vec<String>,
  /// IPC socket/pipe path. Falls back to [`unique_ipc_path`].
  pub ipc_path: Option<String>,
}

impl LaunchOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
    self.executable = Some(path.into());
    self
  }

  pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
    self.extra_args.push(arg.into());
    self
  }

  pub fn with_ipc_path(mut self, path: impl Into<String>) -> Self {
    self.ipc_path = Some(path.into());
    self
  }
}

/// A fresh IPC socket/pipe path, so several players can run side by side.
pub fn unique_ipc_path() -> String {
  let id = uuid::Uuid::new_v4().simple().to_string();
  #[cfg(windows)]
  {
    format!(r"\\.\pipe\mpvctl-{}", id)
  }
  #[cfg(not(windows))]
  {
    std::env::temp_dir()
      .join(format!("mpvctl-{}.sock", id))
      .to_string_lossy()
      .into_owned()
  }
}

/// Find the player executable in common locations.
pub fn find_player() -> Option<PathBuf> {
  if let Ok(path) = which::which("mpv") {
    return Some(path);
  }

  #[cfg(windows)]
  let common_paths: &[&str] = &[
    r"C:\Program Files\mpv\mpv.exe",
    r"C:\Program Files (x86)\mpv\mpv.exe",
    r"C:\mpv\mpv.exe",
  ];
  #[cfg(target_os = "macos")]
  let common_paths: &[&str] = &[
    "/usr/local/bin/mpv",
    "/opt/homebrew/bin/mpv",
    "/Applications/mpv.app/Contents/MacOS/mpv",
  ];
  #[cfg(not(any(windows, target_os = "macos")))]
  let common_paths: &[&str] = &["/usr/bin/mpv", "/usr/local/bin/mpv"];

  common_paths
    .iter()
    .map(PathBuf::from)
    .find(|path| path.exists())
}

/// Build the player command line for `ipc_path`.
fn player_args(ipc_path: &str, extra_args: &[String]) -> Vec<String> {
  let mut args = vec![
    format!("--input-ipc-server={}", ipc_path),
    "--idle".to_string(),
    "--no-terminal".to_string(),
  ];
  args.extend(extra_args.iter().cloned());
  args
}

/// Spawn the player with its IPC server listening on `ipc_path`.
pub fn spawn_player(options: &LaunchOptions, ipc_path: &str) -> Result<Child, ProcessError> {
  let executable = options
    .executable
    .clone()
    .or_else(find_player)
    .ok_or(ProcessError::NotFound)?;

  log::info!("Spawning player: {:?} with IPC: {}", executable, ipc_path);
  if !options.extra_args.is_empty() {
    log::info!("Extra player args: {:?}", options.extra_args);
  }

  let child = Command::new(&executable)
    .args(player_args(ipc_path, &options.extra_args))
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()?;

  Ok(child)
}

/// Remove a stale IPC socket.
pub fn cleanup_ipc(path: &str) {
  #[cfg(not(windows))]
  {
    let _ = std::fs::remove_file(path);
  }
  // Windows named pipes are cleaned up automatically
  #[cfg(windows)]
  let _ = path;
}
