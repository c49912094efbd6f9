mod browser_config;

pub use browser_config::{BrowserConfig, DEFAULT_ARGS};

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use regex::Regex;
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::time;

use crate::tab::Tab;
use crate::transport::Transport;

/// Holds the browser process and its throwaway profile directory.
#[derive(Debug)]
struct Process {
    child: Child,
    _profile: TempDir,
}

impl Process {
    fn kill(&mut self) -> Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child
                .kill()
                .context("Failed to kill browser process")?;
        }
        self.child
            .wait()
            .context("Failed to wait for browser process exit")?;
        Ok(())
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            warn!("Error reaping browser process: {:?}", e);
        }
        // `_profile` is removed after the process is gone.
    }
}

/// A headless Chromium instance owned by this process.
#[derive(Debug)]
pub struct Browser {
    transport: Arc<Transport>,
    process: Mutex<Option<Process>>,
}

impl Browser {
    /// Launches a browser with the given configuration.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let exe = config.resolve_executable()?;
        let profile = tempfile::Builder::new()
            .prefix("rayso-shot-")
            .tempdir()
            .context("Failed to create browser profile directory")?;
        let port = browser_config::get_available_port().ok_or(anyhow!("No available port"))?;

        #[cfg(windows)]
        let mut cmd = {
            use std::os::windows::process::CommandExt;
            let mut c = Command::new(&exe);
            c.creation_flags(0x08000000); // CREATE_NO_WINDOW
            c
        };
        #[cfg(not(windows))]
        let mut cmd = Command::new(&exe);

        debug!("Spawning {} on debug port {}", exe.display(), port);
        let mut child = cmd
            .args(config.browser_args(port, profile.path()))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", exe.display()))?;
        let stderr = child.stderr.take().context("No stderr");
        // From here on the process is reaped on every path, including errors below.
        let process = Process {
            child,
            _profile: profile,
        };

        let ws_url = time::timeout(config.launch_timeout, Self::wait_for_ws(stderr?))
            .await
            .map_err(|_| anyhow!("Timeout waiting for the DevTools endpoint"))??;
        debug!("DevTools listening on {}", ws_url);

        Ok(Self {
            transport: Arc::new(Transport::new(&ws_url, config.command_timeout).await?),
            process: Mutex::new(Some(process)),
        })
    }

    /// Reads browser stderr lines to extract the WebSocket debugging URL.
    async fn wait_for_ws(stderr: ChildStderr) -> Result<String> {
        let reader = BufReader::new(stderr);
        let re = Regex::new(r"listening on (.*/devtools/browser/.*)$")?;
        tokio::task::spawn_blocking(move || {
            for line in reader.lines() {
                let l = line?;
                if let Some(cap) = re.captures(&l) {
                    return Ok(cap[1].to_string());
                }
            }
            Err(anyhow!("WS URL not found in stderr"))
        })
        .await?
    }

    /// Opens a new blank tab.
    pub async fn new_tab(&self) -> Result<Tab> {
        Tab::new(self.transport.clone()).await
    }

    /// Closes the DevTools connection, then kills and reaps the process.
    pub async fn close_async(&self) -> Result<()> {
        self.transport.shutdown().await;
        let process = self
            .process
            .lock()
            .map_err(|_| anyhow!("Failed to lock browser process"))?
            .take();
        if let Some(mut process) = process {
            process.kill()?;
        }
        Ok(())
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        // Kill without the graceful CDP shutdown; the transport task ends when the socket drops.
        if let Ok(mut guard) = self.process.lock()
            && let Some(mut process) = guard.take()
            && let Err(e) = process.kill()
        {
            warn!("Error closing browser in Drop: {:?}", e);
        }
    }
}
