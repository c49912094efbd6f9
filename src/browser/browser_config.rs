use anyhow::{Result, anyhow};
use rand::prelude::SliceRandom;
use std::net;
use std::path::{Path, PathBuf};
use std::time::Duration;
use which::which;

#[cfg(windows)]
use winreg::{RegKey, enums::HKEY_LOCAL_MACHINE};

/// Flags every render browser is started with.
pub const DEFAULT_ARGS: [&str; 12] = [
    "--proxy-server='direct://'",
    "--proxy-bypass-list=*",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
    "--ignore-certificate-errors",
    "--hide-scrollbars",
    "--mute-audio",
];

/// How to start a Chromium process.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub(crate) executable: Option<PathBuf>,
    pub(crate) headless: bool,
    pub(crate) extra_args: Vec<String>,
    pub(crate) launch_timeout: Duration,
    pub(crate) command_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            extra_args: Vec::new(),
            launch_timeout: Duration::from_secs(20),
            command_timeout: Duration::from_secs(10),
        }
    }
}

impl BrowserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses this executable instead of auto-detecting one.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Appends a flag after the defaults.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Upper bound on waiting for the DevTools endpoint after spawning.
    pub fn with_launch_timeout(mut self, timeout: Duration) -> Self {
        self.launch_timeout = timeout;
        self
    }

    /// Upper bound on each individual protocol round-trip.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub(crate) fn resolve_executable(&self) -> Result<PathBuf> {
        match &self.executable {
            Some(path) => Ok(path.clone()),
            None => default_executable(),
        }
    }

    pub(crate) fn browser_args(&self, debug_port: u16, user_data_dir: &Path) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", debug_port),
            format!("--user-data-dir={}", user_data_dir.display()),
        ];

        args.extend(DEFAULT_ARGS.iter().map(|s| s.to_string()));
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.extra_args.iter().cloned());

        args
    }
}

fn default_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROME")
        && Path::new(&path).exists()
    {
        return Ok(path.into());
    }

    let apps = [
        "google-chrome-stable",
        "google-chrome",
        "chromium",
        "chromium-browser",
        "microsoft-edge-stable",
        "chrome",
        "msedge",
        "microsoft-edge",
    ];
    for app in apps {
        if let Ok(path) = which(app) {
            return Ok(path);
        }
    }

    #[cfg(target_os = "macos")]
    {
        let macos_apps = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];
        for path in macos_apps.iter() {
            let path = Path::new(path);
            if path.exists() {
                return Ok(path.into());
            }
        }
    }

    #[cfg(windows)]
    {
        if let Some(path) = get_chrome_path_from_registry().filter(|p| p.exists()) {
            return Ok(path);
        }

        let windows_apps = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ];
        for path in windows_apps.iter() {
            let path = Path::new(path);
            if path.exists() {
                return Ok(path.into());
            }
        }
    }

    Err(anyhow!(
        "Could not auto detect a Chrome executable. Set the CHROME env var."
    ))
}

#[cfg(windows)]
fn get_chrome_path_from_registry() -> Option<PathBuf> {
    RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey("SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\App Paths\\chrome.exe")
        .and_then(|key| key.get_value::<String, _>(""))
        .map(PathBuf::from)
        .ok()
}

pub(crate) fn get_available_port() -> Option<u16> {
    let mut ports: Vec<u16> = (8000..9000).collect();
    ports.shuffle(&mut rand::thread_rng());
    ports.iter().find(|port| port_is_available(**port)).copied()
}

fn port_is_available(port: u16) -> bool {
    net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}
