use anyhow::{Context, Result, bail};
use clap::Parser;
use rayso_shot::{BrowserConfig, CdpDriver, Error, PageSettings, RaySo, RaySoOptions};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Render a code snippet to a ray.so PNG.
#[derive(Parser, Debug)]
#[command(name = "rayso", version)]
struct Cli {
    /// Source file; reads stdin when omitted or `-`.
    file: Option<PathBuf>,

    /// JSON file with options (camelCase keys); flags below take precedence.
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    #[arg(long)]
    title: Option<String>,

    /// breeze, candy, crimson, falcon, meadow, midnight, raindrop or sunset.
    #[arg(long)]
    theme: Option<String>,

    /// 16, 32, 64 or 128.
    #[arg(long)]
    padding: Option<String>,

    /// Highlighting language, `auto` to detect.
    #[arg(long)]
    language: Option<String>,

    /// Transparent image with square corners.
    #[arg(long)]
    no_background: bool,

    /// Light window instead of dark.
    #[arg(long)]
    light: bool,

    /// Directory to write the image into. Defaults to the working directory.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// File name instead of `example_<hex>.png`.
    #[arg(long, value_name = "NAME")]
    out_file: Option<String>,

    /// Chromium executable; auto-detected when unset.
    #[arg(long, env = "CHROME", value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Seconds allowed for page load and for the screenshot.
    #[arg(long, default_value_t = 30, value_name = "SECS")]
    timeout: u64,

    /// Alternative ray.so deployment.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Show the browser window.
    #[arg(long)]
    headed: bool,

    /// Log every render step.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    async fn options(&self) -> Result<RaySoOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let value = serde_json::from_str(&text)
                    .with_context(|| format!("{} is not valid JSON", path.display()))?;
                RaySoOptions::from_json(&value)?
            }
            None => RaySoOptions::default(),
        };

        if let Some(title) = &self.title {
            options.title = title.clone();
        }
        if let Some(theme) = &self.theme {
            options.theme = theme.clone();
        }
        if let Some(padding) = &self.padding {
            options.padding = padding.as_str().into();
        }
        if let Some(language) = &self.language {
            options.language = language.clone();
        }
        if self.no_background {
            options.background = false;
        }
        if self.light {
            options.dark_mode = false;
        }
        if let Some(dir) = &self.out_dir {
            let dir = std::path::absolute(dir)
                .with_context(|| format!("Cannot resolve {}", dir.display()))?;
            options.local_preview_path = dir.to_string_lossy().into_owned();
        }
        if let Some(name) = &self.out_file {
            options.local_preview_file = Some(name.clone());
        }
        options.local_preview = true;
        options.debug |= self.debug;

        Ok(options)
    }

    fn driver(&self) -> CdpDriver {
        let mut config = BrowserConfig::new().with_headless(!self.headed);
        if let Some(chrome) = &self.chrome {
            config = config.with_executable(chrome);
        }
        CdpDriver::new(config)
    }

    fn settings(&self) -> PageSettings {
        let timeout = Duration::from_secs(self.timeout);
        let settings = PageSettings::default()
            .with_navigation_timeout(timeout)
            .with_capture_timeout(timeout);
        match &self.base_url {
            Some(url) => settings.with_base_url(url),
            None => settings,
        }
    }

    async fn code(&self) -> Result<String> {
        match &self.file {
            Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display())),
            _ => {
                let mut code = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut code)
                    .await
                    .context("Failed to read stdin")?;
                Ok(code)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.debug { "info" } else { "warn" }),
    )
    .init();

    let code = cli.code().await?;
    let rayso = RaySo::with_driver(cli.options().await?, cli.driver()).with_settings(cli.settings());

    // Dropping the render future on Ctrl+C drops the browser, which kills its process.
    let rendered = tokio::select! {
        res = rayso.render(&code) => res,
        _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    };

    match rendered {
        Ok(rendered) => {
            if let Some(path) = rendered.saved_to {
                println!("{}", path.display());
            }
            Ok(())
        }
        Err(Error::Validation(e)) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
