use crate::driver::{CdpDriver, Driver, Session};
use crate::error::{RenderError, RenderStage, Result, ValidationError};
use crate::options::{RaySoOptions, RenderRequest};
use crate::page_url::{DEFAULT_BASE_URL, build_page_url};
use crate::preview;
use crate::types::{CaptureOptions, Viewport};
use crate::validate::Validator;
use log::{Level, log, warn};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Knowledge about the remote page: where it lives and what its markup looks like.
///
/// The defaults match ray.so as of this release; override them when the site changes.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub base_url: String,
    pub viewport: Viewport,
    /// Editor controls hidden before the capture.
    pub hidden_selectors: Vec<String>,
    /// Captured when the background is shown.
    pub frame_selector: String,
    /// Captured when the background is hidden.
    pub inner_frame_selector: String,
    /// Element whose border radius is removed when the background is hidden.
    pub inner_frame_style_selector: String,
    pub navigation_timeout: Duration,
    pub select_timeout: Duration,
    pub capture_timeout: Duration,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            viewport: Viewport::default(),
            hidden_selectors: vec![
                "#frame > div.drag-control-points > div.handle.left".to_string(),
                "#frame > div.drag-control-points > div.handle.right".to_string(),
                "#app > main > section".to_string(),
            ],
            frame_selector: r#"div[id="frame"]"#.to_string(),
            inner_frame_selector: r#"div[class="app-frame"]"#.to_string(),
            inner_frame_style_selector: "#frame > div.app-frame-container > div.app-frame"
                .to_string(),
            navigation_timeout: Duration::from_secs(30),
            select_timeout: Duration::from_secs(10),
            capture_timeout: Duration::from_secs(30),
        }
    }
}

impl PageSettings {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// The element to capture for `request`.
    pub fn target_selector(&self, request: &RenderRequest) -> &str {
        if request.background {
            &self.frame_selector
        } else {
            &self.inner_frame_selector
        }
    }
}

/// What a successful render produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// PNG bytes exactly as the browser produced them.
    pub image: Vec<u8>,
    /// Set when a local preview was written.
    pub saved_to: Option<PathBuf>,
}

/// Where a render currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    BrowserOpen,
    PageLoaded,
    ElementSelected,
    ImageCaptured,
    Closed,
    Failed,
}

/// Tracks the state of one render and reports its steps.
struct Progress {
    state: RenderState,
    level: Level,
}

impl Progress {
    fn new(debug: bool) -> Self {
        Self {
            state: RenderState::Idle,
            level: if debug { Level::Info } else { Level::Debug },
        }
    }

    fn note(&self, message: &str) {
        log!(self.level, "{}", message);
    }

    fn advance(&mut self, to: RenderState, message: &str) {
        log!(self.level, "{} ({:?} -> {:?})", message, self.state, to);
        self.state = to;
    }

    fn fail(&mut self, during: impl fmt::Display) {
        log!(self.level, "Render failed while {} ({:?} -> Failed)", during, self.state);
        self.state = RenderState::Failed;
    }
}

/// Renders code snippets to images through ray.so.
///
/// ```no_run
/// use rayso_shot::{RaySo, RaySoOptions, Theme};
///
/// # async fn run() -> rayso_shot::Result<()> {
/// let rayso = RaySo::new(RaySoOptions::new().with_theme(Theme::Candy).with_padding(64));
/// let rendered = rayso.render("console.log('Hello, World!');").await?;
/// println!("{} bytes", rendered.image.len());
/// # Ok(())
/// # }
/// ```
pub struct RaySo<D: Driver = CdpDriver> {
    options: RaySoOptions,
    settings: PageSettings,
    validator: Validator,
    driver: D,
}

impl RaySo<CdpDriver> {
    /// Uses an auto-detected Chromium with default launch settings.
    pub fn new(options: RaySoOptions) -> Self {
        Self::with_driver(options, CdpDriver::default())
    }
}

impl<D: Driver> RaySo<D> {
    pub fn with_driver(options: RaySoOptions, driver: D) -> Self {
        Self {
            options,
            settings: PageSettings::default(),
            validator: Validator::default(),
            driver,
        }
    }

    pub fn with_settings(mut self, settings: PageSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the host-selected path check.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn options(&self) -> &RaySoOptions {
        &self.options
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    /// Validates the options and returns the page address for `code` without starting a browser.
    pub fn page_url(&self, code: &str) -> std::result::Result<String, ValidationError> {
        let request = self.validator.validate(&self.options)?;
        Ok(build_page_url(&self.settings.base_url, &request, code))
    }

    /// Renders `code` and returns the PNG bytes, writing a local preview when configured.
    ///
    /// Options are validated before anything is launched. Once a browser is running it is
    /// closed whether or not the remaining steps succeed.
    pub async fn render(&self, code: &str) -> Result<Rendered> {
        let mut progress = Progress::new(self.options.debug);
        progress.note("[=---------] Started image generation...");

        let request = match self.validator.validate(&self.options) {
            Ok(request) => request,
            Err(e) => {
                progress.fail("validating the options");
                return Err(e.into());
            }
        };
        progress.note("[==--------] Passed validation...");

        let url = build_page_url(&self.settings.base_url, &request, code);
        let mut session = match self.driver.launch().await {
            Ok(session) => session,
            Err(e) => {
                progress.fail(RenderStage::Launch);
                return Err(RenderError::new(RenderStage::Launch, e).into());
            }
        };
        progress.advance(RenderState::BrowserOpen, "[===-------] Opened browser...");

        let outcome = self
            .run_session(&mut session, &request, &url, &mut progress)
            .await;
        let closed = session.close().await;

        match (outcome, closed) {
            (Ok(rendered), Ok(())) => {
                progress.advance(RenderState::Closed, "Closed browser");
                progress.note("[==========] Successfully generated an image...");
                Ok(rendered)
            }
            (Ok(rendered), Err(e)) => {
                warn!("Failed to close browser after capture: {:#}", e);
                progress.advance(RenderState::Closed, "Browser released with errors");
                Ok(rendered)
            }
            (Err(err), closed) => {
                if let Err(e) = closed {
                    warn!("Failed to close browser after error: {:#}", e);
                }
                progress.fail(err.stage());
                Err(err.into())
            }
        }
    }

    async fn run_session(
        &self,
        session: &mut D::Session,
        request: &RenderRequest,
        url: &str,
        progress: &mut Progress,
    ) -> std::result::Result<Rendered, RenderError> {
        let settings = &self.settings;

        session
            .open_page(url, &settings.viewport, settings.navigation_timeout)
            .await
            .map_err(|e| RenderError::new(RenderStage::Navigate, e))?;
        let missing = session
            .evaluate(&hide_elements_script(&settings.hidden_selectors))
            .await
            .map_err(|e| RenderError::new(RenderStage::Navigate, e))?;
        if let Some(missing) = missing.as_array().filter(|m| !m.is_empty()) {
            warn!("Page controls not found, they may show up in the image: {:?}", missing);
        }
        progress.advance(
            RenderState::PageLoaded,
            "[=====-----] Opened and set up the page...",
        );

        if !request.background {
            let found = session
                .evaluate(&square_corners_script(&settings.inner_frame_style_selector))
                .await
                .map_err(|e| RenderError::new(RenderStage::Select, e))?;
            if found.as_bool() != Some(true) {
                return Err(RenderError::new(
                    RenderStage::Select,
                    anyhow::anyhow!(
                        "Frame element not found: {}",
                        settings.inner_frame_style_selector
                    ),
                ));
            }
        }
        session
            .select_element(settings.target_selector(request), settings.select_timeout)
            .await
            .map_err(|e| RenderError::new(RenderStage::Select, e))?;
        progress.advance(
            RenderState::ElementSelected,
            "[======----] Selected code frame element...",
        );

        let image = tokio::time::timeout(
            settings.capture_timeout,
            session.capture(CaptureOptions::new().with_omit_background(true)),
        )
        .await
        .map_err(|_| {
            RenderError::new(
                RenderStage::Capture,
                anyhow::anyhow!("Screenshot timed out after {:?}", settings.capture_timeout),
            )
        })?
        .map_err(|e| RenderError::new(RenderStage::Capture, e))?;
        progress.advance(RenderState::ImageCaptured, "[========--] Took a screenshot...");

        let saved_to = match &request.local_preview {
            Some(target) => {
                let path = preview::preview_path(target);
                preview::write_preview(&path, &image)
                    .await
                    .map_err(|e| RenderError::new(RenderStage::Persist, e))?;
                progress.note(&format!(
                    "[=========-] Created a local file named {}...",
                    path.display()
                ));
                Some(path)
            }
            None => None,
        };

        Ok(Rendered { image, saved_to })
    }
}

/// Hides each matching element and returns the selectors that matched nothing.
pub fn hide_elements_script(selectors: &[String]) -> String {
    let list = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        "(() => {{ const missing = []; for (const sel of {list}) {{ const el = document.querySelector(sel); if (el) {{ el.style.display = 'none'; }} else {{ missing.push(sel); }} }} return missing; }})()"
    )
}

/// Sets `border-radius: 0` on the element and returns whether it exists.
pub fn square_corners_script(selector: &str) -> String {
    let sel = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) {{ return false; }} el.style.borderRadius = '0'; return true; }})()"
    )
}
