//! The browser-automation seam the render sequence is written against.

use crate::browser::{Browser, BrowserConfig};
use crate::tab::Tab;
use crate::types::{CaptureOptions, Viewport};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use std::time::Duration;

/// Starts one browser per render.
#[async_trait]
pub trait Driver: Send + Sync {
    type Session: Session;

    async fn launch(&self) -> Result<Self::Session>;
}

/// A running browser with at most one page.
///
/// `close` must be safe to call in any state, including after a failed step.
#[async_trait]
pub trait Session: Send {
    /// Opens a page sized to `viewport`, navigates to `url` and waits for the load event.
    async fn open_page(&mut self, url: &str, viewport: &Viewport, timeout: Duration)
    -> Result<()>;

    /// Runs `script` in the page and returns its value.
    async fn evaluate(&mut self, script: &str) -> Result<Value>;

    /// Waits until `selector` matches and makes it the capture target.
    async fn select_element(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Screenshots the selected element as PNG.
    async fn capture(&mut self, opts: CaptureOptions) -> Result<Vec<u8>>;

    /// Closes the page, then the browser.
    async fn close(&mut self) -> Result<()>;
}

/// Chromium over the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct CdpDriver {
    config: BrowserConfig,
}

impl CdpDriver {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

#[async_trait]
impl Driver for CdpDriver {
    type Session = CdpSession;

    async fn launch(&self) -> Result<CdpSession> {
        let browser = Browser::launch(&self.config).await?;
        Ok(CdpSession {
            browser,
            tab: None,
            selected: None,
        })
    }
}

pub struct CdpSession {
    browser: Browser,
    tab: Option<Tab>,
    selected: Option<String>,
}

impl CdpSession {
    fn tab(&self) -> Result<&Tab> {
        self.tab.as_ref().context("No page is open")
    }
}

#[async_trait]
impl Session for CdpSession {
    async fn open_page(
        &mut self,
        url: &str,
        viewport: &Viewport,
        timeout: Duration,
    ) -> Result<()> {
        let tab = self.browser.new_tab().await?;
        // Keep the tab before anything else can fail so `close` reaches it.
        let tab = self.tab.insert(tab);
        tab.set_viewport(viewport).await?;
        tab.goto(url, timeout).await?;
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        self.tab()?.evaluate(script).await
    }

    async fn select_element(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab()?.wait_for_selector(selector, timeout).await?;
        self.selected = Some(selector.to_string());
        Ok(())
    }

    async fn capture(&mut self, opts: CaptureOptions) -> Result<Vec<u8>> {
        let selector = self
            .selected
            .as_deref()
            .ok_or_else(|| anyhow!("No element selected"))?;
        let tab = self.tab()?;
        tab.find_element(selector).await?.screenshot(opts).await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(tab) = self.tab.take()
            && let Err(e) = tab.close().await
        {
            warn!("Failed to close tab: {:?}", e);
        }
        self.selected = None;
        self.browser.close_async().await
    }
}
