use crate::element::Element;
use crate::transport::{Transport, TransportResponse, next_id};
use crate::types::Viewport;
use crate::utils;
use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// Represents a CDP browser tab (target) session.
pub struct Tab {
    pub(crate) transport: Arc<Transport>,
    pub(crate) session_id: String,
    pub(crate) target_id: String,
}

impl Tab {
    /// Creates a new blank tab and attaches to it.
    pub(crate) async fn new(transport: Arc<Transport>) -> Result<Self> {
        let TransportResponse::Response(res_create) = transport
            .send(json!({ "id": next_id(), "method": "Target.createTarget", "params": { "url": "about:blank" } }))
            .await? else { return Err(anyhow!("Invalid response type")); };

        let target_id = res_create.result["targetId"]
            .as_str()
            .context("No targetId")?
            .to_string();

        let TransportResponse::Response(res_attach) = transport
            .send(json!({ "id": next_id(), "method": "Target.attachToTarget", "params": { "targetId": target_id } }))
            .await? else { return Err(anyhow!("Invalid response type")); };

        let session_id = res_attach.result["sessionId"]
            .as_str()
            .context("No sessionId")?
            .to_string();

        Ok(Self {
            transport,
            session_id,
            target_id,
        })
    }

    pub(crate) async fn send_cmd(&self, method: &str, params: Value) -> Result<Value> {
        utils::call_target(&self.transport, &self.session_id, method, params).await
    }

    pub async fn set_viewport(&self, viewport: &Viewport) -> Result<&Self> {
        self.send_cmd(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": viewport.width,
                "height": viewport.height,
                "deviceScaleFactor": viewport.device_scale_factor,
                "mobile": false
            }),
        )
        .await?;
        Ok(self)
    }

    /// Navigates to `url` and waits for its load event, failing after `timeout`.
    pub async fn goto(&self, url: &str, timeout: Duration) -> Result<&Self> {
        self.send_cmd("Page.enable", json!({})).await?;

        // Register listener BEFORE triggering the event to avoid race conditions
        let event_rx = self
            .transport
            .listen_for_event(&self.session_id, "Page.loadEventFired")
            .await?;

        let nav = self.send_cmd("Page.navigate", json!({ "url": url })).await?;
        if let Some(err) = nav["result"]["errorText"].as_str() {
            return Err(anyhow!("Navigation to {} failed: {}", url, err));
        }

        time::timeout(timeout, event_rx)
            .await
            .map_err(|_| anyhow!("Timeout waiting for event Page.loadEventFired"))?
            .map_err(|_| anyhow!("Event channel closed"))?;

        Ok(self)
    }

    /// Evaluates `expression` in the page and returns its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .send_cmd(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true
                }),
            )
            .await?;
        if let Some(details) = result["result"].get("exceptionDetails") {
            let text = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("unknown exception");
            return Err(anyhow!("Script threw: {}", text));
        }
        Ok(result["result"]["result"]["value"].clone())
    }

    /// Finds the first element matching the given CSS selector.
    pub async fn find_element(&self, selector: &str) -> Result<Element<'_>> {
        let data_doc = self.send_cmd("DOM.getDocument", json!({})).await?;
        let root_node_id = data_doc["result"]["root"]["nodeId"]
            .as_u64()
            .context("No root node")?;

        let data_sel = self
            .send_cmd(
                "DOM.querySelector",
                json!({ "nodeId": root_node_id, "selector": selector }),
            )
            .await?;
        // querySelector answers nodeId 0 when nothing matched.
        let node_id = data_sel["result"]["nodeId"]
            .as_u64()
            .filter(|id| *id != 0)
            .with_context(|| format!("Element not found: {selector}"))?;

        Element::new(self, node_id).await
    }

    /// Polls for `selector` until it matches or `timeout` elapses.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<Element<'_>> {
        let start = std::time::Instant::now();

        loop {
            match self.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(_) if start.elapsed() < timeout => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Activates the target tab to bring it to the foreground.
    pub async fn activate(&self) -> Result<&Self> {
        self.transport
            .send(json!({ "id": next_id(), "method": "Target.activateTarget", "params": { "targetId": self.target_id } }))
            .await?;
        Ok(self)
    }

    /// Closes the target tab.
    pub async fn close(&self) -> Result<()> {
        let TransportResponse::Response(_) = self
            .transport
            .send(json!({ "id": next_id(), "method": "Target.closeTarget", "params": { "targetId": self.target_id } }))
            .await? else { return Err(anyhow!("Invalid response type")); };
        Ok(())
    }
}
