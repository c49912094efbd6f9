use crate::tab::Tab;
use crate::types::{CaptureOptions, ClipRegion};
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

/// Represents a DOM element controlled via CDP.
pub struct Element<'a> {
    parent: &'a Tab,
    backend_node_id: u64,
}

impl<'a> Element<'a> {
    pub(crate) async fn new(parent: &'a Tab, node_id: u64) -> Result<Self> {
        let data = parent
            .send_cmd("DOM.describeNode", json!({ "nodeId": node_id, "depth": 1 }))
            .await?;
        let backend_node_id = data["result"]["node"]["backendNodeId"]
            .as_u64()
            .context("Missing backendNodeId")?;

        Ok(Self {
            parent,
            backend_node_id,
        })
    }

    /// Border box of the element in page coordinates.
    async fn clip(&self) -> Result<ClipRegion> {
        let data = self
            .parent
            .send_cmd(
                "DOM.getBoxModel",
                json!({ "backendNodeId": self.backend_node_id }),
            )
            .await?;
        let quad: Vec<f64> = data["result"]["model"]["border"]
            .as_array()
            .context("Missing border box")?
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        ClipRegion::from_quad(&quad).context("Malformed border box")
    }

    /// Captures a PNG screenshot of the element and returns the decoded image bytes.
    pub async fn screenshot(&self, opts: CaptureOptions) -> Result<Vec<u8>> {
        let clip = self.clip().await?;
        let params = json!({
            "format": "png",
            "clip": {
                "x": clip.x,
                "y": clip.y,
                "width": clip.width,
                "height": clip.height,
                "scale": 1.0
            },
            "fromSurface": true,
            "captureBeyondViewport": true,
        });

        if opts.omit_background {
            self.parent
                .send_cmd(
                    "Emulation.setDefaultBackgroundColorOverride",
                    json!({ "color": { "r": 0, "g": 0, "b": 0, "a": 0 } }),
                )
                .await?;
        }

        self.parent.activate().await?;
        let captured = self.parent.send_cmd("Page.captureScreenshot", params).await;

        if opts.omit_background {
            let _ = self
                .parent
                .send_cmd("Emulation.setDefaultBackgroundColorOverride", json!({}))
                .await;
        }

        let encoded = captured?["result"]["data"]
            .as_str()
            .map(str::to_owned)
            .context("No image data received")?;
        BASE64
            .decode(encoded)
            .context("Screenshot data is not valid base64")
    }
}
