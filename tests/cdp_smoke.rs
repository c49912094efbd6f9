//! Drives a real Chromium against a local stand-in for the ray.so page.
//!
//! Run with `cargo test -- --ignored` on a machine with Chrome or Chromium installed.

use rayso_shot::{PageSettings, RaySo, RaySoOptions, Viewport};
use std::sync::Arc;
use std::thread;
use tiny_http::{Header, Response, Server};

const PAGE: &str = r#"<!doctype html>
<html>
<body style="margin:0">
  <div id="app">
    <main>
      <div id="frame" style="display:inline-block;padding:32px;background:#345">
        <div class="drag-control-points">
          <div class="handle left">L</div>
          <div class="handle right">R</div>
        </div>
        <div class="app-frame-container">
          <div class="app-frame" style="width:240px;height:80px;border-radius:12px;background:#123;color:#eee">
            <pre id="code"></pre>
          </div>
        </div>
      </div>
      <section>controls</section>
    </main>
  </div>
  <script>
    const params = new URLSearchParams(location.search);
    document.getElementById('code').textContent = atob(params.get('code') || '');
  </script>
</body>
</html>"#;

struct FakeSite {
    server: Arc<Server>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeSite {
    fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let worker = server.clone();
        let handle = thread::spawn(move || {
            for request in worker.incoming_requests() {
                let header = Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap();
                let _ = request.respond(Response::from_string(PAGE).with_header(header));
            }
        });
        Self {
            server,
            handle: Some(handle),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}/", self.server.server_addr().to_ip().unwrap())
    }
}

impl Drop for FakeSite {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
}

fn png_size(bytes: &[u8]) -> (u32, u32) {
    let width = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
    let height = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
    (width, height)
}

fn settings(site: &FakeSite) -> PageSettings {
    PageSettings::default()
        .with_base_url(site.base_url())
        .with_viewport(Viewport::new(1280, 720))
}

#[tokio::test]
#[ignore = "needs a local Chromium"]
async fn captures_outer_frame() {
    let _ = env_logger::builder().is_test(true).try_init();
    let site = FakeSite::start();

    let rendered = RaySo::new(RaySoOptions::new().with_title("smoke"))
        .with_settings(settings(&site))
        .render("fn main() {}")
        .await
        .unwrap();

    assert!(is_png(&rendered.image));
    let (width, height) = png_size(&rendered.image);
    assert!(width >= 240 + 64, "{width}");
    assert!(height >= 80 + 64, "{height}");
}

#[tokio::test]
#[ignore = "needs a local Chromium"]
async fn captures_inner_frame_into_preview() {
    let site = FakeSite::start();
    let dir = tempfile::tempdir().unwrap();
    let options = RaySoOptions::new()
        .with_background(false)
        .with_local_preview(dir.path().to_string_lossy())
        .with_local_preview_file("inner.png");

    let rendered = RaySo::new(options)
        .with_settings(settings(&site))
        .render("print('hi')")
        .await
        .unwrap();

    assert!(is_png(&rendered.image));
    assert_eq!(png_size(&rendered.image), (240, 80));
    let saved = rendered.saved_to.unwrap();
    assert_eq!(std::fs::read(saved).unwrap(), rendered.image);
}
