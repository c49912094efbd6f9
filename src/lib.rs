/*!
Turn code snippets into [ray.so](https://ray.so) images.

The options are validated, encoded into a ray.so address, and the page is opened in a
headless Chromium driven over the Chrome DevTools Protocol (CDP). The code frame is
captured as a PNG with a transparent background where the page would show through.

```no_run
use rayso_shot::{Language, RaySo, RaySoOptions};

# async fn run() -> rayso_shot::Result<()> {
let rayso = RaySo::new(
    RaySoOptions::new()
        .with_title("hello.rs")
        .with_language(Language::Rust)
        .with_background(false)
        .with_local_preview("/tmp"),
);
let rendered = rayso.render("fn main() {}").await?;
println!("wrote {:?}", rendered.saved_to);
# Ok(())
# }
```
*/

mod browser;
mod element;
mod tab;
mod transport;
mod types;
mod utils;

pub mod driver;
pub mod error;
pub mod options;
pub mod page_url;
pub mod preview;
mod rayso;
pub mod validate;

pub use browser::{Browser, BrowserConfig, DEFAULT_ARGS};
pub use driver::{CdpDriver, CdpSession, Driver, Session};
pub use element::Element;
pub use error::{Error, RenderError, RenderStage, Result, ValidationError};
pub use options::{
    Language, LocalPreview, Padding, PaddingValue, RaySoOptions, RenderRequest, Theme,
};
pub use page_url::{DEFAULT_BASE_URL, build_page_url};
pub use rayso::{
    PageSettings, RaySo, RenderState, Rendered, hide_elements_script, square_corners_script,
};
pub use tab::Tab;
pub use types::{CaptureOptions, Viewport};
pub use validate::{PathShape, Validator};
