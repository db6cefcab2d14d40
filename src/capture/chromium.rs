use crate::capture::target::RenderTarget;
use crate::clock::protocol::{self, ClockPayload, RegionRect, RegionState};
use crate::clock::virtual_clock::AdvanceReport;
use crate::foundation::error::{FrameclockError, FrameclockResult};
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, CaptureScreenshotParams,
    Viewport as ClipRect,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::path::{Path, PathBuf};
use std::time::Duration;

// Characters that must be escaped inside a `file://` URL path.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Headless Chromium launch settings.
#[derive(Clone, Debug)]
pub struct BrowserOpts {
    /// Viewport width in CSS pixels.
    pub width: u32,
    /// Viewport height in CSS pixels.
    pub height: u32,
    /// Explicit browser binary. When `None`, chromiumoxide searches the usual locations.
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    /// Disable the Chromium sandbox (needed in most containers).
    pub no_sandbox: bool,
    pub launch_timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for BrowserOpts {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            chrome_executable: None,
            headless: true,
            no_sandbox: false,
            launch_timeout: Duration::from_secs(30),
            extra_args: vec![
                "--hide-scrollbars".to_owned(),
                "--mute-audio".to_owned(),
                "--force-color-profile=srgb".to_owned(),
            ],
        }
    }
}

/// A [`RenderTarget`] backed by one Chromium page over CDP.
pub struct ChromiumTarget {
    browser: Browser,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
}

impl ChromiumTarget {
    /// Launch a browser and open a blank page sized to `opts`.
    #[tracing::instrument(skip(opts), fields(width = opts.width, height = opts.height))]
    pub async fn launch(opts: &BrowserOpts) -> FrameclockResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(opts.width, opts.height)
            .viewport(Viewport {
                width: opts.width,
                height: opts.height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .launch_timeout(opts.launch_timeout);

        if !opts.headless {
            builder = builder.with_head();
        }
        if opts.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &opts.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        for arg in &opts.extra_args {
            builder = builder.arg(arg.as_str());
        }

        let config = builder
            .build()
            .map_err(|e| FrameclockError::browser(format!("browser config: {e}")))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FrameclockError::browser(format!("launch failed: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "cdp handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FrameclockError::browser(format!("open page: {e}")))?;

        tracing::debug!("browser launched");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Evaluate a JavaScript expression in the page and deserialize its value.
    pub async fn evaluate<T: serde::de::DeserializeOwned>(
        &self,
        expr: &str,
    ) -> FrameclockResult<T> {
        call(&self.page, expr).await
    }
}

async fn call<T: serde::de::DeserializeOwned>(page: &Page, expr: &str) -> FrameclockResult<T> {
    let result = page
        .evaluate(expr)
        .await
        .map_err(|e| FrameclockError::protocol(format!("`{expr}` failed: {e}")))?;
    result
        .into_value()
        .map_err(|e| FrameclockError::protocol(format!("`{expr}` returned bad value: {e}")))
}

#[async_trait::async_trait]
impl RenderTarget for ChromiumTarget {
    async fn install_clock(&mut self, payload: &ClockPayload) -> FrameclockResult<()> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(payload.script()))
            .await
            .map_err(|e| FrameclockError::browser(format!("install clock: {e}")))?;
        Ok(())
    }

    async fn load(&mut self, url: &str) -> FrameclockResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| FrameclockError::PageLoad {
                url: url.to_owned(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn protocol_version(&mut self) -> FrameclockResult<u32> {
        call(&self.page, protocol::VERSION_EXPR).await
    }

    async fn region_state(&mut self, selector: &str) -> FrameclockResult<RegionState> {
        call(&self.page, &protocol::region_state_expr(selector)?).await
    }

    async fn reset_region_transform(&mut self, selector: &str) -> FrameclockResult<bool> {
        call(&self.page, &protocol::reset_region_transform_expr(selector)?).await
    }

    async fn is_playback_hook_present(&mut self) -> FrameclockResult<bool> {
        call(&self.page, protocol::IS_PLAYBACK_HOOK_PRESENT_EXPR).await
    }

    async fn invoke_playback_hook(&mut self) -> FrameclockResult<bool> {
        call(&self.page, protocol::INVOKE_PLAYBACK_HOOK_EXPR).await
    }

    async fn click_primary_control(
        &mut self,
        selectors: &[String],
    ) -> FrameclockResult<Option<String>> {
        let clicked: String =
            call(&self.page, &protocol::click_primary_control_expr(selectors)?).await?;
        Ok((!clicked.is_empty()).then_some(clicked))
    }

    async fn advance_to(&mut self, target_ms: f64) -> FrameclockResult<AdvanceReport> {
        call(&self.page, &protocol::advance_to_expr(target_ms)?).await
    }

    async fn screenshot(&mut self, clip: Option<RegionRect>) -> FrameclockResult<Vec<u8>> {
        let mut params = CaptureScreenshotParams::builder().format(CaptureScreenshotFormat::Png);
        if let Some(r) = clip {
            params = params.clip(ClipRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                scale: 1.0,
            });
        }
        let shot = self
            .page
            .execute(params.build())
            .await
            .map_err(|e| FrameclockError::capture(format!("screenshot: {e}")))?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| FrameclockError::capture(format!("screenshot payload: {e}")))
    }

    async fn close(&mut self) -> FrameclockResult<()> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "waiting for browser exit");
        }
        self.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| FrameclockError::browser(format!("close: {e}")))
    }
}

/// `file://` URL for a local scene file. Relative paths are resolved against the working
/// directory.
pub fn file_url(path: &Path) -> FrameclockResult<String> {
    let abs = std::path::absolute(path).map_err(|e| {
        FrameclockError::PageLoad {
            url: path.display().to_string(),
            message: e.to_string(),
        }
    })?;
    let raw = abs.to_string_lossy().replace('\\', "/");
    let encoded = utf8_percent_encode(&raw, PATH_SEGMENT).to_string();
    if encoded.starts_with('/') {
        Ok(format!("file://{encoded}"))
    } else {
        Ok(format!("file:///{encoded}"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/chromium.rs"]
mod tests;
