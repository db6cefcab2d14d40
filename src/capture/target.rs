use crate::clock::protocol::{ClockPayload, RegionRect, RegionState};
use crate::clock::virtual_clock::AdvanceReport;
use crate::foundation::error::FrameclockResult;

/// A page the capture engine can drive.
///
/// Every method is one round trip to the page. Implementations must not advance virtual time on
/// their own; only [`advance_to`](Self::advance_to) moves it.
#[async_trait::async_trait]
pub trait RenderTarget: Send {
    /// Register the clock payload so it runs before any script of the next navigation.
    async fn install_clock(&mut self, payload: &ClockPayload) -> FrameclockResult<()>;

    /// Navigate to `url` and wait for the load event.
    async fn load(&mut self, url: &str) -> FrameclockResult<()>;

    /// Protocol version reported by the installed clock, `0` when absent.
    async fn protocol_version(&mut self) -> FrameclockResult<u32>;

    async fn region_state(&mut self, selector: &str) -> FrameclockResult<RegionState>;

    /// Neutralize any transform on the region. Returns `false` if the region does not exist.
    async fn reset_region_transform(&mut self, selector: &str) -> FrameclockResult<bool>;

    async fn is_playback_hook_present(&mut self) -> FrameclockResult<bool>;

    /// Call the page's playback hook. Returns `false` if it is missing.
    async fn invoke_playback_hook(&mut self) -> FrameclockResult<bool>;

    /// Click the first selector that matches. Returns the selector that was clicked.
    async fn click_primary_control(
        &mut self,
        selectors: &[String],
    ) -> FrameclockResult<Option<String>>;

    async fn advance_to(&mut self, target_ms: f64) -> FrameclockResult<AdvanceReport>;

    /// PNG-encoded screenshot of `clip`, or of the whole viewport when `None`.
    async fn screenshot(&mut self, clip: Option<RegionRect>) -> FrameclockResult<Vec<u8>>;

    async fn close(&mut self) -> FrameclockResult<()>;
}
