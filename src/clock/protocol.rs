//! Host side of the in-page clock protocol.
//!
//! The page half lives in `clock.js` and is installed before any page script runs. The host only
//! talks to it through the expressions built here, each of which evaluates to a JSON value that
//! deserializes into one of the types below. Expressions never evaluate to `null`/`undefined` at
//! the top level so every call has a concrete result.

use crate::clock::virtual_clock::DEFAULT_STEP_MS;
use crate::foundation::error::{FrameclockError, FrameclockResult};

/// Version reported by `window.__frameclock.version`. Bumped on any incompatible change.
pub const CLOCK_PROTOCOL_VERSION: u32 = 1;

/// Global function a scene defines to start its own playback.
pub const DEFAULT_PLAYBACK_HOOK: &str = "__shortsPlayAll";

/// Fixed wall-clock base for `Date.now()`: 2024-01-01T00:00:00Z.
pub const DEFAULT_EPOCH_MS: f64 = 1_704_067_200_000.0;

const CLOCK_JS: &str = include_str!("clock.js");

/// Evaluates to the installed protocol version, or `0` when no clock is present.
pub const VERSION_EXPR: &str =
    "(window.__frameclock && window.__frameclock.version) ? window.__frameclock.version : 0";

pub const IS_PLAYBACK_HOOK_PRESENT_EXPR: &str = "window.__frameclock.isPlaybackHookPresent()";

pub const INVOKE_PLAYBACK_HOOK_EXPR: &str = "window.__frameclock.invokePlaybackHook()";

/// Settings baked into the installed payload.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockConfig {
    pub step_ms: f64,
    pub epoch_ms: f64,
    pub playback_hook: String,
    /// Player buckets (see `CompiledSchedule::to_player_json`). When set, the page gets a
    /// playback hook that applies them, unless it defines its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<serde_json::Value>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            step_ms: DEFAULT_STEP_MS,
            epoch_ms: DEFAULT_EPOCH_MS,
            playback_hook: DEFAULT_PLAYBACK_HOOK.to_owned(),
            schedule: None,
        }
    }
}

/// Script source ready for "evaluate on new document".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockPayload {
    script: String,
}

impl ClockPayload {
    pub fn new(config: &ClockConfig) -> FrameclockResult<Self> {
        let cfg = serde_json::to_string(config)
            .map_err(|e| FrameclockError::serde(format!("encode clock config: {e}")))?;
        let script = format!("(function () {{\n{CLOCK_JS}\n__frameclockInstall({cfg});\n}})();\n");
        Ok(Self { script })
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}

/// Page-space rectangle in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RegionRect {
    /// Snap outward to whole pixels so a clip never cuts a partial row or column.
    pub fn snapped(self) -> Self {
        let x = self.x.floor();
        let y = self.y.floor();
        Self {
            x,
            y,
            width: (self.x + self.width).ceil() - x,
            height: (self.y + self.height).ceil() - y,
        }
    }
}

/// Answer to a region query.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegionState {
    pub present: bool,
    pub visible: bool,
    pub rect: Option<RegionRect>,
}

impl RegionState {
    pub fn absent() -> Self {
        Self {
            present: false,
            visible: false,
            rect: None,
        }
    }
}

/// Expression moving virtual time to `target_ms`; evaluates to an `AdvanceReport`.
pub fn advance_to_expr(target_ms: f64) -> FrameclockResult<String> {
    if !target_ms.is_finite() || target_ms < 0.0 {
        return Err(FrameclockError::protocol(format!(
            "advance target must be a finite non-negative number, got {target_ms}"
        )));
    }
    Ok(format!("window.__frameclock.advanceTo({target_ms:?})"))
}

pub fn region_state_expr(selector: &str) -> FrameclockResult<String> {
    Ok(format!(
        "window.__frameclock.regionState({})",
        js_string(selector)?
    ))
}

pub fn reset_region_transform_expr(selector: &str) -> FrameclockResult<String> {
    Ok(format!(
        "window.__frameclock.resetRegionTransform({})",
        js_string(selector)?
    ))
}

/// Clicks the first matching selector; evaluates to that selector, or `""` when none matched.
pub fn click_primary_control_expr(selectors: &[String]) -> FrameclockResult<String> {
    let list = serde_json::to_string(selectors)
        .map_err(|e| FrameclockError::serde(format!("encode selectors: {e}")))?;
    Ok(format!("window.__frameclock.clickPrimaryControl({list})"))
}

/// Reject a page whose clock speaks a different protocol.
pub fn check_version(reported: u32) -> FrameclockResult<()> {
    match reported {
        CLOCK_PROTOCOL_VERSION => Ok(()),
        0 => Err(FrameclockError::protocol(
            "virtual clock is not installed in the page",
        )),
        other => Err(FrameclockError::protocol(format!(
            "page clock speaks protocol v{other}, host expects v{CLOCK_PROTOCOL_VERSION}"
        ))),
    }
}

fn js_string(s: &str) -> FrameclockResult<String> {
    serde_json::to_string(s).map_err(|e| FrameclockError::serde(format!("encode selector: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/clock/protocol.rs"]
mod tests;
