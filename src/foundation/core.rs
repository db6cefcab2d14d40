use crate::foundation::error::{FrameclockError, FrameclockResult};

/// Highest frame rate a timeline may declare.
pub const MAX_FPS: u32 = 120;

/// Longest timeline accepted, 24 hours.
pub const MAX_DURATION_MS: u64 = 86_400_000;

/// Absolute 0-based output frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Sampling plan for one capture: which virtual instants get a screenshot.
///
/// `total_frames = floor(duration_ms / 1000 * fps) + 1`, so both `t = 0` and the last whole
/// frame interval at or before `duration_ms` are sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FramePlan {
    /// Frames per second, in `[1, 120]`.
    pub fps: u32,
    /// Timeline duration in milliseconds, in `[1, MAX_DURATION_MS]`.
    pub duration_ms: u64,
}

impl FramePlan {
    /// Create a validated plan.
    pub fn new(fps: u32, duration_ms: u64) -> FrameclockResult<Self> {
        if fps == 0 || fps > MAX_FPS {
            return Err(FrameclockError::capture(format!(
                "fps must be in [1, {MAX_FPS}], got {fps}"
            )));
        }
        if duration_ms == 0 || duration_ms > MAX_DURATION_MS {
            return Err(FrameclockError::capture(format!(
                "duration_ms must be in [1, {MAX_DURATION_MS}], got {duration_ms}"
            )));
        }
        Ok(Self { fps, duration_ms })
    }

    /// Virtual milliseconds between two consecutive samples.
    pub fn frame_interval_ms(self) -> f64 {
        1000.0 / f64::from(self.fps)
    }

    /// Number of frames the capture loop produces.
    pub fn total_frames(self) -> u64 {
        // floor(duration_ms / 1000 * fps) in integers: 2000ms @ 30fps is exactly 60 intervals.
        self.duration_ms.saturating_mul(u64::from(self.fps)) / 1000 + 1
    }

    /// Virtual time at which frame `idx` is sampled.
    pub fn target_ms(self, idx: FrameIndex) -> f64 {
        idx.0 as f64 * 1000.0 / f64::from(self.fps)
    }

    /// Iterate `(index, target_ms)` pairs in capture order.
    pub fn frames(self) -> impl Iterator<Item = (FrameIndex, f64)> {
        (0..self.total_frames()).map(move |i| (FrameIndex(i), self.target_ms(FrameIndex(i))))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
