use crate::timeline::validate::SchemaErrors;

/// Result alias used throughout the crate.
pub type FrameclockResult<T> = Result<T, FrameclockError>;

/// Error taxonomy for validation, capture and encoding.
///
/// Validation errors (`Schema`, `Order`) are raised before any browser is launched. Capture and
/// encode errors abort the current render but leave already written frames intact.
#[derive(thiserror::Error, Debug)]
pub enum FrameclockError {
    /// Structural timeline violations (first five, with JSON paths).
    #[error("schema error: {0}")]
    Schema(SchemaErrors),

    /// Events are not non-decreasing by `t_ms`.
    #[error(
        "order error: events[{index}].t_ms = {t_ms} is less than the previous event's t_ms = {previous_t_ms}"
    )]
    Order {
        /// Index of the first offending event.
        index: usize,
        /// Its timestamp.
        t_ms: u64,
        /// Timestamp of the event right before it.
        previous_t_ms: u64,
    },

    /// The capture region never became visible.
    #[error("capture timeout: region '{selector}' not visible after {waited_ms}ms")]
    CaptureTimeout {
        /// Selector of the capture region.
        selector: String,
        /// How long the engine waited.
        waited_ms: u64,
    },

    /// Navigation to the scene failed.
    #[error("page load error: {url}: {message}")]
    PageLoad {
        /// URL that failed to load.
        url: String,
        /// Underlying message.
        message: String,
    },

    /// An external encoder/muxer/prober exited unsuccessfully.
    #[error("encode error: {tool} exited with {status}: {stderr}")]
    Encode {
        /// Program name (`ffmpeg`, `ffprobe`).
        tool: String,
        /// Exit status description.
        status: String,
        /// Captured diagnostic output.
        stderr: String,
    },

    /// Browser launch or CDP failure.
    #[error("browser error: {0}")]
    Browser(String),

    /// Clock protocol failure (not installed, version mismatch, bad reply).
    #[error("clock protocol error: {0}")]
    Protocol(String),

    /// Screenshot or frame persistence failure.
    #[error("capture error: {0}")]
    Capture(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrameclockError {
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors raised by the validator (schema or ordering).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Schema(_) | Self::Order { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
