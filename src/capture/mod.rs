//! Deterministic frame capture: the render-target seam, the Chromium implementation, the
//! capture session and frame persistence.

pub mod chromium;
pub mod engine;
pub mod frames;
pub mod target;
