//! Frameclock renders HTML scenes to video deterministically.
//!
//! A scene is driven by a timeline of `(t_ms, op, target)` events. Instead of recording the page
//! in real time, frameclock replaces the page's time sources with a virtual clock and steps it
//! frame by frame:
//!
//! - Validate and compile a [`Timeline`] into a [`CompiledSchedule`]
//! - Drive a [`RenderTarget`] with a [`CaptureSession`], one screenshot per frame
//! - Encode the frame sequence (and optional audio) with `ffmpeg`
//!
//! [`render`] runs the whole pipeline against headless Chromium.
#![forbid(unsafe_code)]

pub mod capture;
pub mod clock;
pub mod compile;
pub mod encode;
pub mod foundation;
pub mod pipeline;
pub mod scene;
pub mod storyboard;
pub mod timeline;

pub use crate::capture::chromium::{BrowserOpts, ChromiumTarget};
pub use crate::capture::engine::{CaptureOpts, CaptureSession, CaptureStats, PlaybackStart};
pub use crate::capture::frames::{FrameManifest, FrameRecord, FrameWriter};
pub use crate::capture::target::RenderTarget;
pub use crate::clock::protocol::{
    CLOCK_PROTOCOL_VERSION, ClockConfig, ClockPayload, RegionRect, RegionState,
};
pub use crate::clock::virtual_clock::{AdvanceReport, VirtualClock};
pub use crate::compile::schedule::{CompiledSchedule, compile};
pub use crate::encode::ffmpeg::{
    EncodeOpts, Resolution, ToolCommand, build_encode_command, build_mux_command,
    probe_resolution,
};
pub use crate::foundation::core::{FrameIndex, FramePlan};
pub use crate::foundation::error::{FrameclockError, FrameclockResult};
pub use crate::pipeline::{RenderRequest, RenderResult, render};
pub use crate::timeline::model::{Event, Op, Segment, Timeline};
pub use crate::timeline::validate::{SchemaError, SchemaErrors, validate_value};
