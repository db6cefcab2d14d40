//! External encoder adapter.
//!
//! Command builders are pure; [`ffmpeg::run_tool`] is the only place a process is spawned.

/// `ffmpeg`/`ffprobe` command construction, output parsing and execution.
pub mod ffmpeg;
