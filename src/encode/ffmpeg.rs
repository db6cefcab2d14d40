use crate::foundation::error::{FrameclockError, FrameclockResult};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;

/// A fully specified external tool invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_owned(),
            args: Vec::new(),
        }
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn path(mut self, p: &Path) -> Self {
        self.args.push(p.display().to_string());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// Options shared by the encode and mux commands.
#[derive(Clone, Debug)]
pub struct EncodeOpts {
    /// `ffmpeg` binary (name on `PATH` or full path).
    pub ffmpeg: String,
    /// `ffprobe` binary.
    pub ffprobe: String,
    /// Overwrite existing outputs (`-y`) instead of refusing (`-n`).
    pub overwrite: bool,
    pub video_codec: String,
    pub pix_fmt: String,
    pub audio_codec: String,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_owned(),
            ffprobe: "ffprobe".to_owned(),
            overwrite: true,
            video_codec: "libx264".to_owned(),
            pix_fmt: "yuv420p".to_owned(),
            audio_codec: "aac".to_owned(),
        }
    }
}

impl EncodeOpts {
    fn overwrite_flag(&self) -> &'static str {
        if self.overwrite { "-y" } else { "-n" }
    }
}

/// Encode a numbered PNG sequence into an MP4.
///
/// `ffmpeg -y -framerate <fps> -i <pattern> -c:v libx264 -pix_fmt yuv420p <out>`
pub fn build_encode_command(fps: u32, pattern: &Path, out: &Path) -> ToolCommand {
    build_encode_command_with(fps, pattern, out, &EncodeOpts::default())
}

pub fn build_encode_command_with(
    fps: u32,
    pattern: &Path,
    out: &Path,
    opts: &EncodeOpts,
) -> ToolCommand {
    ToolCommand::new(&opts.ffmpeg)
        .args([opts.overwrite_flag(), "-framerate"])
        .args([fps.to_string(), "-i".to_owned()])
        .path(pattern)
        .args(["-c:v", opts.video_codec.as_str(), "-pix_fmt", opts.pix_fmt.as_str()])
        .path(out)
}

/// Mux an audio track into an encoded video, copying the video stream.
///
/// `ffmpeg -y -i <video> -i <audio> -c:v copy -c:a aac -shortest <out>`
pub fn build_mux_command(video: &Path, audio: &Path, out: &Path) -> ToolCommand {
    build_mux_command_with(video, audio, out, &EncodeOpts::default())
}

pub fn build_mux_command_with(
    video: &Path,
    audio: &Path,
    out: &Path,
    opts: &EncodeOpts,
) -> ToolCommand {
    ToolCommand::new(&opts.ffmpeg)
        .args([opts.overwrite_flag(), "-i"])
        .path(video)
        .args(["-i"])
        .path(audio)
        .args(["-c:v", "copy", "-c:a", opts.audio_codec.as_str(), "-shortest"])
        .path(out)
}

/// `ffprobe` query printing `WxH` of the first video stream.
pub fn build_probe_command(video: &Path, opts: &EncodeOpts) -> ToolCommand {
    ToolCommand::new(&opts.ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0:s=x",
        ])
        .path(video)
}

/// `ffprobe` query printing the container duration in seconds.
pub fn build_duration_probe_command(media: &Path, opts: &EncodeOpts) -> ToolCommand {
    ToolCommand::new(&opts.ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .path(media)
}

/// Pixel size of a video stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = FrameclockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_resolution(s)
    }
}

/// Parse `ffprobe` resolution output (`1080x1920`, first non-empty line).
pub fn parse_resolution(out: &str) -> FrameclockResult<Resolution> {
    let line = first_line(out);
    let parsed = line.split_once('x').and_then(|(w, h)| {
        Some(Resolution {
            width: w.trim().parse().ok()?,
            height: h.trim().parse().ok()?,
        })
    });
    parsed.ok_or_else(|| unparseable("ffprobe", "resolution", out))
}

/// Parse `ffprobe` duration output (`12.345000`) into whole milliseconds.
pub fn parse_duration_ms(out: &str) -> FrameclockResult<u64> {
    let secs: f64 = first_line(out)
        .parse()
        .map_err(|_| unparseable("ffprobe", "duration", out))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(unparseable("ffprobe", "duration", out));
    }
    Ok((secs * 1000.0).round() as u64)
}

/// Run `ffprobe` on `video` and return its resolution.
pub async fn probe_resolution(video: &Path, opts: &EncodeOpts) -> FrameclockResult<Resolution> {
    let out = run_tool(&build_probe_command(video, opts)).await?;
    parse_resolution(&out)
}

/// Run `ffprobe` on `media` and return its duration in milliseconds.
pub async fn probe_duration_ms(media: &Path, opts: &EncodeOpts) -> FrameclockResult<u64> {
    let out = run_tool(&build_duration_probe_command(media, opts)).await?;
    parse_duration_ms(&out)
}

/// Run a tool to completion and return its stdout.
///
/// A spawn failure or non-zero exit becomes [`FrameclockError::Encode`] carrying stderr.
#[tracing::instrument(skip_all, fields(tool = %cmd.program))]
pub async fn run_tool(cmd: &ToolCommand) -> FrameclockResult<String> {
    tracing::debug!(command = %cmd, "running");
    let output = tokio::process::Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| FrameclockError::Encode {
            tool: cmd.program.clone(),
            status: "failed to spawn".to_owned(),
            stderr: format!("{e} (is it installed and on PATH?)"),
        })?;

    if !output.status.success() {
        return Err(FrameclockError::Encode {
            tool: cmd.program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Fail with [`FrameclockError::Encode`] when `program -version` cannot run.
pub async fn ensure_tool(program: &str) -> FrameclockResult<()> {
    run_tool(&ToolCommand::new(program).args(["-version"]))
        .await
        .map(|_| ())
}

/// `yuv420p` needs non-zero even dimensions.
pub fn check_frame_size(width: u32, height: u32) -> FrameclockResult<()> {
    if width == 0 || height == 0 || !width.is_multiple_of(2) || !height.is_multiple_of(2) {
        return Err(FrameclockError::Encode {
            tool: "ffmpeg".to_owned(),
            status: "not started".to_owned(),
            stderr: format!(
                "frame size {width}x{height} must be non-zero and even for yuv420p output"
            ),
        });
    }
    Ok(())
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> FrameclockResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn first_line(out: &str) -> &str {
    out.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

fn unparseable(tool: &str, what: &str, out: &str) -> FrameclockError {
    FrameclockError::Encode {
        tool: tool.to_owned(),
        status: format!("unparseable {what}"),
        stderr: out.trim().to_owned(),
    }
}
