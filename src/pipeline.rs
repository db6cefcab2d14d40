use crate::capture::chromium::{BrowserOpts, ChromiumTarget, file_url};
use crate::capture::engine::{CaptureOpts, CaptureSession, CaptureStats};
use crate::capture::frames::{FrameWriter, MANIFEST_FILE};
use crate::capture::target::RenderTarget;
use crate::compile::schedule::compile;
use crate::encode::ffmpeg::{
    EncodeOpts, Resolution, build_encode_command_with, build_mux_command_with, check_frame_size,
    ensure_parent_dir, ensure_tool, probe_resolution, run_tool,
};
use crate::foundation::error::FrameclockResult;
use crate::scene::overlay::inject_debug_overlay;
use crate::scene::qa::{MissingAsset, missing_assets, missing_targets};
use crate::timeline::model::Timeline;
use anyhow::Context as _;
use std::path::{Path, PathBuf};

/// Frames subdirectory of a render's output directory.
pub const FRAMES_DIR: &str = "frames";
/// Video encoded from the frames.
pub const PRIMARY_VIDEO: &str = "video.mp4";
/// Video with the audio track muxed in.
pub const FINAL_VIDEO: &str = "final.mp4";

/// Everything needed to turn a scene and a timeline into video files.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    pub scene_path: PathBuf,
    pub timeline: Timeline,
    pub out_dir: PathBuf,
    /// Audio track to mux into [`FINAL_VIDEO`].
    pub audio_path: Option<PathBuf>,
    /// Render a copy of the scene with a time/caption overlay instead of the scene itself.
    pub debug_overlay: bool,
    pub browser: BrowserOpts,
    pub capture: CaptureOpts,
    pub encode: EncodeOpts,
}

impl RenderRequest {
    pub fn new(
        scene_path: impl Into<PathBuf>,
        timeline: Timeline,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scene_path: scene_path.into(),
            timeline,
            out_dir: out_dir.into(),
            audio_path: None,
            debug_overlay: false,
            browser: BrowserOpts::default(),
            capture: CaptureOpts::default(),
            encode: EncodeOpts::default(),
        }
    }
}

/// Outputs of a successful render.
#[derive(Clone, Debug)]
pub struct RenderResult {
    pub frame_count: u64,
    pub frames_location: PathBuf,
    pub primary_video: PathBuf,
    /// Present only when an audio track was supplied.
    pub final_video: Option<PathBuf>,
    /// Probed size of the primary video; `None` when probing failed.
    pub resolution: Option<Resolution>,
    pub manifest: PathBuf,
    pub missing_assets: Vec<MissingAsset>,
    pub missing_targets: Vec<String>,
    pub capture: CaptureStats,
}

/// Validate, capture, encode and (optionally) mux.
///
/// The timeline is compiled before anything touches the browser, so malformed timelines fail
/// without side effects. The browser is closed whether or not capture succeeds.
#[tracing::instrument(skip_all, fields(scene = %req.scene_path.display(), out = %req.out_dir.display()))]
pub async fn render(req: &RenderRequest) -> FrameclockResult<RenderResult> {
    let schedule = compile(&req.timeline)?;
    let plan = schedule.frame_plan()?;

    let html = std::fs::read_to_string(&req.scene_path)
        .with_context(|| format!("failed to read scene '{}'", req.scene_path.display()))?;
    let scene_dir = req.scene_path.parent().unwrap_or_else(|| Path::new("."));
    let missing_assets = missing_assets(&html, scene_dir);
    for m in &missing_assets {
        tracing::warn!(reference = %m.reference, resolved = %m.resolved.display(), "missing asset");
    }
    let missing_targets = missing_targets(&html, &req.timeline);
    for t in &missing_targets {
        tracing::warn!(element = %t, "timeline target has no element in the scene");
    }

    if let Some(audio) = &req.audio_path
        && !audio.is_file()
    {
        return Err(anyhow::anyhow!("audio track '{}' not found", audio.display()).into());
    }
    ensure_tool(&req.encode.ffmpeg).await?;

    std::fs::create_dir_all(&req.out_dir)
        .with_context(|| format!("failed to create '{}'", req.out_dir.display()))?;

    let scene_url = if req.debug_overlay {
        let debug_html = inject_debug_overlay(
            &html,
            req.timeline.segments(),
            &req.capture.playback_hook,
        )?;
        let debug_path = debug_scene_path(&req.scene_path);
        std::fs::write(&debug_path, debug_html)
            .with_context(|| format!("failed to write '{}'", debug_path.display()))?;
        tracing::info!(path = %debug_path.display(), "debug overlay scene written");
        file_url(&debug_path)?
    } else {
        file_url(&req.scene_path)?
    };

    let frames_dir = req.out_dir.join(FRAMES_DIR);
    let mut writer = FrameWriter::create(&frames_dir, plan)?;
    let pattern = writer.pattern();

    let target = ChromiumTarget::launch(&req.browser).await?;
    let mut session = CaptureSession::new(target, req.capture.clone());
    let captured = session.run(&scene_url, &schedule, &mut writer).await;
    let mut target = session.into_target();
    if let Err(e) = target.close().await {
        tracing::warn!(error = %e, "browser did not close cleanly");
    }
    let capture = captured?;

    let manifest = writer.finish()?;
    check_frame_size(manifest.width, manifest.height)?;

    let primary_video = req.out_dir.join(PRIMARY_VIDEO);
    ensure_parent_dir(&primary_video)?;
    run_tool(&build_encode_command_with(
        plan.fps,
        &pattern,
        &primary_video,
        &req.encode,
    ))
    .await?;

    let resolution = match probe_resolution(&primary_video, &req.encode).await {
        Ok(r) => Some(r),
        Err(e) => {
            tracing::warn!(error = %e, "could not probe video resolution");
            None
        }
    };

    let final_video = match &req.audio_path {
        Some(audio) => {
            let out = req.out_dir.join(FINAL_VIDEO);
            run_tool(&build_mux_command_with(&primary_video, audio, &out, &req.encode)).await?;
            Some(out)
        }
        None => None,
    };

    tracing::info!(
        frames = manifest.frame_count,
        video = %primary_video.display(),
        "render complete"
    );
    Ok(RenderResult {
        frame_count: manifest.frame_count,
        frames_location: frames_dir.clone(),
        primary_video,
        final_video,
        resolution,
        manifest: frames_dir.join(MANIFEST_FILE),
        missing_assets,
        missing_targets,
        capture,
    })
}

/// `<dir>/<stem>.debug.html` next to the scene, so relative asset references keep resolving.
pub fn debug_scene_path(scene_path: &Path) -> PathBuf {
    let stem = scene_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_owned());
    scene_path.with_file_name(format!("{stem}.debug.html"))
}
