use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "frameclock", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate and compile a timeline, then print its dispatch buckets.
    Validate(ValidateArgs),
    /// Report missing local assets (and, with a timeline, missing targets) of a scene.
    Qa(QaArgs),
    /// Capture a scene against a timeline and encode it (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Timeline JSON.
    #[arg(long)]
    timeline: PathBuf,
}

#[derive(Parser, Debug)]
struct QaArgs {
    /// Scene HTML.
    #[arg(long)]
    scene: PathBuf,

    /// Timeline JSON whose targets are checked against the scene's element ids.
    #[arg(long)]
    timeline: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Run id; outputs go to `<out-dir>/<id>/`.
    #[arg(long)]
    id: String,

    /// Scene HTML.
    #[arg(long)]
    scene: PathBuf,

    /// Timeline JSON.
    #[arg(long)]
    timeline: PathBuf,

    #[arg(long, default_value = "runs")]
    out_dir: PathBuf,

    /// Audio track muxed into `final.mp4`.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Override the timeline duration, in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Override the timeline frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Render a copy of the scene with a time and caption overlay.
    #[arg(long, default_value_t = false)]
    debug_overlay: bool,

    /// Let the clock dispatch the timeline when the scene has no playback hook.
    #[arg(long, default_value_t = false)]
    schedule_player: bool,

    /// Chrome/Chromium executable (auto-detected when omitted).
    #[arg(long, env = "FRAMECLOCK_CHROME")]
    chrome: Option<PathBuf>,

    #[arg(long, default_value_t = 1080)]
    width: u32,

    #[arg(long, default_value_t = 1920)]
    height: u32,

    /// Launch Chrome with `--no-sandbox` (containers, CI).
    #[arg(long, default_value_t = false)]
    no_sandbox: bool,

    /// Capture region selector.
    #[arg(long, default_value = frameclock::capture::engine::DEFAULT_REGION_SELECTOR)]
    region: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Qa(args) => cmd_qa(args),
        Command::Render(args) => cmd_render(args).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let timeline = frameclock::Timeline::from_path(&args.timeline)?;
    let schedule = frameclock::compile(&timeline)?;
    let plan = schedule.frame_plan()?;

    println!(
        "ok: {} events in {} buckets, {}ms @ {}fps ({} frames)",
        schedule.event_count(),
        schedule.bucket_count(),
        schedule.duration_ms(),
        schedule.fps(),
        plan.total_frames()
    );
    for (t_ms, events) in schedule.buckets() {
        let ops: Vec<String> = events
            .iter()
            .map(|e| format!("{}#{}", e.op.as_str(), e.target))
            .collect();
        println!("  {t_ms:>7}ms  {}", ops.join(", "));
    }
    Ok(())
}

fn cmd_qa(args: QaArgs) -> anyhow::Result<()> {
    let missing = frameclock::scene::qa::check_assets_exist(&args.scene)?;
    for m in &missing {
        println!("missing asset: {} ({})", m.reference, m.resolved.display());
    }

    let mut missing_targets = Vec::new();
    if let Some(path) = &args.timeline {
        let timeline = frameclock::Timeline::from_path(path)?;
        let html = std::fs::read_to_string(&args.scene)
            .with_context(|| format!("read scene '{}'", args.scene.display()))?;
        missing_targets = frameclock::scene::qa::missing_targets(&html, &timeline);
        for t in &missing_targets {
            println!("missing target: #{t}");
        }
    }

    if missing.is_empty() && missing_targets.is_empty() {
        println!("ok: no missing assets or targets");
    }
    Ok(())
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut timeline = frameclock::Timeline::from_path(&args.timeline)?;
    if let Some(seconds) = args.duration {
        anyhow::ensure!(
            seconds.is_finite() && seconds > 0.0,
            "--duration must be a positive number of seconds, got {seconds}"
        );
        timeline.duration_ms = (seconds * 1000.0).round() as u64;
    }
    if let Some(fps) = args.fps {
        timeline.fps = fps;
    }

    let out_dir = args.out_dir.join(&args.id);
    let mut req = frameclock::RenderRequest::new(&args.scene, timeline, &out_dir);
    req.audio_path = args.audio;
    req.debug_overlay = args.debug_overlay;
    req.browser.width = args.width;
    req.browser.height = args.height;
    req.browser.chrome_executable = args.chrome;
    req.browser.no_sandbox = args.no_sandbox;
    req.capture.region_selector = args.region;
    req.capture.schedule_player = args.schedule_player;

    let result = frameclock::render(&req).await?;

    if !result.missing_assets.is_empty() {
        eprintln!("warning: {} missing asset(s)", result.missing_assets.len());
    }
    eprintln!(
        "wrote {} frames to {}",
        result.frame_count,
        result.frames_location.display()
    );
    match result.resolution {
        Some(r) => eprintln!("wrote {} ({r})", result.primary_video.display()),
        None => eprintln!("wrote {}", result.primary_video.display()),
    }
    if let Some(final_video) = &result.final_video {
        eprintln!("wrote {}", final_video.display());
    }
    Ok(())
}
