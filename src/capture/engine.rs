use crate::capture::frames::FrameWriter;
use crate::capture::target::RenderTarget;
use crate::clock::protocol::{
    self, ClockConfig, ClockPayload, DEFAULT_EPOCH_MS, DEFAULT_PLAYBACK_HOOK, RegionRect,
};
use crate::clock::virtual_clock::{AdvanceReport, DEFAULT_STEP_MS};
use crate::compile::schedule::CompiledSchedule;
use crate::foundation::error::{FrameclockError, FrameclockResult};
use std::time::Duration;

/// Container captured by default.
pub const DEFAULT_REGION_SELECTOR: &str = "#stage";

/// Options for one capture session.
#[derive(Clone, Debug)]
pub struct CaptureOpts {
    /// CSS selector of the capture region. When it matches nothing the full viewport is used.
    pub region_selector: String,
    /// Upper bound on waiting for the region to become visible.
    pub visible_timeout: Duration,
    pub poll_interval: Duration,
    /// Virtual clock step in milliseconds.
    pub step_ms: f64,
    /// `Date.now()` at virtual time 0.
    pub epoch_ms: f64,
    pub playback_hook: String,
    /// Tried in order when the page has no playback hook.
    pub primary_control_selectors: Vec<String>,
    /// Clear any `transform` on the region before capturing.
    pub reset_region_transform: bool,
    /// Ship the compiled schedule with the clock and let it drive the page when the page has
    /// no playback hook of its own.
    pub schedule_player: bool,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        Self {
            region_selector: DEFAULT_REGION_SELECTOR.to_owned(),
            visible_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            step_ms: DEFAULT_STEP_MS,
            epoch_ms: DEFAULT_EPOCH_MS,
            playback_hook: DEFAULT_PLAYBACK_HOOK.to_owned(),
            primary_control_selectors: vec![
                "#playBtn".to_owned(),
                "#play".to_owned(),
                "[data-action=\"play\"]".to_owned(),
                "button".to_owned(),
            ],
            reset_region_transform: true,
            schedule_player: false,
        }
    }
}

/// How playback was started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackStart {
    Hook,
    /// Clicked the control matching this selector.
    PrimaryControl(String),
    /// Neither a hook nor a control was found; the page plays whatever it does on load.
    NotStarted,
}

/// Totals over a finished capture.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureStats {
    pub frames: u64,
    pub timers_fired: u64,
    pub frame_callbacks: u64,
    pub animations_skipped: u64,
    pub playback: PlaybackStart,
    /// Clip used for every screenshot; `None` means full viewport.
    pub clip: Option<RegionRect>,
}

impl CaptureStats {
    fn absorb(&mut self, report: &AdvanceReport) {
        self.timers_fired += report.fired_timers.len() as u64;
        self.frame_callbacks += report.frame_callbacks as u64;
        self.animations_skipped += report.animations_skipped as u64;
    }
}

/// Drives one [`RenderTarget`] through a deterministic capture.
///
/// The session owns its target and is strictly sequential: every step is awaited before the
/// next one starts, and virtual time only moves inside [`advance_to`](Self::advance_to).
pub struct CaptureSession<T: RenderTarget> {
    target: T,
    opts: CaptureOpts,
    now_ms: f64,
}

impl<T: RenderTarget> CaptureSession<T> {
    pub fn new(target: T, opts: CaptureOpts) -> Self {
        Self {
            target,
            opts,
            now_ms: 0.0,
        }
    }

    pub fn opts(&self) -> &CaptureOpts {
        &self.opts
    }

    /// Virtual time of the page as of the last advance.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Load `url` under the virtual clock, start playback and write one frame per plan entry.
    ///
    /// Playback starts and the clock is settled at t=0 before the capture region is resolved,
    /// so a region shown by a t=0 event is visible when it is measured.
    #[tracing::instrument(
        skip_all,
        fields(url = %url, fps = schedule.fps(), duration_ms = schedule.duration_ms())
    )]
    pub async fn run(
        &mut self,
        url: &str,
        schedule: &CompiledSchedule,
        frames: &mut FrameWriter,
    ) -> FrameclockResult<CaptureStats> {
        let plan = schedule.frame_plan()?;
        self.prepare(url, schedule).await?;
        let playback = self.start_playback().await?;

        let mut stats = CaptureStats {
            frames: 0,
            timers_fired: 0,
            frame_callbacks: 0,
            animations_skipped: 0,
            playback,
            clip: None,
        };

        // t=0 events run before the region is measured; the timeline may be what reveals it.
        let primed = self.advance_to(0.0).await?;
        stats.absorb(&primed);
        stats.clip = self.resolve_region().await?;
        let clip = stats.clip;

        tracing::info!(total_frames = plan.total_frames(), "capturing");
        for (idx, target_ms) in plan.frames() {
            let report = self.advance_to(target_ms).await?;
            stats.absorb(&report);
            if report.animations_skipped > 0 {
                tracing::debug!(
                    frame = idx.0,
                    skipped = report.animations_skipped,
                    "animations not seekable yet"
                );
            }

            let png = self.target.screenshot(clip).await?;
            frames.write_frame(idx, target_ms, &png)?;
            stats.frames += 1;
            tracing::trace!(frame = idx.0, t_ms = target_ms, "captured");
        }

        tracing::info!(
            frames = stats.frames,
            timers = stats.timers_fired,
            "capture complete"
        );
        Ok(stats)
    }

    /// Advance the page clock to `target_ms`.
    pub async fn advance_to(&mut self, target_ms: f64) -> FrameclockResult<AdvanceReport> {
        if target_ms < self.now_ms {
            return Err(FrameclockError::protocol(format!(
                "cannot move virtual time backwards ({target_ms}ms < {}ms)",
                self.now_ms
            )));
        }
        let report = self.target.advance_to(target_ms).await?;
        self.now_ms = report.now_ms;
        Ok(report)
    }

    async fn prepare(&mut self, url: &str, schedule: &CompiledSchedule) -> FrameclockResult<()> {
        let config = ClockConfig {
            step_ms: self.opts.step_ms,
            epoch_ms: self.opts.epoch_ms,
            playback_hook: self.opts.playback_hook.clone(),
            schedule: self.opts.schedule_player.then(|| schedule.to_player_json()),
        };
        self.target
            .install_clock(&ClockPayload::new(&config)?)
            .await?;
        self.target.load(url).await?;
        protocol::check_version(self.target.protocol_version().await?)?;
        self.now_ms = 0.0;
        tracing::debug!("page loaded under virtual clock");
        Ok(())
    }

    async fn resolve_region(&mut self) -> FrameclockResult<Option<RegionRect>> {
        let selector = self.opts.region_selector.as_str();
        let mut state = self.target.region_state(selector).await?;
        if !state.present {
            tracing::warn!(selector, "capture region not found, capturing the full viewport");
            return Ok(None);
        }

        let deadline = tokio::time::Instant::now() + self.opts.visible_timeout;
        while !state.visible {
            if tokio::time::Instant::now() >= deadline {
                return Err(FrameclockError::CaptureTimeout {
                    selector: selector.to_owned(),
                    waited_ms: u64::try_from(self.opts.visible_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(self.opts.poll_interval).await;
            state = self.target.region_state(selector).await?;
        }

        if self.opts.reset_region_transform && self.target.reset_region_transform(selector).await?
        {
            state = self.target.region_state(selector).await?;
        }

        let clip = state.rect.map(RegionRect::snapped);
        tracing::debug!(selector, ?clip, "capture region resolved");
        Ok(clip)
    }

    async fn start_playback(&mut self) -> FrameclockResult<PlaybackStart> {
        if self.target.is_playback_hook_present().await?
            && self.target.invoke_playback_hook().await?
        {
            tracing::debug!(hook = %self.opts.playback_hook, "playback started via hook");
            return Ok(PlaybackStart::Hook);
        }

        match self
            .target
            .click_primary_control(&self.opts.primary_control_selectors)
            .await?
        {
            Some(selector) => {
                tracing::info!(%selector, "no playback hook, clicked primary control");
                Ok(PlaybackStart::PrimaryControl(selector))
            }
            None => {
                tracing::warn!("no playback hook and no primary control found");
                Ok(PlaybackStart::NotStarted)
            }
        }
    }
}
