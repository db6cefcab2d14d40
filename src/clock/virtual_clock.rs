use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Default advance granularity in virtual milliseconds.
pub const DEFAULT_STEP_MS: f64 = 1.0;

/// Handle returned by [`VirtualClock::schedule_after`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TimerId(pub u64);

/// Handle returned by [`VirtualClock::schedule_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameRequestId(pub u64);

/// Handle for a native animation tracked by the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimationId(pub u64);

/// Delayed callback. Arguments are captured by the closure.
pub type TimerCallback = Box<dyn FnOnce(&mut VirtualClock) + Send>;
/// Per-frame callback, invoked with the frame timestamp in virtual milliseconds.
pub type FrameCallback = Box<dyn FnOnce(&mut VirtualClock, f64) + Send>;

/// What one [`VirtualClock::advance_to`] call did.
///
/// The same shape is returned by the in-page clock over the protocol.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceReport {
    /// Virtual time after the advance.
    pub now_ms: f64,
    /// Delayed callbacks fired during this advance, in invocation order.
    pub fired_timers: Vec<u64>,
    /// Per-frame callbacks invoked (at most one batch per distinct frame time).
    pub frame_callbacks: usize,
    /// Native animations whose position was set.
    pub animations_seeked: usize,
    /// Native animations left alone because they have not started.
    pub animations_skipped: usize,
}

struct NativeAnimation {
    // `None` until the animation starts; unstarted animations cannot be seeked.
    birth_us: Option<u64>,
    position_ms: Option<f64>,
}

/// A single controllable time source replacing wall-clock timers, frame callbacks and elapsed-time
/// queries for one render session.
///
/// Time only moves inside [`advance_to`](Self::advance_to). Time is kept in integer microseconds
/// so trigger ordering is exact; the public API speaks milliseconds.
///
/// One session owns one clock and drives it from a single task.
pub struct VirtualClock {
    now_us: u64,
    step_us: u64,
    next_id: u64,
    // (trigger_us, id) gives trigger order with scheduling order as the tie-break.
    timers: BTreeMap<(u64, u64), TimerCallback>,
    timer_triggers: HashMap<u64, u64>,
    frames: BTreeMap<u64, FrameCallback>,
    animations: BTreeMap<u64, NativeAnimation>,
    last_frame_us: Option<u64>,
}

impl VirtualClock {
    /// A clock at virtual time 0 with the default 1 ms step.
    pub fn new() -> Self {
        Self::with_step(DEFAULT_STEP_MS)
    }

    /// A clock at virtual time 0 advancing in `step_ms` increments (clamped to >= 1 µs).
    pub fn with_step(step_ms: f64) -> Self {
        Self {
            now_us: 0,
            step_us: ms_to_us(step_ms).max(1),
            next_id: 1,
            timers: BTreeMap::new(),
            timer_triggers: HashMap::new(),
            frames: BTreeMap::new(),
            animations: BTreeMap::new(),
            last_frame_us: None,
        }
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> f64 {
        us_to_ms(self.now_us)
    }

    /// Schedule `cb` to run once virtual time reaches `now + delay_ms`.
    ///
    /// Negative or non-finite delays count as zero.
    pub fn schedule_after(
        &mut self,
        delay_ms: f64,
        cb: impl FnOnce(&mut VirtualClock) + Send + 'static,
    ) -> TimerId {
        let id = self.alloc_id();
        let trigger = self.now_us.saturating_add(ms_to_us(delay_ms));
        self.timers.insert((trigger, id), Box::new(cb));
        self.timer_triggers.insert(id, trigger);
        TimerId(id)
    }

    /// Cancel a pending delayed callback. Returns `false` if it already fired or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timer_triggers.remove(&id.0) {
            Some(trigger) => self.timers.remove(&(trigger, id.0)).is_some(),
            None => false,
        }
    }

    /// Register a callback for the next simulated frame.
    pub fn schedule_frame(
        &mut self,
        cb: impl FnOnce(&mut VirtualClock, f64) + Send + 'static,
    ) -> FrameRequestId {
        let id = self.alloc_id();
        self.frames.insert(id, Box::new(cb));
        FrameRequestId(id)
    }

    /// Cancel a pending frame callback.
    pub fn cancel_frame(&mut self, id: FrameRequestId) -> bool {
        self.frames.remove(&id.0).is_some()
    }

    /// Track a native animation that starts now.
    pub fn track_animation(&mut self) -> AnimationId {
        let id = self.alloc_id();
        self.animations.insert(
            id,
            NativeAnimation {
                birth_us: Some(self.now_us),
                position_ms: None,
            },
        );
        AnimationId(id)
    }

    /// Track a native animation that exists but has not started yet.
    pub fn track_pending_animation(&mut self) -> AnimationId {
        let id = self.alloc_id();
        self.animations.insert(
            id,
            NativeAnimation {
                birth_us: None,
                position_ms: None,
            },
        );
        AnimationId(id)
    }

    /// Mark a pending animation as started at the current virtual time.
    pub fn start_animation(&mut self, id: AnimationId) {
        if let Some(anim) = self.animations.get_mut(&id.0)
            && anim.birth_us.is_none()
        {
            anim.birth_us = Some(self.now_us);
        }
    }

    /// Local time the animation was last seeked to, if it has been seeked.
    pub fn animation_position(&self, id: AnimationId) -> Option<f64> {
        self.animations.get(&id.0).and_then(|a| a.position_ms)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Move virtual time to `target_ms`.
    ///
    /// Callbacks already due at the current time fire first, so a zero-delay callback scheduled
    /// at `t` runs on an advance to `t`. Time then advances in fixed steps; at each step every
    /// due delayed callback is removed and invoked in trigger order before the next step. After
    /// the target is reached, the pending frame callbacks are snapshotted, cleared and invoked
    /// once with `target_ms` as timestamp (skipped when a frame was already produced at this
    /// exact time). Finally every started native animation is seeked to its local time under
    /// the new virtual time.
    ///
    /// A target before the current time does not move the clock.
    pub fn advance_to(&mut self, target_ms: f64) -> AdvanceReport {
        let target_us = ms_to_us(target_ms);
        let mut report = AdvanceReport::default();

        self.fire_due(&mut report.fired_timers);
        while self.now_us < target_us {
            self.now_us = self.now_us.saturating_add(self.step_us).min(target_us);
            self.fire_due(&mut report.fired_timers);
        }

        if self.last_frame_us != Some(self.now_us) {
            self.last_frame_us = Some(self.now_us);
            let now_ms = if target_us == self.now_us && target_ms.is_finite() {
                target_ms
            } else {
                self.now()
            };
            let batch = std::mem::take(&mut self.frames);
            report.frame_callbacks = batch.len();
            for (_, cb) in batch {
                cb(self, now_ms);
            }
        }

        let now_us = self.now_us;
        for anim in self.animations.values_mut() {
            match anim.birth_us {
                Some(birth) => {
                    anim.position_ms = Some(us_to_ms(now_us.saturating_sub(birth)));
                    report.animations_seeked += 1;
                }
                None => report.animations_skipped += 1,
            }
        }

        report.now_ms = self.now();
        report
    }

    fn fire_due(&mut self, fired: &mut Vec<u64>) {
        let due: Vec<(u64, u64)> = self
            .timers
            .range(..=(self.now_us, u64::MAX))
            .map(|(k, _)| *k)
            .collect();
        if due.is_empty() {
            return;
        }

        // Remove the whole due set first; callbacks scheduled while it runs land in later steps.
        let mut callbacks = Vec::with_capacity(due.len());
        for key in due {
            if let Some(cb) = self.timers.remove(&key) {
                self.timer_triggers.remove(&key.1);
                callbacks.push((key.1, cb));
            }
        }
        for (id, cb) in callbacks {
            fired.push(id);
            cb(self);
        }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualClock")
            .field("now_ms", &self.now())
            .field("step_ms", &us_to_ms(self.step_us))
            .field("pending_timers", &self.timers.len())
            .field("pending_frames", &self.frames.len())
            .field("animations", &self.animations.len())
            .finish()
    }
}

fn ms_to_us(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 1000.0).round() as u64
    } else {
        0
    }
}

fn us_to_ms(us: u64) -> f64 {
    us as f64 / 1000.0
}

#[cfg(test)]
#[path = "../../tests/unit/clock/virtual_clock.rs"]
mod tests;
