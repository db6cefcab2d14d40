use crate::foundation::core::FramePlan;
use crate::foundation::error::FrameclockResult;
use crate::timeline::model::{Event, Timeline};
use std::collections::BTreeMap;

/// Timeline events bucketed by exact `t_ms`.
///
/// Buckets are visited in ascending timestamp order; within a bucket events keep the order in
/// which they were authored. Nothing is merged or deduplicated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledSchedule {
    duration_ms: u64,
    fps: u32,
    buckets: BTreeMap<u64, Vec<Event>>,
}

/// Group a timeline's events into a [`CompiledSchedule`].
///
/// The timeline is re-validated first, so a document mutated after loading fails here with the
/// same schema/order errors the validator reports.
#[tracing::instrument(skip(timeline), fields(events = timeline.events.len()))]
pub fn compile(timeline: &Timeline) -> FrameclockResult<CompiledSchedule> {
    timeline.validate()?;

    let mut buckets: BTreeMap<u64, Vec<Event>> = BTreeMap::new();
    for ev in &timeline.events {
        buckets.entry(ev.t_ms).or_default().push(ev.clone());
    }

    tracing::debug!(buckets = buckets.len(), "compiled timeline");
    Ok(CompiledSchedule {
        duration_ms: timeline.duration_ms,
        fps: timeline.fps,
        buckets,
    })
}

impl CompiledSchedule {
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Sampling plan for this schedule.
    pub fn frame_plan(&self) -> FrameclockResult<FramePlan> {
        FramePlan::new(self.fps, self.duration_ms)
    }

    /// Events due at exactly `t_ms`, in authored order.
    pub fn at(&self, t_ms: u64) -> &[Event] {
        self.buckets.get(&t_ms).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct timestamps, ascending.
    pub fn timestamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.buckets.keys().copied()
    }

    /// `(t_ms, events)` buckets, ascending.
    pub fn buckets(&self) -> impl Iterator<Item = (u64, &[Event])> + '_ {
        self.buckets.iter().map(|(t, evs)| (*t, evs.as_slice()))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn event_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Events in timestamp-then-authored order.
    ///
    /// For a validated timeline this reproduces `timeline.events` exactly.
    pub fn flatten(&self) -> Vec<Event> {
        self.buckets.values().flatten().cloned().collect()
    }

    /// Array-of-buckets JSON consumed by the in-page schedule player.
    ///
    /// An array (rather than an object keyed by timestamp) keeps bucket order explicit.
    pub fn to_player_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.buckets
                .iter()
                .map(|(t, evs)| serde_json::json!({ "t_ms": t, "events": evs }))
                .collect(),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/schedule.rs"]
mod tests;
