use crate::foundation::core::FramePlan;
use crate::foundation::error::{FrameclockError, FrameclockResult};
use crate::timeline::validate::validate_value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One of the five DOM mutations a timeline event can apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Op {
    /// Add `value` to the target's class list.
    ClassAdd,
    /// Remove `value` from the target's class list.
    ClassRemove,
    /// Replace the target's text content with `value`.
    TextSet,
    /// Make the target displayed.
    LayerShow,
    /// Hide the target.
    LayerHide,
}

impl Op {
    /// Every op, in declaration order.
    pub const ALL: [Op; 5] = [
        Op::ClassAdd,
        Op::ClassRemove,
        Op::TextSet,
        Op::LayerShow,
        Op::LayerHide,
    ];

    /// Wire name used in timeline JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::ClassAdd => "classAdd",
            Op::ClassRemove => "classRemove",
            Op::TextSet => "textSet",
            Op::LayerShow => "layerShow",
            Op::LayerHide => "layerHide",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }
}

/// A single scheduled mutation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    /// Virtual time in milliseconds at which the mutation is dispatched.
    pub t_ms: u64,
    pub op: Op,
    /// Element id the mutation applies to.
    pub target: String,
    /// CSS class name or text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Spoken word that motivated the event (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

/// A voiceover phrase with its timing. Informational only.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
}

/// A validated-on-load timeline document.
///
/// Construct through [`Timeline::from_str`], [`Timeline::from_reader`] or
/// [`Timeline::from_path`], which validate before deserializing. Timelines built by hand (or
/// mutated after loading) must be re-checked with [`Timeline::validate`]; the compiler does this
/// itself.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timeline {
    pub duration_ms: u64,
    pub fps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voiceover_segments: Option<Vec<Segment>>,
    pub events: Vec<Event>,
}

impl Timeline {
    /// Validate and parse a timeline from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> FrameclockResult<Self> {
        validate_value(&value)?;
        serde_json::from_value(value)
            .map_err(|e| FrameclockError::serde(format!("decode timeline: {e}")))
    }

    /// Validate and parse a timeline from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> FrameclockResult<Self> {
        let value: serde_json::Value = serde_json::from_reader(r)
            .map_err(|e| FrameclockError::serde(format!("parse timeline JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate and parse a timeline from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> FrameclockResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FrameclockError::serde(format!("open timeline JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Re-run schema and ordering validation on this document.
    pub fn validate(&self) -> FrameclockResult<()> {
        let value = serde_json::to_value(self)
            .map_err(|e| FrameclockError::serde(format!("encode timeline: {e}")))?;
        validate_value(&value)
    }

    /// Sampling plan derived from `fps` and `duration_ms`.
    pub fn frame_plan(&self) -> FrameclockResult<FramePlan> {
        FramePlan::new(self.fps, self.duration_ms)
    }

    /// Voiceover segments, or an empty slice when none were supplied.
    pub fn segments(&self) -> &[Segment] {
        self.voiceover_segments.as_deref().unwrap_or(&[])
    }
}

impl std::str::FromStr for Timeline {
    type Err = FrameclockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: serde_json::Value = serde_json::from_str(s)
            .map_err(|e| FrameclockError::serde(format!("parse timeline JSON: {e}")))?;
        Self::from_value(value)
    }
}
