use crate::foundation::error::{FrameclockError, FrameclockResult};
use crate::timeline::model::Segment;
use regex::Regex;
use serde_json::Value;
use std::future::Future;
use std::sync::LazyLock;

/// Attempts made by [`with_attempts`] callers that have no better number.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

static LINE_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*//.*$").expect("comment pattern is valid"));
static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma pattern is valid"));

/// Remove a leading ```` ```lang ```` line and a trailing ```` ``` ```` fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    if !s.starts_with("```") {
        return s;
    }
    let Some((_, body)) = s.split_once('\n') else {
        return "";
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Best-effort parse of almost-JSON.
///
/// Keeps the outermost `{…}`, drops whole-line `//` comments and trailing commas, then parses
/// strictly. The result still has to pass timeline validation.
pub fn parse_json_loose(raw: &str) -> FrameclockResult<Value> {
    let mut s = raw.trim();
    if let (Some(start), Some(end)) = (s.find('{'), s.rfind('}'))
        && end > start
    {
        s = &s[start..=end];
    }
    let s = LINE_COMMENT_RE.replace_all(s, "");
    let s = TRAILING_COMMA_RE.replace_all(&s, "$1");
    serde_json::from_str(&s).map_err(|e| FrameclockError::serde(format!("repair failed: {e}")))
}

/// Run `produce` up to `max_attempts` times until its output parses.
///
/// `produce` gets the 0-based attempt number (so it can add a repair hint on retries). Output is
/// fence-stripped and loosely parsed; an empty reply counts as a failed attempt. Returns the
/// last error when every attempt fails.
pub async fn with_attempts<F, Fut>(max_attempts: u32, mut produce: F) -> FrameclockResult<Value>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = FrameclockResult<String>>,
{
    let mut last_err = None;
    for attempt in 0..max_attempts.max(1) {
        let result = match produce(attempt).await {
            Ok(raw) if raw.trim().is_empty() => Err(FrameclockError::serde("empty response")),
            Ok(raw) => parse_json_loose(strip_code_fences(&raw)),
            Err(e) => Err(e),
        };
        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "storyboard output rejected");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| FrameclockError::serde("no attempts made")))
}

/// The timeline inside a storyboard reply: its `timeline` member, or the reply itself when it
/// already looks like a timeline.
pub fn extract_timeline(reply: &Value) -> Option<Value> {
    match reply.get("timeline") {
        Some(tl @ Value::Object(_)) => Some(tl.clone()),
        _ if reply.get("events").is_some() => Some(reply.clone()),
        _ => None,
    }
}

/// Replace the timeline's voiceover segments with measured ones and pin `duration_ms` to the
/// end of the last segment. No-op when `segments` is empty or `timeline` is not an object.
pub fn apply_authoritative_segments(
    timeline: &mut Value,
    segments: &[Segment],
) -> FrameclockResult<()> {
    let (Some(obj), Some(last)) = (timeline.as_object_mut(), segments.last()) else {
        return Ok(());
    };
    let encoded = serde_json::to_value(segments)
        .map_err(|e| FrameclockError::serde(format!("encode segments: {e}")))?;
    obj.insert("voiceover_segments".to_owned(), encoded);
    obj.insert("duration_ms".to_owned(), Value::from(last.end_ms));
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/storyboard/repair.rs"]
mod tests;
