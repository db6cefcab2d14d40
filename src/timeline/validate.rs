use crate::foundation::core::{MAX_DURATION_MS, MAX_FPS};
use crate::foundation::error::{FrameclockError, FrameclockResult};
use crate::timeline::model::Op;
use serde_json::{Map, Value};
use std::fmt;

/// Number of violations carried by a [`SchemaErrors`] report.
pub const MAX_REPORTED_VIOLATIONS: usize = 5;

const ROOT_FIELDS: &[&str] = &["duration_ms", "fps", "voiceover_segments", "events"];
const EVENT_FIELDS: &[&str] = &["t_ms", "op", "target", "value", "trigger"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaPathElem {
    Field(&'static str),
    Index(usize),
}

/// One structural violation at a JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub path: Vec<SchemaPathElem>,
    pub message: String,
}

impl SchemaError {
    pub fn at(path: &[SchemaPathElem], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }

    /// Path rendered as `$.events[2].op`.
    pub fn path_string(&self) -> String {
        format_path(&self.path)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", format_path(&self.path), self.message)
    }
}

fn format_path(path: &[SchemaPathElem]) -> String {
    let mut s = String::from("$");
    for p in path {
        match *p {
            SchemaPathElem::Field(name) => {
                s.push('.');
                s.push_str(name);
            }
            SchemaPathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

/// The first [`MAX_REPORTED_VIOLATIONS`] violations found, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaErrors {
    errors: Vec<SchemaError>,
    total: usize,
}

impl SchemaErrors {
    pub fn new(mut errors: Vec<SchemaError>) -> Self {
        let total = errors.len();
        errors.truncate(MAX_REPORTED_VIOLATIONS);
        Self { errors, total }
    }

    /// Reported violations (at most five).
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// Number of violations found, including unreported ones.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{e}")?;
        }
        if self.total > self.errors.len() {
            write!(f, " (and {} more)", self.total - self.errors.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

/// Validate a raw timeline document: structure first, then event ordering.
pub fn validate_value(value: &Value) -> FrameclockResult<()> {
    validate_structure(value).map_err(FrameclockError::Schema)?;
    check_order(value)
}

/// Structural pass only. Collects every violation; the report keeps the first five.
pub fn validate_structure(value: &Value) -> Result<(), SchemaErrors> {
    let mut errors = Vec::new();

    let Some(root) = value.as_object() else {
        errors.push(SchemaError::at(&[], "timeline must be a JSON object"));
        return Err(SchemaErrors::new(errors));
    };

    reject_unknown(root, ROOT_FIELDS, &[], &mut errors);

    let path = [SchemaPathElem::Field("duration_ms")];
    if let Some(v) = require(root, "duration_ms", &[], &mut errors)
        && let Some(n) = expect_integer(v, &path, &mut errors)
        && !(1..=i128::from(MAX_DURATION_MS)).contains(&n)
    {
        errors.push(SchemaError::at(
            &path,
            format!("must be in [1, {MAX_DURATION_MS}], got {n}"),
        ));
    }

    let path = [SchemaPathElem::Field("fps")];
    if let Some(v) = require(root, "fps", &[], &mut errors)
        && let Some(n) = expect_integer(v, &path, &mut errors)
        && !(1..=i128::from(MAX_FPS)).contains(&n)
    {
        errors.push(SchemaError::at(
            &path,
            format!("must be in [1, {MAX_FPS}], got {n}"),
        ));
    }

    if let Some(segments) = root.get("voiceover_segments") {
        validate_segments(segments, &mut errors);
    }

    if let Some(events) = require(root, "events", &[], &mut errors) {
        validate_events(events, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaErrors::new(errors))
    }
}

/// Ordering pass: `t_ms` must be non-decreasing in declaration order.
///
/// Assumes the structural pass succeeded.
fn check_order(value: &Value) -> FrameclockResult<()> {
    let Some(events) = value.get("events").and_then(Value::as_array) else {
        return Ok(());
    };
    let mut prev: Option<u64> = None;
    for (index, ev) in events.iter().enumerate() {
        let Some(t_ms) = ev.get("t_ms").and_then(Value::as_u64) else {
            continue;
        };
        if let Some(previous_t_ms) = prev
            && t_ms < previous_t_ms
        {
            return Err(FrameclockError::Order {
                index,
                t_ms,
                previous_t_ms,
            });
        }
        prev = Some(t_ms);
    }
    Ok(())
}

fn validate_events(events: &Value, errors: &mut Vec<SchemaError>) {
    let base = [SchemaPathElem::Field("events")];
    let Some(items) = events.as_array() else {
        errors.push(SchemaError::at(&base, "must be an array"));
        return;
    };

    for (i, ev) in items.iter().enumerate() {
        let path = [SchemaPathElem::Field("events"), SchemaPathElem::Index(i)];
        let Some(obj) = ev.as_object() else {
            errors.push(SchemaError::at(&path, "event must be an object"));
            continue;
        };
        reject_unknown(obj, EVENT_FIELDS, &path, errors);

        let field = |name| [path[0].clone(), path[1].clone(), SchemaPathElem::Field(name)];

        if let Some(v) = require(obj, "t_ms", &path, errors)
            && let Some(n) = expect_integer(v, &field("t_ms"), errors)
            && n < 0
        {
            errors.push(SchemaError::at(
                &field("t_ms"),
                format!("must be >= 0, got {n}"),
            ));
        }

        if let Some(v) = require(obj, "op", &path, errors) {
            match v.as_str() {
                Some(s) if Op::parse(s).is_some() => {}
                Some(s) => errors.push(SchemaError::at(
                    &field("op"),
                    format!("'{s}' is not one of {}", op_list()),
                )),
                None => errors.push(SchemaError::at(
                    &field("op"),
                    format!("must be a string, got {}", type_name(v)),
                )),
            }
        }

        if let Some(v) = require(obj, "target", &path, errors) {
            match v.as_str() {
                Some("") => errors.push(SchemaError::at(&field("target"), "must not be empty")),
                Some(_) => {}
                None => errors.push(SchemaError::at(
                    &field("target"),
                    format!("must be a string, got {}", type_name(v)),
                )),
            }
        }

        for name in ["value", "trigger"] {
            if let Some(v) = obj.get(name)
                && !v.is_string()
            {
                errors.push(SchemaError::at(
                    &field(name),
                    format!("must be a string, got {}", type_name(v)),
                ));
            }
        }
    }
}

fn validate_segments(segments: &Value, errors: &mut Vec<SchemaError>) {
    let base = [SchemaPathElem::Field("voiceover_segments")];
    let Some(items) = segments.as_array() else {
        errors.push(SchemaError::at(&base, "must be an array"));
        return;
    };

    for (i, seg) in items.iter().enumerate() {
        let path = [
            SchemaPathElem::Field("voiceover_segments"),
            SchemaPathElem::Index(i),
        ];
        let Some(obj) = seg.as_object() else {
            errors.push(SchemaError::at(&path, "segment must be an object"));
            continue;
        };
        for name in ["start_ms", "end_ms"] {
            if let Some(v) = require(obj, name, &path, errors) {
                let field = [path[0].clone(), path[1].clone(), SchemaPathElem::Field(name)];
                let _ = expect_integer(v, &field, errors);
            }
        }
        if let Some(v) = require(obj, "text", &path, errors)
            && !v.is_string()
        {
            errors.push(SchemaError::at(
                &[path[0].clone(), path[1].clone(), SchemaPathElem::Field("text")],
                format!("must be a string, got {}", type_name(v)),
            ));
        }
    }
}

fn require<'a>(
    obj: &'a Map<String, Value>,
    name: &'static str,
    path: &[SchemaPathElem],
    errors: &mut Vec<SchemaError>,
) -> Option<&'a Value> {
    let v = obj.get(name);
    if v.is_none() {
        errors.push(SchemaError::at(
            path,
            format!("missing required property '{name}'"),
        ));
    }
    v
}

fn reject_unknown(
    obj: &Map<String, Value>,
    allowed: &[&str],
    path: &[SchemaPathElem],
    errors: &mut Vec<SchemaError>,
) {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            errors.push(SchemaError::at(path, format!("unknown property '{key}'")));
        }
    }
}

fn expect_integer(v: &Value, path: &[SchemaPathElem], errors: &mut Vec<SchemaError>) -> Option<i128> {
    let n = v
        .as_i64()
        .map(i128::from)
        .or_else(|| v.as_u64().map(i128::from));
    if n.is_none() {
        errors.push(SchemaError::at(
            path,
            format!("must be an integer, got {}", type_name(v)),
        ));
    }
    n
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn op_list() -> String {
    Op::ALL
        .iter()
        .map(|op| op.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/validate.rs"]
mod tests;
