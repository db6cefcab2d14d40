use super::*;
use serde_json::json;

fn valid() -> Value {
    json!({
        "duration_ms": 1000,
        "fps": 30,
        "voiceover_segments": [{ "start_ms": 0, "end_ms": 900, "text": "hello" }],
        "events": [
            { "t_ms": 0, "op": "layerShow", "target": "a" },
            { "t_ms": 500, "op": "classAdd", "target": "b", "value": "x", "trigger": "hello" },
            { "t_ms": 500, "op": "classRemove", "target": "c", "value": "y" }
        ]
    })
}

fn schema_errors(v: &Value) -> SchemaErrors {
    match validate_value(v) {
        Err(FrameclockError::Schema(e)) => e,
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn valid_document_passes() {
    validate_value(&valid()).unwrap();
}

#[test]
fn segments_are_optional() {
    let mut v = valid();
    v.as_object_mut().unwrap().remove("voiceover_segments");
    validate_value(&v).unwrap();
}

#[test]
fn missing_required_root_fields_are_reported() {
    let errs = schema_errors(&json!({ "fps": 30 }));
    let msgs: Vec<String> = errs.errors().iter().map(|e| e.to_string()).collect();
    assert!(msgs.iter().any(|m| m.contains("'duration_ms'")));
    assert!(msgs.iter().any(|m| m.contains("'events'")));
}

#[test]
fn unknown_op_is_a_schema_error_with_path() {
    let mut v = valid();
    v["events"][1]["op"] = json!("fadeIn");
    let errs = schema_errors(&v);
    assert_eq!(errs.errors()[0].path_string(), "$.events[1].op");
    assert!(errs.to_string().contains("'fadeIn' is not one of"));
}

#[test]
fn unknown_event_property_is_rejected() {
    let mut v = valid();
    v["events"][0]["description"] = json!("slides in");
    let errs = schema_errors(&v);
    assert_eq!(errs.errors()[0].path_string(), "$.events[0]");
    assert!(errs.errors()[0].message.contains("'description'"));
}

#[test]
fn unknown_root_property_is_rejected() {
    let mut v = valid();
    v["title"] = json!("x");
    let errs = schema_errors(&v);
    assert!(errs.errors()[0].message.contains("'title'"));
}

#[test]
fn event_missing_each_required_field() {
    for field in ["t_ms", "op", "target"] {
        let mut v = valid();
        v["events"][0].as_object_mut().unwrap().remove(field);
        let errs = schema_errors(&v);
        assert!(
            errs.to_string().contains(&format!("missing required property '{field}'")),
            "{field}: {errs}"
        );
    }
}

#[test]
fn wrong_types_and_ranges() {
    let cases = [
        json!({ "duration_ms": 0, "fps": 30, "events": [] }),
        json!({ "duration_ms": 10, "fps": 0, "events": [] }),
        json!({ "duration_ms": 10, "fps": 121, "events": [] }),
        json!({ "duration_ms": 86_400_001, "fps": 30, "events": [] }),
        json!({ "duration_ms": 1_000_000_000_000_000_000u64, "fps": 30, "events": [] }),
        json!({ "duration_ms": 10.5, "fps": 30, "events": [] }),
        json!({ "duration_ms": 10, "fps": "30", "events": [] }),
        json!({ "duration_ms": 10, "fps": 30, "events": {} }),
        json!({ "duration_ms": 10, "fps": 30, "events": [{ "t_ms": -1, "op": "textSet", "target": "a" }] }),
        json!({ "duration_ms": 10, "fps": 30, "events": [{ "t_ms": 0, "op": "textSet", "target": "" }] }),
        json!({ "duration_ms": 10, "fps": 30, "events": [{ "t_ms": 0, "op": "textSet", "target": "a", "value": 3 }] }),
        json!({ "duration_ms": 10, "fps": 30, "events": [], "voiceover_segments": [{ "start_ms": 0, "text": "x" }] }),
        json!([1, 2, 3]),
    ];
    for case in cases {
        assert!(
            matches!(validate_value(&case), Err(FrameclockError::Schema(_))),
            "{case}"
        );
    }
}

#[test]
fn report_is_capped_at_five() {
    let events: Vec<Value> = (0..8)
        .map(|i| json!({ "t_ms": i, "op": "nope", "target": "a" }))
        .collect();
    let errs = schema_errors(&json!({ "duration_ms": 10, "fps": 30, "events": events }));
    assert_eq!(errs.errors().len(), MAX_REPORTED_VIOLATIONS);
    assert_eq!(errs.total(), 8);
    assert!(errs.to_string().ends_with("(and 3 more)"));
}

#[test]
fn decreasing_timestamp_is_an_order_error() {
    let mut v = valid();
    v["events"][2]["t_ms"] = json!(499);
    match validate_value(&v) {
        Err(FrameclockError::Order {
            index,
            t_ms,
            previous_t_ms,
        }) => {
            assert_eq!(index, 2);
            assert_eq!(t_ms, 499);
            assert_eq!(previous_t_ms, 500);
        }
        other => panic!("expected order error, got {other:?}"),
    }
}

#[test]
fn structure_is_checked_before_order() {
    let v = json!({
        "duration_ms": 10,
        "fps": 30,
        "events": [
            { "t_ms": 5, "op": "layerShow", "target": "a" },
            { "t_ms": 1, "op": "bogus", "target": "a" }
        ]
    });
    assert!(matches!(validate_value(&v), Err(FrameclockError::Schema(_))));
}
