use super::*;
use crate::foundation::error::FrameclockError;
use crate::timeline::model::Op;
use proptest::prelude::*;

fn ev(t_ms: u64, op: Op, target: &str, value: Option<&str>) -> Event {
    Event {
        t_ms,
        op,
        target: target.to_owned(),
        value: value.map(str::to_owned),
        trigger: None,
    }
}

fn timeline(events: Vec<Event>) -> Timeline {
    Timeline {
        duration_ms: 1000,
        fps: 30,
        voiceover_segments: None,
        events,
    }
}

#[test]
fn same_timestamp_events_share_a_bucket_in_authored_order() {
    let tl = timeline(vec![
        ev(0, Op::LayerShow, "a", None),
        ev(500, Op::ClassAdd, "b", Some("x")),
        ev(500, Op::ClassRemove, "c", Some("y")),
    ]);
    let sched = compile(&tl).unwrap();

    assert_eq!(sched.timestamps().collect::<Vec<_>>(), vec![0, 500]);
    assert_eq!(sched.at(0).len(), 1);
    assert_eq!(sched.at(500).len(), 2);
    assert_eq!(sched.at(500)[0].op, Op::ClassAdd);
    assert_eq!(sched.at(500)[1].op, Op::ClassRemove);
    assert_eq!(sched.duration_ms(), 1000);
    assert_eq!(sched.fps(), 30);
}

#[test]
fn show_before_animate_survives_compilation() {
    let tl = timeline(vec![
        ev(6000, Op::LayerShow, "spreadsheet", None),
        ev(6000, Op::ClassAdd, "spreadsheet", Some("popIn")),
    ]);
    let sched = compile(&tl).unwrap();
    let ops: Vec<Op> = sched.at(6000).iter().map(|e| e.op).collect();
    assert_eq!(ops, vec![Op::LayerShow, Op::ClassAdd]);
}

#[test]
fn duplicates_are_kept_verbatim() {
    let tl = timeline(vec![
        ev(100, Op::ClassAdd, "a", Some("x")),
        ev(100, Op::ClassAdd, "a", Some("x")),
    ]);
    let sched = compile(&tl).unwrap();
    assert_eq!(sched.event_count(), 2);
    assert_eq!(sched.bucket_count(), 1);
}

#[test]
fn empty_timestamps_have_no_events() {
    let sched = compile(&timeline(vec![ev(10, Op::LayerHide, "a", None)])).unwrap();
    assert!(sched.at(11).is_empty());
}

#[test]
fn mutated_timeline_is_revalidated() {
    let mut tl = timeline(vec![
        ev(10, Op::LayerShow, "a", None),
        ev(20, Op::LayerHide, "a", None),
    ]);
    tl.events.swap(0, 1);
    assert!(matches!(compile(&tl), Err(FrameclockError::Order { .. })));

    let mut tl = timeline(vec![ev(10, Op::LayerShow, "a", None)]);
    tl.events[0].target.clear();
    assert!(matches!(compile(&tl), Err(FrameclockError::Schema(_))));
}

#[test]
fn player_json_is_an_ordered_bucket_array() {
    let tl = timeline(vec![
        ev(0, Op::TextSet, "title", Some("WALL STREET")),
        ev(40, Op::LayerShow, "b", None),
    ]);
    let json = compile(&tl).unwrap().to_player_json();
    assert_eq!(json[0]["t_ms"], 0);
    assert_eq!(json[0]["events"][0]["op"], "textSet");
    assert_eq!(json[0]["events"][0]["value"], "WALL STREET");
    assert_eq!(json[1]["t_ms"], 40);
    assert!(json[1]["events"][0].get("value").is_none());
}

fn arb_event() -> impl Strategy<Value = Event> {
    (
        0u64..5_000,
        prop::sample::select(Op::ALL.to_vec()),
        "[a-z]{1,6}",
        prop::option::of("[a-zA-Z]{1,8}"),
    )
        .prop_map(|(t_ms, op, target, value)| Event {
            t_ms,
            op,
            target,
            value,
            trigger: None,
        })
}

proptest! {
    #[test]
    fn flatten_reconstructs_sorted_input(mut events in prop::collection::vec(arb_event(), 0..40)) {
        // Stable sort: equal timestamps keep generation order, like an authored timeline.
        events.sort_by_key(|e| e.t_ms);
        let tl = timeline(events.clone());
        let sched = compile(&tl).unwrap();
        prop_assert_eq!(sched.flatten(), events);
    }

    #[test]
    fn unsorted_events_fail_with_order_error(
        events in prop::collection::vec(arb_event(), 2..40)
    ) {
        let sorted = events.windows(2).all(|w| w[0].t_ms <= w[1].t_ms);
        prop_assume!(!sorted);
        let tl = timeline(events);
        prop_assert!(matches!(tl.validate(), Err(FrameclockError::Order { .. })), "expected Order error");
    }
}
