use super::*;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(log: &Log, s: impl Into<String>) {
    log.lock().unwrap().push(s.into());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn time_only_moves_on_advance() {
    let mut clock = VirtualClock::new();
    assert_eq!(clock.now(), 0.0);
    clock.schedule_after(10.0, |_| {});
    assert_eq!(clock.now(), 0.0);
    let report = clock.advance_to(25.0);
    assert_eq!(report.now_ms, 25.0);
    assert_eq!(clock.now(), 25.0);
}

#[test]
fn timers_fire_in_trigger_order_then_scheduling_order() {
    let mut clock = VirtualClock::new();
    let l = log();
    for (delay, name) in [(30.0, "c"), (10.0, "a"), (10.0, "b"), (20.0, "x")] {
        let l = l.clone();
        clock.schedule_after(delay, move |_| push(&l, name));
    }
    let report = clock.advance_to(100.0);
    assert_eq!(entries(&l), vec!["a", "b", "x", "c"]);
    assert_eq!(report.fired_timers, vec![2, 3, 4, 1]);
    assert_eq!(clock.pending_timers(), 0);
}

#[test]
fn timer_sees_its_own_step_as_now() {
    let mut clock = VirtualClock::new();
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    clock.schedule_after(7.0, move |c| *s.lock().unwrap() = Some(c.now()));
    clock.advance_to(100.0);
    assert_eq!(*seen.lock().unwrap(), Some(7.0));
}

#[test]
fn cancelled_timer_never_fires() {
    let mut clock = VirtualClock::new();
    let l = log();
    let l2 = l.clone();
    let id = clock.schedule_after(5.0, move |_| push(&l2, "fired"));
    assert!(clock.cancel(id));
    assert!(!clock.cancel(id));
    clock.advance_to(50.0);
    assert!(entries(&l).is_empty());
}

#[test]
fn timers_beyond_target_stay_pending() {
    let mut clock = VirtualClock::new();
    clock.schedule_after(40.0, |_| {});
    let report = clock.advance_to(39.0);
    assert!(report.fired_timers.is_empty());
    assert_eq!(clock.pending_timers(), 1);
    let report = clock.advance_to(40.0);
    assert_eq!(report.fired_timers.len(), 1);
}

#[test]
fn zero_delay_timer_fires_on_advance_to_the_current_time() {
    let mut clock = VirtualClock::new();
    let l = log();
    let l2 = l.clone();
    clock.schedule_after(0.0, move |c| push(&l2, format!("t0@{}", c.now())));

    let report = clock.advance_to(0.0);
    assert_eq!(report.fired_timers, vec![1]);
    assert_eq!(entries(&l), vec!["t0@0"]);
    assert_eq!(clock.pending_timers(), 0);
    assert!(clock.advance_to(0.0).fired_timers.is_empty());
}

#[test]
fn callback_scheduled_during_a_step_runs_at_a_later_step() {
    let mut clock = VirtualClock::new();
    let l = log();
    let l2 = l.clone();
    clock.schedule_after(10.0, move |c| {
        push(&l2, format!("outer@{}", c.now()));
        let l3 = l2.clone();
        c.schedule_after(0.0, move |c| push(&l3, format!("inner@{}", c.now())));
    });
    clock.advance_to(20.0);
    assert_eq!(entries(&l), vec!["outer@10", "inner@11"]);
}

#[test]
fn frame_callbacks_run_once_per_advance_with_target_timestamp() {
    let mut clock = VirtualClock::new();
    let l = log();
    let l2 = l.clone();
    clock.schedule_frame(move |_, ts| push(&l2, format!("frame@{ts}")));

    let report = clock.advance_to(33.0);
    assert_eq!(report.frame_callbacks, 1);
    assert_eq!(clock.pending_frames(), 0);

    let report = clock.advance_to(66.0);
    assert_eq!(report.frame_callbacks, 0);
    assert_eq!(entries(&l), vec!["frame@33"]);
}

#[test]
fn frame_callback_rescheduling_itself_runs_on_the_next_advance() {
    fn tick(log: Log) -> impl FnOnce(&mut VirtualClock, f64) + Send + 'static {
        move |clock, ts| {
            push(&log, format!("{ts}"));
            clock.schedule_frame(tick(log.clone()));
        }
    }

    let mut clock = VirtualClock::new();
    let l = log();
    clock.schedule_frame(tick(l.clone()));
    for t in [0.0, 10.0, 20.0] {
        let report = clock.advance_to(t);
        assert_eq!(report.frame_callbacks, 1, "advance to {t}");
    }
    assert_eq!(entries(&l), vec!["0", "10", "20"]);
}

#[test]
fn cancelled_frame_callback_is_skipped() {
    let mut clock = VirtualClock::new();
    let id = clock.schedule_frame(|_, _| panic!("must not run"));
    assert!(clock.cancel_frame(id));
    assert_eq!(clock.advance_to(5.0).frame_callbacks, 0);
}

#[test]
fn animations_are_seeked_relative_to_start() {
    let mut clock = VirtualClock::new();
    let early = clock.track_animation();
    clock.advance_to(100.0);
    let late = clock.track_animation();
    let report = clock.advance_to(250.0);
    assert_eq!(report.animations_seeked, 2);
    assert_eq!(clock.animation_position(early), Some(250.0));
    assert_eq!(clock.animation_position(late), Some(150.0));
}

#[test]
fn pending_animations_are_skipped_until_started() {
    let mut clock = VirtualClock::new();
    let anim = clock.track_pending_animation();
    let report = clock.advance_to(50.0);
    assert_eq!(report.animations_skipped, 1);
    assert_eq!(report.animations_seeked, 0);
    assert_eq!(clock.animation_position(anim), None);

    clock.start_animation(anim);
    let report = clock.advance_to(80.0);
    assert_eq!(report.animations_seeked, 1);
    assert_eq!(clock.animation_position(anim), Some(30.0));
}

#[test]
fn animation_started_by_a_timer_is_born_at_the_timer_step() {
    let mut clock = VirtualClock::new();
    let anim = clock.track_pending_animation();
    clock.schedule_after(40.0, move |c| c.start_animation(anim));
    clock.advance_to(100.0);
    assert_eq!(clock.animation_position(anim), Some(60.0));
}

#[test]
fn coarser_step_fires_on_step_boundaries() {
    let mut clock = VirtualClock::with_step(10.0);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    clock.schedule_after(3.0, move |c| s.lock().unwrap().push(c.now()));
    clock.advance_to(25.0);
    assert_eq!(*seen.lock().unwrap(), vec![10.0]);
    assert_eq!(clock.now(), 25.0);
}

#[test]
fn advancing_backwards_does_not_move_time() {
    let mut clock = VirtualClock::new();
    clock.advance_to(50.0);
    let report = clock.advance_to(10.0);
    assert_eq!(report.now_ms, 50.0);
}

#[test]
fn fractional_frame_targets_are_exact_to_the_microsecond() {
    let mut clock = VirtualClock::new();
    let target = 1000.0 / 30.0;
    clock.advance_to(target);
    assert!((clock.now() - target).abs() < 0.001);
}

#[test]
fn frame_callbacks_receive_the_requested_target_exactly() {
    let mut clock = VirtualClock::new();
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    clock.schedule_frame(move |_, ts| *s.lock().unwrap() = Some(ts));
    let target = 1000.0 / 30.0;
    clock.advance_to(target);
    assert_eq!(*seen.lock().unwrap(), Some(target));
}

proptest! {
    #[test]
    fn repeated_advance_to_same_target_is_idempotent(
        delays in prop::collection::vec(0u32..500, 0..20),
        target in 0u32..600,
    ) {
        let mut clock = VirtualClock::new();
        for d in &delays {
            clock.schedule_after(f64::from(*d), |_| {});
        }
        clock.schedule_frame(|_, _| {});
        let anim = clock.track_animation();

        let first = clock.advance_to(f64::from(target));
        let pos = clock.animation_position(anim);
        let pending = clock.pending_timers();

        let second = clock.advance_to(f64::from(target));
        prop_assert!(second.fired_timers.is_empty());
        prop_assert_eq!(second.frame_callbacks, 0);
        prop_assert_eq!(second.now_ms, first.now_ms);
        prop_assert_eq!(clock.animation_position(anim), pos);
        prop_assert_eq!(clock.pending_timers(), pending);
    }

    #[test]
    fn every_timer_due_by_target_fires_exactly_once(
        delays in prop::collection::vec(0u32..500, 0..30),
    ) {
        let mut clock = VirtualClock::new();
        for d in &delays {
            clock.schedule_after(f64::from(*d), |_| {});
        }
        let mut fired = Vec::new();
        for t in (0..=500).step_by(33) {
            fired.extend(clock.advance_to(f64::from(t)).fired_timers);
        }
        fired.extend(clock.advance_to(500.0).fired_timers);
        fired.sort_unstable();
        let expected: Vec<u64> = (1..=delays.len() as u64).collect();
        prop_assert_eq!(fired, expected);
    }
}
