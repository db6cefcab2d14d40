//! Timeline compilation into a per-timestamp dispatch schedule.

pub mod schedule;
