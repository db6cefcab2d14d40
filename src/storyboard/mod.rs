//! Repair of machine-written storyboard output before it reaches the timeline validator.

pub mod repair;
