//! Virtual time for deterministic capture.
//!
//! [`virtual_clock::VirtualClock`] is the reference model; [`protocol`] installs and drives the
//! same algorithm inside a browser page.

pub mod protocol;
pub mod virtual_clock;
