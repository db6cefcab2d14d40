//! Static checks and debug instrumentation for scene HTML.

pub mod overlay;
pub mod qa;
