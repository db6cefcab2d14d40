//! Timeline documents: the typed model and its schema/ordering validator.

pub mod model;
pub mod validate;
