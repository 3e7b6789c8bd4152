//! Row models. Each converts into the matching `synthgate_core` type.

pub mod job;
