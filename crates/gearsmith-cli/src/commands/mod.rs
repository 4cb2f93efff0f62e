//! CLI command implementations

pub mod compose;
pub mod doctor;
pub mod resolve;
pub mod validate;
