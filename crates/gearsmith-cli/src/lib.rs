//! Gearsmith CLI library.
//!
//! This crate provides the core functionality for the Gearsmith CLI,
//! including input loading, image build helpers, and the compose, resolve,
//! validate, and doctor commands.

pub mod builder;
pub mod commands;
pub mod input;
