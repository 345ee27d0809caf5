//! Queue types and the worker runtime behind the UI.

pub mod commands;
pub mod runtime;
