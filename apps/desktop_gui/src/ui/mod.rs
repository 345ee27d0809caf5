//! UI layer: the single-page app shell.

pub mod app;
