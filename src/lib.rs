//! Turns streamed AI replies into a versioned project: tree parsing, block
//! extraction and merging, plus a small module loader for previews.

pub mod api;
pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod errors;
pub mod file_processing;
pub mod models;
pub mod preview;
pub mod session;
pub mod utils;
