pub mod client;
pub mod config;
pub mod errors;

pub use client::{GenerationClient, NdjsonDecoder};
pub use errors::BackendError;
