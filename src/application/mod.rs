//! Application layer: file loading and the event pipeline.

pub mod loader;
pub mod pipeline;

pub use loader::FileLoader;
pub use pipeline::{ClonePipeline, Outcome};
