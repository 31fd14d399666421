//! Audio (and optional camera) output stage (spec §4.8): chunked writes,
//! bot-speaking lifecycle, and interruption draining.

pub mod config;
pub mod processor;
pub mod writer;

pub use config::AudioCameraConfig;
pub use processor::AudioCameraOutputProcessor;
pub use writer::TransportWriter;
