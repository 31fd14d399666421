//! Voice-activity segmentation (spec §4.3, §4.4): a confidence-provider
//! abstraction, the windowed state-machine analyzer, and a pipeline
//! processor wrapping it.

pub mod analyzer;
pub mod processor;
pub mod provider;

pub use analyzer::{VadAnalyzer, VadAnalyzerConfig};
pub use processor::VadProcessor;
pub use provider::{EnergyThresholdProvider, VoiceConfidenceProvider};
