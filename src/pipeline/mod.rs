//! Certificate pipeline.
//!
//! 1. `CertificatePipeline::generate_certificates()` validates every row and
//!    renders one PDF per valid participant.
//! 2. `deliver_certificates()` optionally emails each PDF afterwards.
//!
//! Per-record and per-notification failures are collected, never propagated.

pub mod delivery;
pub mod events;
pub mod generator;
pub mod types;

pub use delivery::deliver_certificates;
pub use events::{EventSink, MemorySink, PipelineEvent, TracingSink};
pub use generator::CertificatePipeline;
pub use types::*;
