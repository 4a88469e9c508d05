//! Evidence retrieval and aggregation.
//!
//! Eight self-contained source clients share a uniform fetch contract;
//! the aggregator fans them out concurrently under a per-assessment
//! deadline, runs the literature sub-pipeline, and merges everything
//! into a single [`models::Evidence`] dossier with derived statistics.

pub mod aggregate;
pub mod models;
pub mod sources;
pub mod stats;

pub use aggregate::{Aggregator, LiteratureAnalyst, PaperScore};
pub use models::{Evidence, EvidenceLevel, Response, SourceSlot};
pub use sources::EvidenceRequest;
