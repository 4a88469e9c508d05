//! Deterministic tier engine.
//!
//! A pure decision cascade over the evidence dossier: same dossier,
//! same tumor, same configuration tables, same tier. The LLM never
//! participates here.

pub mod assessment;
pub mod confidence;
pub mod summary;
pub mod tier;

pub use assessment::Assessment;
pub use tier::{get_tier_hint, ReasonCode, SubLevel, Tier, TierConfig, TierResult};
