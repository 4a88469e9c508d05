//! Confidence model.
//!
//! Each (tier, sublevel) pair owns a fixed interval. A result starts at
//! the interval's upper bound and loses 0.05 per absent or degraded
//! source, never dropping below the lower bound. A dossier with every
//! source missing therefore sits exactly on the floor.

use crate::tier::{SubLevel, Tier};

const PENALTY_PER_MISSING_SOURCE: f64 = 0.05;

/// The (lower, upper) confidence interval for a tier/sublevel pair.
/// Sublevel-less tiers: benign IV has its own band; a Tier III result
/// without a sublevel (investigational-only) uses the III-B band.
pub fn interval(tier: Tier, sublevel: Option<SubLevel>) -> (f64, f64) {
    match (tier, sublevel) {
        (Tier::I, Some(SubLevel::A)) => (0.90, 1.00),
        (Tier::I, _) => (0.80, 0.90),
        (Tier::II, Some(SubLevel::A)) => (0.75, 0.85),
        (Tier::II, Some(SubLevel::B)) => (0.65, 0.80),
        (Tier::II, Some(SubLevel::C)) => (0.60, 0.75),
        (Tier::II, _) => (0.55, 0.70),
        (Tier::III, Some(SubLevel::A)) => (0.45, 0.55),
        (Tier::III, Some(SubLevel::C)) => (0.35, 0.45),
        (Tier::III, Some(SubLevel::D)) => (0.30, 0.40),
        (Tier::III, _) => (0.40, 0.50),
        (Tier::IV, _) => (0.90, 1.00),
    }
}

/// Confidence for a decided tier given how many sources were missing.
pub fn score(tier: Tier, sublevel: Option<SubLevel>, missing_sources: usize) -> f64 {
    let (lo, hi) = interval(tier, sublevel);
    (hi - PENALTY_PER_MISSING_SOURCE * missing_sources as f64).max(lo)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
