//! Derived statistics over the evidence dossier.
//!
//! All functions here are pure over `&Evidence` so the tier engine stays
//! deterministic: same dossier, same counters.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Evidence, EvidenceLevel, Response};

/// One sensitivity/resistance data point from VICC or CIViC.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEntry {
    pub drugs: Vec<String>,
    pub response: Response,
    pub level: Option<EvidenceLevel>,
    pub disease: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DominantSignal {
    None,
    SensitivityOnly,
    ResistanceOnly,
    SensitivityDominant,
    ResistanceDominant,
    Mixed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrugConflict {
    pub drug: String,
    pub sensitivity_count: usize,
    pub resistance_count: usize,
    pub sensitivity_diseases: Vec<String>,
    pub resistance_diseases: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvidenceStats {
    pub sensitivity_count: usize,
    pub resistance_count: usize,
    pub sensitivity_by_level: BTreeMap<String, usize>,
    pub resistance_by_level: BTreeMap<String, usize>,
    pub conflicts: Vec<DrugConflict>,
    pub dominant_signal: DominantSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NetSignal {
    Sensitive,
    Resistant,
    Mixed,
}

/// Per-drug roll-up across all predictive sources.
#[derive(Debug, Clone, Serialize)]
pub struct DrugSummary {
    pub drug: String,
    pub sensitivity_count: usize,
    pub resistance_count: usize,
    pub best_level: Option<EvidenceLevel>,
    pub diseases: Vec<String>,
    pub net_signal: NetSignal,
}

/// Collect every predictive sensitivity/resistance entry from VICC and
/// CIViC (evidence items only; assertions are consulted directly by the
/// engine).
pub fn signal_entries(evidence: &Evidence) -> Vec<SignalEntry> {
    let mut entries = Vec::new();

    if let Some(vicc) = evidence.vicc.as_present() {
        for assoc in &vicc.associations {
            entries.push(SignalEntry {
                drugs: assoc.drugs.clone(),
                response: assoc.response,
                level: assoc.evidence_level,
                disease: assoc.disease.clone(),
            });
        }
    }

    for item in evidence.civic_items() {
        if !item.is_predictive() {
            continue;
        }
        let response = if item.is_resistance() {
            Response::Resistant
        } else if item.is_sensitivity() {
            Response::Sensitive
        } else {
            continue;
        };
        entries.push(SignalEntry {
            drugs: item.drugs.clone(),
            response,
            level: item.evidence_level,
            disease: item.disease.clone(),
        });
    }

    entries
}

/// Low-quality minority filter.
///
/// When one side carries A/B evidence and the other side is only C/D
/// with at most two entries, the minority is treated as noise and
/// dropped. More than two entries on the minority side means the signal
/// is multiply sourced and survives. Idempotent.
pub fn filter_low_quality_minority(entries: Vec<SignalEntry>) -> Vec<SignalEntry> {
    let sens: Vec<&SignalEntry> = entries.iter().filter(|e| e.response == Response::Sensitive).collect();
    let res: Vec<&SignalEntry> = entries.iter().filter(|e| e.response == Response::Resistant).collect();

    let has_high = |side: &[&SignalEntry]| side.iter().any(|e| e.level.map(|l| l.is_high_quality()).unwrap_or(false));
    let only_low = |side: &[&SignalEntry]| {
        !side.is_empty()
            && side.iter().all(|e| e.level.map(|l| !l.is_high_quality()).unwrap_or(true))
    };

    let drop_resistance = has_high(&sens) && only_low(&res) && res.len() <= 2;
    let drop_sensitivity = has_high(&res) && only_low(&sens) && sens.len() <= 2;

    entries
        .into_iter()
        .filter(|e| match e.response {
            Response::Resistant => !drop_resistance,
            Response::Sensitive => !drop_sensitivity,
        })
        .collect()
}

fn level_key(level: Option<EvidenceLevel>) -> String {
    level.map(|l| l.as_str().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

/// Summary counters, conflict set, and dominant signal over the
/// minority-filtered entries.
pub fn compute_stats(evidence: &Evidence) -> EvidenceStats {
    let entries = filter_low_quality_minority(signal_entries(evidence));

    let mut stats = EvidenceStats {
        sensitivity_count: 0,
        resistance_count: 0,
        sensitivity_by_level: BTreeMap::new(),
        resistance_by_level: BTreeMap::new(),
        conflicts: Vec::new(),
        dominant_signal: DominantSignal::None,
    };

    #[derive(Default)]
    struct PerDrug {
        name: String,
        sens: usize,
        res: usize,
        sens_diseases: Vec<String>,
        res_diseases: Vec<String>,
    }
    let mut per_drug: BTreeMap<String, PerDrug> = BTreeMap::new();

    for entry in &entries {
        let (count, by_level) = match entry.response {
            Response::Sensitive => (&mut stats.sensitivity_count, &mut stats.sensitivity_by_level),
            Response::Resistant => (&mut stats.resistance_count, &mut stats.resistance_by_level),
        };
        *count += 1;
        *by_level.entry(level_key(entry.level)).or_insert(0) += 1;

        for drug in &entry.drugs {
            let key = drug.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            let slot = per_drug.entry(key).or_default();
            if slot.name.is_empty() {
                slot.name = drug.trim().to_string();
            }
            let disease = entry.disease.clone().unwrap_or_else(|| "unspecified".to_string());
            match entry.response {
                Response::Sensitive => {
                    slot.sens += 1;
                    if !slot.sens_diseases.contains(&disease) {
                        slot.sens_diseases.push(disease);
                    }
                }
                Response::Resistant => {
                    slot.res += 1;
                    if !slot.res_diseases.contains(&disease) {
                        slot.res_diseases.push(disease);
                    }
                }
            }
        }
    }

    for slot in per_drug.into_values() {
        if slot.sens > 0 && slot.res > 0 {
            stats.conflicts.push(DrugConflict {
                drug: slot.name,
                sensitivity_count: slot.sens,
                resistance_count: slot.res,
                sensitivity_diseases: slot.sens_diseases,
                resistance_diseases: slot.res_diseases,
            });
        }
    }

    let total = stats.sensitivity_count + stats.resistance_count;
    stats.dominant_signal = if total == 0 {
        DominantSignal::None
    } else if stats.resistance_count == 0 {
        DominantSignal::SensitivityOnly
    } else if stats.sensitivity_count == 0 {
        DominantSignal::ResistanceOnly
    } else if stats.sensitivity_count as f64 >= total as f64 * 0.8 {
        DominantSignal::SensitivityDominant
    } else if stats.resistance_count as f64 >= total as f64 * 0.8 {
        DominantSignal::ResistanceDominant
    } else {
        DominantSignal::Mixed
    };

    stats
}

/// Per-drug aggregation with the net-signal rule: one-sided evidence
/// keeps its side, a 3:1 ratio keeps the heavier side, anything else is
/// MIXED. The best evidence level per drug is retained. Sorted by best
/// level then by entry volume.
pub fn aggregate_by_drug(evidence: &Evidence) -> Vec<DrugSummary> {
    let entries = filter_low_quality_minority(signal_entries(evidence));

    struct Acc {
        name: String,
        sens: usize,
        res: usize,
        best: Option<EvidenceLevel>,
        diseases: Vec<String>,
    }
    let mut acc: BTreeMap<String, Acc> = BTreeMap::new();

    for entry in &entries {
        for drug in &entry.drugs {
            let key = drug.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            let slot = acc.entry(key).or_insert_with(|| Acc {
                name: drug.trim().to_string(),
                sens: 0,
                res: 0,
                best: None,
                diseases: Vec::new(),
            });
            match entry.response {
                Response::Sensitive => slot.sens += 1,
                Response::Resistant => slot.res += 1,
            }
            if let Some(level) = entry.level {
                slot.best = Some(slot.best.map_or(level, |b| b.min(level)));
            }
            if let Some(d) = &entry.disease {
                if !slot.diseases.contains(d) && slot.diseases.len() < 5 {
                    slot.diseases.push(d.clone());
                }
            }
        }
    }

    let mut out: Vec<DrugSummary> = acc
        .into_values()
        .map(|a| {
            let net_signal = if a.sens > 0 && a.res == 0 {
                NetSignal::Sensitive
            } else if a.res > 0 && a.sens == 0 {
                NetSignal::Resistant
            } else if a.sens >= a.res * 3 {
                NetSignal::Sensitive
            } else if a.res >= a.sens * 3 {
                NetSignal::Resistant
            } else {
                NetSignal::Mixed
            };
            DrugSummary {
                drug: a.name,
                sensitivity_count: a.sens,
                resistance_count: a.res,
                best_level: a.best,
                diseases: a.diseases,
                net_signal,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        let la = a.best_level.map(|l| l as u8).unwrap_or(u8::MAX);
        let lb = b.best_level.map(|l| l as u8).unwrap_or(u8::MAX);
        la.cmp(&lb).then(
            (b.sensitivity_count + b.resistance_count).cmp(&(a.sensitivity_count + a.resistance_count)),
        )
    });
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
