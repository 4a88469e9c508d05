//! The tier decision cascade.
//!
//! An ordered list of named rules; the first rule whose predicate fires
//! decides the tier, sublevel, and reason. Keeping the cascade in data
//! lets the property tests enumerate it directly.

use oncotier_common::tumor::TumorMatcher;
use oncotier_evidence::models::{CgiStatus, Evidence, EvidenceLevel, Response};
use oncotier_evidence::stats::{self, DrugSummary, EvidenceStats, NetSignal};
use oncotier_variant::classes::{ClassMatch, VariantClassTable};
use oncotier_variant::gene_context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::confidence;

// ── Result types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    I,
    II,
    III,
    IV,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::I => "I",
            Tier::II => "II",
            Tier::III => "III",
            Tier::IV => "IV",
        }
    }

    /// Numeric rank for tier-distance metrics: I=1 .. IV=4.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::I => 1,
            Tier::II => 2,
            Tier::III => 3,
            Tier::IV => 4,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches("Tier ").trim().to_uppercase().as_str() {
            "I" | "1" => Some(Tier::I),
            "II" | "2" => Some(Tier::II),
            "III" | "3" => Some(Tier::III),
            "IV" | "4" => Some(Tier::IV),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubLevel {
    A,
    B,
    C,
    D,
}

impl SubLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubLevel::A => "A",
            SubLevel::B => "B",
            SubLevel::C => "C",
            SubLevel::D => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Benign,
    Subtype,
    FdaVariantInTumor,
    LiteratureStrong,
    TrialVariantSpecific,
    InvestigationalOnly,
    ResistanceWithAlt,
    ResistanceNoAlt,
    PrognosticStrong,
    PrognosticWeak,
    Offlabel,
    GeneLevel,
    VusInCancerGene,
    NoEvidence,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Benign => "benign",
            ReasonCode::Subtype => "subtype",
            ReasonCode::FdaVariantInTumor => "fda_variant_in_tumor",
            ReasonCode::LiteratureStrong => "literature_strong",
            ReasonCode::TrialVariantSpecific => "trial_variant_specific",
            ReasonCode::InvestigationalOnly => "investigational_only",
            ReasonCode::ResistanceWithAlt => "resistance_with_alt",
            ReasonCode::ResistanceNoAlt => "resistance_no_alt",
            ReasonCode::PrognosticStrong => "prognostic_strong",
            ReasonCode::PrognosticWeak => "prognostic_weak",
            ReasonCode::Offlabel => "offlabel",
            ReasonCode::GeneLevel => "gene_level",
            ReasonCode::VusInCancerGene => "vus_in_cancer_gene",
            ReasonCode::NoEvidence => "no_evidence",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierResult {
    pub tier: Tier,
    pub sublevel: Option<SubLevel>,
    pub reason: ReasonCode,
    pub human_reason: String,
    pub confidence: f64,
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Immutable tables shared read-only for the process lifetime.
pub struct TierConfig {
    pub classes: VariantClassTable,
    pub tumors: TumorMatcher,
}

impl TierConfig {
    pub fn new() -> Self {
        Self {
            classes: VariantClassTable::new(),
            tumors: TumorMatcher::new(),
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Rule context ─────────────────────────────────────────────────────────────

struct RuleCtx<'a> {
    evidence: &'a Evidence,
    tumor: Option<&'a str>,
    config: &'a TierConfig,
    stats: EvidenceStats,
    drug_summaries: Vec<DrugSummary>,
}

struct Outcome {
    tier: Tier,
    sublevel: Option<SubLevel>,
    reason: ReasonCode,
    human_reason: String,
}

struct TierRule {
    name: &'static str,
    predicate: fn(&RuleCtx) -> Option<Outcome>,
}

/// The cascade, in priority order. First match wins.
static CASCADE: &[TierRule] = &[
    TierRule { name: "benign", predicate: rule_benign },
    TierRule { name: "subtype", predicate: rule_subtype },
    TierRule { name: "fda_variant_in_tumor", predicate: rule_fda_variant_in_tumor },
    TierRule { name: "literature_strong", predicate: rule_literature_strong },
    TierRule { name: "trial_variant_specific", predicate: rule_trial_variant_specific },
    TierRule { name: "investigational_only", predicate: rule_investigational_only },
    TierRule { name: "resistance", predicate: rule_resistance },
    TierRule { name: "prognostic", predicate: rule_prognostic },
    TierRule { name: "offlabel", predicate: rule_offlabel },
    TierRule { name: "gene_level", predicate: rule_gene_level },
    TierRule { name: "vus_in_cancer_gene", predicate: rule_vus },
];

/// Pure tier decision over the dossier. Deterministic: the cascade and
/// every predicate read only the evidence, the tumor, and the static
/// tables.
pub fn get_tier_hint(evidence: &Evidence, tumor_type: Option<&str>, config: &TierConfig) -> TierResult {
    let ctx = RuleCtx {
        evidence,
        tumor: tumor_type,
        config,
        stats: stats::compute_stats(evidence),
        drug_summaries: stats::aggregate_by_drug(evidence),
    };

    let outcome = CASCADE
        .iter()
        .find_map(|rule| {
            let outcome = (rule.predicate)(&ctx)?;
            debug!(rule = rule.name, tier = outcome.tier.as_str(), "cascade rule fired");
            Some(outcome)
        })
        .unwrap_or_else(|| Outcome {
            tier: Tier::III,
            sublevel: Some(SubLevel::D),
            reason: ReasonCode::NoEvidence,
            human_reason: "No actionable evidence found in any queried source".to_string(),
        });

    let confidence =
        confidence::score(outcome.tier, outcome.sublevel, evidence.missing_source_count());

    TierResult {
        tier: outcome.tier,
        sublevel: outcome.sublevel,
        reason: outcome.reason,
        human_reason: outcome.human_reason,
        confidence,
    }
}

// ── Rules ────────────────────────────────────────────────────────────────────

/// 1. ClinVar benign/likely benign is Tier IV, always.
fn rule_benign(ctx: &RuleCtx) -> Option<Outcome> {
    let sig = ctx.evidence.clinvar_significance()?;
    if sig.to_lowercase().contains("benign") {
        return Some(Outcome {
            tier: Tier::IV,
            sublevel: None,
            reason: ReasonCode::Benign,
            human_reason: format!("ClinVar classifies this variant as {}", sig),
        });
    }
    None
}

/// 2. Molecular subtype-defining variant.
fn rule_subtype(ctx: &RuleCtx) -> Option<Outcome> {
    let variant = &ctx.evidence.variant;
    let rule = gene_context::subtype_defining(&variant.gene, &variant.variant_normalized, ctx.tumor)?;
    Some(Outcome {
        tier: Tier::I,
        sublevel: Some(SubLevel::B),
        reason: ReasonCode::Subtype,
        human_reason: format!("Defines the {} molecular subtype", rule.subtype),
    })
}

/// 3. FDA approval for this variant in this tumor type.
fn rule_fda_variant_in_tumor(ctx: &RuleCtx) -> Option<Outcome> {
    let tumor = ctx.tumor?;
    let variant = &ctx.evidence.variant;

    // Hard class exclusion removes the variant from label-derived Tier I
    // entirely (T790M does not ride the first-generation TKI labels even
    // though osimertinib's label names it; that path is the resistance
    // rule's).
    if ctx.config.classes.is_excluded_variant(&variant.gene, &variant.variant_normalized) {
        return None;
    }

    // FDA label: tumor-matching indication that names the variant or
    // admits it through its class.
    if let Some(fda) = ctx.evidence.fda.as_present() {
        for approval in &fda.approvals {
            let Some(indication) = approval.indication.as_deref() else {
                continue;
            };
            if !ctx.config.tumors.matches(Some(tumor), Some(indication)) {
                continue;
            }
            let names_gene = indication.to_lowercase().contains(&variant.gene.to_lowercase());
            if !approval.mentions_variant && !names_gene {
                continue;
            }
            let admitted = matches!(
                ctx.config.classes.match_indication(
                    &variant.gene,
                    &variant.variant_normalized,
                    indication,
                    Some(tumor),
                    variant.position,
                ),
                ClassMatch::Admitted(_)
            );
            if admitted {
                return Some(Outcome {
                    tier: Tier::I,
                    sublevel: Some(SubLevel::A),
                    reason: ReasonCode::FdaVariantInTumor,
                    human_reason: format!(
                        "FDA-approved therapy ({}) for this variant in this tumor type",
                        approval.drug_name
                    ),
                });
            }
        }
    }

    // CIViC assertion, AMP Tier I, predictive sensitivity, same tumor.
    for assertion in ctx.evidence.civic_assertions() {
        if assertion.is_tier_i()
            && assertion.is_predictive()
            && assertion.is_sensitivity()
            && ctx.config.tumors.matches(Some(tumor), assertion.disease.as_deref())
        {
            let sublevel = match assertion.amp_level {
                Some(EvidenceLevel::A) | None => SubLevel::A,
                _ => SubLevel::B,
            };
            return Some(Outcome {
                tier: Tier::I,
                sublevel: Some(sublevel),
                reason: ReasonCode::FdaVariantInTumor,
                human_reason: "CIViC Tier I assertion: predictive sensitivity in this tumor type"
                    .to_string(),
            });
        }
    }

    // CIViC Level A predictive sensitivity evidence in the same tumor.
    for item in ctx.evidence.civic_items() {
        if item.evidence_level == Some(EvidenceLevel::A)
            && item.is_predictive()
            && item.is_sensitivity()
            && ctx.config.tumors.matches(Some(tumor), item.disease.as_deref())
        {
            return Some(Outcome {
                tier: Tier::I,
                sublevel: Some(SubLevel::A),
                reason: ReasonCode::FdaVariantInTumor,
                human_reason: "CIViC Level A predictive sensitivity in this tumor type".to_string(),
            });
        }
    }

    // CGI biomarker with FDA or NCCN status, sensitive, same tumor.
    if let Some(cgi) = ctx.evidence.cgi.as_present() {
        for biomarker in &cgi.biomarkers {
            if biomarker.response == Response::Sensitive
                && ctx.config.tumors.matches(Some(tumor), Some(biomarker.tumor.as_str()))
            {
                let sublevel = match biomarker.evidence_status {
                    CgiStatus::Fda => Some(SubLevel::A),
                    CgiStatus::Nccn => Some(SubLevel::B),
                    _ => None,
                };
                if let Some(sublevel) = sublevel {
                    return Some(Outcome {
                        tier: Tier::I,
                        sublevel: Some(sublevel),
                        reason: ReasonCode::FdaVariantInTumor,
                        human_reason: format!(
                            "CGI {}-status sensitivity biomarker in this tumor type",
                            if sublevel == SubLevel::A { "FDA" } else { "NCCN" }
                        ),
                    });
                }
            }
        }
    }

    None
}

/// 4. Literature-extracted strong sensitivity evidence.
fn rule_literature_strong(ctx: &RuleCtx) -> Option<Outcome> {
    let knowledge = ctx.evidence.literature_knowledge()?;
    if knowledge.is_strong() && knowledge.confidence >= 0.7 && !knowledge.sensitive_to.is_empty() {
        let drugs: Vec<&str> = knowledge.sensitivity_drugs().into_iter().take(3).collect();
        return Some(Outcome {
            tier: Tier::I,
            sublevel: Some(SubLevel::B),
            reason: ReasonCode::LiteratureStrong,
            human_reason: format!(
                "Literature reports {} evidence of benefit from {}",
                knowledge.evidence_level_tag,
                drugs.join(", ")
            ),
        });
    }
    None
}

/// 5. Active trial enrolling this specific variant. Suppressed for
/// investigational-only pairs, which rule 6 forces to Tier III.
fn rule_trial_variant_specific(ctx: &RuleCtx) -> Option<Outcome> {
    let variant = &ctx.evidence.variant;
    if gene_context::is_investigational_only(&variant.gene, ctx.tumor) {
        return None;
    }
    let trials = ctx.evidence.trials.as_present()?;
    let hit = trials.trials.iter().find(|t| {
        t.variant_mentioned
            && t.is_active()
            && (ctx.tumor.is_none()
                || t.conditions
                    .iter()
                    .any(|c| ctx.config.tumors.matches(ctx.tumor, Some(c.as_str()))))
    })?;
    Some(Outcome {
        tier: Tier::II,
        sublevel: Some(SubLevel::D),
        reason: ReasonCode::TrialVariantSpecific,
        human_reason: format!("Active clinical trial {} enrolls this variant", hit.nct_id),
    })
}

/// 6. Investigational-only gene/tumor pair.
///
/// Forces Tier III, but steps aside when the dossier itself carries
/// evidence a later branch is entitled to act on: prognostic items
/// (rule 8 grades them II-C/III-C) or sensitivity signals behind a
/// pathway-actionable tumor suppressor (rule 10). A bare table hit with
/// an otherwise quiet dossier stays investigational-only.
fn rule_investigational_only(ctx: &RuleCtx) -> Option<Outcome> {
    let variant = &ctx.evidence.variant;
    if !gene_context::is_investigational_only(&variant.gene, ctx.tumor) {
        return None;
    }
    if has_prognostic_evidence(ctx) {
        return None;
    }
    if gene_context::pathway_actionable(&variant.gene).is_some()
        && gene_context::is_high_prevalence_tumor(&variant.gene, ctx.tumor)
        && ctx.stats.sensitivity_count > 0
    {
        return None;
    }
    Some(Outcome {
        tier: Tier::III,
        sublevel: None,
        reason: ReasonCode::InvestigationalOnly,
        human_reason: "No approved targeted therapy exists for this gene in this tumor type"
            .to_string(),
    })
}

/// 7. Resistance to standard-of-care, with or without an approved
/// alternative.
fn rule_resistance(ctx: &RuleCtx) -> Option<Outcome> {
    let resisted = resisted_standard_of_care(ctx);
    if resisted.is_empty() {
        return None;
    }

    let alternatives = resistance_alternatives(ctx);
    let resisted_str = resisted.join(", ");
    if let Some(alt) = alternatives.first() {
        Some(Outcome {
            tier: Tier::I,
            sublevel: Some(SubLevel::A),
            reason: ReasonCode::ResistanceWithAlt,
            human_reason: format!(
                "Confers resistance to {} with an FDA-approved alternative ({})",
                resisted_str, alt
            ),
        })
    } else {
        Some(Outcome {
            tier: Tier::II,
            sublevel: Some(SubLevel::D),
            reason: ReasonCode::ResistanceNoAlt,
            human_reason: format!(
                "Resistance marker excluding {} with no approved alternative for this variant",
                resisted_str
            ),
        })
    }
}

/// Drugs of this tumor's standard of care the variant resists.
fn resisted_standard_of_care(ctx: &RuleCtx) -> Vec<String> {
    let mut drugs: Vec<String> = Vec::new();
    let mut push = |drug: &str| {
        let trimmed = drug.trim();
        if !trimmed.is_empty() && !drugs.iter().any(|d| d.eq_ignore_ascii_case(trimmed)) {
            drugs.push(trimmed.to_string());
        }
    };

    // FDA labels in this tumor that require wild-type for the gene.
    if let (Some(tumor), Some(fda)) = (ctx.tumor, ctx.evidence.fda.as_present()) {
        let gene_lower = ctx.evidence.variant.gene.to_lowercase();
        let wildtype_patterns = [
            format!("{} wild-type", gene_lower),
            format!("{}-wild-type", gene_lower),
            format!("wild type {}", gene_lower),
            format!("without {} mutation", gene_lower),
            format!("{}-negative", gene_lower),
            "ras wild-type".to_string(),
            "ras wildtype".to_string(),
        ];
        for approval in &fda.approvals {
            let Some(indication) = approval.indication.as_deref() else {
                continue;
            };
            let indication_lower = indication.to_lowercase();
            if ctx.config.tumors.matches(Some(tumor), Some(indication))
                && wildtype_patterns.iter().any(|p| indication_lower.contains(p))
            {
                push(&approval.drug_name);
            }
        }
    }

    // CGI FDA-status resistance biomarkers in this tumor.
    if let Some(cgi) = ctx.evidence.cgi.as_present() {
        for biomarker in &cgi.biomarkers {
            if biomarker.response == Response::Resistant
                && biomarker.evidence_status == CgiStatus::Fda
                && (ctx.tumor.is_none()
                    || ctx.config.tumors.matches(ctx.tumor, Some(biomarker.tumor.as_str())))
            {
                for drug in &biomarker.drugs {
                    push(drug);
                }
            }
        }
    }

    // Literature-extracted predictive resistance.
    if let Some(knowledge) = ctx.evidence.literature_knowledge() {
        if knowledge.confidence >= 0.7 {
            for drug in knowledge.predictive_resistance_drugs() {
                push(drug);
            }
        }
    }

    // Drug-level aggregation: net-resistant drugs at high quality.
    for summary in &ctx.drug_summaries {
        if summary.net_signal == NetSignal::Resistant
            && summary.best_level.map(|l| l.is_high_quality()).unwrap_or(false)
        {
            push(&summary.drug);
        }
    }

    drugs.truncate(5);
    drugs
}

/// FDA-approved options that remain open for this variant: labels that
/// explicitly name it in a matching tumor, or a Tier I resistance
/// assertion that carries alternative therapies.
fn resistance_alternatives(ctx: &RuleCtx) -> Vec<String> {
    let mut alternatives = Vec::new();

    if let Some(fda) = ctx.evidence.fda.as_present() {
        for approval in &fda.approvals {
            if !approval.mentions_variant {
                continue;
            }
            let tumor_ok = match (ctx.tumor, approval.indication.as_deref()) {
                (Some(tumor), Some(indication)) => {
                    ctx.config.tumors.matches(Some(tumor), Some(indication))
                }
                _ => false,
            };
            if tumor_ok {
                alternatives.push(approval.drug_name.clone());
            }
        }
    }

    for assertion in ctx.evidence.civic_assertions() {
        if assertion.is_tier_i()
            && assertion.is_resistance()
            && !assertion.therapies.is_empty()
            && ctx.config.tumors.matches(ctx.tumor, assertion.disease.as_deref())
        {
            alternatives.extend(assertion.therapies.iter().cloned());
        }
    }

    alternatives
}

/// 8. Prognostic or diagnostic only: no therapeutic signal anywhere.
fn rule_prognostic(ctx: &RuleCtx) -> Option<Outcome> {
    if !is_prognostic_only(ctx) {
        return None;
    }

    let best_level = ctx
        .evidence
        .civic_items()
        .iter()
        .filter(|i| i.is_prognostic())
        .filter_map(|i| i.evidence_level)
        .chain(
            ctx.evidence
                .civic_assertions()
                .iter()
                .filter(|a| {
                    a.assertion_type
                        .as_deref()
                        .map(|t| t.eq_ignore_ascii_case("PROGNOSTIC"))
                        .unwrap_or(false)
                })
                .filter_map(|a| a.amp_level),
        )
        .min()?;

    if best_level.is_high_quality() {
        Some(Outcome {
            tier: Tier::II,
            sublevel: Some(SubLevel::C),
            reason: ReasonCode::PrognosticStrong,
            human_reason: format!(
                "Prognostic marker with Level {} evidence and treatment planning impact",
                best_level.as_str()
            ),
        })
    } else {
        Some(Outcome {
            tier: Tier::III,
            sublevel: Some(SubLevel::C),
            reason: ReasonCode::PrognosticWeak,
            human_reason: "Prognostic association only, supported by weak evidence".to_string(),
        })
    }
}

fn has_prognostic_evidence(ctx: &RuleCtx) -> bool {
    ctx.evidence.civic_items().iter().any(|i| i.is_prognostic())
        || ctx.evidence.civic_assertions().iter().any(|a| {
            a.assertion_type
                .as_deref()
                .map(|t| t.eq_ignore_ascii_case("PROGNOSTIC"))
                .unwrap_or(false)
        })
}

fn is_prognostic_only(ctx: &RuleCtx) -> bool {
    if !has_prognostic_evidence(ctx) {
        return false;
    }

    // Any predictive signal with drugs disqualifies "prognostic only".
    let has_predictive_items = ctx
        .evidence
        .civic_items()
        .iter()
        .any(|i| i.is_predictive() && !i.drugs.is_empty());
    let has_predictive_assertions = ctx
        .evidence
        .civic_assertions()
        .iter()
        .any(|a| a.is_predictive() && !a.therapies.is_empty());
    let has_vicc = ctx
        .evidence
        .vicc
        .as_present()
        .map(|v| !v.associations.is_empty())
        .unwrap_or(false);
    let has_cgi = ctx
        .evidence
        .cgi
        .as_present()
        .map(|c| !c.biomarkers.is_empty())
        .unwrap_or(false);
    let has_fda = ctx
        .evidence
        .fda
        .as_present()
        .map(|f| !f.approvals.is_empty())
        .unwrap_or(false);

    !has_predictive_items && !has_predictive_assertions && !has_vicc && !has_cgi && !has_fda
}

/// 9. FDA approval for this variant's class exists in a different tumor.
fn rule_offlabel(ctx: &RuleCtx) -> Option<Outcome> {
    let variant = &ctx.evidence.variant;
    if ctx
        .config
        .classes
        .is_excluded_variant(&variant.gene, &variant.variant_normalized)
    {
        return None;
    }

    if let Some(fda) = ctx.evidence.fda.as_present() {
        for approval in &fda.approvals {
            let Some(indication) = approval.indication.as_deref() else {
                continue;
            };
            let same_tumor = ctx
                .tumor
                .map(|t| ctx.config.tumors.matches(Some(t), Some(indication)))
                .unwrap_or(false);
            if same_tumor {
                continue;
            }
            let admitted = matches!(
                ctx.config.classes.match_indication(
                    &variant.gene,
                    &variant.variant_normalized,
                    indication,
                    ctx.tumor,
                    variant.position,
                ),
                ClassMatch::Admitted(_)
            );
            let names_variant_or_gene = approval.mentions_variant
                || indication.to_lowercase().contains(&variant.gene.to_lowercase());
            if admitted && names_variant_or_gene {
                return Some(Outcome {
                    tier: Tier::II,
                    sublevel: Some(SubLevel::A),
                    reason: ReasonCode::Offlabel,
                    human_reason: format!(
                        "{} is FDA-approved for this variant in a different tumor type",
                        approval.drug_name
                    ),
                });
            }
        }
    }

    // CGI FDA-status sensitivity in a different tumor.
    if let Some(cgi) = ctx.evidence.cgi.as_present() {
        for biomarker in &cgi.biomarkers {
            if biomarker.response == Response::Sensitive
                && biomarker.evidence_status == CgiStatus::Fda
                && !ctx.config.tumors.matches(ctx.tumor, Some(biomarker.tumor.as_str()))
            {
                return Some(Outcome {
                    tier: Tier::II,
                    sublevel: Some(SubLevel::A),
                    reason: ReasonCode::Offlabel,
                    human_reason: "FDA-status sensitivity biomarker in a different tumor type"
                        .to_string(),
                });
            }
        }
    }

    None
}

/// 10. Gene-level therapeutic evidence: CIViC Level B predictive, or a
/// pathway-actionable tumor suppressor with a pathway drug.
fn rule_gene_level(ctx: &RuleCtx) -> Option<Outcome> {
    let variant = &ctx.evidence.variant;

    let predictive_levels: Vec<EvidenceLevel> = ctx
        .evidence
        .civic_items()
        .iter()
        .filter(|i| i.is_predictive() && !i.drugs.is_empty())
        .filter_map(|i| i.evidence_level)
        .collect();

    if predictive_levels.contains(&EvidenceLevel::B) {
        return Some(Outcome {
            tier: Tier::II,
            sublevel: Some(SubLevel::B),
            reason: ReasonCode::GeneLevel,
            human_reason: "CIViC Level B predictive evidence at the gene level".to_string(),
        });
    }

    if let Some(tsg) = gene_context::pathway_actionable(&variant.gene) {
        if gene_context::is_high_prevalence_tumor(&variant.gene, ctx.tumor) && !tsg.drugs.is_empty()
        {
            return Some(Outcome {
                tier: Tier::II,
                sublevel: Some(SubLevel::B),
                reason: ReasonCode::GeneLevel,
                human_reason: format!(
                    "Loss of {} activates the druggable {} pathway ({})",
                    tsg.gene,
                    tsg.pathway,
                    tsg.drugs.first().copied().unwrap_or("")
                ),
            });
        }
    }

    if !predictive_levels.is_empty()
        || ctx.drug_summaries.iter().any(|d| d.net_signal == NetSignal::Sensitive)
    {
        return Some(Outcome {
            tier: Tier::II,
            sublevel: Some(SubLevel::D),
            reason: ReasonCode::GeneLevel,
            human_reason: "Preclinical or case-level therapeutic evidence only".to_string(),
        });
    }

    None
}

/// 11. Variant of unknown significance in a known cancer gene.
fn rule_vus(ctx: &RuleCtx) -> Option<Outcome> {
    if ctx.evidence.is_cancer_gene() {
        return Some(Outcome {
            tier: Tier::III,
            sublevel: Some(SubLevel::B),
            reason: ReasonCode::VusInCancerGene,
            human_reason: "Variant of unknown significance in a known cancer gene".to_string(),
        });
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use oncotier_evidence::models::{
        CgiBiomarker, CgiFragment, CivicEvidenceItem, CivicFragment, Evidence, FdaApproval,
        FdaFragment, MyVariantFragment, OncoKbFragment, SourceSlot,
    };
    use oncotier_variant::Normalizer;

    fn evidence(gene: &str, variant: &str, tumor: &str) -> Evidence {
        let v = Normalizer::new().normalize(gene, variant).unwrap();
        Evidence::empty(v, Some(tumor.to_string()))
    }

    fn config() -> TierConfig {
        TierConfig::new()
    }

    fn approval(drug: &str, indication: &str, mentions: bool) -> FdaApproval {
        FdaApproval {
            drug_name: drug.to_string(),
            brand_name: Some(drug.to_string()),
            generic_name: None,
            indication: Some(indication.to_string()),
            approval_date: None,
            marketing_status: Some("Prescription".to_string()),
            mentions_variant: mentions,
        }
    }

    #[test]
    fn test_determinism() {
        let mut ev = evidence("BRAF", "V600E", "Melanoma");
        ev.fda = SourceSlot::present(FdaFragment {
            approvals: vec![approval(
                "ZELBORAF",
                "unresectable or metastatic melanoma with BRAF V600E mutation",
                true,
            )],
        });
        let cfg = config();
        let a = get_tier_hint(&ev, Some("Melanoma"), &cfg);
        let b = get_tier_hint(&ev, Some("Melanoma"), &cfg);
        assert_eq!(a.tier, b.tier);
        assert_eq!(a.sublevel, b.sublevel);
        assert_eq!(a.reason, b.reason);
        assert_eq!(a.confidence, b.confidence);
    }

    #[test]
    fn test_benign_always_tier_iv() {
        let mut ev = evidence("BRAF", "V600E", "Melanoma");
        ev.myvariant = SourceSlot::present(MyVariantFragment {
            clinvar_significance: Some("Likely benign".to_string()),
            ..Default::default()
        });
        // Even with a perfect FDA label, benign wins.
        ev.fda = SourceSlot::present(FdaFragment {
            approvals: vec![approval(
                "ZELBORAF",
                "metastatic melanoma with BRAF V600E mutation",
                true,
            )],
        });
        let result = get_tier_hint(&ev, Some("Melanoma"), &config());
        assert_eq!(result.tier, Tier::IV);
        assert_eq!(result.reason, ReasonCode::Benign);
    }

    #[test]
    fn test_pathogenic_clinvar_not_benign() {
        let mut ev = evidence("BRAF", "V600E", "Melanoma");
        ev.myvariant = SourceSlot::present(MyVariantFragment {
            clinvar_significance: Some("Pathogenic".to_string()),
            ..Default::default()
        });
        let result = get_tier_hint(&ev, Some("Melanoma"), &config());
        assert_ne!(result.reason, ReasonCode::Benign);
    }

    #[test]
    fn test_subtype_defining() {
        let ev = evidence("POLE", "P286R", "Endometrial Carcinoma");
        let result = get_tier_hint(&ev, Some("Endometrial Carcinoma"), &config());
        assert_eq!(result.tier, Tier::I);
        assert_eq!(result.sublevel, Some(SubLevel::B));
        assert_eq!(result.reason, ReasonCode::Subtype);
    }

    #[test]
    fn test_empty_dossier_unknown_gene() {
        let ev = evidence("GAPDH", "A100T", "Melanoma");
        let result = get_tier_hint(&ev, Some("Melanoma"), &config());
        assert_eq!(result.tier, Tier::III);
        assert_eq!(result.sublevel, Some(SubLevel::D));
        assert_eq!(result.reason, ReasonCode::NoEvidence);
    }

    #[test]
    fn test_empty_dossier_cancer_gene() {
        let mut ev = evidence("BRAF", "A712T", "Melanoma");
        ev.oncokb = SourceSlot::present(OncoKbFragment { is_cancer_gene: true });
        let result = get_tier_hint(&ev, Some("Melanoma"), &config());
        assert_eq!(result.tier, Tier::III);
        assert_eq!(result.sublevel, Some(SubLevel::B));
        assert_eq!(result.reason, ReasonCode::VusInCancerGene);
    }

    #[test]
    fn test_investigational_only_overrides_trials() {
        let mut ev = evidence("KRAS", "G12D", "Pancreatic Cancer");
        ev.trials = SourceSlot::present(oncotier_evidence::models::TrialsFragment {
            trials: vec![oncotier_evidence::models::Trial {
                nct_id: "NCT04956640".into(),
                title: "KRAS G12D inhibitor".into(),
                phase: Some("PHASE1".into()),
                status: "RECRUITING".into(),
                variant_mentioned: true,
                drugs: vec!["MRTX1133".into()],
                sponsor: None,
                conditions: vec!["Pancreatic Cancer".into()],
            }],
        });
        let result = get_tier_hint(&ev, Some("Pancreatic Cancer"), &config());
        assert_eq!(result.tier, Tier::III);
        assert_eq!(result.reason, ReasonCode::InvestigationalOnly);
        assert_eq!(result.sublevel, None);
    }

    #[test]
    fn test_variant_trial_without_investigational_pair() {
        let mut ev = evidence("KRAS", "G12D", "NSCLC");
        ev.trials = SourceSlot::present(oncotier_evidence::models::TrialsFragment {
            trials: vec![oncotier_evidence::models::Trial {
                nct_id: "NCT04956640".into(),
                title: "KRAS G12D inhibitor".into(),
                phase: Some("PHASE1".into()),
                status: "RECRUITING".into(),
                variant_mentioned: true,
                drugs: vec!["MRTX1133".into()],
                sponsor: None,
                conditions: vec!["Non-Small Cell Lung Cancer".into()],
            }],
        });
        let result = get_tier_hint(&ev, Some("NSCLC"), &config());
        assert_eq!(result.tier, Tier::II);
        assert_eq!(result.sublevel, Some(SubLevel::D));
        assert_eq!(result.reason, ReasonCode::TrialVariantSpecific);
    }

    #[test]
    fn test_cgi_nccn_gives_tier_i_b() {
        let mut ev = evidence("BRAF", "V600E", "Melanoma");
        ev.cgi = SourceSlot::present(CgiFragment {
            biomarkers: vec![CgiBiomarker {
                drugs: vec!["Dabrafenib".into()],
                response: Response::Sensitive,
                evidence_status: CgiStatus::Nccn,
                tumor: "Cutaneous melanoma".into(),
                variant_pattern: "V600E".into(),
            }],
        });
        let result = get_tier_hint(&ev, Some("Melanoma"), &config());
        assert_eq!(result.tier, Tier::I);
        assert_eq!(result.sublevel, Some(SubLevel::B));
    }

    #[test]
    fn test_investigational_wildcard_with_quiet_dossier() {
        // TP53 carries a wildcard-tumor entry; with nothing else in the
        // dossier it stays investigational-only, even for a known
        // cancer gene.
        let mut ev = evidence("TP53", "R175H", "Breast Cancer");
        ev.oncokb = SourceSlot::present(OncoKbFragment { is_cancer_gene: true });
        let result = get_tier_hint(&ev, Some("Breast Cancer"), &config());
        assert_eq!(result.tier, Tier::III);
        assert_eq!(result.sublevel, None);
        assert_eq!(result.reason, ReasonCode::InvestigationalOnly);
    }

    #[test]
    fn test_investigational_yields_to_prognostic_evidence() {
        let mut ev = evidence("TP53", "R175H", "Breast Cancer");
        ev.civic = SourceSlot::present(CivicFragment {
            evidence_items: vec![CivicEvidenceItem {
                evidence_type: Some("PROGNOSTIC".into()),
                evidence_level: Some(EvidenceLevel::B),
                significance: Some("POOR_OUTCOME".into()),
                disease: Some("Breast Cancer".into()),
                drugs: vec![],
                description: None,
            }],
            assertions: vec![],
        });
        let result = get_tier_hint(&ev, Some("Breast Cancer"), &config());
        assert_eq!(result.tier, Tier::II);
        assert_eq!(result.reason, ReasonCode::PrognosticStrong);
    }

    #[test]
    fn test_investigational_vhl_quiet_vs_pathway_evidence() {
        // Quiet dossier: the (VHL, renal) pair wins.
        let quiet = evidence("VHL", "R167Q", "Renal Cell Carcinoma");
        let result = get_tier_hint(&quiet, Some("Renal Cell Carcinoma"), &config());
        assert_eq!(result.reason, ReasonCode::InvestigationalOnly);

        // Sensitivity evidence behind the actionable HIF pathway lets
        // the gene-level branch decide instead.
        let mut ev = evidence("VHL", "R167Q", "Renal Cell Carcinoma");
        ev.vicc = SourceSlot::present(oncotier_evidence::models::ViccFragment {
            associations: vec![oncotier_evidence::models::ViccAssociation {
                drugs: vec!["Belzutifan".into()],
                response: Response::Sensitive,
                evidence_level: Some(EvidenceLevel::C),
                oncokb_level: None,
                source: "civic".into(),
                disease: Some("Renal Cell Carcinoma".into()),
                description: String::new(),
            }],
        });
        let result = get_tier_hint(&ev, Some("Renal Cell Carcinoma"), &config());
        assert_eq!(result.tier, Tier::II);
        assert_eq!(result.reason, ReasonCode::GeneLevel);
    }

    #[test]
    fn test_prognostic_only_strong() {
        let mut ev = evidence("TP53", "R273H", "Ovarian Cancer");
        ev.civic = SourceSlot::present(CivicFragment {
            evidence_items: vec![CivicEvidenceItem {
                evidence_type: Some("PROGNOSTIC".into()),
                evidence_level: Some(EvidenceLevel::B),
                significance: Some("POOR_OUTCOME".into()),
                disease: Some("Ovarian Cancer".into()),
                drugs: vec![],
                description: None,
            }],
            assertions: vec![],
        });
        let result = get_tier_hint(&ev, Some("Ovarian Cancer"), &config());
        assert_eq!(result.tier, Tier::II);
        assert_eq!(result.sublevel, Some(SubLevel::C));
        assert_eq!(result.reason, ReasonCode::PrognosticStrong);
    }

    #[test]
    fn test_prognostic_only_weak() {
        let mut ev = evidence("TP53", "R273H", "Ovarian Cancer");
        ev.civic = SourceSlot::present(CivicFragment {
            evidence_items: vec![CivicEvidenceItem {
                evidence_type: Some("PROGNOSTIC".into()),
                evidence_level: Some(EvidenceLevel::C),
                significance: Some("POOR_OUTCOME".into()),
                disease: Some("Ovarian Cancer".into()),
                drugs: vec![],
                description: None,
            }],
            assertions: vec![],
        });
        let result = get_tier_hint(&ev, Some("Ovarian Cancer"), &config());
        assert_eq!(result.tier, Tier::III);
        assert_eq!(result.sublevel, Some(SubLevel::C));
        assert_eq!(result.reason, ReasonCode::PrognosticWeak);
    }

    #[test]
    fn test_offlabel_different_tumor() {
        let mut ev = evidence("BRAF", "V600E", "Cholangiocarcinoma");
        ev.fda = SourceSlot::present(FdaFragment {
            approvals: vec![approval(
                "ZELBORAF",
                "unresectable or metastatic melanoma with braf v600e mutation",
                true,
            )],
        });
        let result = get_tier_hint(&ev, Some("Cholangiocarcinoma"), &config());
        assert_eq!(result.tier, Tier::II);
        assert_eq!(result.sublevel, Some(SubLevel::A));
        assert_eq!(result.reason, ReasonCode::Offlabel);
    }

    #[test]
    fn test_pathway_actionable_tsg() {
        let ev = evidence("PTEN", "R130Q", "Endometrial Cancer");
        let result = get_tier_hint(&ev, Some("Endometrial Cancer"), &config());
        assert_eq!(result.tier, Tier::II);
        assert_eq!(result.sublevel, Some(SubLevel::B));
        assert_eq!(result.reason, ReasonCode::GeneLevel);
    }
}
