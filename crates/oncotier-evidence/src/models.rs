//! Typed evidence fragments, one per upstream source, and the dossier
//! that aggregates them.
//!
//! Parsers convert upstream JSON at the boundary; everything past this
//! module is strictly typed. A source that could not be reached is
//! `Absent { degraded: true }`, which the engine treats differently from
//! a source that answered with nothing.

use oncotier_variant::NormalizedVariant;
use serde::{Deserialize, Serialize};

// ── Source slot ──────────────────────────────────────────────────────────────

/// Outcome of one source fetch. `Absent { degraded: false }` means the
/// source was skipped by configuration; `degraded: true` means it failed
/// or timed out. Both are distinct from `Present` with empty contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceSlot<T> {
    Present(T),
    Absent { degraded: bool },
}

impl<T> SourceSlot<T> {
    pub fn present(value: T) -> Self {
        SourceSlot::Present(value)
    }

    pub fn degraded() -> Self {
        SourceSlot::Absent { degraded: true }
    }

    pub fn skipped() -> Self {
        SourceSlot::Absent { degraded: false }
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            SourceSlot::Present(v) => Some(v),
            SourceSlot::Absent { .. } => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SourceSlot::Absent { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SourceSlot::Absent { degraded: true })
    }

    pub fn map_present<F: FnOnce(T) -> T>(self, f: F) -> Self {
        match self {
            SourceSlot::Present(v) => SourceSlot::Present(f(v)),
            absent => absent,
        }
    }
}

// ── Shared enums ─────────────────────────────────────────────────────────────

/// Source-independent evidence grade: A (validated/FDA) > B (clinical)
/// > C (case series) > D (preclinical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EvidenceLevel {
    A,
    B,
    C,
    D,
}

impl EvidenceLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Some(EvidenceLevel::A),
            "B" => Some(EvidenceLevel::B),
            "C" => Some(EvidenceLevel::C),
            "D" => Some(EvidenceLevel::D),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceLevel::A => "A",
            EvidenceLevel::B => "B",
            EvidenceLevel::C => "C",
            EvidenceLevel::D => "D",
        }
    }

    pub fn is_high_quality(&self) -> bool {
        matches!(self, EvidenceLevel::A | EvidenceLevel::B)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Sensitive,
    Resistant,
}

// ── MyVariant ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MyVariantFragment {
    pub cosmic_id: Option<String>,
    pub dbsnp_id: Option<String>,
    pub clinvar_id: Option<String>,
    pub ncbi_gene_id: Option<String>,
    pub hgvs_genomic: Option<String>,
    pub hgvs_protein: Option<String>,
    pub polyphen2_prediction: Option<String>,
    pub cadd_score: Option<f64>,
    pub gnomad_exome_af: Option<f64>,
    pub alphamissense_score: Option<f64>,
    pub alphamissense_prediction: Option<String>,
    pub clinvar_significance: Option<String>,
    /// CIViC evidence items embedded in the MyVariant hit, when present.
    pub civic_evidence: Vec<CivicEvidenceItem>,
}

// ── FDA ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FdaApproval {
    pub drug_name: String,
    pub brand_name: Option<String>,
    pub generic_name: Option<String>,
    pub indication: Option<String>,
    pub approval_date: Option<String>,
    pub marketing_status: Option<String>,
    /// The label names this variant outside a negation context.
    pub mentions_variant: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FdaFragment {
    pub approvals: Vec<FdaApproval>,
}

impl FdaFragment {
    pub fn mentions_variant_in_label(&self) -> bool {
        self.approvals.iter().any(|a| a.mentions_variant)
    }
}

// ── CGI ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CgiStatus {
    Fda,
    Nccn,
    Clinical,
    Preclinical,
}

impl CgiStatus {
    pub fn parse(s: &str) -> Self {
        let lower = s.to_lowercase();
        if lower.contains("fda") {
            CgiStatus::Fda
        } else if lower.contains("nccn") || lower.contains("guideline") {
            CgiStatus::Nccn
        } else if lower.contains("clinical")
            || lower.contains("trial")
            || lower.contains("case report")
        {
            CgiStatus::Clinical
        } else {
            CgiStatus::Preclinical
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CgiBiomarker {
    pub drugs: Vec<String>,
    pub response: Response,
    pub evidence_status: CgiStatus,
    pub tumor: String,
    pub variant_pattern: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CgiFragment {
    pub biomarkers: Vec<CgiBiomarker>,
}

// ── VICC ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViccAssociation {
    pub drugs: Vec<String>,
    pub response: Response,
    pub evidence_level: Option<EvidenceLevel>,
    pub oncokb_level: Option<String>,
    pub source: String,
    pub disease: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViccFragment {
    pub associations: Vec<ViccAssociation>,
}

// ── CIViC ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivicEvidenceItem {
    /// PREDICTIVE, PROGNOSTIC, DIAGNOSTIC, ONCOGENIC
    pub evidence_type: Option<String>,
    pub evidence_level: Option<EvidenceLevel>,
    pub significance: Option<String>,
    pub disease: Option<String>,
    pub drugs: Vec<String>,
    pub description: Option<String>,
}

impl CivicEvidenceItem {
    pub fn is_predictive(&self) -> bool {
        self.evidence_type.as_deref().map(|t| t.eq_ignore_ascii_case("PREDICTIVE")).unwrap_or(false)
    }

    pub fn is_prognostic(&self) -> bool {
        self.evidence_type.as_deref().map(|t| t.eq_ignore_ascii_case("PROGNOSTIC")).unwrap_or(false)
    }

    pub fn is_sensitivity(&self) -> bool {
        let sig = self.significance.as_deref().unwrap_or("").to_uppercase();
        sig.contains("SENSITIVITY") || sig.contains("RESPONSE")
    }

    pub fn is_resistance(&self) -> bool {
        self.significance
            .as_deref()
            .unwrap_or("")
            .to_uppercase()
            .contains("RESISTANCE")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivicAssertion {
    pub molecular_profile: String,
    /// I, II, III, IV
    pub amp_tier: Option<String>,
    pub amp_level: Option<EvidenceLevel>,
    pub assertion_type: Option<String>,
    pub significance: Option<String>,
    pub therapies: Vec<String>,
    pub disease: Option<String>,
    pub fda_companion_test: bool,
    pub nccn_guideline: Option<String>,
}

impl CivicAssertion {
    pub fn is_predictive(&self) -> bool {
        self.assertion_type.as_deref().map(|t| t.eq_ignore_ascii_case("PREDICTIVE")).unwrap_or(false)
    }

    pub fn is_tier_i(&self) -> bool {
        self.amp_tier
            .as_deref()
            .map(|t| {
                let t = t.to_uppercase();
                t == "I" || t == "TIER I" || t == "TIER_I"
            })
            .unwrap_or(false)
    }

    pub fn is_sensitivity(&self) -> bool {
        let sig = self.significance.as_deref().unwrap_or("").to_uppercase();
        sig.contains("SENSITIVITY") || sig.contains("RESPONSE")
    }

    pub fn is_resistance(&self) -> bool {
        self.significance
            .as_deref()
            .unwrap_or("")
            .to_uppercase()
            .contains("RESISTANCE")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CivicFragment {
    pub evidence_items: Vec<CivicEvidenceItem>,
    pub assertions: Vec<CivicAssertion>,
}

// ── Literature ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteratureSignal {
    Sensitivity,
    Resistance,
    Prognostic,
    Mixed,
    Irrelevant,
}

impl LiteratureSignal {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "sensitivity" => LiteratureSignal::Sensitivity,
            "resistance" => LiteratureSignal::Resistance,
            "prognostic" => LiteratureSignal::Prognostic,
            "mixed" => LiteratureSignal::Mixed,
            _ => LiteratureSignal::Irrelevant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub paper_id: String,
    pub pmid: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub citations: u32,
    pub tldr: Option<String>,
    pub abstract_text: Option<String>,
    pub url: Option<String>,
    /// LLM relevance score in [0, 1]; None before scoring.
    pub score: Option<f64>,
    pub signal: Option<LiteratureSignal>,
    pub drugs: Vec<String>,
}

/// Drug relationship extracted from the literature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureDrugCall {
    pub drug: String,
    /// in vitro | preclinical | clinical | FDA-labeled
    pub evidence: String,
    /// True when the call affects drug selection rather than prognosis.
    #[serde(default = "default_true")]
    pub predictive: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureKnowledge {
    /// primary (driver) | secondary (acquired resistance) | unknown
    pub mutation_type: String,
    pub resistant_to: Vec<LiteratureDrugCall>,
    pub sensitive_to: Vec<LiteratureDrugCall>,
    /// FDA-approved | Phase 3 | Phase 2 | Preclinical | Case reports | None
    pub evidence_level_tag: String,
    pub rationale: String,
    pub references: Vec<String>,
    pub confidence: f64,
}

impl LiteratureKnowledge {
    pub fn predictive_resistance_drugs(&self) -> Vec<&str> {
        self.resistant_to
            .iter()
            .filter(|r| r.predictive)
            .map(|r| r.drug.as_str())
            .collect()
    }

    pub fn sensitivity_drugs(&self) -> Vec<&str> {
        self.sensitive_to.iter().map(|s| s.drug.as_str()).collect()
    }

    pub fn is_strong(&self) -> bool {
        matches!(self.evidence_level_tag.as_str(), "FDA-approved" | "Phase 3")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiteratureFragment {
    pub papers: Vec<Paper>,
    pub knowledge: Option<LiteratureKnowledge>,
}

// ── Clinical trials ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub nct_id: String,
    pub title: String,
    pub phase: Option<String>,
    pub status: String,
    pub variant_mentioned: bool,
    pub drugs: Vec<String>,
    pub sponsor: Option<String>,
    pub conditions: Vec<String>,
}

impl Trial {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status.as_str(),
            "RECRUITING" | "ENROLLING_BY_INVITATION" | "ACTIVE_NOT_RECRUITING" | "NOT_YET_RECRUITING"
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialsFragment {
    pub trials: Vec<Trial>,
}

// ── OncoKB ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OncoKbFragment {
    pub is_cancer_gene: bool,
}

// ── The dossier ──────────────────────────────────────────────────────────────

pub const SOURCE_NAMES: &[&str] = &[
    "myvariant",
    "fda",
    "cgi",
    "vicc",
    "civic",
    "literature",
    "clinicaltrials",
    "oncokb",
];

/// Aggregated evidence for one assessment. Exclusively owned by its
/// assessment; fragments are never shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub variant: NormalizedVariant,
    pub tumor_type: Option<String>,
    pub myvariant: SourceSlot<MyVariantFragment>,
    pub fda: SourceSlot<FdaFragment>,
    pub cgi: SourceSlot<CgiFragment>,
    pub vicc: SourceSlot<ViccFragment>,
    pub civic: SourceSlot<CivicFragment>,
    pub literature: SourceSlot<LiteratureFragment>,
    pub trials: SourceSlot<TrialsFragment>,
    pub oncokb: SourceSlot<OncoKbFragment>,
}

impl Evidence {
    /// Dossier with every source absent (not degraded); the engine must
    /// still produce a tier from this.
    pub fn empty(variant: NormalizedVariant, tumor_type: Option<String>) -> Self {
        Self {
            variant,
            tumor_type,
            myvariant: SourceSlot::skipped(),
            fda: SourceSlot::skipped(),
            cgi: SourceSlot::skipped(),
            vicc: SourceSlot::skipped(),
            civic: SourceSlot::skipped(),
            literature: SourceSlot::skipped(),
            trials: SourceSlot::skipped(),
            oncokb: SourceSlot::skipped(),
        }
    }

    /// Number of sources that are absent or degraded; drives the
    /// confidence penalty.
    pub fn missing_source_count(&self) -> usize {
        [
            self.myvariant.is_absent(),
            self.fda.is_absent(),
            self.cgi.is_absent(),
            self.vicc.is_absent(),
            self.civic.is_absent(),
            self.literature.is_absent(),
            self.trials.is_absent(),
            self.oncokb.is_absent(),
        ]
        .into_iter()
        .filter(|b| *b)
        .count()
    }

    /// Names of sources that answered, for the serialized assessment.
    pub fn present_sources(&self) -> Vec<&'static str> {
        let flags = [
            !self.myvariant.is_absent(),
            !self.fda.is_absent(),
            !self.cgi.is_absent(),
            !self.vicc.is_absent(),
            !self.civic.is_absent(),
            !self.literature.is_absent(),
            !self.trials.is_absent(),
            !self.oncokb.is_absent(),
        ];
        SOURCE_NAMES
            .iter()
            .zip(flags)
            .filter_map(|(name, present)| present.then_some(*name))
            .collect()
    }

    pub fn clinvar_significance(&self) -> Option<&str> {
        self.myvariant
            .as_present()
            .and_then(|m| m.clinvar_significance.as_deref())
    }

    /// CIViC evidence items from both the dedicated client and the
    /// MyVariant embedding, deduplicated by (type, level, disease, drugs).
    pub fn civic_items(&self) -> Vec<&CivicEvidenceItem> {
        let mut seen = std::collections::HashSet::new();
        let mut items = Vec::new();
        let dedup_key = |item: &CivicEvidenceItem| {
            (
                item.evidence_type.clone(),
                item.evidence_level,
                item.disease.clone(),
                item.drugs.join("|").to_lowercase(),
            )
        };
        if let Some(frag) = self.civic.as_present() {
            for item in &frag.evidence_items {
                if seen.insert(dedup_key(item)) {
                    items.push(item);
                }
            }
        }
        if let Some(frag) = self.myvariant.as_present() {
            for item in &frag.civic_evidence {
                if seen.insert(dedup_key(item)) {
                    items.push(item);
                }
            }
        }
        items
    }

    pub fn civic_assertions(&self) -> &[CivicAssertion] {
        self.civic
            .as_present()
            .map(|c| c.assertions.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_cancer_gene(&self) -> bool {
        self.oncokb
            .as_present()
            .map(|o| o.is_cancer_gene)
            .unwrap_or(false)
    }

    pub fn literature_knowledge(&self) -> Option<&LiteratureKnowledge> {
        self.literature.as_present().and_then(|l| l.knowledge.as_ref())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use oncotier_variant::Normalizer;

    fn variant() -> NormalizedVariant {
        Normalizer::new().normalize("BRAF", "V600E").unwrap()
    }

    #[test]
    fn test_absent_vs_empty_distinction() {
        let mut ev = Evidence::empty(variant(), Some("Melanoma".into()));
        assert_eq!(ev.missing_source_count(), 8);

        ev.fda = SourceSlot::present(FdaFragment::default());
        assert_eq!(ev.missing_source_count(), 7);
        // Present-but-empty is not absent.
        assert!(ev.fda.as_present().unwrap().approvals.is_empty());
        assert!(!ev.fda.is_absent());
    }

    #[test]
    fn test_degraded_flag() {
        let slot: SourceSlot<FdaFragment> = SourceSlot::degraded();
        assert!(slot.is_absent());
        assert!(slot.is_degraded());
        let slot: SourceSlot<FdaFragment> = SourceSlot::skipped();
        assert!(slot.is_absent());
        assert!(!slot.is_degraded());
    }

    #[test]
    fn test_evidence_level_order() {
        assert!(EvidenceLevel::A < EvidenceLevel::B);
        assert!(EvidenceLevel::B < EvidenceLevel::D);
        assert!(EvidenceLevel::A.is_high_quality());
        assert!(!EvidenceLevel::C.is_high_quality());
        assert_eq!(EvidenceLevel::parse("b"), Some(EvidenceLevel::B));
        assert_eq!(EvidenceLevel::parse("Level A"), None);
    }

    #[test]
    fn test_civic_items_merged_and_deduped() {
        let item = CivicEvidenceItem {
            evidence_type: Some("PREDICTIVE".into()),
            evidence_level: Some(EvidenceLevel::A),
            significance: Some("SENSITIVITYRESPONSE".into()),
            disease: Some("Melanoma".into()),
            drugs: vec!["Vemurafenib".into()],
            description: None,
        };
        let mut ev = Evidence::empty(variant(), Some("Melanoma".into()));
        ev.civic = SourceSlot::present(CivicFragment {
            evidence_items: vec![item.clone()],
            assertions: vec![],
        });
        ev.myvariant = SourceSlot::present(MyVariantFragment {
            civic_evidence: vec![item],
            ..Default::default()
        });
        assert_eq!(ev.civic_items().len(), 1);
    }

    #[test]
    fn test_cgi_status_parse() {
        assert_eq!(CgiStatus::parse("FDA guidelines"), CgiStatus::Fda);
        assert_eq!(CgiStatus::parse("NCCN guidelines"), CgiStatus::Nccn);
        assert_eq!(CgiStatus::parse("Early trials"), CgiStatus::Clinical);
        assert_eq!(CgiStatus::parse("Pre-clinical"), CgiStatus::Preclinical);
    }

    #[test]
    fn test_mentions_variant_in_label() {
        let frag = FdaFragment {
            approvals: vec![FdaApproval {
                drug_name: "TAGRISSO".into(),
                brand_name: Some("TAGRISSO".into()),
                generic_name: Some("osimertinib".into()),
                indication: Some("EGFR T790M mutation-positive NSCLC".into()),
                approval_date: None,
                marketing_status: Some("Prescription".into()),
                mentions_variant: true,
            }],
        };
        assert!(frag.mentions_variant_in_label());
    }
}
