//! End-to-end cascade scenarios over synthetic dossiers.

use oncotier_engine::tier::{get_tier_hint, ReasonCode, SubLevel, Tier, TierConfig};
use oncotier_evidence::models::{
    CgiBiomarker, CgiFragment, CivicEvidenceItem, CivicFragment, Evidence, EvidenceLevel,
    FdaApproval, FdaFragment, LiteratureDrugCall, LiteratureFragment, LiteratureKnowledge,
    Response, SourceSlot, Trial, TrialsFragment,
};
use oncotier_variant::Normalizer;

fn evidence(gene: &str, variant: &str, tumor: &str) -> Evidence {
    let v = Normalizer::new().normalize(gene, variant).unwrap();
    Evidence::empty(v, Some(tumor.to_string()))
}

fn approval(drug: &str, indication: &str, mentions_variant: bool) -> FdaApproval {
    FdaApproval {
        drug_name: drug.to_string(),
        brand_name: Some(drug.to_string()),
        generic_name: None,
        indication: Some(indication.to_string()),
        approval_date: None,
        marketing_status: Some("Prescription".to_string()),
        mentions_variant,
    }
}

fn knowledge_resistant_to(drug: &str, confidence: f64) -> LiteratureKnowledge {
    LiteratureKnowledge {
        mutation_type: "secondary".to_string(),
        resistant_to: vec![LiteratureDrugCall {
            drug: drug.to_string(),
            evidence: "clinical".to_string(),
            predictive: true,
        }],
        sensitive_to: vec![],
        evidence_level_tag: "Phase 2".to_string(),
        rationale: "acquired resistance mutation".to_string(),
        references: vec!["26051236".to_string()],
        confidence,
    }
}

/// Scenario: BRAF V600E in melanoma with a label naming the variant.
#[test]
fn braf_v600e_melanoma_is_tier_i_a() {
    let mut ev = evidence("BRAF", "V600E", "Melanoma");
    ev.fda = SourceSlot::present(FdaFragment {
        approvals: vec![
            approval(
                "ZELBORAF",
                "indicated for unresectable or metastatic melanoma with BRAF V600E mutation",
                true,
            ),
            approval(
                "TAFINLAR",
                "melanoma with BRAF V600E or V600K mutations",
                true,
            ),
        ],
    });

    let result = get_tier_hint(&ev, Some("Melanoma"), &TierConfig::new());
    assert_eq!(result.tier, Tier::I);
    assert_eq!(result.sublevel, Some(SubLevel::A));
    assert_eq!(result.reason, ReasonCode::FdaVariantInTumor);
}

/// Scenario: BRAF G469A must not ride V600-only labels; it lands on the
/// gene-level branch instead.
#[test]
fn braf_g469a_melanoma_never_tier_i() {
    let mut ev = evidence("BRAF", "G469A", "Melanoma");
    ev.fda = SourceSlot::present(FdaFragment {
        approvals: vec![approval(
            "ZELBORAF",
            "indicated for unresectable or metastatic melanoma with BRAF V600E mutation",
            false,
        )],
    });
    ev.civic = SourceSlot::present(CivicFragment {
        evidence_items: vec![CivicEvidenceItem {
            evidence_type: Some("PREDICTIVE".to_string()),
            evidence_level: Some(EvidenceLevel::B),
            significance: Some("SENSITIVITYRESPONSE".to_string()),
            disease: Some("Melanoma".to_string()),
            drugs: vec!["Trametinib".to_string()],
            description: None,
        }],
        assertions: vec![],
    });

    let result = get_tier_hint(&ev, Some("Melanoma"), &TierConfig::new());
    assert_ne!(result.tier, Tier::I);
    assert_eq!(result.tier, Tier::II);
    assert_eq!(result.sublevel, Some(SubLevel::B));
    assert_eq!(result.reason, ReasonCode::GeneLevel);
}

/// Same dossier with only preclinical CIViC evidence drops to II-D.
#[test]
fn braf_g469a_weak_evidence_is_ii_d() {
    let mut ev = evidence("BRAF", "G469A", "Melanoma");
    ev.civic = SourceSlot::present(CivicFragment {
        evidence_items: vec![CivicEvidenceItem {
            evidence_type: Some("PREDICTIVE".to_string()),
            evidence_level: Some(EvidenceLevel::D),
            significance: Some("SENSITIVITYRESPONSE".to_string()),
            disease: Some("Melanoma".to_string()),
            drugs: vec!["Trametinib".to_string()],
            description: None,
        }],
        assertions: vec![],
    });

    let result = get_tier_hint(&ev, Some("Melanoma"), &TierConfig::new());
    assert_eq!(result.tier, Tier::II);
    assert_eq!(result.sublevel, Some(SubLevel::D));
}

/// Scenario: EGFR T790M in NSCLC — resistance to first-generation TKIs
/// with osimertinib as the approved alternative.
#[test]
fn egfr_t790m_nsclc_resistance_with_alternative() {
    let mut ev = evidence("EGFR", "T790M", "NSCLC");
    ev.fda = SourceSlot::present(FdaFragment {
        approvals: vec![approval(
            "TAGRISSO",
            "metastatic EGFR T790M mutation-positive non-small cell lung cancer",
            true,
        )],
    });
    ev.cgi = SourceSlot::present(CgiFragment {
        biomarkers: vec![CgiBiomarker {
            drugs: vec!["Erlotinib".to_string(), "Gefitinib".to_string()],
            response: Response::Resistant,
            evidence_status: oncotier_evidence::models::CgiStatus::Fda,
            tumor: "Non-small cell lung".to_string(),
            variant_pattern: "T790M".to_string(),
        }],
    });

    let result = get_tier_hint(&ev, Some("NSCLC"), &TierConfig::new());
    assert_eq!(result.tier, Tier::I);
    assert_eq!(result.sublevel, Some(SubLevel::A));
    assert_eq!(result.reason, ReasonCode::ResistanceWithAlt);
    assert!(result.human_reason.contains("TAGRISSO"));
}

/// Scenario: EGFR C797S — literature-documented osimertinib resistance
/// with no approved alternative.
#[test]
fn egfr_c797s_nsclc_resistance_without_alternative() {
    let mut ev = evidence("EGFR", "C797S", "NSCLC");
    ev.literature = SourceSlot::present(LiteratureFragment {
        papers: vec![],
        knowledge: Some(knowledge_resistant_to("osimertinib", 0.85)),
    });

    let result = get_tier_hint(&ev, Some("NSCLC"), &TierConfig::new());
    assert_eq!(result.tier, Tier::II);
    assert_eq!(result.sublevel, Some(SubLevel::D));
    assert_eq!(result.reason, ReasonCode::ResistanceNoAlt);
}

/// Low-confidence literature resistance is not acted on.
#[test]
fn low_confidence_literature_resistance_ignored() {
    let mut ev = evidence("EGFR", "C797S", "NSCLC");
    ev.literature = SourceSlot::present(LiteratureFragment {
        papers: vec![],
        knowledge: Some(knowledge_resistant_to("osimertinib", 0.4)),
    });

    let result = get_tier_hint(&ev, Some("NSCLC"), &TierConfig::new());
    assert_ne!(result.reason, ReasonCode::ResistanceNoAlt);
}

/// Scenario: KRAS G12D in pancreatic cancer is investigational-only,
/// even with a variant-specific recruiting trial.
#[test]
fn kras_g12d_pancreatic_investigational_only_beats_trials() {
    let mut ev = evidence("KRAS", "G12D", "Pancreatic Cancer");
    ev.trials = SourceSlot::present(TrialsFragment {
        trials: vec![Trial {
            nct_id: "NCT05737706".to_string(),
            title: "MRTX1133 in KRAS G12D mutant tumors".to_string(),
            phase: Some("PHASE1".to_string()),
            status: "RECRUITING".to_string(),
            variant_mentioned: true,
            drugs: vec!["MRTX1133".to_string()],
            sponsor: None,
            conditions: vec!["Pancreatic Cancer".to_string()],
        }],
    });

    let result = get_tier_hint(&ev, Some("Pancreatic Cancer"), &TierConfig::new());
    assert_eq!(result.tier, Tier::III);
    assert_eq!(result.sublevel, None);
    assert_eq!(result.reason, ReasonCode::InvestigationalOnly);
}

/// Scenario: TP53 R273H in ovarian cancer with only Level B prognostic
/// evidence.
#[test]
fn tp53_r273h_ovarian_prognostic_strong() {
    let mut ev = evidence("TP53", "R273H", "Ovarian Cancer");
    ev.civic = SourceSlot::present(CivicFragment {
        evidence_items: vec![CivicEvidenceItem {
            evidence_type: Some("PROGNOSTIC".to_string()),
            evidence_level: Some(EvidenceLevel::B),
            significance: Some("POOR_OUTCOME".to_string()),
            disease: Some("Ovarian Carcinoma".to_string()),
            drugs: vec![],
            description: None,
        }],
        assertions: vec![],
    });

    let result = get_tier_hint(&ev, Some("Ovarian Cancer"), &TierConfig::new());
    assert_eq!(result.tier, Tier::II);
    assert_eq!(result.sublevel, Some(SubLevel::C));
    assert_eq!(result.reason, ReasonCode::PrognosticStrong);
}

/// ClinVar benign dominates everything else.
#[test]
fn benign_dominates_all_branches() {
    let mut ev = evidence("BRAF", "V600E", "Melanoma");
    ev.myvariant = SourceSlot::present(oncotier_evidence::models::MyVariantFragment {
        clinvar_significance: Some("Benign".to_string()),
        ..Default::default()
    });
    ev.fda = SourceSlot::present(FdaFragment {
        approvals: vec![approval("ZELBORAF", "melanoma with braf v600e mutation", true)],
    });

    let result = get_tier_hint(&ev, Some("Melanoma"), &TierConfig::new());
    assert_eq!(result.tier, Tier::IV);
    assert_eq!(result.reason, ReasonCode::Benign);
}

/// Tier I requires qualifying evidence; sensitivity at Level C alone is
/// not enough.
#[test]
fn tier_i_requires_strong_source() {
    let mut ev = evidence("BRAF", "V600E", "Melanoma");
    ev.civic = SourceSlot::present(CivicFragment {
        evidence_items: vec![CivicEvidenceItem {
            evidence_type: Some("PREDICTIVE".to_string()),
            evidence_level: Some(EvidenceLevel::C),
            significance: Some("SENSITIVITYRESPONSE".to_string()),
            disease: Some("Melanoma".to_string()),
            drugs: vec!["Vemurafenib".to_string()],
            description: None,
        }],
        assertions: vec![],
    });
    let result = get_tier_hint(&ev, Some("Melanoma"), &TierConfig::new());
    assert_ne!(result.tier, Tier::I);
}

/// EGFR R108K sits on the exclusion list: a gene-level label match must
/// not produce Tier I.
#[test]
fn excluded_variant_cannot_claim_gene_label() {
    let mut ev = evidence("EGFR", "R108K", "NSCLC");
    ev.fda = SourceSlot::present(FdaFragment {
        approvals: vec![approval(
            "TARCEVA",
            "non-small cell lung cancer whose tumors have EGFR exon 19 deletions \
             or exon 21 (L858R) substitution mutations",
            false,
        )],
    });
    let result = get_tier_hint(&ev, Some("NSCLC"), &TierConfig::new());
    assert_ne!(result.tier, Tier::I);
}

/// Deadline boundary: every source absent still yields a decided tier
/// whose confidence sits at the interval floor.
#[test]
fn all_sources_absent_confidence_at_floor() {
    let v = Normalizer::new().normalize("GAPDH", "A100T").unwrap();
    let mut ev = Evidence::empty(v, Some("Melanoma".to_string()));
    ev.myvariant = SourceSlot::degraded();
    ev.fda = SourceSlot::degraded();
    ev.cgi = SourceSlot::degraded();
    ev.vicc = SourceSlot::degraded();
    ev.civic = SourceSlot::degraded();
    ev.literature = SourceSlot::degraded();
    ev.trials = SourceSlot::degraded();
    ev.oncokb = SourceSlot::degraded();

    let result = get_tier_hint(&ev, Some("Melanoma"), &TierConfig::new());
    assert_eq!(result.tier, Tier::III);
    assert_eq!(result.sublevel, Some(SubLevel::D));
    // III-D interval is 0.30–0.40; 8 missing sources floor it.
    assert!((result.confidence - 0.30).abs() < 1e-9);
}
