//! Compact evidence summaries for the narrator.
//!
//! The narrator gets a pre-digested view of the dossier, not raw
//! fragments: counters first, then the few tier-determining items.

use oncotier_evidence::models::{Evidence, Response};
use oncotier_evidence::stats::{self, NetSignal};
use oncotier_variant::gene_context;

/// Compact textual dossier summary.
pub fn compact_summary(evidence: &Evidence) -> String {
    let stats = stats::compute_stats(evidence);
    let drugs = stats::aggregate_by_drug(evidence);
    let mut lines = Vec::new();

    lines.push(format!(
        "Sensitivity entries: {}; resistance entries: {}; signal: {:?}",
        stats.sensitivity_count, stats.resistance_count, stats.dominant_signal
    ));

    for conflict in stats.conflicts.iter().take(3) {
        lines.push(format!(
            "Conflict: {} ({} sensitivity vs {} resistance entries)",
            conflict.drug, conflict.sensitivity_count, conflict.resistance_count
        ));
    }

    for drug in drugs.iter().take(8) {
        lines.push(format!(
            "Drug {}: {} sens / {} res -> {:?}{}",
            drug.drug,
            drug.sensitivity_count,
            drug.resistance_count,
            drug.net_signal,
            drug.best_level
                .map(|l| format!(" [best level {}]", l.as_str()))
                .unwrap_or_default(),
        ));
    }

    if let Some(fda) = evidence.fda.as_present() {
        for approval in fda.approvals.iter().take(5) {
            lines.push(format!(
                "FDA label: {}{}",
                approval.drug_name,
                if approval.mentions_variant { " (names this variant)" } else { "" }
            ));
        }
    }

    if let Some(cgi) = evidence.cgi.as_present() {
        for biomarker in cgi.biomarkers.iter().take(5) {
            lines.push(format!(
                "CGI: {} {} in {} ({:?})",
                biomarker.drugs.join("+"),
                match biomarker.response {
                    Response::Sensitive => "sensitive",
                    Response::Resistant => "resistant",
                },
                biomarker.tumor,
                biomarker.evidence_status,
            ));
        }
    }

    if let Some(sig) = evidence.clinvar_significance() {
        lines.push(format!("ClinVar: {}", sig));
    }

    if let Some(knowledge) = evidence.literature_knowledge() {
        if !knowledge.resistant_to.is_empty() {
            lines.push(format!(
                "Literature: resistant to {} (confidence {:.0}%)",
                knowledge.predictive_resistance_drugs().join(", "),
                knowledge.confidence * 100.0
            ));
        }
        if !knowledge.sensitive_to.is_empty() {
            lines.push(format!(
                "Literature: potentially sensitive to {}",
                knowledge.sensitivity_drugs().join(", ")
            ));
        }
    }

    if let Some(trials) = evidence.trials.as_present() {
        let variant_specific = trials.trials.iter().filter(|t| t.variant_mentioned).count();
        if !trials.trials.is_empty() {
            lines.push(format!(
                "Trials: {} active ({} variant-specific)",
                trials.trials.len(),
                variant_specific
            ));
        }
    }

    lines.join("\n")
}

/// Gene-context notes (mutation class, pathway) for the narrator.
pub fn gene_notes(evidence: &Evidence) -> String {
    let variant = &evidence.variant;
    let mut notes = Vec::new();

    if let Some(class) = gene_context::oncogene_mutation_class(&variant.gene, &variant.variant_normalized)
    {
        notes.push(format!(
            "Mutation class: {} ({}).{}",
            class.name,
            class.mechanism,
            class.note.map(|n| format!(" {}", n)).unwrap_or_default()
        ));
    }
    if let Some(tsg) = gene_context::pathway_actionable(&variant.gene) {
        notes.push(format!("{} loss activates the {} pathway.", tsg.gene, tsg.pathway));
    }
    notes.join("\n")
}

/// Deterministic therapy recommendations: net-sensitive drugs by best
/// level, then label drugs that name the variant, then mutation-class
/// drugs. The narrator never adds to this list.
pub fn recommended_therapies(evidence: &Evidence) -> Vec<String> {
    let mut therapies: Vec<String> = Vec::new();
    fn push(therapies: &mut Vec<String>, drug: &str) {
        let trimmed = drug.trim();
        if !trimmed.is_empty() && !therapies.iter().any(|t| t.eq_ignore_ascii_case(trimmed)) {
            therapies.push(trimmed.to_string());
        }
    }

    for summary in stats::aggregate_by_drug(evidence) {
        if summary.net_signal == NetSignal::Sensitive {
            push(&mut therapies, &summary.drug);
        }
    }

    if let Some(fda) = evidence.fda.as_present() {
        for approval in &fda.approvals {
            if approval.mentions_variant {
                push(&mut therapies, &approval.drug_name);
            }
        }
    }

    if therapies.is_empty() {
        let variant = &evidence.variant;
        if let Some(class) =
            gene_context::oncogene_mutation_class(&variant.gene, &variant.variant_normalized)
        {
            for drug in class.drugs {
                push(&mut therapies, drug);
            }
        }
    }

    therapies.truncate(5);
    therapies
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use oncotier_evidence::models::{
        Evidence, EvidenceLevel, FdaApproval, FdaFragment, SourceSlot, ViccAssociation,
        ViccFragment,
    };
    use oncotier_variant::Normalizer;

    fn base_evidence() -> Evidence {
        let v = Normalizer::new().normalize("BRAF", "V600E").unwrap();
        Evidence::empty(v, Some("Melanoma".into()))
    }

    #[test]
    fn test_recommended_therapies_prefers_net_sensitive() {
        let mut ev = base_evidence();
        ev.vicc = SourceSlot::present(ViccFragment {
            associations: vec![ViccAssociation {
                drugs: vec!["Dabrafenib".into()],
                response: Response::Sensitive,
                evidence_level: Some(EvidenceLevel::A),
                oncokb_level: None,
                source: "civic".into(),
                disease: Some("Melanoma".into()),
                description: String::new(),
            }],
        });
        ev.fda = SourceSlot::present(FdaFragment {
            approvals: vec![FdaApproval {
                drug_name: "ZELBORAF".into(),
                brand_name: None,
                generic_name: Some("vemurafenib".into()),
                indication: Some("melanoma with braf v600e".into()),
                approval_date: None,
                marketing_status: None,
                mentions_variant: true,
            }],
        });
        let therapies = recommended_therapies(&ev);
        assert_eq!(therapies[0], "Dabrafenib");
        assert!(therapies.contains(&"ZELBORAF".to_string()));
    }

    #[test]
    fn test_recommended_therapies_falls_back_to_class_drugs() {
        let ev = base_evidence();
        let therapies = recommended_therapies(&ev);
        assert!(therapies.contains(&"vemurafenib".to_string()));
    }

    #[test]
    fn test_compact_summary_mentions_counts() {
        let summary = compact_summary(&base_evidence());
        assert!(summary.contains("Sensitivity entries: 0"));
    }

    #[test]
    fn test_gene_notes_for_classified_variant() {
        let notes = gene_notes(&base_evidence());
        assert!(notes.contains("Class I (V600)"));
    }
}
