//! The assessment record: the serialized result of one pipeline run.
//!
//! Field names are stable; downstream consumers parse this JSON.

use oncotier_evidence::models::Evidence;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::summary;
use crate::tier::TierResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// "GENE VARIANT", e.g. "BRAF V600E".
    pub variant: String,
    pub tier: String,
    pub confidence: f64,
    pub sublevel_internal: Option<String>,
    pub reason_code: String,
    pub recommended_therapies: Vec<String>,
    pub evidence_sources: Vec<String>,
    pub narrative: String,
    pub annotations: serde_json::Value,
    pub references: Vec<String>,
}

impl Assessment {
    pub fn build(evidence: &Evidence, result: &TierResult, narrative: String) -> Self {
        Self {
            variant: format!("{} {}", evidence.variant.gene, evidence.variant.variant_normalized),
            tier: result.tier.as_str().to_string(),
            confidence: result.confidence,
            sublevel_internal: result.sublevel.map(|s| s.as_str().to_string()),
            reason_code: result.reason.as_str().to_string(),
            recommended_therapies: summary::recommended_therapies(evidence),
            evidence_sources: evidence
                .present_sources()
                .into_iter()
                .map(String::from)
                .collect(),
            narrative,
            annotations: annotations(evidence),
            references: references(evidence),
        }
    }
}

/// Database ids, functional scores, and the mutation-class annotation.
fn annotations(evidence: &Evidence) -> serde_json::Value {
    let mut map = serde_json::Map::new();

    if let Some(mv) = evidence.myvariant.as_present() {
        let mut set = |key: &str, value: serde_json::Value| {
            if !value.is_null() {
                map.insert(key.to_string(), value);
            }
        };
        set("cosmic_id", json!(mv.cosmic_id));
        set("dbsnp_id", json!(mv.dbsnp_id));
        set("clinvar_id", json!(mv.clinvar_id));
        set("clinvar_significance", json!(mv.clinvar_significance));
        set("hgvs_genomic", json!(mv.hgvs_genomic));
        set("polyphen2_prediction", json!(mv.polyphen2_prediction));
        set("cadd_score", json!(mv.cadd_score));
        set("gnomad_exome_af", json!(mv.gnomad_exome_af));
        set("alphamissense_score", json!(mv.alphamissense_score));
        set("alphamissense_prediction", json!(mv.alphamissense_prediction));
    }

    if let Some(class) = oncotier_variant::gene_context::oncogene_mutation_class(
        &evidence.variant.gene,
        &evidence.variant.variant_normalized,
    ) {
        map.insert(
            "mutation_class".to_string(),
            json!({
                "name": class.name,
                "mechanism": class.mechanism,
                "note": class.note,
            }),
        );
    }

    if let Some(hgvs) = &evidence.variant.hgvs_protein {
        map.insert("hgvs_protein".to_string(), json!(hgvs));
    }

    serde_json::Value::Object(map)
}

/// Paper ids and trial registry ids backing the assessment.
fn references(evidence: &Evidence) -> Vec<String> {
    let mut refs = Vec::new();

    if let Some(lit) = evidence.literature.as_present() {
        for paper in lit.papers.iter().take(5) {
            match &paper.pmid {
                Some(pmid) => refs.push(format!("PMID:{}", pmid)),
                None => refs.push(format!("S2:{}", paper.paper_id)),
            }
        }
        if let Some(knowledge) = &lit.knowledge {
            for r in knowledge.references.iter().take(5) {
                let tagged = if r.starts_with("PMID") { r.clone() } else { format!("PMID:{}", r) };
                if !refs.contains(&tagged) {
                    refs.push(tagged);
                }
            }
        }
    }

    if let Some(trials) = evidence.trials.as_present() {
        for trial in trials.trials.iter().take(5) {
            refs.push(trial.nct_id.clone());
        }
    }

    refs
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{ReasonCode, SubLevel, Tier};
    use oncotier_evidence::models::{MyVariantFragment, SourceSlot};
    use oncotier_variant::Normalizer;

    fn evidence() -> Evidence {
        let v = Normalizer::new().normalize("BRAF", "V600E").unwrap();
        let mut ev = Evidence::empty(v, Some("Melanoma".into()));
        ev.myvariant = SourceSlot::present(MyVariantFragment {
            cosmic_id: Some("COSM476".into()),
            cadd_score: Some(32.0),
            ..Default::default()
        });
        ev
    }

    fn result() -> TierResult {
        TierResult {
            tier: Tier::I,
            sublevel: Some(SubLevel::A),
            reason: ReasonCode::FdaVariantInTumor,
            human_reason: "FDA-approved therapy".into(),
            confidence: 0.95,
        }
    }

    #[test]
    fn test_stable_field_names() {
        let a = Assessment::build(&evidence(), &result(), "narrative text".into());
        let value = serde_json::to_value(&a).unwrap();
        for field in [
            "variant",
            "tier",
            "confidence",
            "sublevel_internal",
            "reason_code",
            "recommended_therapies",
            "evidence_sources",
            "narrative",
            "annotations",
            "references",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(value["variant"], "BRAF V600E");
        assert_eq!(value["tier"], "I");
        assert_eq!(value["sublevel_internal"], "A");
        assert_eq!(value["reason_code"], "fda_variant_in_tumor");
    }

    #[test]
    fn test_annotations_carry_ids_and_class() {
        let a = Assessment::build(&evidence(), &result(), String::new());
        assert_eq!(a.annotations["cosmic_id"], "COSM476");
        assert_eq!(a.annotations["cadd_score"], 32.0);
        assert_eq!(a.annotations["mutation_class"]["name"], "Class I (V600)");
        assert_eq!(a.annotations["hgvs_protein"], "p.V600E");
    }

    #[test]
    fn test_evidence_sources_reflect_present_slots() {
        let a = Assessment::build(&evidence(), &result(), String::new());
        assert_eq!(a.evidence_sources, vec!["myvariant"]);
    }
}
