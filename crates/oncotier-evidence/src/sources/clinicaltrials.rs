//! ClinicalTrials.gov v2 API client.
//!
//! API docs: https://clinicaltrials.gov/data-api/api
//! Endpoint: https://clinicaltrials.gov/api/v2/studies
//!
//! Queries variant-level first, then gene-level, keeps recruiting or
//! active studies, and flags per trial whether the variant is named in
//! the eligibility criteria or arm descriptions.

use oncotier_common::SandboxClient;
use tracing::{debug, instrument};

use super::EvidenceRequest;
use crate::models::{Trial, TrialsFragment};

const CT_API_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

const FIELDS: &str = "NCTId,BriefTitle,OverallStatus,Phase,Condition,InterventionName,\
                      LeadSponsorName,EligibilityCriteria,ArmGroupDescription";

/// Intervention rows that are not drugs.
const NON_DRUG_INTERVENTIONS: &[&str] = &[
    "placebo",
    "observation",
    "standard of care",
    "best supportive",
    "radiation",
    "surgery",
    "biopsy",
    "imaging",
];

pub struct ClinicalTrialsClient {
    client: SandboxClient,
}

impl ClinicalTrialsClient {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }

    async fn search(&self, term: &str, page_size: usize) -> anyhow::Result<Vec<serde_json::Value>> {
        let resp: serde_json::Value = self
            .client
            .get(CT_API_URL)?
            .query(&[
                ("query.term", term),
                ("filter.overallStatus", "RECRUITING|ACTIVE_NOT_RECRUITING|ENROLLING_BY_INVITATION|NOT_YET_RECRUITING"),
                ("pageSize", &page_size.to_string()),
                ("format", "json"),
                ("fields", FIELDS),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp["studies"].as_array().cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, req: &EvidenceRequest) -> anyhow::Result<TrialsFragment> {
        let gene = req.gene();
        let variant = req.variant_short();

        // Variant-level first; fall back to gene-level with tumor context.
        let mut studies = self.search(&format!("{} {}", gene, variant), 20).await?;
        if studies.is_empty() {
            let term = match req.tumor() {
                Some(tumor) => format!("{} mutation {}", gene, tumor),
                None => format!("{} mutation", gene),
            };
            studies = self.search(&term, 20).await?;
        }

        let mut trials = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for study in &studies {
            if let Some(trial) = parse_study(study, variant) {
                if seen.insert(trial.nct_id.clone()) {
                    trials.push(trial);
                }
            }
        }

        debug!(n = trials.len(), "clinical trials parsed");
        Ok(TrialsFragment { trials })
    }
}

fn parse_study(study: &serde_json::Value, variant: &str) -> Option<Trial> {
    let proto = &study["protocolSection"];
    let nct_id = proto["identificationModule"]["nctId"].as_str()?.to_string();
    let title = proto["identificationModule"]["briefTitle"]
        .as_str()
        .unwrap_or("")
        .to_string();
    let status = proto["statusModule"]["overallStatus"]
        .as_str()
        .unwrap_or("UNKNOWN")
        .to_string();
    let phase = proto["designModule"]["phases"]
        .as_array()
        .and_then(|p| p.first())
        .and_then(|p| p.as_str())
        .map(String::from);

    let conditions: Vec<String> = proto["conditionsModule"]["conditions"]
        .as_array()
        .map(|c| c.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let drugs: Vec<String> = proto["armsInterventionsModule"]["interventions"]
        .as_array()
        .map(|ivs| {
            ivs.iter()
                .filter_map(|iv| iv["name"].as_str())
                .filter(|name| {
                    let lower = name.to_lowercase();
                    !NON_DRUG_INTERVENTIONS.iter().any(|skip| lower.contains(skip))
                })
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let sponsor = proto["sponsorCollaboratorsModule"]["leadSponsor"]["name"]
        .as_str()
        .map(String::from);

    // The variant counts as explicitly mentioned when eligibility text,
    // arm descriptions, or the title name it.
    let eligibility = proto["eligibilityModule"]["eligibilityCriteria"]
        .as_str()
        .unwrap_or("");
    let arms_text: String = proto["armsInterventionsModule"]["armGroups"]
        .as_array()
        .map(|arms| {
            arms.iter()
                .filter_map(|a| a["description"].as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let variant_lower = variant.to_lowercase();
    let variant_mentioned = [eligibility, &arms_text, &title]
        .iter()
        .any(|text| text.to_lowercase().contains(&variant_lower));

    Some(Trial {
        nct_id,
        title,
        phase,
        status,
        variant_mentioned,
        drugs,
        sponsor,
        conditions,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn study(eligibility: &str) -> serde_json::Value {
        json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT04956640",
                    "briefTitle": "Study of RMC-6236 in Advanced Solid Tumors"
                },
                "statusModule": {"overallStatus": "RECRUITING"},
                "designModule": {"phases": ["PHASE1"]},
                "conditionsModule": {"conditions": ["Pancreatic Cancer", "NSCLC"]},
                "armsInterventionsModule": {
                    "interventions": [
                        {"name": "RMC-6236"},
                        {"name": "Placebo"},
                        {"name": "Radiation therapy"}
                    ],
                    "armGroups": [{"description": "dose escalation"}]
                },
                "sponsorCollaboratorsModule": {"leadSponsor": {"name": "Revolution Medicines"}},
                "eligibilityModule": {"eligibilityCriteria": eligibility}
            }
        })
    }

    #[test]
    fn test_parse_study() {
        let t = parse_study(&study("KRAS G12D mutation required"), "G12D").unwrap();
        assert_eq!(t.nct_id, "NCT04956640");
        assert_eq!(t.phase.as_deref(), Some("PHASE1"));
        assert!(t.is_active());
        assert!(t.variant_mentioned);
        assert_eq!(t.sponsor.as_deref(), Some("Revolution Medicines"));
        // Placebo and radiation filtered out.
        assert_eq!(t.drugs, vec!["RMC-6236"]);
    }

    #[test]
    fn test_gene_level_trial_not_variant_specific() {
        let t = parse_study(&study("documented KRAS mutation"), "G12D").unwrap();
        assert!(!t.variant_mentioned);
    }

    #[test]
    fn test_study_without_nct_skipped() {
        assert!(parse_study(&json!({"protocolSection": {}}), "G12D").is_none());
    }
}
