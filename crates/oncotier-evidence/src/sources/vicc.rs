//! VICC meta-knowledgebase client.
//!
//! Endpoint: https://search.cancervariants.org/api/v1/associations
//!
//! Issues a Lucene-style gene+variant query and parses association
//! records. Resistance entries describing compound mutations (a second
//! alteration acquired on top of the queried one) are dropped: they say
//! nothing about the queried variant on its own.

use oncotier_common::SandboxClient;
use tracing::{debug, instrument};

use super::EvidenceRequest;
use crate::models::{EvidenceLevel, Response, ViccAssociation, ViccFragment};

const ASSOCIATIONS_URL: &str = "https://search.cancervariants.org/api/v1/associations";

/// Free-text markers of compound-mutation resistance.
const COMPOUND_MARKERS: &[&str] = &[
    "secondary mutation",
    "acquired mutation",
    "acquired resistance mutation",
    "in cis",
    "compound mutation",
];

pub struct ViccClient {
    client: SandboxClient,
}

impl ViccClient {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, req: &EvidenceRequest) -> anyhow::Result<ViccFragment> {
        let query = format!("+{} +{}", req.gene(), req.variant_short());
        let resp: serde_json::Value = self
            .client
            .get(ASSOCIATIONS_URL)?
            .query(&[("q", query.as_str()), ("size", "50")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hits = resp["hits"].as_array().cloned().unwrap_or_default();
        let associations: Vec<ViccAssociation> = hits
            .iter()
            .filter_map(parse_association)
            .filter(|a| !is_compound_resistance(a))
            .collect();

        debug!(n = associations.len(), "VICC associations kept");
        Ok(ViccFragment { associations })
    }
}

fn parse_association(hit: &serde_json::Value) -> Option<ViccAssociation> {
    let assoc = &hit["association"];
    if assoc.is_null() {
        return None;
    }

    let response_text = assoc["response_type"].as_str().unwrap_or("").to_lowercase();
    let response = if response_text.contains("resist") {
        Response::Resistant
    } else if response_text.contains("sensitiv") || response_text.contains("respon") {
        Response::Sensitive
    } else {
        return None;
    };

    let drugs = assoc["environmentalContexts"]
        .as_array()
        .map(|ctxs| {
            ctxs.iter()
                .filter_map(|c| c["description"].as_str().or_else(|| c["name"].as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(ViccAssociation {
        drugs,
        response,
        evidence_level: assoc["evidence_label"].as_str().and_then(EvidenceLevel::parse),
        oncokb_level: hit["oncokb"]["clinical"]["level"].as_str().map(String::from),
        source: hit["source"].as_str().unwrap_or("unknown").to_string(),
        disease: assoc["phenotype"]["description"]
            .as_str()
            .or_else(|| assoc["phenotype"]["type"]["term"].as_str())
            .map(String::from),
        description: assoc["description"].as_str().unwrap_or("").to_string(),
    })
}

/// Resistance attributed to a co-occurring second mutation must not
/// penalize the queried variant.
fn is_compound_resistance(assoc: &ViccAssociation) -> bool {
    if assoc.response != Response::Resistant {
        return false;
    }
    let text = assoc.description.to_lowercase();
    if COMPOUND_MARKERS.iter().any(|m| text.contains(m)) {
        return true;
    }
    // "... harboring X and Y ..." describes a double-mutant context.
    if let Some(idx) = text.find("harboring") {
        let tail = &text[idx..text.len().min(idx + 120)];
        if tail.contains(" and ") {
            return true;
        }
    }
    false
}

// ── Tests ─────────────────────────────────────────────────────────────────────
