//! CIViC GraphQL client.
//!
//! Endpoint: https://civicdb.org/api/graphql
//!
//! Fallback source: queried when MyVariant carried no CIViC block, and
//! always when assertions are needed for tier attribution (assertions
//! are not part of the MyVariant embedding).

use oncotier_common::SandboxClient;
use tracing::{debug, instrument};

use super::EvidenceRequest;
use crate::models::{CivicAssertion, CivicEvidenceItem, CivicFragment, EvidenceLevel};

const GRAPHQL_URL: &str = "https://civicdb.org/api/graphql";

const MOLECULAR_PROFILE_QUERY: &str = r#"
query profile($name: String!) {
  molecularProfiles(name: $name, first: 1) {
    nodes {
      name
      evidenceItems(first: 25, status: ACCEPTED) {
        nodes {
          evidenceType
          evidenceLevel
          significance
          disease { name }
          therapies { name }
          description
        }
      }
      assertions(first: 10) {
        nodes {
          ampLevel
          assertionType
          significance
          disease { name }
          therapies { name }
          fdaCompanionTest
          nccnGuideline { name }
        }
      }
    }
  }
}
"#;

pub struct CivicClient {
    client: SandboxClient,
}

impl CivicClient {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, req: &EvidenceRequest) -> anyhow::Result<CivicFragment> {
        let profile_name = format!("{} {}", req.gene(), req.variant_short());
        let body = serde_json::json!({
            "query": MOLECULAR_PROFILE_QUERY,
            "variables": { "name": profile_name },
        });

        let resp: serde_json::Value = self
            .client
            .post(GRAPHQL_URL)?
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(errors) = resp["errors"].as_array() {
            if !errors.is_empty() {
                anyhow::bail!("CIViC GraphQL error: {}", errors[0]["message"].as_str().unwrap_or("unknown"));
            }
        }

        let fragment = parse_profiles(&resp["data"]["molecularProfiles"]["nodes"], &profile_name);
        debug!(
            items = fragment.evidence_items.len(),
            assertions = fragment.assertions.len(),
            "CIViC profile parsed"
        );
        Ok(fragment)
    }
}

fn parse_profiles(nodes: &serde_json::Value, profile_name: &str) -> CivicFragment {
    let mut fragment = CivicFragment::default();
    let Some(profiles) = nodes.as_array() else {
        return fragment;
    };

    for profile in profiles {
        for item in profile["evidenceItems"]["nodes"].as_array().unwrap_or(&vec![]) {
            fragment.evidence_items.push(CivicEvidenceItem {
                evidence_type: item["evidenceType"].as_str().map(String::from),
                evidence_level: item["evidenceLevel"].as_str().and_then(EvidenceLevel::parse),
                significance: item["significance"].as_str().map(String::from),
                disease: item["disease"]["name"].as_str().map(String::from),
                drugs: therapy_names(&item["therapies"]),
                description: item["description"].as_str().map(String::from),
            });
        }
        for assertion in profile["assertions"]["nodes"].as_array().unwrap_or(&vec![]) {
            let (amp_tier, amp_level) = parse_amp_level(assertion["ampLevel"].as_str());
            fragment.assertions.push(CivicAssertion {
                molecular_profile: profile["name"]
                    .as_str()
                    .unwrap_or(profile_name)
                    .to_string(),
                amp_tier,
                amp_level,
                assertion_type: assertion["assertionType"].as_str().map(String::from),
                significance: assertion["significance"].as_str().map(String::from),
                therapies: therapy_names(&assertion["therapies"]),
                disease: assertion["disease"]["name"].as_str().map(String::from),
                fda_companion_test: assertion["fdaCompanionTest"].as_bool().unwrap_or(false),
                nccn_guideline: assertion["nccnGuideline"]["name"].as_str().map(String::from),
            });
        }
    }
    fragment
}

fn therapy_names(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|ts| ts.iter().filter_map(|t| t["name"].as_str().map(String::from)).collect())
        .unwrap_or_default()
}

/// CIViC encodes tier and level together, e.g. "TIER_I_LEVEL_A".
fn parse_amp_level(raw: Option<&str>) -> (Option<String>, Option<EvidenceLevel>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    let upper = raw.to_uppercase();
    let tier = if upper.contains("TIER_IV") || upper.contains("TIER IV") {
        Some("IV")
    } else if upper.contains("TIER_III") || upper.contains("TIER III") {
        Some("III")
    } else if upper.contains("TIER_II") || upper.contains("TIER II") {
        Some("II")
    } else if upper.contains("TIER_I") || upper.contains("TIER I") {
        Some("I")
    } else {
        None
    };
    let level = upper
        .rsplit(|c: char| c == '_' || c == ' ')
        .next()
        .and_then(EvidenceLevel::parse);
    (tier.map(String::from), level)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_amp_level() {
        assert_eq!(
            parse_amp_level(Some("TIER_I_LEVEL_A")),
            (Some("I".to_string()), Some(EvidenceLevel::A))
        );
        assert_eq!(
            parse_amp_level(Some("TIER_II_LEVEL_C")),
            (Some("II".to_string()), Some(EvidenceLevel::C))
        );
        assert_eq!(parse_amp_level(Some("TIER_IV")), (Some("IV".to_string()), None));
        assert_eq!(parse_amp_level(None), (None, None));
    }

    #[test]
    fn test_parse_profiles() {
        let nodes = json!([{
            "name": "BRAF V600E",
            "evidenceItems": {"nodes": [{
                "evidenceType": "PREDICTIVE",
                "evidenceLevel": "A",
                "significance": "SENSITIVITYRESPONSE",
                "disease": {"name": "Melanoma"},
                "therapies": [{"name": "Dabrafenib"}, {"name": "Trametinib"}],
                "description": "Combination therapy"
            }]},
            "assertions": {"nodes": [{
                "ampLevel": "TIER_I_LEVEL_A",
                "assertionType": "PREDICTIVE",
                "significance": "SENSITIVITYRESPONSE",
                "disease": {"name": "Melanoma"},
                "therapies": [{"name": "Dabrafenib"}],
                "fdaCompanionTest": true,
                "nccnGuideline": {"name": "Melanoma"}
            }]}
        }]);
        let frag = parse_profiles(&nodes, "BRAF V600E");
        assert_eq!(frag.evidence_items.len(), 1);
        assert_eq!(frag.evidence_items[0].drugs.len(), 2);
        assert_eq!(frag.assertions.len(), 1);
        let a = &frag.assertions[0];
        assert!(a.is_tier_i());
        assert!(a.is_predictive());
        assert!(a.is_sensitivity());
        assert_eq!(a.amp_level, Some(EvidenceLevel::A));
        assert!(a.fda_companion_test);
        assert_eq!(a.nccn_guideline.as_deref(), Some("Melanoma"));
    }

    #[test]
    fn test_empty_response() {
        let frag = parse_profiles(&json!(null), "X");
        assert!(frag.evidence_items.is_empty());
        assert!(frag.assertions.is_empty());
    }
}
