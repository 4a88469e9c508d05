//! openFDA drug label client.
//!
//! API docs: https://open.fda.gov/apis/drug/label/
//! Endpoint: https://api.fda.gov/drug/label.json
//!
//! Searches prescribing information for biomarker-based indications.
//! Strategy: full-text `GENE AND VARIANT` across indication text first,
//! then a gene-only fallback. Each approval records whether the label
//! names the queried variant outside a negation context.

use oncotier_common::SandboxClient;
use tracing::{debug, instrument};

use super::{gene_aliases, EvidenceRequest};
use crate::models::{FdaApproval, FdaFragment};

const LABEL_URL: &str = "https://api.fda.gov/drug/label.json";

pub struct FdaClient {
    client: SandboxClient,
}

impl FdaClient {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }

    async fn search(&self, search_query: &str, limit: usize) -> anyhow::Result<Vec<serde_json::Value>> {
        let resp = self
            .client
            .get(LABEL_URL)?
            .query(&[("search", search_query), ("limit", &limit.to_string())])
            .send()
            .await?;

        // openFDA answers 404 for an empty result set.
        if resp.status().as_u16() == 404 {
            return Ok(vec![]);
        }
        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        Ok(body["results"].as_array().cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, req: &EvidenceRequest) -> anyhow::Result<FdaFragment> {
        let variant = req.variant_short();
        let mut records = Vec::new();

        // Strategy 1: gene + variant in the indication text, per alias.
        for gene in gene_aliases(req.gene()) {
            let query = format!("indications_and_usage:({} AND {})", gene, variant);
            let hits = self.search(&query, 15).await?;
            if !hits.is_empty() {
                records.extend(hits);
            }
        }

        // Strategy 2: gene-only fallback.
        if records.is_empty() {
            for gene in gene_aliases(req.gene()) {
                let query = format!("indications_and_usage:{}", gene);
                let hits = self.search(&query, 15).await?;
                records.extend(hits);
            }
        }

        let mut approvals = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for record in &records {
            if let Some(approval) = parse_label(record, variant) {
                let key = approval.drug_name.to_lowercase();
                if seen.insert(key) {
                    approvals.push(approval);
                }
            }
        }
        approvals.truncate(10);

        debug!(n = approvals.len(), "FDA approvals parsed");
        Ok(FdaFragment { approvals })
    }
}

fn parse_label(record: &serde_json::Value, variant: &str) -> Option<FdaApproval> {
    let openfda = &record["openfda"];
    let first_str = |v: &serde_json::Value| -> Option<String> {
        v.as_str()
            .map(String::from)
            .or_else(|| v[0].as_str().map(String::from))
    };

    let brand_name = first_str(&openfda["brand_name"]);
    let generic_name = first_str(&openfda["generic_name"]);
    let drug_name = brand_name.clone().or_else(|| generic_name.clone())?;

    let indication = match &record["indications_and_usage"] {
        serde_json::Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    };

    let mentions_variant = indication
        .as_deref()
        .map(|text| mentions_outside_negation(text, variant))
        .unwrap_or(false);

    Some(FdaApproval {
        drug_name,
        brand_name,
        generic_name,
        indication: indication.map(|i| i.chars().take(1800).collect()),
        approval_date: record["effective_time"].as_str().map(String::from),
        marketing_status: Some("Prescription".to_string()),
        mentions_variant,
    })
}

/// A label "mentions" the variant only when the mention is not negated:
/// "without the D816V mutation" is an exclusion, not an approval.
fn mentions_outside_negation(text: &str, variant: &str) -> bool {
    let text_lower = text.to_lowercase();
    let variant_lower = variant.to_lowercase();
    if !text_lower.contains(&variant_lower) {
        return false;
    }
    let negations = [
        format!("without the {}", variant_lower),
        format!("without {}", variant_lower),
        format!("no {}", variant_lower),
        format!("not {}", variant_lower),
        format!("excluding {}", variant_lower),
        format!("absence of {}", variant_lower),
        format!("negative for {}", variant_lower),
    ];
    // Every occurrence must sit inside a negation for the mention to be
    // discounted.
    let occurrences = text_lower.matches(&variant_lower).count();
    let negated = negations
        .iter()
        .map(|n| text_lower.matches(n.as_str()).count())
        .sum::<usize>();
    occurrences > negated
}

// ── Tests ─────────────────────────────────────────────────────────────────────
