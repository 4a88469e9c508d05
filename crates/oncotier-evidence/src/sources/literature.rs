//! Semantic Scholar literature client.
//!
//! Endpoint: https://api.semanticscholar.org/graph/v1/paper/search
//!
//! Runs a small set of tumor-aware queries and merges the results into
//! at most six unique papers, each carrying citation counts and the AI
//! summary (TLDR) when available. Without an API key Semantic Scholar
//! allows roughly one request per second; a client-side limiter keeps
//! us under that.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use oncotier_common::SandboxClient;
use tracing::{debug, instrument};

use super::EvidenceRequest;
use crate::models::{LiteratureFragment, Paper};

const SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const FIELDS: &str = "title,abstract,year,citationCount,tldr,externalIds,url";
const MAX_PAPERS: usize = 6;

pub struct LiteratureClient {
    client: SandboxClient,
    api_key: Option<String>,
    limiter: DefaultDirectRateLimiter,
}

impl LiteratureClient {
    pub fn new(client: SandboxClient, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            limiter: RateLimiter::direct(Quota::per_second(nonzero!(1u32))),
        }
    }

    fn queries(req: &EvidenceRequest) -> Vec<String> {
        let gene = req.gene();
        let variant = req.variant_short();
        let mut queries = Vec::new();
        if let Some(tumor) = req.tumor() {
            queries.push(format!("{} {} {}", gene, variant, tumor));
        }
        queries.push(format!("{} {} resistance", gene, variant));
        queries.push(format!("{} {} targeted therapy", gene, variant));
        queries
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<serde_json::Value>> {
        self.limiter.until_ready().await;
        let mut builder = self
            .client
            .get(SEARCH_URL)?
            .query(&[("query", query), ("fields", FIELDS), ("limit", "5")]);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }
        let resp: serde_json::Value = builder
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp["data"].as_array().cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, req: &EvidenceRequest) -> anyhow::Result<LiteratureFragment> {
        let mut papers: Vec<Paper> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for query in Self::queries(req) {
            if papers.len() >= MAX_PAPERS {
                break;
            }
            let hits = self.search(&query).await?;
            for hit in hits {
                if papers.len() >= MAX_PAPERS {
                    break;
                }
                if let Some(paper) = parse_paper(&hit) {
                    if seen.insert(paper.paper_id.clone()) {
                        papers.push(paper);
                    }
                }
            }
        }

        debug!(n = papers.len(), "literature papers merged");
        Ok(LiteratureFragment { papers, knowledge: None })
    }
}

fn parse_paper(hit: &serde_json::Value) -> Option<Paper> {
    let paper_id = hit["paperId"].as_str()?.to_string();
    Some(Paper {
        pmid: hit["externalIds"]["PubMed"]
            .as_str()
            .map(String::from)
            .or_else(|| hit["externalIds"]["PubMed"].as_i64().map(|v| v.to_string())),
        paper_id,
        title: hit["title"].as_str().unwrap_or("").to_string(),
        year: hit["year"].as_i64().map(|y| y as i32),
        citations: hit["citationCount"].as_u64().unwrap_or(0) as u32,
        tldr: hit["tldr"]["text"].as_str().map(String::from),
        abstract_text: hit["abstract"].as_str().map(String::from),
        url: hit["url"].as_str().map(String::from),
        score: None,
        signal: None,
        drugs: Vec::new(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use oncotier_variant::Normalizer;
    use serde_json::json;

    fn req(tumor: Option<&str>) -> EvidenceRequest {
        let v = Normalizer::new().normalize("EGFR", "C797S").unwrap();
        EvidenceRequest::new(v, tumor.map(String::from))
    }

    #[test]
    fn test_queries_are_tumor_aware() {
        let queries = LiteratureClient::queries(&req(Some("NSCLC")));
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "EGFR C797S NSCLC");
        assert!(queries[1].contains("resistance"));
    }

    #[test]
    fn test_queries_without_tumor() {
        let queries = LiteratureClient::queries(&req(None));
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn test_parse_paper() {
        let hit = json!({
            "paperId": "abc123",
            "title": "EGFR C797S mediates resistance to osimertinib",
            "abstract": "We report...",
            "year": 2015,
            "citationCount": 812,
            "tldr": {"text": "C797S blocks covalent binding of osimertinib."},
            "externalIds": {"PubMed": "25939061"},
            "url": "https://www.semanticscholar.org/paper/abc123"
        });
        let p = parse_paper(&hit).unwrap();
        assert_eq!(p.paper_id, "abc123");
        assert_eq!(p.pmid.as_deref(), Some("25939061"));
        assert_eq!(p.citations, 812);
        assert!(p.tldr.as_deref().unwrap().contains("C797S"));
        assert!(p.score.is_none());
    }

    #[test]
    fn test_paper_without_id_skipped() {
        assert!(parse_paper(&json!({"title": "orphan"})).is_none());
    }
}
