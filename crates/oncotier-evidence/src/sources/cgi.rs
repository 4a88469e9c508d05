//! Cancer Genome Interpreter biomarker catalog client.
//!
//! The CGI catalog is a bulk TSV download, not a per-variant API. It is
//! fetched on demand and cached on disk for `cgi_cache_ttl_days`; at
//! most one downloader runs at a time and the cache file is replaced by
//! atomic rename, so concurrent readers always see the last complete
//! copy.
//!
//! Catalog variant patterns support position wildcards: `.12.` matches
//! any substitution at codon 12, a bare `.` matches any variant of the
//! gene, and a codon-level pattern like `V600` matches every V600x.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use oncotier_common::SandboxClient;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::EvidenceRequest;
use crate::models::{CgiBiomarker, CgiFragment, CgiStatus, Response};

const CATALOG_URL: &str =
    "https://www.cancergenomeinterpreter.org/data/cgi_biomarkers_latest/cgi_biomarkers_per_variant.tsv";

pub struct CgiClient {
    client: SandboxClient,
    cache_path: PathBuf,
    ttl: Duration,
    download_lock: Mutex<()>,
}

impl CgiClient {
    pub fn new(client: SandboxClient, cache_dir: &Path, ttl_days: u64) -> Self {
        Self {
            client,
            cache_path: cache_dir.join("cgi_biomarkers_per_variant.tsv"),
            ttl: Duration::from_secs(ttl_days * 24 * 60 * 60),
            download_lock: Mutex::new(()),
        }
    }

    fn cache_age(&self) -> Option<Duration> {
        let modified = std::fs::metadata(&self.cache_path).and_then(|m| m.modified()).ok()?;
        SystemTime::now().duration_since(modified).ok()
    }

    fn cache_is_fresh(&self) -> bool {
        self.cache_age().map(|age| age < self.ttl).unwrap_or(false)
    }

    /// Returns the catalog text, downloading only when the cached copy
    /// is missing or older than the TTL. A failed refresh falls back to
    /// the stale copy when one exists.
    async fn catalog_text(&self) -> anyhow::Result<String> {
        if self.cache_is_fresh() {
            return Ok(tokio::fs::read_to_string(&self.cache_path).await?);
        }

        let _guard = self.download_lock.lock().await;
        // Another task may have refreshed while we waited.
        if self.cache_is_fresh() {
            return Ok(tokio::fs::read_to_string(&self.cache_path).await?);
        }

        match self.download().await {
            Ok(text) => {
                if let Err(e) = self.write_cache(&text).await {
                    warn!("CGI cache write failed: {e}");
                }
                Ok(text)
            }
            Err(e) => {
                if self.cache_path.exists() {
                    warn!("CGI refresh failed ({e}); serving stale catalog");
                    Ok(tokio::fs::read_to_string(&self.cache_path).await?)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn download(&self) -> anyhow::Result<String> {
        info!("downloading CGI biomarker catalog");
        let text = self
            .client
            .get(CATALOG_URL)?
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    async fn write_cache(&self, text: &str) -> anyhow::Result<()> {
        if let Some(dir) = self.cache_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.cache_path.with_extension("tsv.tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.cache_path).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, req: &EvidenceRequest) -> anyhow::Result<CgiFragment> {
        let text = self.catalog_text().await?;
        let biomarkers = parse_catalog(&text, req.gene(), req.variant_short());
        debug!(n = biomarkers.len(), "CGI biomarkers matched");
        Ok(CgiFragment { biomarkers })
    }
}

/// Parse the TSV catalog, keeping rows whose gene and variant pattern
/// match the query. Tumor filtering is left to the engine so off-label
/// rows remain visible.
fn parse_catalog(text: &str, gene: &str, variant: &str) -> Vec<CgiBiomarker> {
    let mut lines = text.lines();
    let Some(header_line) = lines.next() else {
        return vec![];
    };
    let header: Vec<&str> = header_line.split('\t').map(|c| c.trim()).collect();
    let col = |names: &[&str]| -> Option<usize> {
        header.iter().position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };

    let Some(gene_idx) = col(&["Gene"]) else { return vec![] };
    let Some(alteration_idx) = col(&["Alteration", "individual_mutation"]) else { return vec![] };
    let Some(assoc_idx) = col(&["Association"]) else { return vec![] };
    let drug_idx = col(&["Drug", "Drug full name"]);
    let level_idx = col(&["Evidence level", "Evidence"]);
    let tumor_idx = col(&["Primary Tumor type full name", "Primary Tumor type", "Tumor type"]);

    let gene_upper = gene.to_uppercase();
    let mut out = Vec::new();

    for line in lines {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() <= alteration_idx.max(gene_idx).max(assoc_idx) {
            continue;
        }
        if !cols[gene_idx].trim().eq_ignore_ascii_case(&gene_upper) {
            continue;
        }

        let alteration = cols[alteration_idx].trim();
        if !alteration_matches(alteration, &gene_upper, variant) {
            continue;
        }

        let association = cols[assoc_idx].trim().to_lowercase();
        let response = if association.contains("no responsive") || association.contains("resist") {
            Response::Resistant
        } else if association.contains("respon") || association.contains("sensitiv") {
            Response::Sensitive
        } else {
            continue;
        };

        let drugs: Vec<String> = drug_idx
            .map(|i| cols.get(i).copied().unwrap_or(""))
            .unwrap_or("")
            .split(';')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        out.push(CgiBiomarker {
            drugs,
            response,
            evidence_status: level_idx
                .and_then(|i| cols.get(i))
                .map(|s| CgiStatus::parse(s))
                .unwrap_or(CgiStatus::Preclinical),
            tumor: tumor_idx
                .and_then(|i| cols.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            variant_pattern: alteration.to_string(),
        });
    }
    out
}

/// Match one catalog alteration entry (optionally `GENE:`-prefixed,
/// possibly a comma list) against the canonical variant.
fn alteration_matches(alteration: &str, gene: &str, variant: &str) -> bool {
    let body = alteration
        .split_once(':')
        .map(|(prefix, rest)| {
            if prefix.trim().eq_ignore_ascii_case(gene) {
                rest
            } else {
                alteration
            }
        })
        .unwrap_or(alteration);

    body.split(',').map(|p| p.trim()).any(|p| pattern_matches(p, variant))
}

fn pattern_matches(pattern: &str, variant: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    // "." admits any variant of the gene.
    if pattern == "." {
        return true;
    }
    let variant_upper = variant.to_uppercase();
    // ".12." admits any substitution at codon 12.
    if let Some(stripped) = pattern.strip_prefix('.').and_then(|p| p.strip_suffix('.')) {
        if stripped.chars().all(|c| c.is_ascii_digit()) {
            return variant_position(&variant_upper)
                .map(|pos| pos.to_string() == stripped)
                .unwrap_or(false);
        }
    }
    let pattern_upper = pattern.to_uppercase();
    if pattern_upper == variant_upper {
        return true;
    }
    // Codon-level pattern: "V600" matches V600E, V600K, ...
    if pattern_upper.len() > 1
        && pattern_upper.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && pattern_upper[1..].chars().all(|c| c.is_ascii_digit())
    {
        return variant_upper.starts_with(&pattern_upper);
    }
    false
}

fn variant_position(variant: &str) -> Option<u32> {
    let digits: String = variant
        .chars()
        .skip_while(|c| c.is_alphabetic())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = "\
Gene\tAlteration\tAssociation\tDrug\tEvidence level\tPrimary Tumor type full name
BRAF\tBRAF:V600E\tResponsive\tVemurafenib\tFDA guidelines\tCutaneous melanoma
BRAF\tBRAF:V600\tResponsive\tDabrafenib;Trametinib\tFDA guidelines\tCutaneous melanoma
KRAS\tKRAS:.12.\tResistant\tCetuximab\tFDA guidelines\tColorectal adenocarcinoma
KRAS\tKRAS:.\tResistant\tPanitumumab\tNCCN guidelines\tColorectal adenocarcinoma
EGFR\tEGFR:T790M\tResistant\tErlotinib\tFDA guidelines\tNon-small cell lung
KIT\tKIT:D816V\tResistant\tImatinib\tEarly trials\tGastrointestinal stromal
";

    #[test]
    fn test_exact_variant_match() {
        let rows = parse_catalog(CATALOG, "BRAF", "V600E");
        assert_eq!(rows.len(), 2); // V600E exact + V600 codon pattern
        assert_eq!(rows[0].response, Response::Sensitive);
        assert_eq!(rows[0].evidence_status, CgiStatus::Fda);
        assert_eq!(rows[1].drugs, vec!["Dabrafenib", "Trametinib"]);
    }

    #[test]
    fn test_codon_pattern_does_not_overreach() {
        let rows = parse_catalog(CATALOG, "BRAF", "G469A");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_position_wildcard() {
        assert!(pattern_matches(".12.", "G12D"));
        assert!(pattern_matches(".12.", "G12C"));
        assert!(!pattern_matches(".12.", "G13D"));
        assert!(!pattern_matches(".12.", "G125D"));
    }

    #[test]
    fn test_any_variant_wildcard() {
        let rows = parse_catalog(CATALOG, "KRAS", "Q61H");
        // ".12." misses but "." matches.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].drugs, vec!["Panitumumab"]);
        assert_eq!(rows[0].evidence_status, CgiStatus::Nccn);
    }

    #[test]
    fn test_wildcards_stack_for_position_variant() {
        let rows = parse_catalog(CATALOG, "KRAS", "G12D");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_resistance_row() {
        let rows = parse_catalog(CATALOG, "EGFR", "T790M");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].response, Response::Resistant);
        assert_eq!(rows[0].evidence_status, CgiStatus::Fda);
    }

    #[test]
    fn test_gene_filter() {
        assert!(parse_catalog(CATALOG, "NRAS", "Q61K").is_empty());
    }

    #[tokio::test]
    async fn test_cache_write_is_atomic_rename() {
        let dir = tempfile::tempdir().unwrap();
        let client = CgiClient::new(
            oncotier_common::SandboxClient::new().unwrap(),
            dir.path(),
            7,
        );
        client.write_cache(CATALOG).await.unwrap();
        assert!(client.cache_path.exists());
        assert!(client.cache_is_fresh());
        let text = tokio::fs::read_to_string(&client.cache_path).await.unwrap();
        assert!(text.contains("BRAF:V600E"));
        // No leftover temp file.
        assert!(!client.cache_path.with_extension("tsv.tmp").exists());
    }
}
