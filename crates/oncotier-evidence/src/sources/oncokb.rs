//! OncoKB cancer gene list.
//!
//! Source: https://www.oncokb.org/api/v1/utils/cancerGeneList
//!
//! Loaded once at startup and shared read-only. When the API is
//! unreachable a curated built-in set stands in, so `is_cancer_gene`
//! always answers.

use std::collections::HashSet;

use oncotier_common::SandboxClient;
use tracing::{info, warn};

const GENE_LIST_URL: &str = "https://www.oncokb.org/api/v1/utils/cancerGeneList";

pub struct OncoKbGeneList {
    genes: HashSet<String>,
    from_fallback: bool,
}

impl OncoKbGeneList {
    /// Fetch the curated list; fall back to the built-in set on failure.
    pub async fn load(client: &SandboxClient) -> Self {
        match Self::fetch(client).await {
            Ok(genes) if !genes.is_empty() => {
                info!(n = genes.len(), "OncoKB cancer gene list loaded");
                Self { genes, from_fallback: false }
            }
            Ok(_) => {
                warn!("OncoKB returned an empty gene list; using fallback set");
                Self::fallback()
            }
            Err(e) => {
                warn!("OncoKB gene list unavailable ({e}); using fallback set");
                Self::fallback()
            }
        }
    }

    async fn fetch(client: &SandboxClient) -> anyhow::Result<HashSet<String>> {
        let resp: serde_json::Value = client
            .get(GENE_LIST_URL)?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let genes = resp
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e["hugoSymbol"].as_str())
                    .map(|s| s.to_uppercase())
                    .collect()
            })
            .unwrap_or_default();
        Ok(genes)
    }

    pub fn fallback() -> Self {
        Self {
            genes: FALLBACK_CANCER_GENES.iter().map(|g| g.to_string()).collect(),
            from_fallback: true,
        }
    }

    pub fn is_cancer_gene(&self, gene: &str) -> bool {
        self.genes.contains(&gene.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn is_from_fallback(&self) -> bool {
        self.from_fallback
    }
}

/// Curated subset of the OncoKB cancer gene list, used when the API is
/// unavailable.
static FALLBACK_CANCER_GENES: &[&str] = &[
    "ABL1", "AKT1", "ALK", "APC", "AR", "ARID1A", "ASXL1", "ATM", "ATRX", "BAP1", "BCL2",
    "BRAF", "BRCA1", "BRCA2", "CDH1", "CDK4", "CDK6", "CDK12", "CDKN2A", "CHEK2", "CREBBP",
    "CTNNB1", "DNMT3A", "EGFR", "EP300", "ERBB2", "ERBB3", "ESR1", "EZH2", "FBXW7", "FGFR1",
    "FGFR2", "FGFR3", "FGFR4", "FLT3", "GATA3", "GNA11", "GNAQ", "GNAS", "HRAS", "IDH1",
    "IDH2", "JAK1", "JAK2", "JAK3", "KDM6A", "KEAP1", "KIT", "KMT2A", "KMT2C", "KMT2D",
    "KRAS", "MAP2K1", "MDM2", "MED12", "MEN1", "MET", "MLH1", "MSH2", "MSH6", "MTOR", "MYC",
    "MYCN", "MYD88", "NF1", "NF2", "NOTCH1", "NOTCH2", "NPM1", "NRAS", "NTRK1", "NTRK2",
    "NTRK3", "PALB2", "PBRM1", "PDGFRA", "PIK3CA", "PIK3R1", "PMS2", "POLD1", "POLE", "PTCH1",
    "PTEN", "PTPN11", "RAD51C", "RAD51D", "RB1", "RET", "RNF43", "ROS1", "RUNX1", "SDHA",
    "SDHB", "SDHC", "SDHD", "SETD2", "SF3B1", "SMAD4", "SMARCA4", "SMARCB1", "SMO", "SPOP",
    "STAG2", "STK11", "TET2", "TP53", "TSC1", "TSC2", "U2AF1", "VHL", "WT1",
];

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_contains_major_genes() {
        let list = OncoKbGeneList::fallback();
        assert!(list.is_from_fallback());
        assert!(list.is_cancer_gene("BRAF"));
        assert!(list.is_cancer_gene("tp53"));
        assert!(list.is_cancer_gene("Kras"));
    }

    #[test]
    fn test_non_cancer_gene() {
        let list = OncoKbGeneList::fallback();
        assert!(!list.is_cancer_gene("GAPDH"));
        assert!(!list.is_cancer_gene("ACTB"));
    }
}
