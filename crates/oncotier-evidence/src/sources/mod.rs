//! Evidence source clients.
//!
//! Each client is self-contained: it knows its endpoint, query shapes,
//! and parsing, and returns its typed fragment. Retry, deadline, and
//! degradation handling live in the aggregator so every client stays a
//! plain `fetch → fragment` function.

pub mod cgi;
pub mod civic;
pub mod clinicaltrials;
pub mod fda;
pub mod literature;
pub mod myvariant;
pub mod oncokb;
pub mod vicc;

pub use cgi::CgiClient;
pub use civic::CivicClient;
pub use clinicaltrials::ClinicalTrialsClient;
pub use fda::FdaClient;
pub use literature::LiteratureClient;
pub use myvariant::MyVariantClient;
pub use oncokb::OncoKbGeneList;
pub use vicc::ViccClient;

use oncotier_variant::NormalizedVariant;

/// The admitted variant plus tumor context every client receives.
#[derive(Debug, Clone)]
pub struct EvidenceRequest {
    pub variant: NormalizedVariant,
    pub tumor_type: Option<String>,
}

impl EvidenceRequest {
    pub fn new(variant: NormalizedVariant, tumor_type: Option<String>) -> Self {
        Self { variant, tumor_type }
    }

    pub fn gene(&self) -> &str {
        &self.variant.gene
    }

    pub fn variant_short(&self) -> &str {
        &self.variant.variant_normalized
    }

    pub fn tumor(&self) -> Option<&str> {
        self.tumor_type.as_deref()
    }
}

/// FDA labels and some catalogs use legacy nomenclature for a few genes.
pub fn gene_aliases(gene: &str) -> Vec<String> {
    let gene_upper = gene.to_uppercase();
    let mut names = vec![gene_upper.clone()];
    match gene_upper.as_str() {
        "ERBB2" => names.push("HER2".to_string()),
        "HER2" => names.push("ERBB2".to_string()),
        "EGFR" => names.push("HER1".to_string()),
        _ => {}
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gene_aliases() {
        assert_eq!(gene_aliases("ERBB2"), vec!["ERBB2", "HER2"]);
        assert_eq!(gene_aliases("her2"), vec!["HER2", "ERBB2"]);
        assert_eq!(gene_aliases("BRAF"), vec!["BRAF"]);
    }
}
