//! Protein variant notation normalisation.
//!
//! Maps the notations seen in clinical input ("V600E", "p.V600E",
//! "Val600Glu", "T790fs", "E746_A750del") onto one canonical short form
//! and classifies the variant kind. Structural classes the pipeline does
//! not assess (fusions, amplifications, splice events, exon-level
//! deletions, truncations) are rejected here, before any source client
//! runs.
//!
//! # Example
//! ```ignore
//! let norm = Normalizer::new();
//! let v = norm.normalize("BRAF", "Val600Glu").unwrap();
//! assert_eq!(v.variant_normalized, "V600E");
//! assert_eq!(v.kind, VariantKind::Missense);
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Three-letter → one-letter amino acid code.
fn aa3_to_aa1(aa: &str) -> Option<char> {
    match aa.to_lowercase().as_str() {
        "ala" => Some('A'), "cys" => Some('C'), "asp" => Some('D'),
        "glu" => Some('E'), "phe" => Some('F'), "gly" => Some('G'),
        "his" => Some('H'), "ile" => Some('I'), "lys" => Some('K'),
        "leu" => Some('L'), "met" => Some('M'), "asn" => Some('N'),
        "pro" => Some('P'), "gln" => Some('Q'), "arg" => Some('R'),
        "ser" => Some('S'), "thr" => Some('T'), "val" => Some('V'),
        "trp" => Some('W'), "tyr" => Some('Y'),
        "ter" | "stop" => Some('*'),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Missense,
    Nonsense,
    Frameshift,
    Insertion,
    Deletion,
    Duplication,
    OtherIndel,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Missense => "missense",
            VariantKind::Nonsense => "nonsense",
            VariantKind::Frameshift => "frameshift",
            VariantKind::Insertion => "insertion",
            VariantKind::Deletion => "deletion",
            VariantKind::Duplication => "duplication",
            VariantKind::OtherIndel => "other_indel",
        }
    }
}

/// Canonical form of an admitted variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedVariant {
    pub gene: String,
    pub variant_original: String,
    /// Canonical short form, e.g. "V600E", "T790fs", "E746_A750del".
    pub variant_normalized: String,
    pub kind: VariantKind,
    /// HGVS p. notation for substitutions, e.g. "p.V600E".
    pub hgvs_protein: Option<String>,
    pub position: Option<u32>,
    pub ref_aa: Option<char>,
    pub alt_aa: Option<char>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RejectedVariant {
    #[error("unsupported variant class for {gene} \"{variant}\" ({token})")]
    UnsupportedClass {
        gene: String,
        variant: String,
        token: &'static str,
    },
    #[error("unrecognized variant notation for {gene}: \"{variant}\"")]
    UnrecognizedNotation { gene: String, variant: String },

    #[error("empty gene symbol")]
    EmptyGene,
}

impl From<RejectedVariant> for oncotier_common::OncotierError {
    fn from(r: RejectedVariant) -> Self {
        match &r {
            RejectedVariant::UnsupportedClass { .. } => {
                oncotier_common::OncotierError::UnsupportedVariantKind(r.to_string())
            }
            _ => oncotier_common::OncotierError::UnrecognizedNotation(r.to_string()),
        }
    }
}

/// Tokens that mark a variant class outside this pipeline's scope.
/// Matched on the lowercased input.
const REJECTION_TOKENS: &[&str] = &[
    "fusion",
    "rearrang",
    " amp",
    "amplification",
    "overexpression",
    "splice",
    "skipping",
    "trunc",
];

pub struct Normalizer {
    /// Short substitution: V600E, R213*
    re_short: Regex,
    /// Three-letter substitution: Val600Glu, optionally p.-prefixed.
    re_long: Regex,
    /// Frameshift: T790fs, K745fs*12
    re_fs: Regex,
    /// Positional token required for indel notations.
    re_position: Regex,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            re_short: Regex::new(r"^([A-Z])(\d+)([A-Z*])$").unwrap(),
            re_long: Regex::new(r"(?i)^([a-z]{3})(\d+)([a-z]{3}|\*)$").unwrap(),
            re_fs: Regex::new(r"^([A-Z])(\d+)FS(\*\d+)?$").unwrap(),
            re_position: Regex::new(r"[A-Z]?\d+").unwrap(),
        }
    }

    /// Normalise a raw `(gene, variant)` pair. Deterministic and pure;
    /// idempotent over its own canonical output.
    pub fn normalize(&self, gene: &str, variant: &str) -> Result<NormalizedVariant, RejectedVariant> {
        let gene = gene.trim().to_uppercase();
        if gene.is_empty() {
            return Err(RejectedVariant::EmptyGene);
        }

        let original = variant.trim().to_string();
        let stripped = strip_protein_prefix(&original);
        let lower = stripped.to_lowercase();

        for token in REJECTION_TOKENS {
            if lower.contains(token) {
                return Err(RejectedVariant::UnsupportedClass {
                    gene,
                    variant: original,
                    token,
                });
            }
        }
        // Exon-level deletion phrases ("exon 19 deletion") are structural
        // for our purposes, unlike residue-range indels (E746_A750del).
        if lower.contains("exon") && (lower.contains("del") || lower.contains("skip")) {
            return Err(RejectedVariant::UnsupportedClass {
                gene,
                variant: original,
                token: "exon deletion",
            });
        }

        let upper = stripped.to_uppercase();

        // Short substitution wins over the long form when both could match.
        if let Some(caps) = self.re_short.captures(&upper) {
            let ref_aa = caps[1].chars().next().unwrap();
            let position: u32 = caps[2].parse().map_err(|_| RejectedVariant::UnrecognizedNotation {
                gene: gene.clone(),
                variant: original.clone(),
            })?;
            let alt_aa = caps[3].chars().next().unwrap();
            return Ok(self.substitution(gene, original, ref_aa, position, alt_aa));
        }

        if let Some(caps) = self.re_long.captures(stripped) {
            if let (Some(ref_aa), Some(alt_aa)) = (aa3_to_aa1(&caps[1]), aa3_to_aa1(&caps[3])) {
                let position: u32 = caps[2].parse().map_err(|_| {
                    RejectedVariant::UnrecognizedNotation {
                        gene: gene.clone(),
                        variant: original.clone(),
                    }
                })?;
                return Ok(self.substitution(gene, original, ref_aa, position, alt_aa));
            }
        }

        if let Some(caps) = self.re_fs.captures(&upper) {
            let ref_aa = caps[1].chars().next().unwrap();
            let position: u32 = caps[2].parse().map_err(|_| RejectedVariant::UnrecognizedNotation {
                gene: gene.clone(),
                variant: original.clone(),
            })?;
            let suffix = caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();
            return Ok(NormalizedVariant {
                variant_normalized: format!("{}{}fs{}", ref_aa, position, suffix),
                gene,
                variant_original: original,
                kind: VariantKind::Frameshift,
                hgvs_protein: None,
                position: Some(position),
                ref_aa: Some(ref_aa),
                alt_aa: None,
            });
        }

        if (upper.contains("DEL") || upper.contains("INS") || upper.contains("DUP"))
            && self.re_position.is_match(&upper)
        {
            let kind = if upper.contains("DELINS") {
                VariantKind::OtherIndel
            } else if upper.contains("DEL") {
                VariantKind::Deletion
            } else if upper.contains("INS") {
                VariantKind::Insertion
            } else {
                VariantKind::Duplication
            };
            let canonical = upper
                .replace("DELINS", "delins")
                .replace("DEL", "del")
                .replace("INS", "ins")
                .replace("DUP", "dup");
            let position = self
                .re_position
                .find(&canonical)
                .and_then(|m| m.as_str().trim_start_matches(|c: char| c.is_alphabetic()).parse().ok());
            return Ok(NormalizedVariant {
                gene,
                variant_original: original,
                variant_normalized: canonical,
                kind,
                hgvs_protein: None,
                position,
                ref_aa: None,
                alt_aa: None,
            });
        }

        Err(RejectedVariant::UnrecognizedNotation { gene, variant: original })
    }

    fn substitution(
        &self,
        gene: String,
        original: String,
        ref_aa: char,
        position: u32,
        alt_aa: char,
    ) -> NormalizedVariant {
        let canonical = format!("{}{}{}", ref_aa, position, alt_aa);
        let kind = if alt_aa == '*' {
            VariantKind::Nonsense
        } else {
            VariantKind::Missense
        };
        NormalizedVariant {
            gene,
            variant_original: original,
            hgvs_protein: Some(format!("p.{}", canonical)),
            variant_normalized: canonical,
            kind,
            position: Some(position),
            ref_aa: Some(ref_aa),
            alt_aa: Some(alt_aa),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_protein_prefix(v: &str) -> &str {
    let trimmed = v.trim();
    if trimmed.len() > 2 && (trimmed.starts_with("p.") || trimmed.starts_with("P.")) {
        &trimmed[2..]
    } else {
        trimmed
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn norm() -> Normalizer {
        Normalizer::new()
    }

    #[test]
    fn test_short_missense() {
        let v = norm().normalize("braf", "V600E").unwrap();
        assert_eq!(v.gene, "BRAF");
        assert_eq!(v.variant_normalized, "V600E");
        assert_eq!(v.kind, VariantKind::Missense);
        assert_eq!(v.hgvs_protein.as_deref(), Some("p.V600E"));
        assert_eq!(v.position, Some(600));
        assert_eq!(v.ref_aa, Some('V'));
        assert_eq!(v.alt_aa, Some('E'));
    }

    #[test]
    fn test_all_notations_converge() {
        let n = norm();
        for input in ["Val600Glu", "VAL600GLU", "p.V600E", "v600e", "p.Val600Glu"] {
            let v = n.normalize("BRAF", input).unwrap();
            assert_eq!(v.variant_normalized, "V600E", "input {input}");
            assert_eq!(v.kind, VariantKind::Missense, "input {input}");
        }
    }

    #[test]
    fn test_idempotent() {
        let n = norm();
        let first = n.normalize("EGFR", "Leu858Arg").unwrap();
        let second = n.normalize("EGFR", &first.variant_normalized).unwrap();
        assert_eq!(first.variant_normalized, second.variant_normalized);
        assert_eq!(first.kind, second.kind);
    }

    #[test]
    fn test_nonsense() {
        let v = norm().normalize("TP53", "R213*").unwrap();
        assert_eq!(v.kind, VariantKind::Nonsense);
        assert_eq!(v.variant_normalized, "R213*");
        assert_eq!(v.alt_aa, Some('*'));
    }

    #[test]
    fn test_frameshift() {
        let v = norm().normalize("APC", "T1556fs").unwrap();
        assert_eq!(v.kind, VariantKind::Frameshift);
        assert_eq!(v.variant_normalized, "T1556fs");
        assert_eq!(v.position, Some(1556));

        let v = norm().normalize("BRCA1", "K745fs*12").unwrap();
        assert_eq!(v.variant_normalized, "K745fs*12");
    }

    #[test]
    fn test_small_indels() {
        let n = norm();
        let v = n.normalize("EGFR", "E746_A750del").unwrap();
        assert_eq!(v.kind, VariantKind::Deletion);
        assert_eq!(v.variant_normalized, "E746_A750del");
        assert_eq!(v.position, Some(746));

        let v = n.normalize("ERBB2", "A775_G776insYVMA").unwrap();
        assert_eq!(v.kind, VariantKind::Insertion);

        let v = n.normalize("KIT", "A502_Y503dup").unwrap();
        assert_eq!(v.kind, VariantKind::Duplication);

        let v = n.normalize("EGFR", "L747_A750delinsP").unwrap();
        assert_eq!(v.kind, VariantKind::OtherIndel);
    }

    #[test]
    fn test_structural_classes_rejected() {
        let n = norm();
        for input in [
            "fusion",
            "EML4-ALK rearrangement",
            "amplification",
            "ERBB2 amp",
            "overexpression",
            "exon 14 skipping",
            "splice site",
            "exon 19 deletion",
            "truncation",
        ] {
            let err = n.normalize("ALK", input).unwrap_err();
            assert!(
                matches!(err, RejectedVariant::UnsupportedClass { .. }),
                "expected rejection for {input}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_unrecognized_notation() {
        let err = norm().normalize("BRAF", "wild-type").unwrap_err();
        assert!(matches!(err, RejectedVariant::UnrecognizedNotation { .. }));
    }

    #[test]
    fn test_empty_gene_rejected() {
        assert_eq!(norm().normalize("  ", "V600E").unwrap_err(), RejectedVariant::EmptyGene);
    }

    #[test]
    fn test_residue_range_del_admitted_but_exon_del_rejected() {
        let n = norm();
        assert!(n.normalize("EGFR", "E746_A750del").is_ok());
        assert!(n.normalize("EGFR", "exon 19 del").is_err());
    }
}
