//! Variant-class matching against FDA indication text.
//!
//! Decides whether a concrete variant falls under a drug approval whose
//! label names the gene, a mutation class, or nothing specific. This is
//! what keeps BRAF G469A from claiming V600E approvals and T790M from
//! claiming first-generation TKI labels.

use std::collections::HashMap;

/// Tumor-contextual override for a class, e.g. KIT D816V which is
/// approved in mastocytosis but excluded in GIST unless the label names
/// the variant itself.
#[derive(Debug, Clone)]
pub struct SpecialRule {
    pub tumor_exclusion: &'static [&'static str],
    pub unless_explicit: bool,
}

#[derive(Debug, Clone)]
pub struct VariantClass {
    pub name: &'static str,
    /// Lowercase substrings that must appear in the indication text.
    pub patterns: &'static [&'static str],
    /// Uppercase explicit variants; "*" admits any variant of the gene.
    pub variants: &'static [&'static str],
    pub exclude_patterns: &'static [&'static str],
    /// Codon range admitting positional variants (residue-range indels).
    pub codon_range: Option<(u32, u32)>,
    pub special_rules: &'static [SpecialRule],
}

#[derive(Debug, Clone)]
pub struct GeneClasses {
    /// Any mutation of the gene qualifies (e.g. PIK3CA, ALK).
    pub default_approve: bool,
    /// A class pattern must match or the variant is rejected (BRAF, EGFR,
    /// KRAS): prevents non-V600 BRAF from claiming V600 approvals.
    pub require_explicit: bool,
    pub classes: &'static [VariantClass],
    /// Variants never admitted by gene-level matching for this gene,
    /// regardless of class (resistance variants living under their own
    /// labels, lab artifacts).
    pub exclude_variants: &'static [&'static str],
}

static BRAF_CLASSES: &[VariantClass] = &[VariantClass {
    name: "v600",
    patterns: &["v600"],
    variants: &["V600E", "V600K", "V600D", "V600R", "V600M", "V600G"],
    exclude_patterns: &[],
    codon_range: None,
    special_rules: &[],
}];

static EGFR_CLASSES: &[VariantClass] = &[VariantClass {
    name: "tki_sensitizing",
    patterns: &["egfr", "exon 19", "l858r"],
    variants: &["L858R", "L861Q", "G719A", "G719C", "G719S", "S768I"],
    exclude_patterns: &[],
    // Exon 19 residue-range deletions.
    codon_range: Some((729, 761)),
    special_rules: &[],
}];

static KRAS_CLASSES: &[VariantClass] = &[VariantClass {
    name: "g12c",
    patterns: &["g12c"],
    variants: &["G12C"],
    exclude_patterns: &[],
    codon_range: None,
    special_rules: &[],
}];

static KIT_CLASSES: &[VariantClass] = &[
    VariantClass {
        name: "gist_activating",
        patterns: &["gastrointestinal stromal", "gist"],
        variants: &["*"],
        exclude_patterns: &[],
        codon_range: None,
        special_rules: &[],
    },
    VariantClass {
        name: "d816v",
        patterns: &["mastocytosis", "d816v"],
        variants: &["D816V"],
        exclude_patterns: &[],
        codon_range: None,
        special_rules: &[SpecialRule {
            tumor_exclusion: &["gist", "gastrointestinal stromal"],
            unless_explicit: true,
        }],
    },
];

static PIK3CA_CLASSES: &[VariantClass] = &[];
static ALK_CLASSES: &[VariantClass] = &[];

fn build_gene_table() -> HashMap<&'static str, GeneClasses> {
    let mut m = HashMap::new();
    m.insert("BRAF", GeneClasses {
        default_approve: false,
        require_explicit: true,
        classes: BRAF_CLASSES,
        exclude_variants: &[],
    });
    m.insert("EGFR", GeneClasses {
        default_approve: false,
        require_explicit: true,
        classes: EGFR_CLASSES,
        // T790M/C797S live under their own resistance pathway; R108K is an
        // extracellular-domain variant with no TKI evidence.
        exclude_variants: &["T790M", "C797S", "R108K"],
    });
    m.insert("KRAS", GeneClasses {
        default_approve: false,
        require_explicit: true,
        classes: KRAS_CLASSES,
        exclude_variants: &[],
    });
    m.insert("KIT", GeneClasses {
        default_approve: false,
        require_explicit: false,
        classes: KIT_CLASSES,
        exclude_variants: &[],
    });
    m.insert("PIK3CA", GeneClasses {
        default_approve: true,
        require_explicit: false,
        classes: PIK3CA_CLASSES,
        exclude_variants: &[],
    });
    m.insert("ALK", GeneClasses {
        default_approve: true,
        require_explicit: false,
        classes: ALK_CLASSES,
        exclude_variants: &[],
    });
    m
}

/// Wild-type-requirement phrases; `{gene}` is substituted lowercased.
static GLOBAL_EXCLUSIONS: &[&str] = &[
    "{gene} wild-type",
    "{gene}-wild-type",
    "wild type {gene}",
    "without {gene} mutation",
    "{gene}-negative",
];

/// Outcome of matching a variant against one indication text.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassMatch {
    /// Admitted, with the matching class name.
    Admitted(&'static str),
    Rejected,
}

pub struct VariantClassTable {
    genes: HashMap<&'static str, GeneClasses>,
}

impl VariantClassTable {
    pub fn new() -> Self {
        Self { genes: build_gene_table() }
    }

    pub fn gene_config(&self, gene: &str) -> Option<&GeneClasses> {
        self.genes.get(gene.to_uppercase().as_str())
    }

    pub fn requires_explicit(&self, gene: &str) -> bool {
        self.gene_config(gene).map(|g| g.require_explicit).unwrap_or(false)
    }

    /// True when the canonical variant sits on the gene's exclusion list
    /// and must never be admitted through gene-level label matching.
    pub fn is_excluded_variant(&self, gene: &str, variant: &str) -> bool {
        self.gene_config(gene)
            .map(|g| g.exclude_variants.iter().any(|v| v.eq_ignore_ascii_case(variant)))
            .unwrap_or(false)
    }

    /// Tumor-contextual override. `Some(true)` force-admits,
    /// `Some(false)` force-rejects, `None` defers to class matching.
    pub fn check_special_rules(
        &self,
        gene: &str,
        variant: &str,
        indication_text: &str,
        tumor_type: Option<&str>,
    ) -> Option<bool> {
        let config = self.gene_config(gene)?;
        let variant_upper = variant.to_uppercase();
        let tumor_lower = tumor_type.unwrap_or("").to_lowercase();
        let indication_lower = indication_text.to_lowercase();

        for class in config.classes {
            let in_class = class.variants.contains(&"*")
                || class.variants.iter().any(|v| *v == variant_upper);
            if !in_class {
                continue;
            }
            for rule in class.special_rules {
                let tumor_excluded = rule
                    .tumor_exclusion
                    .iter()
                    .any(|te| tumor_lower.contains(te));
                if tumor_excluded {
                    if rule.unless_explicit {
                        return Some(indication_lower.contains(&variant.to_lowercase()));
                    }
                    return Some(false);
                }
            }
        }
        None
    }

    /// Match a canonical variant against an FDA indication text.
    ///
    /// Order: wild-type exclusions, special tumor rules, hard variant
    /// exclusions, then class admission. Genes without configuration and
    /// genes marked `default_approve` admit any variant once the gene is
    /// named.
    pub fn match_indication(
        &self,
        gene: &str,
        variant: &str,
        indication_text: &str,
        tumor_type: Option<&str>,
        position: Option<u32>,
    ) -> ClassMatch {
        let indication_lower = indication_text.to_lowercase();
        let gene_lower = gene.to_lowercase();
        let variant_upper = variant.to_uppercase();

        for pattern in GLOBAL_EXCLUSIONS {
            let resolved = pattern.replace("{gene}", &gene_lower);
            if indication_lower.contains(&resolved) {
                return ClassMatch::Rejected;
            }
        }

        if let Some(forced) = self.check_special_rules(gene, variant, &indication_lower, tumor_type)
        {
            return if forced {
                ClassMatch::Admitted("special_rule")
            } else {
                ClassMatch::Rejected
            };
        }

        if self.is_excluded_variant(gene, variant) {
            return ClassMatch::Rejected;
        }

        let Some(config) = self.gene_config(gene) else {
            return ClassMatch::Admitted("default");
        };

        if config.default_approve {
            return ClassMatch::Admitted("default");
        }

        for class in config.classes {
            let pattern_matched = class.patterns.iter().any(|p| indication_lower.contains(p));
            if !pattern_matched {
                continue;
            }
            if class.exclude_patterns.iter().any(|p| indication_lower.contains(p)) {
                continue;
            }
            if class.variants.contains(&"*") || class.variants.iter().any(|v| *v == variant_upper) {
                return ClassMatch::Admitted(class.name);
            }
            if let (Some((lo, hi)), Some(pos)) = (class.codon_range, position) {
                if pos >= lo && pos <= hi {
                    return ClassMatch::Admitted(class.name);
                }
            }
        }

        if config.require_explicit {
            return ClassMatch::Rejected;
        }
        ClassMatch::Admitted("default")
    }
}

impl Default for VariantClassTable {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
