//! Curated gene-level knowledge tables.
//!
//! These are the fast, API-independent tables the tier engine and
//! narrator consult: oncogene mutation classes, pathway-actionable tumor
//! suppressors, investigational-only gene/tumor pairs, subtype-defining
//! variants, and gene role sets.

use serde::Serialize;
use std::collections::HashSet;

// ── Oncogene mutation classes ────────────────────────────────────────────────
//
// Some oncogenes have distinct mutation classes with different
// therapeutic profiles. BRAF is the canonical example: class I (V600)
// responds to V600 inhibitors, class II/III do not and route to MEK
// inhibition instead.

#[derive(Debug, Clone, Serialize)]
pub struct MutationClass {
    pub gene: &'static str,
    pub name: &'static str,
    pub variants: &'static [&'static str],
    /// Codon interval for exon-level membership (KIT).
    pub codon_range: Option<(u32, u32)>,
    pub mechanism: &'static str,
    pub drugs: &'static [&'static str],
    /// Tumor tokens with FDA approval for this class.
    pub fda_tumors: &'static [&'static str],
    pub note: Option<&'static str>,
}

static MUTATION_CLASSES: &[MutationClass] = &[
    MutationClass {
        gene: "BRAF",
        name: "Class I (V600)",
        variants: &["V600E", "V600K", "V600D", "V600R", "V600M", "V600G"],
        codon_range: None,
        mechanism: "RAS-independent monomer signaling",
        drugs: &["vemurafenib", "dabrafenib", "encorafenib"],
        fda_tumors: &["melanoma", "nsclc", "lung", "colorectal", "thyroid"],
        note: Some("V600-specific inhibitors are effective"),
    },
    MutationClass {
        gene: "BRAF",
        name: "Class II (non-V600 activating)",
        variants: &[
            "G469A", "G469V", "G469E", "G469R", "G469S",
            "K601E", "K601N", "K601T",
            "L597Q", "L597R", "L597S", "L597V",
            "G464V", "G464E", "G464R",
            "G466V", "G466E", "G466A", "G466R",
            "N581S", "N581I", "N581K",
            "F595L", "A598V", "A598T", "T599I",
        ],
        codon_range: None,
        mechanism: "RAS-independent dimer signaling, resistant to V600 inhibitors",
        drugs: &["trametinib", "binimetinib", "cobimetinib", "selumetinib"],
        fda_tumors: &["nsclc", "lung"],
        note: Some("V600 inhibitors cause paradoxical activation; use MEK inhibitors"),
    },
    MutationClass {
        gene: "BRAF",
        name: "Class III (kinase-impaired)",
        variants: &[
            "D594G", "D594N", "D594E", "D594H", "D594A", "D594V",
            "G596R", "G596D", "G596C",
        ],
        codon_range: None,
        mechanism: "Kinase-impaired, RAS-dependent signaling",
        drugs: &["trametinib", "binimetinib", "cobimetinib"],
        fda_tumors: &["nsclc", "lung"],
        note: Some("Only effective in RAS-wildtype tumors"),
    },
    MutationClass {
        gene: "KIT",
        name: "Exon 9 (extracellular)",
        variants: &[],
        codon_range: Some((449, 514)),
        mechanism: "Ligand-independent dimerization",
        drugs: &["imatinib (high dose)", "sunitinib"],
        fda_tumors: &["gist", "gastrointestinal stromal"],
        note: None,
    },
    MutationClass {
        gene: "KIT",
        name: "Exon 11 (juxtamembrane)",
        variants: &[],
        codon_range: Some((550, 591)),
        mechanism: "Loss of juxtamembrane autoinhibition",
        drugs: &["imatinib"],
        fda_tumors: &["gist", "gastrointestinal stromal"],
        note: None,
    },
    MutationClass {
        gene: "KIT",
        name: "Exon 17 (activation loop)",
        variants: &["D816V", "D816H", "D816Y", "N822K"],
        codon_range: Some((788, 828)),
        mechanism: "Constitutive activation-loop activation, imatinib-resistant",
        drugs: &["avapritinib"],
        fda_tumors: &["mastocytosis"],
        note: Some("Causes imatinib resistance in GIST"),
    },
    MutationClass {
        gene: "KRAS",
        name: "G12C",
        variants: &["G12C"],
        codon_range: None,
        mechanism: "Covalently targetable cysteine in switch II pocket",
        drugs: &["sotorasib", "adagrasib"],
        fda_tumors: &["nsclc", "lung", "colorectal"],
        note: None,
    },
    MutationClass {
        gene: "KRAS",
        name: "Non-G12C activating",
        variants: &["G12D", "G12V", "G12R", "G12S", "G12A", "G13D", "Q61H", "Q61L", "Q61R"],
        codon_range: None,
        mechanism: "Constitutive GTPase-deficient signaling, no approved direct inhibitor",
        drugs: &[],
        fda_tumors: &[],
        note: None,
    },
];

/// Mutation-class annotation for an oncogene variant, if any.
pub fn oncogene_mutation_class(gene: &str, variant: &str) -> Option<&'static MutationClass> {
    let gene_upper = gene.to_uppercase();
    let mut variant_upper = variant.to_uppercase();
    if let Some(stripped) = variant_upper.strip_prefix("P.") {
        variant_upper = stripped.to_string();
    }
    let position = parse_position(&variant_upper);

    MUTATION_CLASSES.iter().find(|class| {
        if class.gene != gene_upper {
            return false;
        }
        if class.variants.iter().any(|v| *v == variant_upper) {
            return true;
        }
        // Fall back to codon interval only when no explicit class named
        // the variant (exon 17 lists D816V explicitly and wins above).
        if let (Some((lo, hi)), Some(pos)) = (class.codon_range, position) {
            let explicitly_elsewhere = MUTATION_CLASSES
                .iter()
                .any(|c| c.gene == gene_upper && c.variants.iter().any(|v| *v == variant_upper));
            return !explicitly_elsewhere && pos >= lo && pos <= hi;
        }
        false
    })
}

fn parse_position(variant: &str) -> Option<u32> {
    let digits: String = variant
        .chars()
        .skip_while(|c| c.is_alphabetic())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ── Pathway-actionable tumor suppressors ─────────────────────────────────────
//
// TSGs where loss of function activates a druggable downstream pathway,
// unlike generic TSGs where LOF only confirms pathogenicity.

#[derive(Debug, Clone, Serialize)]
pub struct PathwayTsg {
    pub gene: &'static str,
    pub pathway: &'static str,
    pub mechanism: &'static str,
    pub drugs: &'static [&'static str],
    pub high_prevalence_tumors: &'static [&'static str],
}

static PATHWAY_TSGS: &[PathwayTsg] = &[
    PathwayTsg {
        gene: "PTEN",
        pathway: "PI3K/AKT/mTOR",
        mechanism: "PTEN loss releases PI3K signaling into AKT/mTOR activation",
        drugs: &["alpelisib", "capivasertib", "everolimus", "ipatasertib"],
        high_prevalence_tumors: &["endometrial", "endometrium", "prostate", "breast", "glioblastoma", "gbm"],
    },
    PathwayTsg {
        gene: "TSC1",
        pathway: "mTOR",
        mechanism: "TSC1 loss hyperactivates mTORC1",
        drugs: &["everolimus", "sirolimus", "temsirolimus"],
        high_prevalence_tumors: &["renal", "kidney", "bladder", "sega"],
    },
    PathwayTsg {
        gene: "TSC2",
        pathway: "mTOR",
        mechanism: "TSC2 loss hyperactivates mTORC1",
        drugs: &["everolimus", "sirolimus", "temsirolimus"],
        high_prevalence_tumors: &["renal", "kidney", "bladder", "sega"],
    },
    PathwayTsg {
        gene: "NF1",
        pathway: "RAS/MAPK",
        mechanism: "NF1 loss releases RAS signaling into MEK/ERK activation",
        drugs: &["selumetinib", "trametinib", "binimetinib", "cobimetinib"],
        high_prevalence_tumors: &["neurofibroma", "plexiform neurofibroma", "mpnst", "glioma", "melanoma"],
    },
    PathwayTsg {
        gene: "STK11",
        pathway: "AMPK/mTOR",
        mechanism: "STK11 loss inactivates AMPK and activates mTOR",
        drugs: &["everolimus"],
        high_prevalence_tumors: &["lung", "nsclc", "non-small cell lung", "cervical"],
    },
    PathwayTsg {
        gene: "VHL",
        pathway: "HIF",
        mechanism: "VHL loss stabilizes HIF and drives VEGF/angiogenesis",
        drugs: &["belzutifan", "axitinib", "pazopanib", "cabozantinib"],
        high_prevalence_tumors: &["renal", "kidney", "clear cell renal", "ccrcc", "hemangioblastoma"],
    },
];

pub fn pathway_actionable(gene: &str) -> Option<&'static PathwayTsg> {
    let gene_upper = gene.to_uppercase();
    PATHWAY_TSGS.iter().find(|t| t.gene == gene_upper)
}

pub fn is_high_prevalence_tumor(gene: &str, tumor_type: Option<&str>) -> bool {
    let Some(tumor) = tumor_type else { return false };
    let Some(info) = pathway_actionable(gene) else { return false };
    let tumor_lower = tumor.to_lowercase();
    info.high_prevalence_tumors
        .iter()
        .any(|t| tumor_lower.contains(t) || t.contains(tumor_lower.as_str()))
}

// ── Investigational-only pairs ───────────────────────────────────────────────
//
// Gene/tumor combinations with no approved targeted therapy despite
// active research; forced to Tier III by the engine. "*" matches any
// tumor.

static INVESTIGATIONAL_ONLY: &[(&str, &str)] = &[
    ("kras", "pancreatic"),
    ("kras", "pancreas"),
    ("nras", "melanoma"),
    ("tp53", "*"),
    ("apc", "colorectal"),
    ("apc", "colon"),
    ("vhl", "renal"),
    ("vhl", "kidney"),
    ("smad4", "pancreatic"),
    ("smad4", "pancreas"),
    ("cdkn2a", "melanoma"),
    ("arid1a", "*"),
];

pub fn is_investigational_only(gene: &str, tumor_type: Option<&str>) -> bool {
    let gene_lower = gene.to_lowercase();
    let tumor_lower = tumor_type.unwrap_or("").to_lowercase();
    INVESTIGATIONAL_ONLY.iter().any(|(g, t)| {
        *g == gene_lower && (*t == "*" || (!tumor_lower.is_empty() && tumor_lower.contains(t)))
    })
}

// ── Subtype-defining variants ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SubtypeRule {
    pub gene: &'static str,
    pub variants: &'static [&'static str],
    pub tumor_tokens: &'static [&'static str],
    pub subtype: &'static str,
}

static SUBTYPE_DEFINING: &[SubtypeRule] = &[
    SubtypeRule {
        gene: "POLE",
        variants: &["P286R", "V411L"],
        tumor_tokens: &["endometrial", "endometrium", "uterine"],
        subtype: "POLE-ultramutated endometrial carcinoma",
    },
    SubtypeRule {
        gene: "IDH1",
        variants: &["R132H", "R132C", "R132G", "R132S"],
        tumor_tokens: &["glioma", "astrocytoma", "oligodendroglioma"],
        subtype: "IDH-mutant diffuse glioma",
    },
    SubtypeRule {
        gene: "JAK2",
        variants: &["V617F"],
        tumor_tokens: &["polycythemia", "myelofibrosis", "myeloproliferative", "essential thrombocythemia"],
        subtype: "JAK2 V617F myeloproliferative neoplasm",
    },
];

pub fn subtype_defining(gene: &str, variant: &str, tumor_type: Option<&str>) -> Option<&'static SubtypeRule> {
    let Some(tumor) = tumor_type else { return None };
    let gene_upper = gene.to_uppercase();
    let variant_upper = variant.to_uppercase();
    let tumor_lower = tumor.to_lowercase();
    SUBTYPE_DEFINING.iter().find(|r| {
        r.gene == gene_upper
            && r.variants.iter().any(|v| *v == variant_upper)
            && r.tumor_tokens.iter().any(|t| tumor_lower.contains(t))
    })
}

// ── Gene role sets ───────────────────────────────────────────────────────────

pub fn oncogenes() -> HashSet<&'static str> {
    [
        "KRAS", "NRAS", "HRAS", "BRAF", "EGFR", "ERBB2", "MET", "ALK", "ROS1", "RET",
        "NTRK1", "NTRK2", "NTRK3", "FGFR1", "FGFR2", "FGFR3", "FGFR4", "PIK3CA", "AKT1",
        "MTOR", "KIT", "PDGFRA", "ABL1", "JAK2", "FLT3", "IDH1", "IDH2", "CTNNB1", "SMO",
        "PTPN11", "MAP2K1", "ARAF", "RAF1", "ERBB3", "DDR2", "ESR1", "AR", "GNA11", "GNAQ",
        "MYD88", "BTK",
    ]
    .into_iter()
    .collect()
}

pub fn tumor_suppressors() -> HashSet<&'static str> {
    [
        "TP53", "RB1", "PTEN", "APC", "CDKN2A", "NF1", "NF2", "VHL", "STK11", "KEAP1",
        "SMAD4", "FBXW7", "ARID1A", "SMARCA4", "SMARCB1", "PBRM1", "BAP1", "SETD2", "CDH1",
        "TSC1", "TSC2", "FLCN", "FH", "SDHB", "MEN1", "ATRX", "WT1", "RUNX1", "GATA3", "B2M",
    ]
    .into_iter()
    .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braf_class_i() {
        let c = oncogene_mutation_class("BRAF", "V600E").unwrap();
        assert_eq!(c.name, "Class I (V600)");
        assert!(c.drugs.contains(&"dabrafenib"));
    }

    #[test]
    fn test_braf_class_ii_and_iii() {
        assert_eq!(oncogene_mutation_class("BRAF", "G469A").unwrap().name, "Class II (non-V600 activating)");
        assert_eq!(oncogene_mutation_class("braf", "p.D594G").unwrap().name, "Class III (kinase-impaired)");
    }

    #[test]
    fn test_kit_exon_mapping() {
        assert_eq!(oncogene_mutation_class("KIT", "D816V").unwrap().name, "Exon 17 (activation loop)");
        // V559D has no explicit entry; codon interval places it in exon 11.
        assert_eq!(oncogene_mutation_class("KIT", "V559D").unwrap().name, "Exon 11 (juxtamembrane)");
        assert_eq!(oncogene_mutation_class("KIT", "A502_Y503dup").unwrap().name, "Exon 9 (extracellular)");
    }

    #[test]
    fn test_kras_g12c_vs_generic() {
        assert_eq!(oncogene_mutation_class("KRAS", "G12C").unwrap().name, "G12C");
        let generic = oncogene_mutation_class("KRAS", "G12D").unwrap();
        assert_eq!(generic.name, "Non-G12C activating");
        assert!(generic.drugs.is_empty());
    }

    #[test]
    fn test_unclassified_returns_none() {
        assert!(oncogene_mutation_class("TP53", "R273H").is_none());
        assert!(oncogene_mutation_class("BRAF", "A999Z").is_none());
    }

    #[test]
    fn test_investigational_pairs() {
        assert!(is_investigational_only("KRAS", Some("Pancreatic Adenocarcinoma")));
        assert!(is_investigational_only("kras", Some("pancreas")));
        assert!(is_investigational_only("NRAS", Some("Cutaneous Melanoma")));
        assert!(is_investigational_only("VHL", Some("Renal Cell Carcinoma")));
        assert!(!is_investigational_only("KRAS", Some("NSCLC")));
        assert!(!is_investigational_only("KRAS", None));
        assert!(!is_investigational_only("BRAF", Some("Melanoma")));
    }

    #[test]
    fn test_investigational_wildcard_tumor() {
        assert!(is_investigational_only("TP53", Some("Ovarian Cancer")));
        assert!(is_investigational_only("TP53", None));
        assert!(is_investigational_only("ARID1A", Some("Bladder Cancer")));
    }

    #[test]
    fn test_subtype_defining() {
        assert!(subtype_defining("POLE", "P286R", Some("Endometrial Carcinoma")).is_some());
        assert!(subtype_defining("POLE", "V411L", Some("endometrium")).is_some());
        assert!(subtype_defining("POLE", "P286R", Some("Colorectal")).is_none());
        assert!(subtype_defining("POLE", "P286R", None).is_none());
        assert!(subtype_defining("IDH1", "R132H", Some("Diffuse Astrocytoma")).is_some());
    }

    #[test]
    fn test_pathway_actionable_lookup() {
        let pten = pathway_actionable("PTEN").unwrap();
        assert_eq!(pten.pathway, "PI3K/AKT/mTOR");
        assert!(is_high_prevalence_tumor("PTEN", Some("Endometrial Cancer")));
        assert!(!is_high_prevalence_tumor("PTEN", Some("Melanoma")));
        assert!(pathway_actionable("RB1").is_none());
    }

    #[test]
    fn test_role_sets() {
        assert!(oncogenes().contains("KRAS"));
        assert!(tumor_suppressors().contains("TP53"));
        assert!(!oncogenes().contains("TP53"));
    }
}
