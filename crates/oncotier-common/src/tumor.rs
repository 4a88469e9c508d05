//! Tumor-type alias matching.
//!
//! Upstream sources spell the same tumor many ways (`NSCLC`,
//! `Non-Small Cell Lung Cancer`, `Lung Adenocarcinoma`). All matching in
//! the pipeline goes through this table so a single canonical token set
//! governs every source.

use std::collections::HashMap;

/// Abbreviation → family of lowercase full names.
fn build_alias_table() -> HashMap<&'static str, Vec<&'static str>> {
    let mut m = HashMap::new();
    m.insert("nsclc", vec![
        "non-small cell lung", "non small cell lung", "nsclc",
        "lung adenocarcinoma", "lung squamous", "lung cancer", "lung carcinoma",
    ]);
    m.insert("sclc", vec!["small cell lung", "sclc"]);
    m.insert("crc", vec![
        "colorectal", "colon", "rectal", "crc", "colorectal adenocarcinoma",
    ]);
    m.insert("gist", vec!["gastrointestinal stromal", "gist"]);
    m.insert("melanoma", vec!["melanoma", "cutaneous melanoma", "skin cancer"]);
    m.insert("pancreatic", vec![
        "pancreatic", "pancreas", "pancreatic adenocarcinoma", "pdac",
    ]);
    m.insert("breast", vec!["breast", "breast carcinoma", "mammary"]);
    m.insert("ovarian", vec!["ovarian", "ovary", "fallopian tube"]);
    m.insert("prostate", vec!["prostate", "prostatic"]);
    m.insert("renal", vec![
        "renal", "kidney", "renal cell", "clear cell renal", "ccrcc", "rcc",
    ]);
    m.insert("bladder", vec!["bladder", "urothelial"]);
    m.insert("gastric", vec!["gastric", "stomach", "gastroesophageal"]);
    m.insert("endometrial", vec!["endometrial", "endometrium", "uterine"]);
    m.insert("thyroid", vec!["thyroid", "papillary thyroid", "anaplastic thyroid"]);
    m.insert("glioma", vec![
        "glioma", "glioblastoma", "gbm", "astrocytoma", "oligodendroglioma",
    ]);
    m.insert("aml", vec!["acute myeloid leukemia", "aml"]);
    m.insert("cml", vec!["chronic myeloid leukemia", "cml"]);
    m.insert("cll", vec!["chronic lymphocytic leukemia", "cll"]);
    m.insert("mds", vec!["myelodysplastic", "mds"]);
    m.insert("mastocytosis", vec!["mastocytosis", "systemic mastocytosis"]);
    m.insert("cholangiocarcinoma", vec!["cholangiocarcinoma", "bile duct", "biliary"]);
    m.insert("hcc", vec!["hepatocellular", "liver cancer", "hcc"]);
    m.insert("hnscc", vec!["head and neck", "hnscc"]);
    m.insert("cervical", vec!["cervical", "cervix"]);
    m.insert("esophageal", vec!["esophageal", "oesophageal", "esophagus"]);
    m
}

/// Centralized tumor matcher shared read-only for the process lifetime.
pub struct TumorMatcher {
    aliases: HashMap<&'static str, Vec<&'static str>>,
}

impl TumorMatcher {
    pub fn new() -> Self {
        Self { aliases: build_alias_table() }
    }

    /// Collapse a free-text tumor description to its canonical token, if
    /// any alias family recognizes it.
    pub fn canonical(&self, tumor: &str) -> Option<&'static str> {
        let t = tumor.trim().to_lowercase();
        if t.is_empty() {
            return None;
        }
        for (abbrev, names) in &self.aliases {
            if t == *abbrev || names.iter().any(|n| t.contains(n) || n.contains(t.as_str())) {
                return Some(abbrev);
            }
        }
        None
    }

    /// Flexible match between the patient's tumor type and a disease
    /// string from an upstream source. Substring containment either way,
    /// then alias-family overlap.
    pub fn matches(&self, tumor_type: Option<&str>, disease: Option<&str>) -> bool {
        let (Some(tumor), Some(disease)) = (tumor_type, disease) else {
            return false;
        };
        let tumor_lower = tumor.trim().to_lowercase();
        let disease_lower = disease.trim().to_lowercase();
        if tumor_lower.is_empty() || disease_lower.is_empty() {
            return false;
        }

        if disease_lower.contains(&tumor_lower) || tumor_lower.contains(&disease_lower) {
            return true;
        }

        for (abbrev, names) in &self.aliases {
            let tumor_in_family =
                tumor_lower == *abbrev || names.iter().any(|n| tumor_lower.contains(n));
            if tumor_in_family {
                if disease_lower == *abbrev || names.iter().any(|n| disease_lower.contains(n)) {
                    return true;
                }
            }
        }
        false
    }
}

impl Default for TumorMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m() -> TumorMatcher {
        TumorMatcher::new()
    }

    #[test]
    fn test_nsclc_aliases_collapse() {
        let m = m();
        assert!(m.matches(Some("NSCLC"), Some("Non-Small Cell Lung Cancer")));
        assert!(m.matches(Some("NSCLC"), Some("Lung Adenocarcinoma")));
        assert!(m.matches(Some("Lung Adenocarcinoma"), Some("nsclc")));
    }

    #[test]
    fn test_substring_match() {
        let m = m();
        assert!(m.matches(Some("Melanoma"), Some("Cutaneous Melanoma of the Skin")));
    }

    #[test]
    fn test_unrelated_tumors_do_not_match() {
        let m = m();
        assert!(!m.matches(Some("GIST"), Some("Systemic Mastocytosis")));
        assert!(!m.matches(Some("Pancreatic Cancer"), Some("Melanoma")));
    }

    #[test]
    fn test_missing_sides() {
        let m = m();
        assert!(!m.matches(None, Some("Melanoma")));
        assert!(!m.matches(Some("Melanoma"), None));
        assert!(!m.matches(Some(""), Some("Melanoma")));
    }

    #[test]
    fn test_canonical_token() {
        let m = m();
        assert_eq!(m.canonical("Pancreatic Adenocarcinoma"), Some("pancreatic"));
        assert_eq!(m.canonical("clear cell renal carcinoma"), Some("renal"));
        assert_eq!(m.canonical("unknown primary"), None);
    }
}
