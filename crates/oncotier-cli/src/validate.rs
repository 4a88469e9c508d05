//! Validation harness: run the pipeline against gold-standard labels
//! and compute per-tier precision/recall/F1, a confusion matrix, and
//! the average tier distance.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use oncotier_engine::tier::Tier;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationCase {
    pub gene: String,
    pub variant: String,
    #[serde(default)]
    pub tumor_type: Option<String>,
    pub expected_tier: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TierMetrics {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseFailure {
    pub gene: String,
    pub variant: String,
    pub tumor_type: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub total_cases: usize,
    pub evaluated: usize,
    pub overall_accuracy: f64,
    pub per_tier: BTreeMap<String, TierMetrics>,
    /// Rows are expected tiers I..IV, columns predicted I..IV.
    pub confusion_matrix: Vec<Vec<usize>>,
    pub average_tier_distance: f64,
    pub failures: Vec<CaseFailure>,
}

/// Run every case through the pipeline with a bounded number in flight.
/// Per-case errors are captured into the report, never propagated.
pub async fn run_validation(
    pipeline: &Pipeline,
    cases: Vec<ValidationCase>,
    max_concurrent: usize,
) -> anyhow::Result<ValidationReport> {
    let total = cases.len();
    let outcomes: Vec<(ValidationCase, Result<Tier, String>)> =
        stream::iter(cases.into_iter().map(|case| async move {
            let result = pipeline
                .assess(&case.gene, &case.variant, case.tumor_type.as_deref())
                .await;
            let outcome = match result {
                Ok(assessment) => Tier::parse(&assessment.tier)
                    .ok_or_else(|| format!("unparseable tier {}", assessment.tier)),
                Err(e) => Err(e.to_string()),
            };
            (case, outcome)
        }))
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut pairs: Vec<(Tier, Tier)> = Vec::new();
    let mut failures = Vec::new();
    for (case, outcome) in outcomes {
        let Some(expected) = Tier::parse(&case.expected_tier) else {
            failures.push(CaseFailure {
                error: format!("unparseable expected tier {:?}", case.expected_tier),
                gene: case.gene,
                variant: case.variant,
                tumor_type: case.tumor_type,
            });
            continue;
        };
        match outcome {
            Ok(predicted) => pairs.push((expected, predicted)),
            Err(error) => {
                warn!(gene = %case.gene, variant = %case.variant, %error, "case failed");
                failures.push(CaseFailure {
                    error,
                    gene: case.gene,
                    variant: case.variant,
                    tumor_type: case.tumor_type,
                });
            }
        }
    }

    let report = build_report(total, &pairs, failures);
    info!(
        evaluated = report.evaluated,
        accuracy = report.overall_accuracy,
        "validation complete"
    );
    Ok(report)
}

const TIERS: [Tier; 4] = [Tier::I, Tier::II, Tier::III, Tier::IV];

fn build_report(
    total_cases: usize,
    pairs: &[(Tier, Tier)],
    failures: Vec<CaseFailure>,
) -> ValidationReport {
    let evaluated = pairs.len();
    let mut confusion = vec![vec![0usize; 4]; 4];
    for (expected, predicted) in pairs {
        confusion[(expected.rank() - 1) as usize][(predicted.rank() - 1) as usize] += 1;
    }

    let mut per_tier = BTreeMap::new();
    let mut correct = 0usize;
    for tier in TIERS {
        let i = (tier.rank() - 1) as usize;
        let tp = confusion[i][i];
        let fp: usize = (0..4).filter(|&j| j != i).map(|j| confusion[j][i]).sum();
        let false_negatives: usize = (0..4).filter(|&j| j != i).map(|j| confusion[i][j]).sum();
        correct += tp;

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + false_negatives);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        per_tier.insert(
            tier.as_str().to_string(),
            TierMetrics { tp, fp, false_negatives, precision, recall, f1 },
        );
    }

    let average_tier_distance = if evaluated > 0 {
        pairs
            .iter()
            .map(|(e, p)| (e.rank() as i32 - p.rank() as i32).unsigned_abs() as f64)
            .sum::<f64>()
            / evaluated as f64
    } else {
        0.0
    };

    ValidationReport {
        total_cases,
        evaluated,
        overall_accuracy: ratio(correct, evaluated),
        per_tier,
        confusion_matrix: confusion,
        average_tier_distance,
        failures,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let pairs = vec![(Tier::I, Tier::I), (Tier::II, Tier::II), (Tier::III, Tier::III)];
        let report = build_report(3, &pairs, vec![]);
        assert_eq!(report.overall_accuracy, 1.0);
        assert_eq!(report.average_tier_distance, 0.0);
        assert_eq!(report.per_tier["I"].f1, 1.0);
        assert_eq!(report.confusion_matrix[0][0], 1);
    }

    #[test]
    fn test_metric_identities() {
        // Expected I predicted II, expected II predicted II.
        let pairs = vec![(Tier::I, Tier::II), (Tier::II, Tier::II)];
        let report = build_report(2, &pairs, vec![]);

        let tier_ii = &report.per_tier["II"];
        assert_eq!(tier_ii.tp, 1);
        assert_eq!(tier_ii.fp, 1);
        assert_eq!(tier_ii.false_negatives, 0);
        assert!((tier_ii.precision - 0.5).abs() < 1e-9);
        assert!((tier_ii.recall - 1.0).abs() < 1e-9);
        // F1 = 2PR/(P+R)
        let expected_f1 = 2.0 * 0.5 * 1.0 / 1.5;
        assert!((tier_ii.f1 - expected_f1).abs() < 1e-9);

        let tier_i = &report.per_tier["I"];
        assert_eq!(tier_i.tp, 0);
        assert_eq!(tier_i.f1, 0.0); // P+R = 0 branch

        // accuracy = sum(TP) / N
        assert!((report.overall_accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_tier_distance() {
        let pairs = vec![(Tier::I, Tier::IV), (Tier::II, Tier::II)];
        let report = build_report(2, &pairs, vec![]);
        assert!((report.average_tier_distance - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_failures_do_not_enter_metrics() {
        let pairs = vec![(Tier::I, Tier::I)];
        let failures = vec![CaseFailure {
            gene: "ALK".into(),
            variant: "fusion".into(),
            tumor_type: None,
            error: "unsupported variant class".into(),
        }];
        let report = build_report(2, &pairs, failures);
        assert_eq!(report.total_cases, 2);
        assert_eq!(report.evaluated, 1);
        assert_eq!(report.overall_accuracy, 1.0);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(0, &[], vec![]);
        assert_eq!(report.overall_accuracy, 0.0);
        assert_eq!(report.average_tier_distance, 0.0);
    }

    #[test]
    fn test_case_deserialization() {
        let case: ValidationCase = serde_json::from_str(
            r#"{"gene": "BRAF", "variant": "V600E", "tumor_type": "Melanoma", "expected_tier": "I"}"#,
        )
        .unwrap();
        assert_eq!(case.gene, "BRAF");
        assert!(case.notes.is_none());
    }
}
