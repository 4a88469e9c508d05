//! The three LLM services: paper relevance scoring, literature
//! knowledge extraction, and the narrative writer.
//!
//! Each service takes a fully serialized context and returns a typed
//! structure. The narrator cannot move a tier: if its prose names a
//! tier other than the one it was given, the prose is discarded and a
//! templated fallback is used instead.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use oncotier_common::settings::LlmSettings;
use oncotier_evidence::aggregate::{LiteratureAnalyst, PaperScore};
use oncotier_evidence::models::{
    LiteratureDrugCall, LiteratureKnowledge, LiteratureSignal, Paper,
};
use oncotier_evidence::EvidenceRequest;
use tracing::{debug, warn};

use crate::audit::DecisionLog;
use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};

pub struct LlmService {
    backend: Arc<dyn LlmBackend>,
    settings: LlmSettings,
    log: Option<DecisionLog>,
}

impl LlmService {
    pub fn new(backend: Arc<dyn LlmBackend>, settings: LlmSettings, log: Option<DecisionLog>) -> Self {
        Self { backend, settings, log }
    }

    async fn chat(
        &self,
        kind: &str,
        messages: Vec<Message>,
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String, LlmError> {
        let payload: String = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let request_id = self
            .log
            .as_ref()
            .map(|l| l.log_request(kind, self.backend.model_id(), &payload));

        let started = Instant::now();
        let result = self
            .backend
            .complete(LlmRequest {
                messages,
                model: None,
                max_tokens: Some(max_tokens),
                temperature: Some(self.settings.temperature),
                json_mode,
            })
            .await;

        match &result {
            Ok(resp) => {
                if let (Some(log), Some(id)) = (&self.log, request_id) {
                    log.log_response(id, &resp.content, started.elapsed().as_millis() as u64);
                }
            }
            Err(e) => {
                if let (Some(log), Some(id)) = (&self.log, request_id) {
                    log.log_error(id, &e.to_string());
                }
            }
        }

        result.map(|r| r.content)
    }

    // ── Narrative ────────────────────────────────────────────────────────────

    /// Write the 3–5 sentence rationale for an already-decided tier.
    /// Falls back to a template when the model is unavailable or its
    /// prose disagrees with the tier it was given.
    pub async fn write_narrative(&self, input: &NarrativeInput<'_>) -> String {
        let system = "You are a molecular tumor board assistant. You are given a \
                      final, already-decided AMP/ASCO/CAP tier and the evidence \
                      behind it. Write 3-5 sentences of clinical rationale for that \
                      tier. Do not propose a different tier. Name the relevant drugs. \
                      Plain prose, no markdown.";
        let user = format!(
            "Gene/variant: {}\nTumor type: {}\nAssigned tier: Tier {}\nDecision basis: {}\n\n\
             Evidence summary:\n{}\n{}",
            input.variant_label,
            input.tumor_type.unwrap_or("not specified"),
            input.tier_label,
            input.human_reason,
            input.evidence_summary,
            input.gene_notes,
        );
        let messages = vec![Message::system(system), Message::user(user)];

        match self
            .chat("narrative", messages, self.settings.max_tokens_narrative, false)
            .await
        {
            Ok(prose) => {
                let mentioned = mentioned_tiers(&prose);
                let expected = input.tier_label.to_uppercase();
                if mentioned.iter().any(|t| *t != expected) {
                    warn!(?mentioned, expected, "narrator named a different tier; using fallback");
                    fallback_narrative(input)
                } else {
                    prose.trim().to_string()
                }
            }
            Err(e) => {
                warn!(error = %e, "narrator unavailable; using fallback");
                fallback_narrative(input)
            }
        }
    }
}

/// Context for the narrative writer. The tier is final; the narrator
/// only explains it.
pub struct NarrativeInput<'a> {
    pub variant_label: &'a str,
    pub tumor_type: Option<&'a str>,
    /// "I" | "II" | "III" | "IV"
    pub tier_label: &'a str,
    pub human_reason: &'a str,
    pub evidence_summary: &'a str,
    pub gene_notes: &'a str,
}

/// Deterministic narrative used when the LLM fails or disagrees.
pub fn fallback_narrative(input: &NarrativeInput<'_>) -> String {
    let tumor = input.tumor_type.unwrap_or("the reported tumor type");
    format!(
        "{} in {} was classified as Tier {}. Basis: {}. \
         This classification was produced by the deterministic evidence cascade; \
         see the evidence dossier for the underlying sources.",
        input.variant_label, tumor, input.tier_label, input.human_reason
    )
}

/// Every tier token the text names, normalized to "I".."IV".
fn mentioned_tiers(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    let mut found = HashSet::new();
    let mut rest = lower.as_str();
    while let Some(idx) = rest.find("tier ") {
        let tail = &rest[idx + 5..];
        let numeral: String = tail
            .chars()
            .take_while(|c| matches!(c, 'i' | 'v' | 'I' | 'V'))
            .collect();
        if matches!(numeral.as_str(), "i" | "ii" | "iii" | "iv") {
            found.insert(numeral.to_uppercase());
        }
        rest = tail;
    }
    found
}

/// Strip markdown code fences the model sometimes wraps JSON in.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

// ── Literature analyst ───────────────────────────────────────────────────────

#[async_trait]
impl LiteratureAnalyst for LlmService {
    /// Score one paper's relevance to the gene/variant/tumor context.
    async fn score_paper(&self, paper: &Paper, req: &EvidenceRequest) -> anyhow::Result<PaperScore> {
        let content = paper
            .tldr
            .as_deref()
            .or(paper.abstract_text.as_deref())
            .unwrap_or("");
        if content.is_empty() {
            return Ok(PaperScore {
                relevance_score: 0.0,
                signal: LiteratureSignal::Irrelevant,
                drugs: vec![],
                key_finding: "No abstract or summary available".to_string(),
                confidence: 0.0,
            });
        }

        let tumor = req.tumor().unwrap_or("cancer (unspecified)");
        let system = "You are an oncology literature analyst. Judge whether a paper \
                      is relevant to a specific gene variant in a specific tumor type. \
                      Papers about the same codon or mutation class are relevant; \
                      papers about a different tumor type are not. Distinguish \
                      PREDICTIVE signals (variant predicts response or resistance to a \
                      specific drug) from PROGNOSTIC ones (outcome association only). \
                      Return valid JSON only, no markdown.";
        let user = format!(
            "Evaluate this paper's relevance to {} {} in {}:\n\nTITLE: {}\n\nCONTENT: {}\n\n\
             Return JSON: {{\"relevance_score\": <0-1>, \
             \"signal_type\": \"resistance|sensitivity|mixed|prognostic|unclear\", \
             \"drugs_mentioned\": [..], \"key_finding\": \"one sentence\", \
             \"confidence\": <0-1>}}",
            req.gene(),
            req.variant_short(),
            tumor,
            paper.title,
            content.chars().take(1500).collect::<String>(),
        );

        let raw = self
            .chat(
                "paper_scoring",
                vec![Message::system(system), Message::user(user)],
                self.settings.max_tokens_scoring,
                true,
            )
            .await?;
        let data: serde_json::Value = serde_json::from_str(strip_code_fences(&raw))?;

        let relevance_score = data["relevance_score"].as_f64().unwrap_or(0.0).clamp(0.0, 1.0);
        debug!(paper = %paper.paper_id, relevance_score, "paper scored");
        Ok(PaperScore {
            relevance_score,
            signal: LiteratureSignal::parse(data["signal_type"].as_str().unwrap_or("unclear")),
            drugs: string_list(&data["drugs_mentioned"]),
            key_finding: data["key_finding"].as_str().unwrap_or("").to_string(),
            confidence: data["confidence"].as_f64().unwrap_or(0.5).clamp(0.0, 1.0),
        })
    }

    /// Synthesize one structured knowledge block from the kept papers.
    async fn extract_knowledge(
        &self,
        papers: &[Paper],
        req: &EvidenceRequest,
    ) -> anyhow::Result<LiteratureKnowledge> {
        let tumor = req.tumor().unwrap_or("cancer (unspecified)");
        let papers_text: String = papers
            .iter()
            .take(5)
            .enumerate()
            .map(|(i, p)| {
                format!(
                    "Paper {} (PMID: {}):\nTitle: {}\nContent: {}\n",
                    i + 1,
                    p.pmid.as_deref().unwrap_or("unknown"),
                    p.title,
                    p.tldr
                        .as_deref()
                        .or(p.abstract_text.as_deref())
                        .unwrap_or("")
                        .chars()
                        .take(1000)
                        .collect::<String>(),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let system = "You are an oncology researcher synthesizing literature. \
                      Extract structured, clinically actionable information about one \
                      gene variant. PREDICTIVE resistance means the variant excludes a \
                      specific targeted therapy; an outcome association without a \
                      specific drug is PROGNOSTIC, not resistance. Only report \
                      findings the provided papers support. Return valid JSON only, \
                      no markdown.";
        let user = format!(
            "Extract knowledge about {} {} in {} from these papers:\n\n{}\n\
             Return JSON: {{\"mutation_type\": \"primary|secondary|unknown\", \
             \"resistant_to\": [{{\"drug\": \"..\", \"evidence\": \
             \"in vitro|preclinical|clinical|FDA-labeled\", \"is_predictive\": true}}], \
             \"sensitive_to\": [{{\"drug\": \"..\", \"evidence\": \"..\"}}], \
             \"evidence_level\": \"FDA-approved|Phase 3|Phase 2|Preclinical|Case reports|None\", \
             \"rationale\": \"one sentence\", \"references\": [\"PMID\", ..], \
             \"confidence\": <0-1>}}",
            req.gene(),
            req.variant_short(),
            tumor,
            papers_text,
        );

        let raw = self
            .chat(
                "knowledge_extraction",
                vec![Message::system(system), Message::user(user)],
                self.settings.max_tokens_extraction,
                true,
            )
            .await?;
        let data: serde_json::Value = serde_json::from_str(strip_code_fences(&raw))?;

        Ok(LiteratureKnowledge {
            mutation_type: data["mutation_type"].as_str().unwrap_or("unknown").to_string(),
            resistant_to: drug_calls(&data["resistant_to"]),
            sensitive_to: drug_calls(&data["sensitive_to"]),
            evidence_level_tag: data["evidence_level"].as_str().unwrap_or("None").to_string(),
            rationale: data["rationale"].as_str().unwrap_or("").to_string(),
            references: string_list(&data["references"]),
            confidence: data["confidence"].as_f64().unwrap_or(0.0).clamp(0.0, 1.0),
        })
    }
}

fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|xs| xs.iter().filter_map(|x| x.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn drug_calls(value: &serde_json::Value) -> Vec<LiteratureDrugCall> {
    value
        .as_array()
        .map(|xs| {
            xs.iter()
                .filter_map(|x| {
                    let drug = x["drug"].as_str()?.to_string();
                    Some(LiteratureDrugCall {
                        drug,
                        evidence: x["evidence"].as_str().unwrap_or("unknown").to_string(),
                        predictive: x["is_predictive"].as_bool().unwrap_or(true),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentioned_tiers() {
        let tiers = mentioned_tiers("This is a Tier I finding, not Tier III.");
        assert!(tiers.contains("I"));
        assert!(tiers.contains("III"));
        assert_eq!(tiers.len(), 2);
    }

    #[test]
    fn test_mentioned_tiers_none() {
        assert!(mentioned_tiers("strong evidence for sensitivity").is_empty());
        // "tiered" is not a tier token
        assert!(mentioned_tiers("a tiered approach").is_empty());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_fallback_narrative_names_tier_and_reason() {
        let input = NarrativeInput {
            variant_label: "BRAF V600E",
            tumor_type: Some("Melanoma"),
            tier_label: "I",
            human_reason: "FDA-approved therapy for this variant in this tumor type",
            evidence_summary: "",
            gene_notes: "",
        };
        let text = fallback_narrative(&input);
        assert!(text.contains("Tier I"));
        assert!(text.contains("BRAF V600E"));
        assert!(text.contains("Melanoma"));
    }

    #[test]
    fn test_drug_calls_parsing() {
        let v = serde_json::json!([
            {"drug": "osimertinib", "evidence": "clinical", "is_predictive": true},
            {"drug": "erlotinib", "evidence": "FDA-labeled"},
            {"evidence": "orphan entry without drug"}
        ]);
        let calls = drug_calls(&v);
        assert_eq!(calls.len(), 2);
        assert!(calls[1].predictive); // defaults to predictive
    }

    #[test]
    fn test_string_list() {
        assert_eq!(string_list(&serde_json::json!(["a", "b"])), vec!["a", "b"]);
        assert!(string_list(&serde_json::json!(null)).is_empty());
    }
}
