//! Per-assessment orchestration: admission, fan-out, tier decision,
//! narrative. Each assessment runs under one deadline and owns its
//! evidence exclusively.

use std::sync::Arc;
use std::time::Duration;

use oncotier_common::{OncotierError, SandboxClient, Settings};
use oncotier_engine::summary;
use oncotier_engine::tier::{get_tier_hint, TierConfig};
use oncotier_engine::Assessment;
use oncotier_evidence::aggregate::{Aggregator, LiteratureAnalyst};
use oncotier_evidence::sources::OncoKbGeneList;
use oncotier_evidence::EvidenceRequest;
use oncotier_llm::backend::{AnthropicBackend, LlmBackend, OpenAiBackend};
use oncotier_llm::service::{fallback_narrative, NarrativeInput};
use oncotier_llm::{DecisionLog, LlmService};
use oncotier_variant::Normalizer;
use tokio::time::Instant;
use tracing::info;

pub struct Pipeline {
    normalizer: Normalizer,
    aggregator: Aggregator,
    engine_config: TierConfig,
    llm: Option<Arc<LlmService>>,
    timeout: Duration,
}

impl Pipeline {
    /// Build the full pipeline from settings: shared HTTP transport,
    /// OncoKB gene list, LLM provider from environment keys (an absent
    /// key disables the provider and the literature sub-pipeline with
    /// it).
    pub async fn from_settings(settings: &Settings) -> Result<Self, OncotierError> {
        let http = SandboxClient::new()?;
        let oncokb = Arc::new(OncoKbGeneList::load(&http).await);

        let backend: Option<Arc<dyn LlmBackend>> = if let Some(key) = Settings::openai_api_key() {
            Some(Arc::new(OpenAiBackend::new(key, &settings.llm.model)))
        } else if let Some(key) = Settings::anthropic_api_key() {
            Some(Arc::new(AnthropicBackend::new(key, &settings.llm.model)))
        } else {
            info!("no LLM provider key found; narrative and literature analysis disabled");
            None
        };

        let llm = match backend {
            Some(backend) => {
                let log = match &settings.llm.decision_log {
                    Some(path) => Some(
                        DecisionLog::open(std::path::Path::new(path))
                            .map_err(|e| OncotierError::Config(e.to_string()))?,
                    ),
                    None => None,
                };
                Some(Arc::new(LlmService::new(backend, settings.llm.clone(), log)))
            }
            None => None,
        };

        let analyst: Option<Arc<dyn LiteratureAnalyst>> =
            llm.clone().map(|svc| svc as Arc<dyn LiteratureAnalyst>);

        Ok(Self {
            normalizer: Normalizer::new(),
            aggregator: Aggregator::new(http, settings, oncokb, analyst),
            engine_config: TierConfig::new(),
            llm,
            timeout: Duration::from_secs(settings.pipeline.timeout_sec),
        })
    }

    /// Run one assessment. Admission errors surface to the caller; all
    /// source failures degrade inside the aggregator.
    pub async fn assess(
        &self,
        gene: &str,
        variant: &str,
        tumor_type: Option<&str>,
    ) -> Result<Assessment, OncotierError> {
        let normalized = self.normalizer.normalize(gene, variant)?;
        let request = EvidenceRequest::new(normalized, tumor_type.map(String::from));
        let deadline = Instant::now() + self.timeout;

        let evidence = self.aggregator.gather(&request, deadline).await;
        let result = get_tier_hint(&evidence, request.tumor(), &self.engine_config);

        let variant_label = format!("{} {}", request.gene(), request.variant_short());
        let evidence_summary = summary::compact_summary(&evidence);
        let gene_notes = summary::gene_notes(&evidence);
        let narrative_input = NarrativeInput {
            variant_label: &variant_label,
            tumor_type: request.tumor(),
            tier_label: result.tier.as_str(),
            human_reason: &result.human_reason,
            evidence_summary: &evidence_summary,
            gene_notes: &gene_notes,
        };
        let narrative = match &self.llm {
            Some(llm) => llm.write_narrative(&narrative_input).await,
            None => fallback_narrative(&narrative_input),
        };

        info!(
            gene = request.gene(),
            variant = request.variant_short(),
            tier = result.tier.as_str(),
            reason = result.reason.as_str(),
            confidence = result.confidence,
            "assessment complete"
        );

        Ok(Assessment::build(&evidence, &result, narrative))
    }
}
