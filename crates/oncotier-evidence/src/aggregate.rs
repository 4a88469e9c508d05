//! Concurrent evidence aggregation.
//!
//! All source clients run concurrently under one per-assessment
//! deadline. A source that errors out after retries, or is still in
//! flight when the deadline expires, is recorded as absent/degraded and
//! never aborts the assessment. The literature sub-pipeline scores each
//! paper with the LLM, drops the irrelevant ones, and extracts one
//! consolidated knowledge block from the keepers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use oncotier_common::retry::RetryPolicy;
use oncotier_common::{SandboxClient, Settings};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::models::{
    Evidence, LiteratureFragment, LiteratureKnowledge, LiteratureSignal, OncoKbFragment, Paper,
    SourceSlot,
};
use crate::sources::{
    CgiClient, CivicClient, ClinicalTrialsClient, EvidenceRequest, FdaClient, LiteratureClient,
    MyVariantClient, OncoKbGeneList, ViccClient,
};

/// LLM relevance verdict for one paper.
#[derive(Debug, Clone)]
pub struct PaperScore {
    pub relevance_score: f64,
    pub signal: LiteratureSignal,
    pub drugs: Vec<String>,
    pub key_finding: String,
    pub confidence: f64,
}

/// The two pure literature services the aggregator needs. Implemented
/// by the LLM layer; mocked in tests.
#[async_trait]
pub trait LiteratureAnalyst: Send + Sync {
    async fn score_paper(&self, paper: &Paper, req: &EvidenceRequest) -> anyhow::Result<PaperScore>;

    async fn extract_knowledge(
        &self,
        papers: &[Paper],
        req: &EvidenceRequest,
    ) -> anyhow::Result<LiteratureKnowledge>;
}

pub struct Aggregator {
    myvariant: MyVariantClient,
    fda: FdaClient,
    cgi: CgiClient,
    vicc: Option<ViccClient>,
    civic: CivicClient,
    literature: LiteratureClient,
    trials: ClinicalTrialsClient,
    oncokb: Arc<OncoKbGeneList>,
    analyst: Option<Arc<dyn LiteratureAnalyst>>,
    retry: RetryPolicy,
    score_threshold: f64,
    evidence_item_limit: usize,
    /// Per-host concurrency caps, shared across assessments.
    host_limits: HashMap<&'static str, Semaphore>,
}

impl Aggregator {
    pub fn new(
        http: SandboxClient,
        settings: &Settings,
        oncokb: Arc<OncoKbGeneList>,
        analyst: Option<Arc<dyn LiteratureAnalyst>>,
    ) -> Self {
        Self {
            myvariant: MyVariantClient::new(http.clone()),
            fda: FdaClient::new(http.clone()),
            cgi: CgiClient::new(
                http.clone(),
                Path::new(&settings.sources.cgi_cache_dir),
                settings.sources.cgi_cache_ttl_days,
            ),
            vicc: settings
                .sources
                .vicc_enabled
                .then(|| ViccClient::new(http.clone())),
            civic: CivicClient::new(http.clone()),
            literature: LiteratureClient::new(http.clone(), Settings::semantic_scholar_api_key()),
            trials: ClinicalTrialsClient::new(http),
            oncokb,
            analyst,
            retry: RetryPolicy::new(settings.pipeline.retries),
            score_threshold: settings.pipeline.literature_score_threshold,
            evidence_item_limit: settings.sources.evidence_item_limit,
            host_limits: build_host_limits(settings.sources.per_host_permits),
        }
    }

    /// Fan out all sources, wait for completion or the deadline, and
    /// merge the fragments into one dossier.
    #[instrument(skip(self, req), fields(gene = req.gene(), variant = req.variant_short()))]
    pub async fn gather(&self, req: &EvidenceRequest, deadline: Instant) -> Evidence {
        let (myvariant, fda, cgi, vicc, civic, literature_raw, trials) = tokio::join!(
            self.slot("myvariant", deadline, || self.myvariant.fetch(req)),
            self.slot("fda", deadline, || self.fda.fetch(req)),
            self.slot("cgi", deadline, || self.cgi.fetch(req)),
            async {
                match &self.vicc {
                    Some(client) => self.slot("vicc", deadline, || client.fetch(req)).await,
                    None => SourceSlot::skipped(),
                }
            },
            self.slot("civic", deadline, || self.civic.fetch(req)),
            self.slot("literature", deadline, || self.literature.fetch(req)),
            self.slot("clinicaltrials", deadline, || self.trials.fetch(req)),
        );

        let literature = match literature_raw {
            SourceSlot::Present(frag) => self.literature_pipeline(frag, req, deadline).await,
            absent => absent,
        };

        // Cap per-source item volume before the dossier is sealed.
        let vicc = vicc.map_present(|mut frag| {
            frag.associations.truncate(self.evidence_item_limit);
            frag
        });
        let civic = civic.map_present(|mut frag| {
            frag.evidence_items.truncate(self.evidence_item_limit);
            frag
        });
        let trials = trials.map_present(|mut frag| {
            frag.trials.truncate(self.evidence_item_limit);
            frag
        });

        let evidence = Evidence {
            variant: req.variant.clone(),
            tumor_type: req.tumor_type.clone(),
            myvariant,
            fda,
            cgi,
            vicc,
            civic,
            literature,
            trials,
            oncokb: SourceSlot::present(OncoKbFragment {
                is_cancer_gene: self.oncokb.is_cancer_gene(req.gene()),
            }),
        };

        info!(
            missing = evidence.missing_source_count(),
            sources = ?evidence.present_sources(),
            "evidence gathered"
        );
        evidence
    }

    /// Wrap one source fetch with retry and the shared deadline,
    /// converting any failure into a degraded slot.
    async fn slot<T, F, Fut>(&self, name: &'static str, deadline: Instant, op: F) -> SourceSlot<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        if Instant::now() >= deadline {
            warn!(source = name, "deadline already expired, skipping");
            return SourceSlot::degraded();
        }
        let fetch = async {
            // Waiting for a host permit counts against the deadline.
            let _permit = match self.host_limits.get(name) {
                Some(sem) => sem.acquire().await.ok(),
                None => None,
            };
            self.retry.run(deadline, op).await
        };
        match tokio::time::timeout_at(deadline, fetch).await {
            Ok(Ok(value)) => SourceSlot::present(value),
            Ok(Err(e)) => {
                warn!(source = name, error = %e, "source degraded");
                SourceSlot::degraded()
            }
            Err(_) => {
                warn!(source = name, "source cancelled at deadline");
                SourceSlot::degraded()
            }
        }
    }

    /// Per-paper relevance scoring, threshold filter, then one
    /// knowledge-extraction call over the kept set. An unavailable or
    /// failing analyst drops the literature contribution to absent;
    /// missing the LLM entirely keeps the raw papers without knowledge.
    async fn literature_pipeline(
        &self,
        fragment: LiteratureFragment,
        req: &EvidenceRequest,
        deadline: Instant,
    ) -> SourceSlot<LiteratureFragment> {
        let Some(analyst) = &self.analyst else {
            return SourceSlot::present(fragment);
        };
        if fragment.papers.is_empty() {
            return SourceSlot::present(fragment);
        }

        let scored: Vec<(Paper, anyhow::Result<PaperScore>)> =
            stream::iter(fragment.papers.into_iter().map(|paper| async move {
                let result =
                    match tokio::time::timeout_at(deadline, analyst.score_paper(&paper, req)).await
                    {
                        Ok(r) => r,
                        Err(_) => Err(anyhow::anyhow!("paper scoring cancelled at deadline")),
                    };
                (paper, result)
            }))
            .buffer_unordered(4)
            .collect()
            .await;

        let mut kept = Vec::new();
        let mut any_scored = false;
        for (mut paper, result) in scored {
            match result {
                Ok(score) => {
                    any_scored = true;
                    if score.relevance_score >= self.score_threshold {
                        paper.score = Some(score.relevance_score);
                        paper.signal = Some(score.signal);
                        paper.drugs = score.drugs;
                        kept.push(paper);
                    }
                }
                Err(e) => warn!(paper = %paper.paper_id, error = %e, "paper scoring failed"),
            }
        }

        if !any_scored {
            warn!("literature scorer unavailable; dropping literature to absent");
            return SourceSlot::degraded();
        }
        if kept.is_empty() {
            return SourceSlot::present(LiteratureFragment { papers: kept, knowledge: None });
        }

        match tokio::time::timeout_at(deadline, analyst.extract_knowledge(&kept, req)).await {
            Ok(Ok(knowledge)) => SourceSlot::present(LiteratureFragment {
                papers: kept,
                knowledge: Some(knowledge),
            }),
            Ok(Err(e)) => {
                warn!(error = %e, "knowledge extraction failed; dropping literature to absent");
                SourceSlot::degraded()
            }
            Err(_) => {
                warn!("knowledge extraction cancelled at deadline");
                SourceSlot::degraded()
            }
        }
    }
}

/// One semaphore per upstream host. Semantic Scholar is additionally
/// rate-limited by its own token bucket inside the client, so it only
/// needs one slot here.
fn build_host_limits(permits: usize) -> HashMap<&'static str, Semaphore> {
    let permits = permits.max(1);
    let mut limits = HashMap::new();
    for name in ["myvariant", "fda", "cgi", "vicc", "civic", "clinicaltrials"] {
        limits.insert(name, Semaphore::new(permits));
    }
    limits.insert("literature", Semaphore::new(1));
    limits
}

// ── Tests ─────────────────────────────────────────────────────────────────────
