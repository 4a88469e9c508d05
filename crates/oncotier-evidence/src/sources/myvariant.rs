//! MyVariant.info query client.
//!
//! API docs: https://docs.myvariant.info/en/latest/
//! Endpoint: https://myvariant.info/v1/query
//!
//! MyVariant aggregates COSMIC, dbSNP, ClinVar, CADD, gnomAD, and CIViC
//! annotations behind one query endpoint. Three query shapes are tried
//! in order; the first with hits wins.

use oncotier_common::SandboxClient;
use tracing::{debug, instrument};

use super::EvidenceRequest;
use crate::models::{CivicEvidenceItem, EvidenceLevel, MyVariantFragment};

const QUERY_URL: &str = "https://myvariant.info/v1/query";

const FIELDS: &str = "cosmic.cosmic_id,dbsnp.rsid,clinvar,cadd.phred,cadd.gene,\
                      dbnsfp.polyphen2.hdiv.pred,dbnsfp.alphamissense,\
                      gnomad_exome.af.af,civic,snpeff";

pub struct MyVariantClient {
    client: SandboxClient,
}

impl MyVariantClient {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }

    /// Query shapes in decreasing specificity: `GENE p.VARIANT`,
    /// `GENE:VARIANT`, `GENE VARIANT`.
    fn query_shapes(req: &EvidenceRequest) -> Vec<String> {
        let gene = req.gene();
        let variant = req.variant_short();
        vec![
            format!("{} p.{}", gene, variant),
            format!("{}:{}", gene, variant),
            format!("{} {}", gene, variant),
        ]
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, req: &EvidenceRequest) -> anyhow::Result<MyVariantFragment> {
        for query in Self::query_shapes(req) {
            let resp: serde_json::Value = self
                .client
                .get(QUERY_URL)?
                .query(&[("q", query.as_str()), ("fields", FIELDS), ("size", "3")])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let hits = resp["hits"].as_array().cloned().unwrap_or_default();
            if hits.is_empty() {
                continue;
            }
            debug!(query, n = hits.len(), "MyVariant hits");
            return Ok(parse_hit(&hits[0]));
        }
        Ok(MyVariantFragment::default())
    }
}

fn parse_hit(hit: &serde_json::Value) -> MyVariantFragment {
    let clinvar = &hit["clinvar"];
    // rcv may be an object or an array of submissions.
    let clinvar_significance = clinvar["rcv"]["clinical_significance"]
        .as_str()
        .or_else(|| clinvar["rcv"][0]["clinical_significance"].as_str())
        .or_else(|| clinvar["clinical_significance"].as_str())
        .map(String::from);

    let alphamissense = &hit["dbnsfp"]["alphamissense"];

    MyVariantFragment {
        cosmic_id: hit["cosmic"]["cosmic_id"].as_str().map(String::from),
        dbsnp_id: hit["dbsnp"]["rsid"].as_str().map(String::from),
        clinvar_id: clinvar["variant_id"]
            .as_i64()
            .map(|v| v.to_string())
            .or_else(|| clinvar["variant_id"].as_str().map(String::from)),
        ncbi_gene_id: clinvar["gene"]["id"]
            .as_i64()
            .map(|v| v.to_string())
            .or_else(|| hit["cadd"]["gene"]["gene_id"].as_str().map(String::from)),
        hgvs_genomic: hit["_id"].as_str().map(String::from),
        hgvs_protein: hit["snpeff"]["ann"]["hgvs_p"]
            .as_str()
            .or_else(|| hit["snpeff"]["ann"][0]["hgvs_p"].as_str())
            .map(String::from),
        polyphen2_prediction: hit["dbnsfp"]["polyphen2"]["hdiv"]["pred"]
            .as_str()
            .or_else(|| hit["dbnsfp"]["polyphen2"]["hdiv"]["pred"][0].as_str())
            .map(String::from),
        cadd_score: hit["cadd"]["phred"].as_f64(),
        gnomad_exome_af: hit["gnomad_exome"]["af"]["af"].as_f64(),
        alphamissense_score: alphamissense["am_pathogenicity"].as_f64(),
        alphamissense_prediction: alphamissense["am_class"]
            .as_str()
            .or_else(|| alphamissense["am_class"][0].as_str())
            .map(String::from),
        clinvar_significance,
        civic_evidence: parse_civic(&hit["civic"]),
    }
}

fn parse_civic(civic: &serde_json::Value) -> Vec<CivicEvidenceItem> {
    let containers = match civic {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::Object(_) => vec![civic.clone()],
        _ => return vec![],
    };

    let mut out = Vec::new();
    for container in containers {
        let items = container["evidence_items"].as_array().cloned().unwrap_or_default();
        for item in items {
            out.push(CivicEvidenceItem {
                evidence_type: item["evidence_type"].as_str().map(String::from),
                evidence_level: item["evidence_level"].as_str().and_then(EvidenceLevel::parse),
                significance: item["significance"]
                    .as_str()
                    .or_else(|| item["clinical_significance"].as_str())
                    .map(String::from),
                disease: item["disease"]["name"]
                    .as_str()
                    .or_else(|| item["disease"]["display_name"].as_str())
                    .map(String::from),
                drugs: item["therapies"]
                    .as_array()
                    .or_else(|| item["drugs"].as_array())
                    .map(|ds| {
                        ds.iter()
                            .filter_map(|d| d["name"].as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default(),
                description: item["description"].as_str().map(String::from),
            });
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
