use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::OncotierError;

/// Hosts the assessment pipeline is permitted to contact. Everything
/// the eight evidence sources and the LLM providers need, and nothing
/// else; a URL outside this list is refused before any connection is
/// opened.
static DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "myvariant.info",                  // MyVariant
    "api.fda.gov",                     // openFDA drug labels
    "www.cancergenomeinterpreter.org", // CGI biomarker catalog
    "search.cancervariants.org",       // VICC meta-knowledgebase
    "civicdb.org",                     // CIViC GraphQL
    "api.semanticscholar.org",         // Semantic Scholar
    "clinicaltrials.gov",              // ClinicalTrials.gov v2
    "www.oncokb.org",                  // OncoKB cancer gene list
    "api.openai.com",                  // OpenAI LLMs
    "api.anthropic.com",               // Anthropic LLMs
    "localhost",                       // OpenAI-compatible local endpoints
    "127.0.0.1",
];

/// HTTP client capped to an allowlist of upstream hosts.
///
/// One instance is cloned into every source client so the whole
/// process draws from a single connection pool.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    inner: Client,
    allowed_hosts: HashSet<String>,
}

impl SandboxClient {
    pub fn new() -> Result<Self, OncotierError> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| OncotierError::Config(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            inner,
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
        })
    }

    /// Adds a hostname to the allowlist (its subdomains come with it).
    pub fn allow_domain(&mut self, host: &str) {
        self.allowed_hosts.insert(host.to_string());
    }

    /// A host passes when it is listed itself or when stripping leading
    /// labels reaches a listed parent domain.
    fn host_permitted(&self, host: &str) -> bool {
        let mut candidate = host;
        loop {
            if self.allowed_hosts.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, parent)) => candidate = parent,
                None => return false,
            }
        }
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| self.host_permitted(h)))
            .unwrap_or(false)
    }

    fn checked(&self, url: &str) -> Result<(), OncotierError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            Err(OncotierError::Security(format!(
                "refusing request to host outside the sandbox allowlist: {url}"
            )))
        }
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, OncotierError> {
        self.checked(url)?;
        Ok(self.inner.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, OncotierError> {
        self.checked(url)?;
        Ok(self.inner.post(url))
    }
}
