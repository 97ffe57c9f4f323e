use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::LitlensError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// An HTTP client that only issues requests to approved hosts.
/// Subdomains of an allowed host are allowed as well.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Client with the default allowlist of literature and LLM APIs.
    pub fn new() -> Result<Self, LitlensError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, LitlensError> {
        let domains = [
            "eutils.ncbi.nlm.nih.gov", // PubMed E-utilities
            "www.ebi.ac.uk",           // Europe PMC REST
            "api.unpaywall.org",       // Unpaywall
            "api.openai.com",          // OpenAI
            "localhost",
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("litlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LitlensError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else { return false };
        let Some(host) = parsed.host_str() else { return false };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, LitlensError> {
        self.request(reqwest::Method::GET, url)
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, LitlensError> {
        self.request(reqwest::Method::POST, url)
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> Result<reqwest::RequestBuilder, LitlensError> {
        if !self.is_allowed(url) {
            tracing::warn!(url = %url, "Blocked request to host outside allowlist");
            return Err(LitlensError::Security(format!("domain not in allowlist for URL {}", url)));
        }
        Ok(self.client.request(method, url))
    }
}
