//! Europe PMC REST API client.
//!
//! Base: https://www.ebi.ac.uk/europepmc/webservices/rest

use async_trait::async_trait;
use litlens_common::sandbox::SandboxClient as Client;
use litlens_common::Article;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::LiteratureSource;
use crate::error::SourceError;
use crate::pdf_url::PdfLocation;

const EPMC_BASE_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";
const CITATION_PAGE_SIZE: usize = 1000;

pub struct EuropePmcClient {
    client: Client,
    base_url: String,
}

/// An article citing, or cited by, another article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitedWork {
    pub id: String,
    /// Europe PMC source code, `MED` for PubMed records.
    pub source: String,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
}

impl EuropePmcClient {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::new()?,
            base_url: EPMC_BASE_URL.to_string(),
        })
    }

    /// Point at another deployment (a local mock in tests).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> anyhow::Result<Value> {
        let value = self.client
            .get(url)?
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(value)
    }

    #[instrument(skip(self))]
    async fn search_core(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Value>> {
        let params = [
            ("query", query.to_string()),
            ("resultType", "core".to_string()),
            ("pageSize", max_results.max(1).to_string()),
            ("format", "json".to_string()),
        ];
        let resp = self.get_json(&format!("{}/search", self.base_url), &params).await?;
        let results = resp["resultList"]["result"].as_array().cloned().unwrap_or_default();
        debug!(count = results.len(), "Europe PMC search returned results");
        Ok(results)
    }

    /// Articles citing `pmid`.
    #[instrument(skip(self))]
    pub async fn citations(&self, pmid: &str) -> anyhow::Result<Vec<CitedWork>> {
        let url = format!("{}/MED/{}/citations", self.base_url, pmid);
        let params = [
            ("format", "json".to_string()),
            ("pageSize", CITATION_PAGE_SIZE.to_string()),
        ];
        let resp = self.get_json(&url, &params).await?;
        Ok(parse_cited_works(&resp["citationList"]["citation"]))
    }

    /// Articles referenced by `pmid`.
    #[instrument(skip(self))]
    pub async fn references(&self, pmid: &str) -> anyhow::Result<Vec<CitedWork>> {
        let url = format!("{}/MED/{}/references", self.base_url, pmid);
        let params = [
            ("format", "json".to_string()),
            ("pageSize", CITATION_PAGE_SIZE.to_string()),
        ];
        let resp = self.get_json(&url, &params).await?;
        Ok(parse_cited_works(&resp["referenceList"]["reference"]))
    }

    /// Full-text PDF link for a PubMed article, open-access links first.
    #[instrument(skip(self))]
    pub async fn pdf_url(&self, pmid: &str) -> anyhow::Result<Option<PdfLocation>> {
        let results = self.search_core(&format!("EXT_ID:{} AND SRC:MED", pmid), 1).await?;
        Ok(results.first().and_then(pick_pdf_url))
    }
}

#[async_trait]
impl LiteratureSource for EuropePmcClient {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Article>> {
        let results = self.search_core(query, max_results).await?;
        Ok(results.iter().filter_map(article_from_result).collect())
    }

    async fn fetch(&self, pmids: &[String]) -> anyhow::Result<Vec<Article>> {
        if pmids.is_empty() {
            return Ok(vec![]);
        }
        let ids = pmids
            .iter()
            .map(|p| format!("EXT_ID:{}", p))
            .collect::<Vec<_>>()
            .join(" OR ");
        let query = format!("({}) AND SRC:MED", ids);
        let results = self.search_core(&query, pmids.len()).await?;
        Ok(results.iter().filter_map(article_from_result).collect())
    }
}

// ── Response mapping ────────────────────────────────────────────────────────

fn str_field(v: &Value, key: &str) -> Option<String> {
    v[key].as_str().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// `pubYear` arrives as a string in search results and a number in citation lists.
fn year_field(v: &Value) -> Option<i32> {
    match &v["pubYear"] {
        Value::Number(n) => n.as_i64().map(|y| y as i32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Map one `resultType=core` search hit. Hits without a PMID are skipped.
pub(crate) fn article_from_result(r: &Value) -> Option<Article> {
    let pmid = str_field(r, "pmid")?;
    let title = str_field(r, "title")?;

    let mut article = Article::new(pmid, title);
    article.abstract_text = str_field(r, "abstractText");
    article.authors = r["authorList"]["author"]
        .as_array()
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| str_field(a, "fullName").or_else(|| str_field(a, "collectiveName")))
                .collect()
        })
        .unwrap_or_default();
    article.journal = str_field(&r["journalInfo"]["journal"], "title")
        .or_else(|| str_field(r, "journalTitle"));
    article.publication_year = year_field(r);
    article.doi = str_field(r, "doi");
    article.pmcid = str_field(r, "pmcid");
    article.mesh_terms = r["meshHeadingList"]["meshHeading"]
        .as_array()
        .map(|headings| {
            headings
                .iter()
                .filter_map(|h| str_field(h, "descriptorName"))
                .collect()
        })
        .unwrap_or_default();
    article.keywords = string_list(&r["keywordList"]["keyword"]);
    Some(article)
}

/// Pick a PDF link from `fullTextUrlList`, preferring open-access and free copies.
pub(crate) fn pick_pdf_url(r: &Value) -> Option<PdfLocation> {
    let urls = r["fullTextUrlList"]["fullTextUrl"].as_array()?;
    let pdfs: Vec<&Value> = urls
        .iter()
        .filter(|u| u["documentStyle"].as_str() == Some("pdf"))
        .collect();

    let rank = |u: &Value| match u["availabilityCode"].as_str() {
        Some("OA") => 0,
        Some("F") => 1,
        _ => 2,
    };
    let best = pdfs.into_iter().min_by_key(|u| rank(*u))?;
    Some(PdfLocation {
        url: str_field(best, "url")?,
        source: "europepmc".to_string(),
        open_access: rank(best) == 0 || r["isOpenAccess"].as_str() == Some("Y"),
    })
}

pub(crate) fn parse_cited_works(list: &Value) -> Vec<CitedWork> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|c| {
                    Some(CitedWork {
                        id: str_field(c, "id")?,
                        source: str_field(c, "source").unwrap_or_else(|| "MED".to_string()),
                        title: str_field(c, "title"),
                        authors: str_field(c, "authorString"),
                        journal: str_field(c, "journalAbbreviation"),
                        year: year_field(c),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
