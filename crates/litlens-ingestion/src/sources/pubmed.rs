//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi

use async_trait::async_trait;
use litlens_common::sandbox::SandboxClient as Client;
use litlens_common::Article;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::LiteratureSource;
use crate::error::SourceError;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL:  &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

pub struct PubMedClient {
    client: Client,
    api_key: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl PubMedClient {
    pub fn new(api_key: Option<String>, email: Option<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::new()?,
            api_key,
            email,
        })
    }

    /// NCBI asks callers to identify themselves; an API key raises the rate limit.
    fn identity_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", "litlens".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        params
    }

    /// Search PubMed and return a list of PMIDs.
    #[instrument(skip(self))]
    pub async fn esearch(&self, query: &str, max: usize) -> anyhow::Result<Vec<String>> {
        let mut params = self.identity_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("term", query.to_string()));
        params.push(("retmax", max.to_string()));
        params.push(("retmode", "json".to_string()));

        let resp: ESearchResponse = self.client
            .get(ESEARCH_URL)?
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let ids = resp.esearchresult.idlist;
        debug!(count = ids.len(), "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    /// Fetch PubMed XML for a list of PMIDs and parse it into articles.
    #[instrument(skip(self), fields(count = pmids.len()))]
    pub async fn efetch(&self, pmids: &[String]) -> anyhow::Result<Vec<Article>> {
        if pmids.is_empty() {
            return Ok(vec![]);
        }

        let mut params = self.identity_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("id", pmids.join(",")));
        params.push(("rettype", "abstract".to_string()));
        params.push(("retmode", "xml".to_string()));

        let xml = self.client
            .get(EFETCH_URL)?
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_pubmed_xml(&xml))
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Article>> {
        let pmids = self.esearch(query, max_results).await?;
        self.efetch(&pmids).await
    }

    async fn fetch(&self, pmids: &[String]) -> anyhow::Result<Vec<Article>> {
        self.efetch(pmids).await
    }
}

// ── efetch XML ──────────────────────────────────────────────────────────────

/// Text being collected for one element, including any inline markup inside it.
struct Capture {
    depth: usize,
    attr: Option<String>,
    text: String,
}

#[derive(Default)]
struct ArticleBuilder {
    pmid: Option<String>,
    title: String,
    abstract_parts: Vec<String>,
    authors: Vec<String>,
    last_name: String,
    fore_name: String,
    collective_name: String,
    journal: Option<String>,
    year: Option<i32>,
    doi: Option<String>,
    pmcid: Option<String>,
    mesh_terms: Vec<String>,
    keywords: Vec<String>,
}

impl ArticleBuilder {
    fn accept(&mut self, element: &str, capture: Capture) {
        let text = collapse_whitespace(&capture.text);
        match element {
            "PMID" => {
                if self.pmid.is_none() && !text.is_empty() {
                    self.pmid = Some(text);
                }
            }
            "ArticleTitle" => self.title = text,
            "AbstractText" if !text.is_empty() => {
                let part = match capture.attr.filter(|l| !l.trim().is_empty()) {
                    Some(label) => format!("{}: {}", label.trim(), text),
                    None => text,
                };
                self.abstract_parts.push(part);
            }
            "LastName" => self.last_name = text,
            "ForeName" => self.fore_name = text,
            "CollectiveName" => self.collective_name = text,
            "Title" => self.journal = Some(text).filter(|t| !t.is_empty()),
            "Year" => {
                if self.year.is_none() {
                    self.year = text.parse().ok();
                }
            }
            "MedlineDate" => {
                if self.year.is_none() {
                    self.year = leading_year(&text);
                }
            }
            "ArticleId" if !text.is_empty() => match capture.attr.as_deref() {
                Some("doi") => self.doi = Some(text),
                Some("pmc") => self.pmcid = Some(text),
                _ => {}
            },
            "DescriptorName" if !text.is_empty() => self.mesh_terms.push(text),
            "Keyword" if !text.is_empty() => self.keywords.push(text),
            _ => {}
        }
    }

    fn finish_author(&mut self) {
        let name = if !self.collective_name.is_empty() {
            self.collective_name.clone()
        } else if self.fore_name.is_empty() {
            self.last_name.clone()
        } else {
            format!("{} {}", self.fore_name, self.last_name)
        };
        if !name.trim().is_empty() {
            self.authors.push(name.trim().to_string());
        }
        self.last_name.clear();
        self.fore_name.clear();
        self.collective_name.clear();
    }

    fn build(self) -> Option<Article> {
        let pmid = self.pmid?;
        if self.title.is_empty() {
            return None;
        }
        let mut article = Article::new(pmid, self.title);
        if !self.abstract_parts.is_empty() {
            article.abstract_text = Some(self.abstract_parts.join("\n\n"));
        }
        article.authors = self.authors;
        article.journal = self.journal;
        article.publication_year = self.year;
        article.doi = self.doi;
        article.pmcid = self.pmcid;
        article.mesh_terms = self.mesh_terms;
        article.keywords = self.keywords;
        Some(article)
    }
}

/// Whether the text of `element` (about to be opened under `stack`) is collected.
fn is_captured(stack: &[String], element: &str) -> bool {
    let parent = stack.last().map(String::as_str).unwrap_or("");
    match element {
        // The citation's own PMID; CommentsCorrections carry PMIDs of other articles.
        "PMID" => parent == "MedlineCitation",
        "ArticleTitle" => parent == "Article",
        "AbstractText" => parent == "Abstract",
        "LastName" | "ForeName" | "CollectiveName" => parent == "Author",
        "Title" => parent == "Journal",
        "Year" | "MedlineDate" => parent == "PubDate",
        "ArticleId" => parent == "ArticleIdList" && !stack.iter().any(|s| s == "ReferenceList"),
        "DescriptorName" => parent == "MeshHeading",
        "Keyword" => parent == "KeywordList",
        _ => false,
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse efetch XML (`<PubmedArticleSet><PubmedArticle>…`) into articles.
/// Articles without a PMID or title are skipped.
pub fn parse_pubmed_xml(xml: &str) -> Vec<Article> {
    let mut articles = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<ArticleBuilder> = None;
    let mut capture: Option<Capture> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "PubmedArticle" {
                    current = Some(ArticleBuilder::default());
                }
                if capture.is_none() && current.is_some() && is_captured(&stack, &name) {
                    let attr = match name.as_str() {
                        "AbstractText" => attribute(e, "Label"),
                        "ArticleId" => attribute(e, "IdType"),
                        _ => None,
                    };
                    capture = Some(Capture { depth: stack.len(), attr, text: String::new() });
                }
                stack.push(name);
            }
            Ok(Event::Text(ref e)) => {
                if let Some(c) = capture.as_mut() {
                    c.text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(c) = capture.as_mut() {
                    c.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(_)) => {
                let name = stack.pop().unwrap_or_default();
                if capture.as_ref().is_some_and(|c| c.depth == stack.len()) {
                    if let (Some(c), Some(builder)) = (capture.take(), current.as_mut()) {
                        builder.accept(&name, c);
                    }
                }
                match name.as_str() {
                    "Author" => {
                        if let Some(builder) = current.as_mut() {
                            builder.finish_author();
                        }
                    }
                    "PubmedArticle" => {
                        if let Some(builder) = current.take() {
                            match builder.build() {
                                Some(article) => articles.push(article),
                                None => warn!("Skipping PubMed record without PMID or title"),
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, position = reader.buffer_position(), "PubMed XML parse error");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    articles
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "1998 Dec-1999 Jan" → 1998
fn leading_year(s: &str) -> Option<i32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() >= 4 {
        digits[..4].parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const XML: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE">
      <PMID Version="1">12345678</PMID>
      <Article>
        <Journal>
          <JournalIssue><PubDate><Year>2021</Year><Month>Mar</Month></PubDate></JournalIssue>
          <Title>Nature</Title>
        </Journal>
        <ArticleTitle>KRAS <i>G12C</i> inhibition in lung cancer</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Resistance emerges &amp; limits benefit.</AbstractText>
          <AbstractText Label="RESULTS">MET amplification was
            frequent.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author><LastName>Smith</LastName><ForeName>John</ForeName></Author>
          <Author><LastName>Chen</LastName></Author>
          <Author><CollectiveName>Lung Cancer Consortium</CollectiveName></Author>
        </AuthorList>
      </Article>
      <MeshHeadingList>
        <MeshHeading><DescriptorName UI="D008175">Lung Neoplasms</DescriptorName></MeshHeading>
        <MeshHeading><DescriptorName UI="D016283">Proto-Oncogene Proteins p21(ras)</DescriptorName></MeshHeading>
      </MeshHeadingList>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="Cites"><PMID Version="1">999</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
      <KeywordList><Keyword>sotorasib</Keyword><Keyword>resistance</Keyword></KeywordList>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">12345678</ArticleId>
        <ArticleId IdType="doi">10.1038/s41586-021-0001</ArticleId>
        <ArticleId IdType="pmc">PMC8000001</ArticleId>
      </ArticleIdList>
      <ReferenceList>
        <Reference><ArticleIdList><ArticleId IdType="doi">10.9999/other</ArticleId></ArticleIdList></Reference>
      </ReferenceList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>222</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate></JournalIssue></Journal>
        <ArticleTitle>Plain abstract</ArticleTitle>
        <Abstract><AbstractText>Single paragraph.</AbstractText></Abstract>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>333</PMID>
      <Article><ArticleTitle></ArticleTitle></Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_full_record() {
        let articles = parse_pubmed_xml(XML);
        assert_eq!(articles.len(), 2);

        let a = &articles[0];
        assert_eq!(a.pmid, "12345678");
        assert_eq!(a.title, "KRAS G12C inhibition in lung cancer");
        assert_eq!(
            a.abstract_text.as_deref(),
            Some("BACKGROUND: Resistance emerges & limits benefit.\n\nRESULTS: MET amplification was frequent.")
        );
        assert_eq!(a.authors, vec!["John Smith", "Chen", "Lung Cancer Consortium"]);
        assert_eq!(a.journal.as_deref(), Some("Nature"));
        assert_eq!(a.publication_year, Some(2021));
        assert_eq!(a.doi.as_deref(), Some("10.1038/s41586-021-0001"));
        assert_eq!(a.pmcid.as_deref(), Some("PMC8000001"));
        assert_eq!(a.mesh_terms, vec!["Lung Neoplasms", "Proto-Oncogene Proteins p21(ras)"]);
        assert_eq!(a.keywords, vec!["sotorasib", "resistance"]);
    }

    #[test]
    fn test_medline_date_and_unlabelled_abstract() {
        let articles = parse_pubmed_xml(XML);
        let b = &articles[1];
        assert_eq!(b.pmid, "222");
        assert_eq!(b.publication_year, Some(1998));
        assert_eq!(b.abstract_text.as_deref(), Some("Single paragraph."));
        assert!(b.authors.is_empty());
        assert_eq!(b.doi, None);
    }

    #[test]
    fn test_empty_title_is_skipped() {
        let articles = parse_pubmed_xml(XML);
        assert!(articles.iter().all(|a| a.pmid != "333"));
    }

    #[test]
    fn test_malformed_xml_keeps_completed_records() {
        let truncated = &XML[..XML.find("<PMID>222").unwrap()];
        let broken = format!("{}</Oops>", truncated);
        let articles = parse_pubmed_xml(&broken);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].pmid, "12345678");
    }

    #[test]
    fn test_leading_year() {
        assert_eq!(leading_year("1998 Dec-1999 Jan"), Some(1998));
        assert_eq!(leading_year("Spring 2003"), Some(2003));
        assert_eq!(leading_year("n.d."), None);
    }
}
