//! Article similarity: TF-IDF cosine over text, Jaccard over MeSH terms and authors.

use std::collections::{HashMap, HashSet};

use litlens_common::Article;
use litlens_config::AnalyticsConfig;
use serde::Serialize;

/// Sparse term → weight vector.
pub type TermVector = HashMap<String, f64>;

const STOP_WORDS: &[&str] = &[
    "about", "after", "all", "also", "among", "and", "any", "are", "both", "but", "can",
    "could", "did", "does", "during", "each", "for", "from", "had", "has", "have", "here",
    "how", "into", "its", "may", "more", "most", "not", "our", "over", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "under", "upon", "was", "were", "what", "when", "where", "which", "while",
    "who", "whom", "why", "will", "with", "within", "without", "would", "using", "used",
    "use", "between", "study", "studies", "results", "however", "been", "being", "other",
    "only", "one", "two", "per", "via",
];

/// Lowercase alphanumeric tokens of at least three characters, stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Inverse document frequencies fitted on a corpus.
#[derive(Debug, Clone, Default)]
pub struct TfIdf {
    idf: HashMap<String, f64>,
    documents: usize,
}

impl TfIdf {
    /// Smooth idf: `ln((1 + n) / (1 + df)) + 1`.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut df: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let unique: HashSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }
        let n = documents.len() as f64;
        let idf = df
            .into_iter()
            .map(|(term, count)| (term, ((1.0 + n) / (1.0 + count as f64)).ln() + 1.0))
            .collect();
        Self { idf, documents: documents.len() }
    }

    /// L2-normalized TF-IDF vector. Terms unseen during fitting get the
    /// idf of a term with zero document frequency.
    pub fn transform(&self, text: &str) -> TermVector {
        let unseen = (1.0 + self.documents as f64).ln() + 1.0;
        let mut vector: TermVector = HashMap::new();
        for term in tokenize(text) {
            *vector.entry(term).or_insert(0.0) += 1.0;
        }
        for (term, weight) in vector.iter_mut() {
            *weight *= self.idf.get(term).copied().unwrap_or(unseen);
        }
        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

pub fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum();
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Case-insensitive Jaccard overlap; 0 when both sets are empty.
pub fn jaccard<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let set = |items: &[S]| -> HashSet<String> {
        items
            .iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    };
    let (a, b) = (set(a), set(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

#[derive(Debug, Clone, Copy)]
pub struct SimilarityWeights {
    pub text: f64,
    pub mesh: f64,
    pub authors: f64,
    pub min_similarity: f64,
}

impl From<&AnalyticsConfig> for SimilarityWeights {
    fn from(cfg: &AnalyticsConfig) -> Self {
        Self {
            text: cfg.text_weight,
            mesh: cfg.mesh_weight,
            authors: cfg.author_weight,
            min_similarity: cfg.min_similarity,
        }
    }
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self::from(&AnalyticsConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarArticle {
    pub pmid: String,
    pub title: String,
    pub score: f64,
    pub text_similarity: f64,
    pub mesh_overlap: f64,
    pub author_overlap: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityEngine {
    weights: SimilarityWeights,
}

impl SimilarityEngine {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    /// Candidates most similar to `target`, best first (ties by PMID).
    /// The target itself and scores below the minimum are dropped.
    pub fn rank(&self, target: &Article, candidates: &[Article], limit: usize) -> Vec<SimilarArticle> {
        let pool: Vec<&Article> = candidates.iter().filter(|c| c.pmid != target.pmid).collect();
        if pool.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut corpus: Vec<String> = Vec::with_capacity(pool.len() + 1);
        corpus.push(target.searchable_text());
        corpus.extend(pool.iter().map(|c| c.searchable_text()));
        let tfidf = TfIdf::fit(&corpus);
        let target_vec = tfidf.transform(&corpus[0]);

        let w = self.weights;
        let mut ranked: Vec<SimilarArticle> = pool
            .iter()
            .zip(corpus.iter().skip(1))
            .map(|(candidate, text)| {
                let text_similarity = cosine(&target_vec, &tfidf.transform(text));
                let mesh_overlap = jaccard(&target.mesh_terms, &candidate.mesh_terms);
                let author_overlap = jaccard(&target.authors, &candidate.authors);
                SimilarArticle {
                    pmid: candidate.pmid.clone(),
                    title: candidate.title.clone(),
                    score: w.text * text_similarity + w.mesh * mesh_overlap + w.authors * author_overlap,
                    text_similarity,
                    mesh_overlap,
                    author_overlap,
                }
            })
            .filter(|s| s.score >= w.min_similarity)
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.pmid.cmp(&b.pmid))
        });
        ranked.truncate(limit);
        ranked
    }
}
