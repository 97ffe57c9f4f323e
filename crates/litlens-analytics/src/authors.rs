//! Author productivity and collaboration analysis.

use std::collections::{BTreeSet, HashMap};

use litlens_common::Article;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorStats {
    pub name: String,
    pub article_count: usize,
    pub first_author_count: usize,
    pub last_author_count: usize,
    pub co_author_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collaboration {
    pub authors: [String; 2],
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorReport {
    pub total_articles: usize,
    pub authors: Vec<AuthorStats>,
    pub collaborations: Vec<Collaboration>,
}

#[derive(Default)]
struct Tally {
    display: String,
    articles: usize,
    first: usize,
    last: usize,
    co_authors: BTreeSet<String>,
}

/// Trimmed, whitespace-collapsed name and its case-insensitive key.
fn normalize(name: &str) -> Option<(String, String)> {
    let display = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if display.is_empty() {
        None
    } else {
        let key = display.to_lowercase();
        Some((display, key))
    }
}

pub fn analyze(articles: &[Article]) -> AuthorReport {
    let mut tallies: HashMap<String, Tally> = HashMap::new();
    let mut pairs: HashMap<(String, String), usize> = HashMap::new();

    for article in articles {
        // Distinct authors of this article, in byline order.
        let mut byline: Vec<String> = Vec::new();
        for (display, key) in article.authors.iter().filter_map(|a| normalize(a)) {
            tallies.entry(key.clone()).or_insert_with(|| Tally { display, ..Default::default() });
            if !byline.contains(&key) {
                byline.push(key);
            }
        }

        let count = byline.len();
        for (i, key) in byline.iter().enumerate() {
            if let Some(t) = tallies.get_mut(key) {
                t.articles += 1;
                if i == 0 {
                    t.first += 1;
                } else if i == count - 1 {
                    t.last += 1;
                }
                t.co_authors.extend(byline.iter().filter(|k| *k != key).cloned());
            }
        }

        for (i, a) in byline.iter().enumerate() {
            for b in &byline[i + 1..] {
                let pair = if a < b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
                *pairs.entry(pair).or_insert(0) += 1;
            }
        }
    }

    let display_of = |key: &str| {
        tallies
            .get(key)
            .map(|t| t.display.clone())
            .unwrap_or_else(|| key.to_string())
    };

    let mut collaborations: Vec<(String, String, Collaboration)> = pairs
        .into_iter()
        .map(|((a, b), count)| {
            let c = Collaboration { authors: [display_of(&a), display_of(&b)], count };
            (a, b, c)
        })
        .collect();
    collaborations.sort_by(|x, y| {
        y.2.count
            .cmp(&x.2.count)
            .then_with(|| x.0.cmp(&y.0))
            .then_with(|| x.1.cmp(&y.1))
    });

    let mut authors: Vec<(String, AuthorStats)> = tallies
        .into_iter()
        .map(|(key, t)| {
            let stats = AuthorStats {
                name: t.display,
                article_count: t.articles,
                first_author_count: t.first,
                last_author_count: t.last,
                co_author_count: t.co_authors.len(),
            };
            (key, stats)
        })
        .collect();
    authors.sort_by(|x, y| y.1.article_count.cmp(&x.1.article_count).then_with(|| x.0.cmp(&y.0)));

    AuthorReport {
        total_articles: articles.len(),
        authors: authors.into_iter().map(|(_, s)| s).collect(),
        collaborations: collaborations.into_iter().map(|(_, _, c)| c).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litlens_test_utils::article_with;
    use pretty_assertions::assert_eq;

    fn by(pmid: &str, authors: &[&str]) -> Article {
        article_with(pmid, "t", "a", authors, &[], Some(2020))
    }

    #[test]
    fn test_counts_positions_and_coauthors() {
        let report = analyze(&[
            by("1", &["Jane Smith", "Wei Chen", "Ann Lee"]),
            by("2", &["wei  chen", "Jane Smith"]),
            by("3", &["Solo Author"]),
        ]);

        assert_eq!(report.total_articles, 3);
        let names: Vec<&str> = report.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Jane Smith", "Wei Chen", "Ann Lee", "Solo Author"]);

        let jane = &report.authors[0];
        assert_eq!(jane.article_count, 2);
        assert_eq!(jane.first_author_count, 1);
        assert_eq!(jane.last_author_count, 1);
        assert_eq!(jane.co_author_count, 2);

        // First spelling seen is kept.
        let wei = &report.authors[1];
        assert_eq!(wei.name, "Wei Chen");
        assert_eq!(wei.first_author_count, 1);

        let solo = &report.authors[3];
        assert_eq!(solo.first_author_count, 1);
        assert_eq!(solo.last_author_count, 0);
        assert_eq!(solo.co_author_count, 0);
    }

    #[test]
    fn test_collaboration_pairs() {
        let report = analyze(&[
            by("1", &["Jane Smith", "Wei Chen", "Ann Lee"]),
            by("2", &["Wei Chen", "Jane Smith"]),
        ]);
        assert_eq!(report.collaborations.len(), 3);
        assert_eq!(report.collaborations[0].count, 2);
        assert_eq!(
            report.collaborations[0].authors,
            ["Jane Smith".to_string(), "Wei Chen".to_string()]
        );
    }

    #[test]
    fn test_duplicate_and_blank_names_ignored() {
        let report = analyze(&[by("1", &["A B", "a b", "  "])]);
        assert_eq!(report.authors.len(), 1);
        assert_eq!(report.authors[0].article_count, 1);
        assert!(report.collaborations.is_empty());
    }
}
