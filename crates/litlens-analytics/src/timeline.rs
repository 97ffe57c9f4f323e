//! Publication timeline for a set of articles.

use std::collections::{BTreeMap, HashMap};

use litlens_common::Article;
use serde::Serialize;

const TOP_TERMS_PER_YEAR: usize = 3;
const MIN_YEARS_FOR_TREND: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Growing,
    Stable,
    Declining,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearBucket {
    pub year: i32,
    pub count: usize,
    pub top_mesh_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub total: usize,
    pub undated: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    /// Every year from first to last, including years with no articles.
    pub years: Vec<YearBucket>,
    pub trend: Trend,
    pub slope: Option<f64>,
}

pub fn build(articles: &[Article]) -> Timeline {
    let mut by_year: BTreeMap<i32, Vec<&Article>> = BTreeMap::new();
    let mut undated = 0;
    for article in articles {
        match article.publication_year {
            Some(year) => by_year.entry(year).or_default().push(article),
            None => undated += 1,
        }
    }

    let first_year = by_year.keys().next().copied();
    let last_year = by_year.keys().next_back().copied();

    let years: Vec<YearBucket> = match (first_year, last_year) {
        (Some(first), Some(last)) => (first..=last)
            .map(|year| {
                let in_year = by_year.get(&year).map(Vec::as_slice).unwrap_or(&[]);
                YearBucket {
                    year,
                    count: in_year.len(),
                    top_mesh_terms: top_terms(in_year),
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    let (trend, slope) = if by_year.len() < MIN_YEARS_FOR_TREND {
        (Trend::InsufficientData, None)
    } else {
        let slope = least_squares_slope(&years);
        (classify(slope, &years), Some(slope))
    };

    Timeline {
        total: articles.len(),
        undated,
        first_year,
        last_year,
        years,
        trend,
        slope,
    }
}

fn top_terms(articles: &[&Article]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for article in articles {
        for term in &article.mesh_terms {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(TOP_TERMS_PER_YEAR)
        .map(|(term, _)| term.to_string())
        .collect()
}

fn least_squares_slope(years: &[YearBucket]) -> f64 {
    let n = years.len() as f64;
    let mean_x = years.iter().map(|b| b.year as f64).sum::<f64>() / n;
    let mean_y = years.iter().map(|b| b.count as f64).sum::<f64>() / n;
    let (num, den) = years.iter().fold((0.0, 0.0), |(num, den), b| {
        let dx = b.year as f64 - mean_x;
        (num + dx * (b.count as f64 - mean_y), den + dx * dx)
    });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Slope is judged relative to the mean yearly count.
fn classify(slope: f64, years: &[YearBucket]) -> Trend {
    let mean = years.iter().map(|b| b.count as f64).sum::<f64>() / years.len() as f64;
    if slope > 0.1 * mean {
        Trend::Growing
    } else if slope < -0.1 * mean {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litlens_test_utils::article_with;
    use pretty_assertions::assert_eq;

    fn dated(pmid: &str, year: Option<i32>, mesh: &[&str]) -> Article {
        article_with(pmid, "t", "a", &["X"], mesh, year)
    }

    #[test]
    fn test_missing_years_are_filled() {
        let t = build(&[dated("1", Some(2018), &[]), dated("2", Some(2021), &[])]);
        let years: Vec<(i32, usize)> = t.years.iter().map(|b| (b.year, b.count)).collect();
        assert_eq!(years, vec![(2018, 1), (2019, 0), (2020, 0), (2021, 1)]);
        assert_eq!(t.trend, Trend::InsufficientData);
        assert_eq!(t.slope, None);
    }

    #[test]
    fn test_growing_trend_and_undated() {
        let mut articles = vec![dated("u", None, &[])];
        let mut n = 0;
        for (year, count) in [(2019, 1), (2020, 2), (2021, 4), (2022, 6)] {
            for _ in 0..count {
                n += 1;
                articles.push(dated(&n.to_string(), Some(year), &[]));
            }
        }
        let t = build(&articles);
        assert_eq!(t.total, 14);
        assert_eq!(t.undated, 1);
        assert_eq!(t.trend, Trend::Growing);
        assert!(t.slope.unwrap() > 1.0);
    }

    #[test]
    fn test_declining_and_stable() {
        let declining: Vec<Article> = [(2019, 5), (2020, 3), (2021, 1)]
            .iter()
            .flat_map(|&(y, c)| (0..c).map(move |i| dated(&format!("{}-{}", y, i), Some(y), &[])))
            .collect();
        assert_eq!(build(&declining).trend, Trend::Declining);

        let stable: Vec<Article> = (2019..=2021).map(|y| dated(&y.to_string(), Some(y), &[])).collect();
        assert_eq!(build(&stable).trend, Trend::Stable);
    }

    #[test]
    fn test_top_terms_per_year() {
        let t = build(&[
            dated("1", Some(2020), &["Lung", "KRAS", "Mice"]),
            dated("2", Some(2020), &["Lung", "KRAS"]),
            dated("3", Some(2020), &["Lung", "Apoptosis"]),
        ]);
        assert_eq!(t.years[0].top_mesh_terms, vec!["Lung", "KRAS", "Apoptosis"]);
    }

    #[test]
    fn test_empty_input() {
        let t = build(&[]);
        assert!(t.years.is_empty());
        assert_eq!(t.first_year, None);
        assert_eq!(t.trend, Trend::InsufficientData);
    }
}
