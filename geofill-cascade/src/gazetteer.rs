//! Gazetteer client
//!
//! Resolves free-text place names to coordinates. Knowledge-base articles are
//! consulted first (one language edition at a time), then the general-purpose
//! geocoder. Every candidate is checked against the caller's constraints
//! before it is returned.

use geofill_common::Coordinate;
use std::sync::Arc;
use tracing::debug;

use crate::types::{EvidenceError, GazetteerMatch, GazetteerSource, Geocoder, KnowledgeBase, SearchBias};

/// Titles fetched per knowledge-base language
pub const RESULTS_PER_LANGUAGE: usize = 3;

/// Words that describe a kind of place rather than a specific one
const GENERIC_LABELS: &[&str] = &[
    "summit",
    "viewpoint",
    "overlook",
    "entrance",
    "exit",
    "ticket",
    "gate",
    "temple",
    "pagoda",
    "church",
    "cathedral",
    "museum",
    "station",
    "bridge",
    "castle",
    "palace",
    "plaza",
    "square",
    "park",
    "garden",
    "street",
    "city",
    "town",
    "village",
    "market",
    "waterfall",
    "beach",
    "mountain",
    "river",
    "lake",
    "island",
    "tower",
    "monument",
    "memorial",
    "statue",
    "building",
    "university",
    "campus",
    "airport",
    "bus station",
    "train station",
    "harbor",
    "port",
];

const HINT_STOPWORDS: &[&str] = &["the", "of", "de", "la", "el", "los", "las", "y", "and", "en", "do", "da"];

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphabetic() || ('\u{C0}'..='\u{FF}').contains(&c) || c == '\''
}

/// Maximal runs of letters (ASCII and Latin-1) and apostrophes
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c)).filter(|w| !w.is_empty())
}

/// Whether a label is too vague to geocode
///
/// True for labels shorter than four characters, labels with no words, and
/// labels made only of generic place words ("Mountain Overlook").
pub fn is_generic_label(label: &str) -> bool {
    let label = label.trim();
    if label.chars().count() < 4 {
        return true;
    }

    // A label with no words at all is generic as well
    let lowered = label.to_lowercase();
    let generic = words(&lowered).all(|w| GENERIC_LABELS.contains(&w));
    generic
}

/// Meaningful lower-cased words of a hint (stopwords and short words removed)
pub fn hint_tokens(hint: &str) -> Vec<String> {
    let lowered = hint.to_lowercase();
    words(&lowered)
        .filter(|w| w.chars().count() >= 3 && !HINT_STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn mentions_any(text: &str, tokens: &[String]) -> bool {
    let text = text.to_lowercase();
    tokens.iter().any(|t| text.contains(t.as_str()))
}

/// Constraints applied to every gazetteer candidate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupConstraints {
    /// Bias coordinate
    pub bias: Option<Coordinate>,
    /// Maximum distance from `bias` in kilometres
    pub max_km: Option<f64>,
    /// At least one token must appear in the candidate's text
    pub must_match: Vec<String>,
    /// Appended to the query as `"{name} {context}"`
    pub context: Option<String>,
}

impl LookupConstraints {
    /// No bias, no tokens, no context
    pub fn unconstrained() -> Self {
        Self::default()
    }

    /// Constraints derived from the photo's active bias
    pub fn from_bias(bias: Option<&SearchBias>) -> Self {
        match bias {
            Some(b) => Self {
                bias: Some(b.center),
                max_km: Some(b.max_km),
                must_match: b.tokens.clone(),
                context: Some(b.hint.clone()),
            },
            None => Self::default(),
        }
    }

    fn query_for(&self, name: &str) -> String {
        match &self.context {
            Some(context) if !context.trim().is_empty() => {
                format!("{} {}", name.trim(), context.trim())
            }
            _ => name.trim().to_string(),
        }
    }

    fn in_range(&self, coordinate: &Coordinate) -> bool {
        match (&self.bias, self.max_km) {
            (Some(center), Some(max_km)) => coordinate.within_km(center, max_km),
            _ => true,
        }
    }
}

/// Place-name resolver backed by a knowledge base and a geocoder
pub struct Gazetteer {
    knowledge_base: Arc<dyn KnowledgeBase>,
    geocoder: Arc<dyn Geocoder>,
    languages: Vec<String>,
}

impl Gazetteer {
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            knowledge_base,
            geocoder,
            languages: vec!["es".to_string(), "en".to_string()],
        }
    }

    /// Override the knowledge-base language editions (queried in order)
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        if !languages.is_empty() {
            self.languages = languages;
        }
        self
    }

    /// Resolve a label to a coordinate under `constraints`
    ///
    /// Generic labels are rejected without any query. Service failures are
    /// logged and treated as "no candidate" for that strategy.
    pub async fn resolve(&self, name: &str, constraints: &LookupConstraints) -> Option<GazetteerMatch> {
        if is_generic_label(name) {
            debug!(label = %name, "Skipping generic label");
            return None;
        }

        let query = constraints.query_for(name);

        for lang in &self.languages {
            if let Some(found) = self.search_knowledge_base(&query, lang, constraints).await {
                return Some(found);
            }
        }

        self.search_geocoder(&query, constraints).await
    }

    async fn search_knowledge_base(
        &self,
        query: &str,
        lang: &str,
        constraints: &LookupConstraints,
    ) -> Option<GazetteerMatch> {
        let titles = match self
            .knowledge_base
            .search(query, lang, RESULTS_PER_LANGUAGE)
            .await
        {
            Ok(titles) => titles,
            Err(e) => {
                debug!(query = %query, lang = %lang, error = %e, "Knowledge-base search failed");
                return None;
            }
        };

        for title in titles.into_iter().take(RESULTS_PER_LANGUAGE) {
            let page = match self.knowledge_base.page(&title, lang).await {
                Ok(Some(page)) => page,
                Ok(None) => continue,
                Err(e) => {
                    debug!(title = %title, lang = %lang, error = %e, "Knowledge-base page fetch failed");
                    continue;
                }
            };

            let Some(coordinate) = page.coordinate else {
                continue;
            };
            if !constraints.in_range(&coordinate) {
                debug!(title = %title, coordinate = %coordinate, "Article outside bias radius");
                continue;
            }
            if !constraints.must_match.is_empty() {
                let titles_text = format!("{} {}", title, page.title);
                if !mentions_any(&titles_text, &constraints.must_match)
                    && !mentions_any(&page.summary, &constraints.must_match)
                {
                    debug!(title = %title, "Article does not mention hint tokens");
                    continue;
                }
            }

            return Some(GazetteerMatch {
                coordinate,
                label: title,
                source: GazetteerSource::KnowledgeBase {
                    provider: self.knowledge_base.name().to_string(),
                    lang: lang.to_string(),
                },
            });
        }

        None
    }

    async fn search_geocoder(&self, query: &str, constraints: &LookupConstraints) -> Option<GazetteerMatch> {
        let hit = match self.geocoder.geocode(query).await {
            Ok(Some(hit)) => hit,
            Ok(None) => return None,
            Err(e) => {
                debug!(query = %query, error = %e, "Geocoder lookup failed");
                return None;
            }
        };

        if !constraints.in_range(&hit.coordinate) {
            debug!(query = %query, coordinate = %hit.coordinate, "Geocoder hit outside bias radius");
            return None;
        }
        if !constraints.must_match.is_empty()
            && !mentions_any(query, &constraints.must_match)
            && !mentions_any(&hit.display_name, &constraints.must_match)
        {
            return None;
        }

        Some(GazetteerMatch {
            coordinate: hit.coordinate,
            label: query.to_string(),
            source: GazetteerSource::Geocoder {
                provider: self.geocoder.name().to_string(),
            },
        })
    }

    /// Geocode a plan or global hint name directly (no filters)
    ///
    /// Unlike [`Gazetteer::resolve`], service failures are returned so the
    /// caller can report them.
    pub async fn geocode_hint(&self, name: &str) -> Result<Option<Coordinate>, EvidenceError> {
        Ok(self.geocoder.geocode(name.trim()).await?.map(|hit| hit.coordinate))
    }
}
