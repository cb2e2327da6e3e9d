//! Domain types shared by the catalog, the embedding store and the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ItemId = String;

/// What kind of content a catalog item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Track,
    Lesson,
    GlossaryTerm,
    News,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Track => "track",
            ContentKind::Lesson => "lesson",
            ContentKind::GlossaryTerm => "glossary-term",
            ContentKind::News => "news",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "track" => Ok(ContentKind::Track),
            "lesson" => Ok(ContentKind::Lesson),
            "glossary-term" | "glossary" | "term" => Ok(ContentKind::GlossaryTerm),
            "news" => Ok(ContentKind::News),
            other => Err(Error::Operation(format!("unknown content kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

/// One static piece of educational content.
///
/// - `id`: unique within a catalog
/// - `body`: the text payload that gets embedded
/// - `category`/`difficulty`/`description`: optional facets shown to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub body: String,
    pub kind: ContentKind,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub description: Option<String>,
}

impl CatalogItem {
    /// Provider input for this item: `"<title>: <body>"`.
    pub fn embedding_text(&self) -> String { format!("{}: {}", self.title, self.body) }
}

/// A ranked search hit. Higher `relevance_score` is better; the substring
/// fallback assigns a fixed placeholder score instead of a similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: ItemId,
    pub title: String,
    pub kind: ContentKind,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub description: Option<String>,
    pub relevance_score: f32,
}

impl SearchResult {
    pub fn from_item(item: &CatalogItem, relevance_score: f32) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            kind: item.kind,
            category: item.category.clone(),
            difficulty: item.difficulty,
            description: item.description.clone(),
            relevance_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: ItemId,
    pub title: String,
    pub kind: ContentKind,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub description: Option<String>,
    pub reason: String,
    pub confidence: f32,
}

impl Recommendation {
    pub fn from_item(item: &CatalogItem, reason: impl Into<String>, confidence: f32) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            kind: item.kind,
            category: item.category.clone(),
            difficulty: item.difficulty,
            description: item.description.clone(),
            reason: reason.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Search,
    Question,
    Exploration,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Search => "search",
            Intent::Question => "question",
            Intent::Exploration => "exploration",
        }
    }
}

/// Keyword-driven reading of a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: Intent,
    pub suggested_filters: BTreeSet<String>,
    pub related_topics: Vec<String>,
}
