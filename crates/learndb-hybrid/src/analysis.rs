use std::collections::BTreeSet;

use learndb_core::types::{Intent, QueryAnalysis};

const QUESTION_WORDS: &[&str] = &["what", "how", "why", "when", "where", "who", "which"];
const EXPLORATION_WORDS: &[&str] = &["explore", "discover", "learn about", "tell me about", "show me"];

const FILTER_RULES: &[(&[&str], &str)] = &[
    (&["beginner", "basic"], "difficulty:beginner"),
    (&["advanced", "complex"], "difficulty:advanced"),
    (&["genetics", "dna", "gene"], "category:genetics"),
];

/// Returned for every query; not derived from the input.
pub const RELATED_TOPICS: [&str; 5] = ["DNA Structure", "Gene Expression", "CRISPR", "Bioinformatics", "Protein Folding"];

/// Keyword-driven intent and filter detection. Deterministic and pure.
///
/// Intent terms match whole words (phrases match as a run of words), so
/// "show" does not count as "how". Filter keywords are stems and match
/// anywhere in the query.
pub fn analyze(query: &str) -> QueryAnalysis {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    let normalized = format!(" {} ", words.join(" "));
    let has_term = |terms: &[&str]| terms.iter().any(|t| normalized.contains(&format!(" {} ", t)));

    let intent = if has_term(QUESTION_WORDS) {
        Intent::Question
    } else if has_term(EXPLORATION_WORDS) {
        Intent::Exploration
    } else {
        Intent::Search
    };

    let suggested_filters: BTreeSet<String> = FILTER_RULES
        .iter()
        .filter(|rule| rule.0.iter().any(|stem| lower.contains(stem)))
        .map(|rule| rule.1.to_string())
        .collect();

    QueryAnalysis { intent, suggested_filters, related_topics: RELATED_TOPICS.iter().map(|t| t.to_string()).collect() }
}
