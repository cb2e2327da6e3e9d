pub const MAX_SUGGESTIONS: usize = 5;

pub const SUGGESTION_PHRASES: &[&str] = &[
    "What is DNA?",
    "DNA sequencing basics",
    "How does gene expression work?",
    "CRISPR gene editing",
    "Introduction to genetics",
    "Genetic mutations explained",
    "RNA and transcription",
    "Protein folding",
    "Bioinformatics for beginners",
    "Machine learning in genomics",
    "Sequence alignment with BLAST",
    "Latest gene therapy news",
];

/// Canned phrases related to `partial` by containment in either direction,
/// in list order.
pub fn suggest(partial: &str) -> Vec<String> {
    let needle = partial.trim().to_lowercase();
    SUGGESTION_PHRASES
        .iter()
        .filter(|phrase| {
            let phrase = phrase.to_lowercase();
            phrase.contains(&needle) || needle.contains(&phrase)
        })
        .take(MAX_SUGGESTIONS)
        .map(|p| p.to_string())
        .collect()
}
