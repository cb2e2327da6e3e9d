use std::cmp::Ordering;

/// Cosine similarity of two vectors.
///
/// Vectors of different length are incomparable and score `0.0`. A zero
/// vector yields NaN; rank with [`descending`] so NaN sorts last.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() { return 0.0; }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b)
}

/// Comparator for sorting scores high-to-low with NaN at the end.
pub fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Score every candidate against `query` and sort best-first.
///
/// The sort is stable, so equal scores keep the candidates' input order.
pub fn rank<'a, T, I>(query: &[f32], candidates: I) -> Vec<(&'a T, f32)>
where
    I: IntoIterator<Item = (&'a T, &'a [f32])>,
    T: 'a,
{
    let mut scored: Vec<(&'a T, f32)> = candidates.into_iter().map(|(item, v)| (item, cosine_similarity(query, v))).collect();
    scored.sort_by(|a, b| descending(a.1, b.1));
    scored
}
