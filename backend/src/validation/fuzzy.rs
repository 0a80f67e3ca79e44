//! Approximate label matching.
//!
//! Similarity is the Ratcliff/Obershelp ratio `2 * M / T`, where `M` counts
//! characters in recursively found longest common blocks and `T` is the
//! combined length of both strings. The ratio is not symmetric; candidates
//! are scored as `similarity_ratio(candidate, word)`.

/// Minimum ratio for a label to be suggested.
pub const SUGGESTION_CUTOFF: f64 = 0.6;

/// Maximum number of suggestions returned.
pub const MAX_SUGGESTIONS: usize = 3;

/// Similarity ratio in `[0, 1]`; two empty strings are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_chars(&a, 0, a.len(), &b, 0, b.len());
    2.0 * matches as f64 / total as f64
}

fn matching_chars(a: &[char], alo: usize, ahi: usize, b: &[char], blo: usize, bhi: usize) -> usize {
    let (i, j, size) = longest_match(a, alo, ahi, b, blo, bhi);
    if size == 0 {
        return 0;
    }
    size + matching_chars(a, alo, i, b, blo, j) + matching_chars(a, i + size, ahi, b, j + size, bhi)
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`. Ties resolve to
/// the block starting earliest in `a`, then earliest in `b`.
fn longest_match(a: &[char], alo: usize, ahi: usize, b: &[char], blo: usize, bhi: usize) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let mut prev = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        let mut curr = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = prev[j - blo] + 1;
                curr[j - blo + 1] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        prev = curr;
    }
    best
}

/// Indices of the candidates close to `word`, best first.
///
/// At most `n` candidates scoring at least `cutoff` are returned; ties keep
/// the later candidate text first, as ordered by descending `(score, text)`.
pub fn close_matches(word: &str, candidates: &[&str], n: usize, cutoff: f64) -> Vec<usize> {
    let mut scored: Vec<(f64, usize)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| (similarity_ratio(candidate, word), idx))
        .filter(|(score, _)| *score >= cutoff)
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| candidates[b.1].cmp(candidates[a.1]))
    });

    scored.into_iter().take(n).map(|(_, idx)| idx).collect()
}
