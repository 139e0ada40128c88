//! Spelling correction against the index vocabulary.
//!
//! `suggest` runs a full Levenshtein DP against every vocabulary term, so a
//! query costs O(V * |q| * |t|). That is fine for a chat corpus vocabulary
//! but scales linearly with it; the per-request deadline is what keeps a
//! huge vocabulary from stalling a query.

use std::time::Instant;

pub const MAX_EDIT_DISTANCE: usize = 2;
pub const MAX_SUGGESTIONS: usize = 5;

/// How many candidates to score between deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Unit-cost Levenshtein distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ac) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, bc) in b.iter().enumerate() {
            let cost = usize::from(ac != bc);
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub term: String,
    pub distance: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestions {
    /// At most [`MAX_SUGGESTIONS`], ascending by distance; ties keep
    /// vocabulary order.
    pub candidates: Vec<Suggestion>,
    /// The deadline passed before the whole vocabulary was scanned.
    pub truncated: bool,
}

impl Suggestions {
    pub fn best(&self) -> Option<&Suggestion> {
        self.candidates.first()
    }
}

/// Find vocabulary terms within edit distance 1..=2 of `term`.
///
/// Exact matches are excluded; the caller looks those up directly.
pub fn suggest<'a>(
    term: &str,
    vocabulary: impl IntoIterator<Item = &'a str>,
    deadline: Option<Instant>,
) -> Suggestions {
    let term_len = term.chars().count();
    let mut found = Vec::new();
    let mut truncated = false;

    for (scanned, candidate) in vocabulary.into_iter().enumerate() {
        let check = scanned > 0 && scanned % DEADLINE_CHECK_INTERVAL == 0;
        if check && deadline.is_some_and(|d| Instant::now() >= d) {
            truncated = true;
            break;
        }

        // Length difference is a lower bound on the distance.
        if candidate.chars().count().abs_diff(term_len) > MAX_EDIT_DISTANCE {
            continue;
        }

        let distance = levenshtein(term, candidate);
        if distance > 0 && distance <= MAX_EDIT_DISTANCE {
            found.push(Suggestion {
                term: candidate.to_string(),
                distance,
            });
        }
    }

    found.sort_by_key(|s| s.distance);
    found.truncate(MAX_SUGGESTIONS);

    if truncated {
        tracing::debug!(term, kept = found.len(), "fuzzy scan hit deadline");
    }

    Suggestions {
        candidates: found,
        truncated,
    }
}
