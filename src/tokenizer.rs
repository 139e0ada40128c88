//! Text normalization for the inverted index and for queries.
//!
//! Both paths lowercase, turn every character that is neither alphanumeric
//! nor whitespace into a space, split on whitespace and drop tokens of two
//! characters or fewer. Only the index path removes stop words and purely
//! numeric tokens. A query made of a single stop word therefore keeps its
//! term but can never match anything.

/// Minimum token length (in chars) is `MIN_TERM_CHARS + 1`.
pub const MIN_TERM_CHARS: usize = 2;

/// Common English function words that never enter the index.
const STOP_WORDS: &[&str] = &[
    "a", "all", "an", "and", "any", "are", "as", "at", "be", "both", "but",
    "by", "can", "each", "few", "for", "from", "had", "has", "have", "he",
    "her", "hers", "herself", "him", "himself", "how", "i", "in", "is", "it",
    "its", "itself", "just", "me", "more", "most", "no", "nor", "not", "now",
    "of", "on", "only", "or", "other", "our", "ours", "ourselves", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "they", "this", "to", "too",
    "us", "very", "was", "we", "what", "when", "where", "which", "who", "why",
    "will", "with", "you", "your", "yours", "yourself", "yourselves",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

fn is_long_enough(token: &str) -> bool {
    token.chars().count() > MIN_TERM_CHARS
}

fn is_numeric(token: &str) -> bool {
    token.chars().all(char::is_numeric)
}

/// Lowercase, strip punctuation and split. No filtering.
fn raw_tokens(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Whether a token could ever be an index term. Stop words and numbers
/// are dropped at index time, so a query term failing this has no
/// meaningful spelling correction either.
pub fn is_indexable(token: &str) -> bool {
    is_long_enough(token) && !is_stop_word(token) && !is_numeric(token)
}

/// Tokenize message text for indexing.
pub fn tokenize_for_index(text: &str) -> Vec<String> {
    raw_tokens(text)
        .into_iter()
        .filter(|t| is_indexable(t))
        .collect()
}

/// Tokenize a user query. Only the length filter applies.
pub fn tokenize_query(text: &str) -> Vec<String> {
    raw_tokens(text)
        .into_iter()
        .filter(|t| is_long_enough(t))
        .collect()
}
