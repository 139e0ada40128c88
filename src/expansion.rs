//! Synonym expansion for queries with too few exact matches.

use std::collections::{BTreeSet, HashSet};

use crate::{
    inverted_index::{InvertedIndex, Posting},
    synonyms::SynonymTable,
    tokenizer::MIN_TERM_CHARS,
};

/// Expansion runs only when the exact tier is thin.
///
/// `exact_total` counts every literal and corrected posting before
/// deduplication. A threshold of zero disables expansion.
pub fn should_expand(exact_total: usize, threshold: usize) -> bool {
    exact_total < threshold
}

/// Union of the synonyms of every query term, sorted.
///
/// Query terms, corrected terms and anything too short to be an index
/// term are left out.
pub fn expansion_terms(
    query_terms: &[String],
    corrected_terms: &[&str],
    synonyms: &SynonymTable,
) -> Vec<String> {
    let excluded: HashSet<&str> = query_terms
        .iter()
        .map(String::as_str)
        .chain(corrected_terms.iter().copied())
        .collect();

    let mut terms = BTreeSet::new();
    for term in query_terms {
        for related in synonyms.lookup(term) {
            if related.chars().count() > MIN_TERM_CHARS
                && !excluded.contains(related)
            {
                terms.insert(related.to_string());
            }
        }
    }
    terms.into_iter().collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Every synonym searched, whether or not it matched.
    pub terms: Vec<String>,
    /// Postings reached only through a synonym, in term order.
    pub postings: Vec<Posting>,
}

/// Resolve expansion terms against the index.
///
/// Synonyms are looked up literally; they are never spell-corrected.
/// Postings whose key is already in `exact_keys` stay in the exact tier.
pub fn expand(
    index: &InvertedIndex,
    synonyms: &SynonymTable,
    query_terms: &[String],
    corrected_terms: &[&str],
    exact_keys: &HashSet<String>,
) -> Expansion {
    let terms = expansion_terms(query_terms, corrected_terms, synonyms);
    let postings = terms
        .iter()
        .filter_map(|term| index.get(term))
        .flatten()
        .filter(|p| !exact_keys.contains(&p.key()))
        .cloned()
        .collect();

    Expansion { terms, postings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn table() -> SynonymTable {
        let mut table = SynonymTable::empty();
        table.extend("pain", ["ache", "hurt", "sore", "ok"]);
        table.extend("back", ["spine", "pain"]);
        table
    }

    #[test]
    fn threshold_is_strict() {
        assert!(should_expand(3, 20));
        assert!(should_expand(19, 20));
        assert!(!should_expand(20, 20));
        assert!(!should_expand(0, 0));
    }

    #[test]
    fn terms_exclude_query_corrections_and_short_tokens() {
        let got = expansion_terms(&terms(&["back", "pain"]), &["hurt"], &table());
        assert_eq!(got, vec!["ache", "sore", "spine"]);
    }

    #[test]
    fn unknown_terms_expand_to_nothing() {
        let got = expansion_terms(&terms(&["stretching"]), &[], &table());
        assert!(got.is_empty());
    }

    #[test]
    fn expand_keeps_exact_postings_out_of_semantic_set() {
        let mut index = InvertedIndex::new();
        index.insert("ache", Posting::new("t1", "m1"));
        index.insert("ache", Posting::new("t2", "m2"));
        index.insert("spine", Posting::new("t3", "m3"));

        let exact: HashSet<String> = ["t1:m1".to_string()].into();
        let expansion =
            expand(&index, &table(), &terms(&["back", "pain"]), &[], &exact);

        assert_eq!(expansion.terms, vec!["ache", "hurt", "sore", "spine"]);
        assert_eq!(
            expansion.postings,
            vec![Posting::new("t2", "m2"), Posting::new("t3", "m3")]
        );
    }
}
