use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    config_db::SearchConfig,
    context::ContextAssembler,
    error::Result,
    expansion,
    fuzzy,
    inverted_index::{IndexHandle, Posting},
    message_store::{Message, MessageStore},
    synonyms::SynonymTable,
    tokenizer,
};

/// Characters of message text shown per context line in terminal output.
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub expansion_threshold: usize,
    pub result_limit: usize,
    /// Upper bound on time spent in spelling correction per query.
    pub time_budget: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            expansion_threshold: config.expansion_threshold,
            result_limit: config.result_limit,
            time_budget: config.time_budget,
        }
    }
}

/// How a result was reached. Exact sorts before semantic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// A literal query term or its spelling correction.
    Exact,
    /// Only a synonym of a query term.
    Semantic,
}

/// Context window of a result, or why it could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Hydration {
    Hydrated { messages: Vec<Message> },
    Degraded { reason: String },
}

impl Hydration {
    pub fn messages(&self) -> &[Message] {
        match self {
            Self::Hydrated { messages } => messages,
            Self::Degraded { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub thread_id: String,
    pub message_id: String,
    pub timestamp: Option<i64>,
    pub thread_name: Option<String>,
    pub tier: MatchTier,
    pub context: Hydration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermCorrection {
    pub original: String,
    pub corrected: String,
    pub distance: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<QueryResult>,
    /// Number of results returned.
    pub total_results: usize,
    /// Distinct matches before the result limit was applied.
    pub total_matches: usize,
    pub exact_match_count: usize,
    pub semantic_match_count: usize,
    pub corrected_terms: Vec<TermCorrection>,
    pub expansion_terms: Vec<String>,
    pub used_expansion: bool,
    /// Spelling correction ran out of time before scanning every term.
    pub fuzzy_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }
}

/// A candidate before hydration.
struct Candidate {
    posting: Posting,
    tier: MatchTier,
}

/// Query pipeline over a shared index, synonym table and message store.
///
/// Every collaborator is injected; the engine keeps no mutable state, so
/// one instance can serve concurrent queries.
pub struct SearchEngine {
    index: Arc<IndexHandle>,
    synonyms: Arc<SynonymTable>,
    store: Arc<dyn MessageStore>,
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(
        index: Arc<IndexHandle>,
        synonyms: Arc<SynonymTable>,
        store: Arc<dyn MessageStore>,
        options: SearchOptions,
    ) -> Self {
        Self {
            index,
            synonyms,
            store,
            options,
        }
    }

    /// Run a query. Failures are reported in [`SearchResponse::error`],
    /// never returned.
    pub fn search(&self, query: &str) -> SearchResponse {
        let terms = unique_query_terms(query);
        if terms.is_empty() {
            return SearchResponse::empty(query);
        }

        match self.run(query, &terms) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(query, "search failed: {e}");
                SearchResponse {
                    error: Some(e.to_string()),
                    ..SearchResponse::empty(query)
                }
            }
        }
    }

    fn run(&self, query: &str, terms: &[String]) -> Result<SearchResponse> {
        let index = self.index.snapshot()?;
        let deadline = Instant::now() + self.options.time_budget;

        // Exact tier: literal hits in query order, then corrections.
        let mut literal: Vec<Posting> = Vec::new();
        let mut corrected: Vec<Posting> = Vec::new();
        let mut corrections: Vec<TermCorrection> = Vec::new();
        let mut fuzzy_truncated = false;

        for term in terms {
            if let Some(postings) = index.get(term) {
                literal.extend_from_slice(postings);
                continue;
            }
            if !tokenizer::is_indexable(term) {
                continue;
            }
            let suggestions = fuzzy::suggest(term, index.terms(), Some(deadline));
            fuzzy_truncated |= suggestions.truncated;
            if let Some(best) = suggestions.best() {
                if let Some(postings) = index.get(&best.term) {
                    corrected.extend_from_slice(postings);
                }
                corrections.push(TermCorrection {
                    original: term.clone(),
                    corrected: best.term.clone(),
                    distance: best.distance,
                });
            }
        }

        let exact_total = literal.len() + corrected.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<Candidate> = Vec::new();
        for posting in literal.into_iter().chain(corrected) {
            if seen.insert(posting.key()) {
                candidates.push(Candidate {
                    posting,
                    tier: MatchTier::Exact,
                });
            }
        }

        let used_expansion = expansion::should_expand(
            exact_total,
            self.options.expansion_threshold,
        );
        let mut expansion_terms = Vec::new();
        if used_expansion {
            let corrected_terms: Vec<&str> =
                corrections.iter().map(|c| c.corrected.as_str()).collect();
            let expanded = expansion::expand(
                &index,
                &self.synonyms,
                terms,
                &corrected_terms,
                &seen,
            );
            for posting in expanded.postings {
                if seen.insert(posting.key()) {
                    candidates.push(Candidate {
                        posting,
                        tier: MatchTier::Semantic,
                    });
                }
            }
            expansion_terms = expanded.terms;
        }

        tracing::debug!(
            query,
            exact_total,
            candidates = candidates.len(),
            used_expansion,
            "resolved matches"
        );

        let messages = self.lookup_messages(&candidates);
        let timestamp =
            |c: &Candidate| messages.get(&c.posting.message_id).map(|m| m.timestamp);
        candidates.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| newest_first(timestamp(a), timestamp(b)))
        });

        let total_matches = candidates.len();
        candidates.truncate(self.options.result_limit);

        let titles = self.lookup_titles(&candidates);
        let assembler = ContextAssembler::new(self.store.as_ref());
        let results: Vec<QueryResult> = candidates
            .into_par_iter()
            .map(|c| {
                let message = messages.get(&c.posting.message_id);
                let context = hydrate(&assembler, &c.posting, message);
                QueryResult {
                    timestamp: message.map(|m| m.timestamp),
                    thread_name: titles.get(&c.posting.thread_id).cloned(),
                    tier: c.tier,
                    context,
                    thread_id: c.posting.thread_id,
                    message_id: c.posting.message_id,
                }
            })
            .collect();

        let exact_match_count = results
            .iter()
            .filter(|r| r.tier == MatchTier::Exact)
            .count();

        Ok(SearchResponse {
            query: query.to_string(),
            total_results: results.len(),
            total_matches,
            exact_match_count,
            semantic_match_count: results.len() - exact_match_count,
            results,
            corrected_terms: corrections,
            expansion_terms,
            used_expansion,
            fuzzy_truncated,
            error: None,
        })
    }

    /// Batch lookup of the matched messages. A store failure only costs
    /// timestamps and context, so it is logged rather than propagated.
    fn lookup_messages(
        &self,
        candidates: &[Candidate],
    ) -> HashMap<String, Message> {
        let ids: Vec<&str> = candidates
            .iter()
            .map(|c| c.posting.message_id.as_str())
            .collect();
        self.store.messages_by_ids(&ids).unwrap_or_else(|e| {
            tracing::warn!("message lookup failed: {e}");
            HashMap::new()
        })
    }

    fn lookup_titles(&self, candidates: &[Candidate]) -> HashMap<String, String> {
        let mut ids: Vec<&str> = candidates
            .iter()
            .map(|c| c.posting.thread_id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        match self.store.threads_by_ids(&ids) {
            Ok(threads) => threads
                .into_iter()
                .map(|(id, thread)| (id, thread.title))
                .collect(),
            Err(e) => {
                tracing::warn!("thread lookup failed: {e}");
                HashMap::new()
            }
        }
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("index", &self.index)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Query terms in order, duplicates collapsed to their first occurrence.
fn unique_query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenizer::tokenize_query(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Descending timestamps, missing ones last.
fn newest_first(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn hydrate(
    assembler: &ContextAssembler<'_>,
    posting: &Posting,
    message: Option<&Message>,
) -> Hydration {
    let Some(message) = message else {
        tracing::warn!(posting = %posting, "matched message missing from store");
        return Hydration::Degraded {
            reason: "message not found".to_string(),
        };
    };
    match assembler.window(&posting.thread_id, message.sequence) {
        Ok(messages) => Hydration::Hydrated { messages },
        Err(e) => {
            tracing::warn!(posting = %posting, "context lookup failed: {e}");
            Hydration::Degraded {
                reason: e.to_string(),
            }
        }
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Format a response for human-readable terminal output.
pub fn format_human(response: &SearchResponse) {
    if let Some(error) = &response.error {
        println!("Search failed: {error}");
        return;
    }

    for c in &response.corrected_terms {
        println!("Did you mean \"{}\" for \"{}\"?", c.corrected, c.original);
    }
    if response.used_expansion && !response.expansion_terms.is_empty() {
        println!("Also searched: {}", response.expansion_terms.join(", "));
    }

    if response.results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, r) in response.results.iter().enumerate() {
        let title = r.thread_name.as_deref().unwrap_or(&r.thread_id);
        let tier = match r.tier {
            MatchTier::Exact => "exact",
            MatchTier::Semantic => "related",
        };
        println!("{:>3}. [{tier}] {title} #{}", i + 1, r.message_id);
        match &r.context {
            Hydration::Hydrated { messages } => {
                for m in messages {
                    let marker = if m.id == r.message_id { ">" } else { " " };
                    println!("     {marker} {}", preview(&m.text));
                }
            }
            Hydration::Degraded { reason } => {
                println!("     (context unavailable: {reason})");
            }
        }
    }
    println!(
        "\n{} result(s) ({} exact, {} related)",
        response.total_results,
        response.exact_match_count,
        response.semantic_match_count
    );
}

/// Format a response as JSON output.
pub fn format_json(response: &SearchResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}
