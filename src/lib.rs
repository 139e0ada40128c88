//! counsel-search - message search for patient/physician counseling chats.
//!
//! Messages are tokenized into an inverted index that is rebuilt in full
//! from a message store and published as a single JSON file. Queries are
//! matched literally, corrected against the index vocabulary by edit
//! distance, and widened with a medical thesaurus when exact matches are
//! scarce. Each hit comes back with the surrounding conversation.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use counsel_search::{
//!     DataDir, IndexBuilder, IndexHandle, MessageDb, SearchEngine,
//!     SearchOptions, SynonymTable,
//! };
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = MessageDb::open(&data_dir.messages_db()).unwrap();
//! let index_path = data_dir.index_path().unwrap();
//!
//! IndexBuilder::default().rebuild(&store, &index_path).unwrap();
//!
//! let engine = SearchEngine::new(
//!     Arc::new(IndexHandle::open(&index_path)),
//!     Arc::new(SynonymTable::builtin()),
//!     Arc::new(store),
//!     SearchOptions::default(),
//! );
//!
//! let response = engine.search("back pian");
//! for c in &response.corrected_terms {
//!     println!("{} -> {}", c.original, c.corrected);
//! }
//! for r in &response.results {
//!     println!("{:?} {}:{}", r.tier, r.thread_id, r.message_id);
//! }
//! ```

pub mod config_db;
pub mod context;
pub mod data_dir;
pub mod error;
pub mod expansion;
pub mod fuzzy;
pub mod importer;
pub mod index_builder;
pub mod inverted_index;
pub mod message_store;
pub mod search;
pub mod synonyms;
pub mod tokenizer;

pub use config_db::{ConfigDb, SearchConfig};
pub use context::ContextAssembler;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use index_builder::{IndexBuilder, IndexStats};
pub use inverted_index::{IndexHandle, InvertedIndex, Posting};
pub use message_store::{Message, MessageDb, MessageStore, Thread};
pub use search::{
    Hydration,
    MatchTier,
    QueryResult,
    SearchEngine,
    SearchOptions,
    SearchResponse,
    TermCorrection,
};
pub use synonyms::SynonymTable;
