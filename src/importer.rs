use std::{collections::HashSet, path::Path};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    message_store::{Message, MessageDb, MessageStore, Thread},
};

/// A chat export: `{"threads": [...], "messages": [...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Corpus {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Thread ids end up as the prefix of persisted postings, which are
    /// split at the first `:`.
    fn validate(&self) -> Result<()> {
        for m in &self.messages {
            if m.thread_id.is_empty() || m.thread_id.contains(':') {
                return Err(Error::Config(format!(
                    "message {} has invalid thread id '{}'",
                    m.id, m.thread_id
                )));
            }
            if m.id.is_empty() {
                return Err(Error::Config(format!(
                    "message in thread {} has an empty id",
                    m.thread_id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub threads: usize,
    pub messages: usize,
    /// Messages whose thread is not part of the import nor already stored.
    pub orphaned: usize,
}

/// Load a corpus into the message store.
///
/// Re-importing the same ids replaces the stored records. The search index
/// is not touched; run a rebuild afterwards.
pub fn import_corpus(db: &MessageDb, corpus: &Corpus) -> Result<ImportSummary> {
    corpus.validate()?;

    let threads = db.insert_threads(&corpus.threads)?;
    let messages = db.insert_messages(&corpus.messages)?;

    let imported: HashSet<&str> =
        corpus.threads.iter().map(|t| t.id.as_str()).collect();
    let mut unknown: Vec<&str> = corpus
        .messages
        .iter()
        .map(|m| m.thread_id.as_str())
        .filter(|id| !imported.contains(id))
        .collect();
    unknown.sort_unstable();
    unknown.dedup();
    let stored = db.threads_by_ids(&unknown)?;
    let orphaned = corpus
        .messages
        .iter()
        .filter(|m| {
            !imported.contains(m.thread_id.as_str())
                && !stored.contains_key(&m.thread_id)
        })
        .count();

    if orphaned > 0 {
        tracing::warn!(orphaned, "messages reference unknown threads");
    }
    tracing::info!(threads, messages, "imported corpus");

    Ok(ImportSummary {
        threads,
        messages,
        orphaned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = r#"{
        "threads": [
            {"id": "t1", "title": "Back pain", "users": ["u1", "d1"], "date_created": 1700000000000}
        ],
        "messages": [
            {"id": "m1", "threadId": "t1", "userId": "u1", "message": "My back hurts", "timestamp": 1700000000001, "msgIndex": 0},
            {"id": "m2", "threadId": "t1", "userId": "d1", "message": "Since when?", "timestamp": 1700000000002, "msgIndex": 1},
            {"id": "m3", "threadId": "t9", "userId": "u2", "message": "Hello", "timestamp": 1700000000003, "msgIndex": 0}
        ]
    }"#;

    fn test_db() -> (tempfile::TempDir, MessageDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = MessageDb::open(&tmp.path().join("messages.db")).unwrap();
        (tmp, db)
    }

    #[test]
    fn import_counts_and_orphans() {
        let (_tmp, db) = test_db();
        let corpus: Corpus = serde_json::from_str(CORPUS).unwrap();

        let summary = import_corpus(&db, &corpus).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                threads: 1,
                messages: 3,
                orphaned: 1,
            }
        );
        assert_eq!(db.message_count().unwrap(), 3);
    }

    #[test]
    fn previously_stored_threads_are_not_orphans() {
        let (_tmp, db) = test_db();
        let corpus: Corpus = serde_json::from_str(CORPUS).unwrap();
        import_corpus(&db, &corpus).unwrap();

        let follow_up = Corpus {
            threads: Vec::new(),
            messages: vec![Message {
                id: "m4".to_string(),
                thread_id: "t1".to_string(),
                user_id: "u1".to_string(),
                text: "Still hurts".to_string(),
                timestamp: 1_700_000_000_004,
                sequence: 2,
            }],
        };
        let summary = import_corpus(&db, &follow_up).unwrap();
        assert_eq!(summary.orphaned, 0);
        assert_eq!(db.message_count().unwrap(), 4);
    }

    #[test]
    fn colon_in_thread_id_is_rejected() {
        let (_tmp, db) = test_db();
        let corpus = Corpus {
            threads: Vec::new(),
            messages: vec![Message {
                id: "m1".to_string(),
                thread_id: "a:b".to_string(),
                user_id: "u1".to_string(),
                text: "hi".to_string(),
                timestamp: 0,
                sequence: 0,
            }],
        };
        assert!(matches!(
            import_corpus(&db, &corpus),
            Err(Error::Config(_))
        ));
        assert_eq!(db.message_count().unwrap(), 0);
    }

    #[test]
    fn from_file_reads_export() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("corpus.json");
        std::fs::write(&path, CORPUS).unwrap();
        let corpus = Corpus::from_file(&path).unwrap();
        assert_eq!(corpus.threads[0].title, "Back pain");
        assert_eq!(corpus.messages[1].sequence, 1);
    }
}
