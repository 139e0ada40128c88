//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use counsel_search::{
    Error,
    IndexBuilder,
    IndexHandle,
    Message,
    MessageStore,
    Result,
    SearchEngine,
    SearchOptions,
    SynonymTable,
    Thread,
    message_store::ScanCursor,
};
use parking_lot::Mutex;

pub fn message(
    id: &str,
    thread: &str,
    sequence: u64,
    timestamp: i64,
    text: &str,
) -> Message {
    Message {
        id: id.to_string(),
        thread_id: thread.to_string(),
        user_id: "patient".to_string(),
        text: text.to_string(),
        timestamp,
        sequence,
    }
}

pub fn thread(id: &str, title: &str) -> Thread {
    Thread {
        id: id.to_string(),
        title: title.to_string(),
        users: vec!["patient".to_string(), "doctor".to_string()],
        date_created: 0,
    }
}

/// In-memory store that records every context window it is asked for and
/// can be told to fail range lookups for one thread.
#[derive(Default)]
pub struct VecStore {
    messages: Vec<Message>,
    threads: Vec<Thread>,
    failing_thread: Option<String>,
    pub range_requests: Mutex<Vec<(String, u64, u64)>>,
}

impl VecStore {
    pub fn new(messages: Vec<Message>, threads: Vec<Thread>) -> Self {
        Self {
            messages,
            threads,
            ..Self::default()
        }
    }

    pub fn failing_ranges_for(mut self, thread_id: &str) -> Self {
        self.failing_thread = Some(thread_id.to_string());
        self
    }
}

impl MessageStore for VecStore {
    fn get_message(&self, id: &str) -> Result<Option<Message>> {
        Ok(self.messages.iter().find(|m| m.id == id).cloned())
    }

    fn messages_in_range(
        &self,
        thread_id: &str,
        lo: u64,
        hi: u64,
    ) -> Result<Vec<Message>> {
        self.range_requests
            .lock()
            .push((thread_id.to_string(), lo, hi));
        if self.failing_thread.as_deref() == Some(thread_id) {
            return Err(Error::Io(std::io::Error::other("replica offline")));
        }
        let mut found: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| {
                m.thread_id == thread_id && (lo..=hi).contains(&m.sequence)
            })
            .cloned()
            .collect();
        found.sort_by_key(|m| m.sequence);
        Ok(found)
    }

    fn messages_by_ids(
        &self,
        ids: &[&str],
    ) -> Result<HashMap<String, Message>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| ids.contains(&m.id.as_str()))
            .map(|m| (m.id.clone(), m.clone()))
            .collect())
    }

    fn threads_by_ids(&self, ids: &[&str]) -> Result<HashMap<String, Thread>> {
        Ok(self
            .threads
            .iter()
            .filter(|t| ids.contains(&t.id.as_str()))
            .map(|t| (t.id.clone(), t.clone()))
            .collect())
    }

    fn scan_batch(
        &self,
        after: Option<&ScanCursor>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let mut ordered: Vec<&Message> = self.messages.iter().collect();
        ordered.sort_by(|a, b| {
            (a.sequence, a.id.as_str()).cmp(&(b.sequence, b.id.as_str()))
        });
        Ok(ordered
            .into_iter()
            .filter(|m| match after {
                Some(c) => {
                    (m.sequence, m.id.as_str())
                        > (c.sequence, c.message_id.as_str())
                }
                None => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Index `store` in memory and wire an engine around it.
pub fn engine(
    store: Arc<VecStore>,
    synonyms: SynonymTable,
    options: SearchOptions,
) -> SearchEngine {
    let (index, _) = IndexBuilder::new(2)
        .build(store.as_ref())
        .expect("in-memory build");
    SearchEngine::new(
        Arc::new(IndexHandle::from_index(index)),
        Arc::new(synonyms),
        store,
        options,
    )
}
