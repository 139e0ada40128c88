use std::{collections::HashMap, ops::Bound, path::Path};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// message id -> JSON encoded [`Message`]
const MESSAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("messages");
/// (thread id, sequence) -> message id
const BY_THREAD: TableDefinition<(&str, u64), &str> =
    TableDefinition::new("messages_by_thread");
/// (sequence, message id) -> thread id; the stable scan order for rebuilds
const SCAN_ORDER: TableDefinition<(u64, &str), &str> =
    TableDefinition::new("scan_order");
/// thread id -> JSON encoded [`Thread`]
const THREADS: TableDefinition<&str, &[u8]> = TableDefinition::new("threads");

/// One chat message. Field names on the wire follow the export format of
/// the chat database (`message`, `msgIndex`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    #[serde(rename = "message")]
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Position of the message inside its thread.
    #[serde(rename = "msgIndex")]
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub date_created: i64,
}

/// Position in the rebuild scan: the key of the last message already seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    pub sequence: u64,
    pub message_id: String,
}

impl ScanCursor {
    pub fn after(message: &Message) -> Self {
        Self {
            sequence: message.sequence,
            message_id: message.id.clone(),
        }
    }
}

/// Read-only access to the message corpus.
///
/// The search pipeline never writes through this trait. Implementations
/// must be safe to call from several threads at once, since context
/// windows are hydrated in parallel.
pub trait MessageStore: Send + Sync {
    fn get_message(&self, id: &str) -> Result<Option<Message>>;

    /// Messages of `thread_id` whose sequence lies in `lo..=hi`, ascending.
    fn messages_in_range(
        &self,
        thread_id: &str,
        lo: u64,
        hi: u64,
    ) -> Result<Vec<Message>>;

    /// Batch point lookup. Unknown ids are absent from the map.
    fn messages_by_ids(&self, ids: &[&str]) -> Result<HashMap<String, Message>>;

    fn threads_by_ids(&self, ids: &[&str]) -> Result<HashMap<String, Thread>>;

    /// Up to `limit` messages ordered by `(sequence, id)`, strictly after
    /// `after` when given.
    fn scan_batch(
        &self,
        after: Option<&ScanCursor>,
        limit: usize,
    ) -> Result<Vec<Message>>;
}

/// redb-backed message store.
pub struct MessageDb {
    db: Database,
}

impl MessageDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(MESSAGES)?;
        txn.open_table(BY_THREAD)?;
        txn.open_table(SCAN_ORDER)?;
        txn.open_table(THREADS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Insert or replace messages in a single transaction.
    ///
    /// `(thread_id, sequence)` is expected to be unique; a later message
    /// with the same pair shadows the earlier one in range lookups.
    pub fn insert_messages(&self, messages: &[Message]) -> Result<usize> {
        if messages.is_empty() {
            return Ok(0);
        }
        let txn = self.db.begin_write()?;
        {
            let mut records = txn.open_table(MESSAGES)?;
            let mut by_thread = txn.open_table(BY_THREAD)?;
            let mut scan = txn.open_table(SCAN_ORDER)?;

            for message in messages {
                let previous = records
                    .get(message.id.as_str())?
                    .map(|v| v.value().to_vec());
                if let Some(bytes) = previous {
                    let old: Message = serde_json::from_slice(&bytes)?;
                    by_thread.remove((old.thread_id.as_str(), old.sequence))?;
                    scan.remove((old.sequence, old.id.as_str()))?;
                }

                let bytes = serde_json::to_vec(message)?;
                records.insert(message.id.as_str(), bytes.as_slice())?;
                by_thread.insert(
                    (message.thread_id.as_str(), message.sequence),
                    message.id.as_str(),
                )?;
                scan.insert(
                    (message.sequence, message.id.as_str()),
                    message.thread_id.as_str(),
                )?;
            }
        }
        txn.commit()?;
        Ok(messages.len())
    }

    pub fn insert_threads(&self, threads: &[Thread]) -> Result<usize> {
        if threads.is_empty() {
            return Ok(0);
        }
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(THREADS)?;
            for thread in threads {
                let bytes = serde_json::to_vec(thread)?;
                table.insert(thread.id.as_str(), bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(threads.len())
    }

    pub fn message_count(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MESSAGES)?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

impl MessageStore for MessageDb {
    fn get_message(&self, id: &str) -> Result<Option<Message>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MESSAGES)?;
        match table.get(id)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    fn messages_in_range(
        &self,
        thread_id: &str,
        lo: u64,
        hi: u64,
    ) -> Result<Vec<Message>> {
        if lo > hi {
            return Ok(Vec::new());
        }
        let txn = self.db.begin_read()?;
        let by_thread = txn.open_table(BY_THREAD)?;
        let records = txn.open_table(MESSAGES)?;

        let mut result = Vec::new();
        for entry in by_thread.range((thread_id, lo)..=(thread_id, hi))? {
            let (_key, id) = entry?;
            if let Some(v) = records.get(id.value())? {
                result.push(serde_json::from_slice(v.value())?);
            }
        }
        Ok(result)
    }

    fn messages_by_ids(&self, ids: &[&str]) -> Result<HashMap<String, Message>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MESSAGES)?;
        let mut result = HashMap::with_capacity(ids.len());
        for &id in ids {
            if let Some(v) = table.get(id)? {
                let message: Message = serde_json::from_slice(v.value())?;
                result.insert(message.id.clone(), message);
            }
        }
        Ok(result)
    }

    fn threads_by_ids(&self, ids: &[&str]) -> Result<HashMap<String, Thread>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(THREADS)?;
        let mut result = HashMap::with_capacity(ids.len());
        for &id in ids {
            if let Some(v) = table.get(id)? {
                let thread: Thread = serde_json::from_slice(v.value())?;
                result.insert(thread.id.clone(), thread);
            }
        }
        Ok(result)
    }

    fn scan_batch(
        &self,
        after: Option<&ScanCursor>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let txn = self.db.begin_read()?;
        let scan = txn.open_table(SCAN_ORDER)?;
        let records = txn.open_table(MESSAGES)?;

        let range = match after {
            Some(cursor) => scan.range((
                Bound::Excluded((cursor.sequence, cursor.message_id.as_str())),
                Bound::Unbounded,
            ))?,
            None => scan.iter()?,
        };

        let mut result = Vec::with_capacity(limit);
        for entry in range.take(limit) {
            let (key, _thread) = entry?;
            let (_sequence, id) = key.value();
            if let Some(v) = records.get(id)? {
                result.push(serde_json::from_slice(v.value())?);
            }
        }
        Ok(result)
    }
}

impl std::fmt::Debug for MessageDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDb").finish_non_exhaustive()
    }
}
