use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    inverted_index::{InvertedIndex, Posting},
    message_store::{Message, MessageStore, ScanCursor},
    tokenizer,
};

/// Number of terms reported in [`IndexStats::top_terms`].
const TOP_TERMS: usize = 10;

/// Summary of a completed rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub messages_scanned: usize,
    pub unique_terms: usize,
    pub total_postings: usize,
    pub top_terms: Vec<(String, usize)>,
}

impl IndexStats {
    pub fn of(index: &InvertedIndex, messages_scanned: usize) -> Self {
        Self {
            messages_scanned,
            unique_terms: index.len(),
            total_postings: index.total_postings(),
            top_terms: index.top_terms(TOP_TERMS),
        }
    }
}

/// Path of the advisory lock file guarding rebuilds of `index_path`.
pub fn lock_path(index_path: &Path) -> PathBuf {
    let mut name = index_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive hold on the rebuild lock; released on drop.
#[derive(Debug)]
pub struct RebuildLock {
    file: File,
}

impl RebuildLock {
    /// Take the lock without waiting. A held lock means another rebuild is
    /// running, which is reported as [`Error::RebuildInProgress`].
    pub fn acquire(index_path: &Path) -> Result<Self> {
        let path = lock_path(index_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                Error::RebuildIo(format!("cannot open {}: {e}", path.display()))
            })?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Self { file }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(Error::RebuildInProgress(path))
            }
            Err(e) => Err(Error::RebuildIo(format!(
                "cannot lock {}: {e}",
                path.display()
            ))),
        }
    }
}

impl Drop for RebuildLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Full batch rebuild of the inverted index from a message store.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuilder {
    batch_size: usize,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl IndexBuilder {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Scan the whole store and build an index in memory.
    ///
    /// Returns the index and the number of messages scanned. Any store
    /// error aborts the scan.
    pub fn build(
        &self,
        store: &dyn MessageStore,
    ) -> Result<(InvertedIndex, usize)> {
        let mut index = InvertedIndex::new();
        let mut cursor: Option<ScanCursor> = None;
        let mut scanned = 0usize;
        let mut batch_no = 0usize;

        loop {
            let batch = store
                .scan_batch(cursor.as_ref(), self.batch_size)
                .map_err(|e| {
                    Error::RebuildIo(format!(
                        "reading batch {batch_no} failed: {e}"
                    ))
                })?;
            let Some(last) = batch.last() else {
                break;
            };
            cursor = Some(ScanCursor::after(last));

            // Tokenize in parallel, append in scan order.
            let tokenized: Vec<(Posting, Vec<String>)> =
                batch.par_iter().map(message_terms).collect();
            for (posting, terms) in tokenized {
                for term in &terms {
                    index.insert(term, posting.clone());
                }
            }

            scanned += batch.len();
            tracing::debug!(
                batch = batch_no,
                messages = batch.len(),
                scanned,
                terms = index.len(),
                "indexed batch"
            );
            batch_no += 1;

            if batch.len() < self.batch_size {
                break;
            }
        }

        Ok((index, scanned))
    }

    /// Rebuild and publish the index at `target`.
    ///
    /// The previously published file stays in place until the new one is
    /// complete; on any failure it is left untouched.
    pub fn rebuild(
        &self,
        store: &dyn MessageStore,
        target: &Path,
    ) -> Result<IndexStats> {
        let _lock = RebuildLock::acquire(target)?;

        let (index, scanned) = self.build(store)?;
        index.write_atomic(target).map_err(|e| {
            Error::RebuildIo(format!(
                "publishing {} failed: {e}",
                target.display()
            ))
        })?;

        let stats = IndexStats::of(&index, scanned);
        tracing::info!(
            messages = stats.messages_scanned,
            unique_terms = stats.unique_terms,
            total_postings = stats.total_postings,
            path = %target.display(),
            "search index rebuilt"
        );
        Ok(stats)
    }
}

/// A message's posting and its index terms in text order. A term that
/// occurs twice is posted twice; queries collapse repeats by posting key.
fn message_terms(message: &Message) -> (Posting, Vec<String>) {
    let terms = tokenizer::tokenize_for_index(&message.text);
    (Posting::new(&message.thread_id, &message.id), terms)
}
