use std::{
    collections::BTreeMap,
    fmt,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One occurrence of a term: the message that contains it and its thread.
///
/// Persisted as `"thread_id:message_id"`. Parsing splits at the first `:`,
/// so thread ids must not contain one; message ids may.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Posting {
    pub thread_id: String,
    pub message_id: String,
}

impl Posting {
    pub fn new(
        thread_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            message_id: message_id.into(),
        }
    }

    /// Deduplication key; identical to the persisted form.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.thread_id, self.message_id)
    }
}

impl TryFrom<String> for Posting {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.split_once(':') {
            Some((thread, message))
                if !thread.is_empty() && !message.is_empty() =>
            {
                Ok(Self::new(thread, message))
            }
            _ => Err(format!("malformed posting '{value}'")),
        }
    }
}

impl From<Posting> for String {
    fn from(posting: Posting) -> Self {
        posting.to_string()
    }
}

/// Term -> postings in corpus scan order.
///
/// Serializes as a plain JSON object. The map is ordered, so the same
/// corpus always produces the same file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    terms: BTreeMap<String, Vec<Posting>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a posting to a term's list.
    pub fn insert(&mut self, term: &str, posting: Posting) {
        match self.terms.get_mut(term) {
            Some(list) => list.push(posting),
            None => {
                self.terms.insert(term.to_string(), vec![posting]);
            }
        }
    }

    pub fn get(&self, term: &str) -> Option<&[Posting]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    /// All terms, ascending.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn total_postings(&self) -> usize {
        self.terms.values().map(Vec::len).sum()
    }

    /// The `n` terms with the most postings, ties broken alphabetically.
    pub fn top_terms(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts: Vec<(&str, usize)> = self
            .terms
            .iter()
            .map(|(term, postings)| (term.as_str(), postings.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
            .into_iter()
            .take(n)
            .map(|(term, count)| (term.to_string(), count))
            .collect()
    }

    /// Read a published index.
    ///
    /// A missing file, unparseable JSON, or a term with no postings all
    /// mean the index cannot be trusted and yield
    /// [`Error::IndexUnavailable`].
    pub fn load(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| Error::IndexUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                unavailable("index has not been built".to_string())
            }
            _ => unavailable(e.to_string()),
        })?;

        let index: Self = serde_json::from_slice(&bytes)
            .map_err(|e| unavailable(format!("corrupt index: {e}")))?;

        if let Some((term, _)) =
            index.terms.iter().find(|(_, postings)| postings.is_empty())
        {
            return Err(unavailable(format!(
                "corrupt index: term '{term}' has no postings"
            )));
        }

        tracing::debug!(
            path = %path.display(),
            terms = index.len(),
            "loaded search index"
        );
        Ok(index)
    }

    /// Publish the index at `path` atomically.
    ///
    /// The JSON is staged in a temp file in the same directory, synced,
    /// then renamed over `path`. Readers see the old file or the new one.
    /// The directory is synced afterwards so the rename itself is durable.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut staged, self)?;
        staged.flush()?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;
        sync_dir(dir)?;
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

// Directories cannot be opened as files here; the rename is as durable as
// the platform makes it.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Shared, swappable view of the published index.
///
/// Queries take a [`snapshot`](Self::snapshot) once and work on that `Arc`
/// for their whole lifetime, so a concurrent [`reload`](Self::reload) is
/// observed either entirely or not at all.
pub struct IndexHandle {
    path: Option<PathBuf>,
    current: RwLock<std::result::Result<Arc<InvertedIndex>, String>>,
}

impl IndexHandle {
    /// Open the index at `path`. A missing or corrupt file is not an error
    /// here; it is reported by every [`snapshot`](Self::snapshot) until a
    /// successful reload.
    pub fn open(path: &Path) -> Self {
        let handle = Self {
            path: Some(path.to_path_buf()),
            current: RwLock::new(Err("not loaded".to_string())),
        };
        if let Err(e) = handle.reload() {
            tracing::warn!("{e}");
        }
        handle
    }

    /// Wrap an index that only lives in memory.
    pub fn from_index(index: InvertedIndex) -> Self {
        Self {
            path: None,
            current: RwLock::new(Ok(Arc::new(index))),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the published file and swap it in.
    ///
    /// On failure the handle keeps serving nothing: a stale index after a
    /// failed reload would hide that the file on disk is broken.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match InvertedIndex::load(path) {
            Ok(index) => {
                *self.current.write() = Ok(Arc::new(index));
                Ok(())
            }
            Err(e) => {
                let reason = match &e {
                    Error::IndexUnavailable { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                *self.current.write() = Err(reason);
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> Result<Arc<InvertedIndex>> {
        match &*self.current.read() {
            Ok(index) => Ok(Arc::clone(index)),
            Err(reason) => Err(Error::IndexUnavailable {
                path: self.path.clone().unwrap_or_default(),
                reason: reason.clone(),
            }),
        }
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
