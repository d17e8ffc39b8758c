//! JSON document backend.
//!
//! Each conversation is one aggregate document, `<dir>/<id>.json`, holding
//! its summary, dialogs, state and breakpoints. Every write rewrites the
//! whole document through a temp file, `fsync` and rename, so a batch is
//! persisted as one unit and readers see either the old or the new document.
//!
//! A process-wide mutex serializes read-modify-write cycles.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rewind_core::{Breakpoint, ConversationId, ConversationSummary, DialogEntry, StateEntry};

use crate::errors::{Result, StoreError};
use crate::memory::sort_summaries;
use crate::repository::{ConversationRepository, DialogWrite, WriteBatch};

const EXTENSION: &str = "json";

/// On-disk aggregate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConversationDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConversationSummary>,
    dialogs: Vec<DialogEntry>,
    state: Vec<StateEntry>,
    breakpoints: Vec<Breakpoint>,
}

/// Directory of per-conversation JSON documents.
#[derive(Debug)]
pub struct DocumentRepository {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DocumentRepository {
    /// Open a document directory, creating it if missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "document repository ready");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ConversationId) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.{EXTENSION}")))
    }

    fn read(&self, id: &ConversationId) -> Result<ConversationDocument> {
        read_document(&self.path_for(id)?)
    }

    fn update(&self, id: &ConversationId, f: impl FnOnce(&mut ConversationDocument)) -> Result<()> {
        let path = self.path_for(id)?;
        let _guard = self.write_lock.lock();
        let mut doc = read_document(&path)?;
        f(&mut doc);
        write_document(&path, &doc)
    }
}

fn read_document(path: &Path) -> Result<ConversationDocument> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(ConversationDocument::default()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConversationDocument::default()),
        Err(e) => Err(e.into()),
    }
}

fn write_document(path: &Path, doc: &ConversationDocument) -> Result<()> {
    let json = serde_json::to_vec_pretty(doc)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = File::create(&tmp_path)?;
    file.write_all(&json)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl ConversationRepository for DocumentRepository {
    fn load_summary(&self, id: &ConversationId) -> Result<Option<ConversationSummary>> {
        Ok(self.read(id)?.summary)
    }

    fn save_summary(&self, summary: &ConversationSummary) -> Result<()> {
        self.update(&summary.id, |doc| doc.summary = Some(summary.clone()))
    }

    fn list_summaries(&self) -> Result<Vec<ConversationSummary>> {
        let mut summaries = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match read_document(&path) {
                Ok(doc) => summaries.extend(doc.summary),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
            }
        }
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    fn delete_conversations(&self, ids: &[ConversationId]) -> Result<usize> {
        let paths = ids
            .iter()
            .map(|id| self.path_for(id))
            .collect::<Result<Vec<_>>>()?;
        let _guard = self.write_lock.lock();
        let mut removed = 0;
        for path in paths {
            let had_summary = read_document(&path)?.summary.is_some();
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
            if had_summary {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn load_dialogs(&self, id: &ConversationId) -> Result<Vec<DialogEntry>> {
        Ok(self.read(id)?.dialogs)
    }

    fn save_dialogs(&self, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        self.update(id, |doc| doc.dialogs = dialogs.to_vec())
    }

    fn append_dialogs(&self, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        self.update(id, |doc| doc.dialogs.extend_from_slice(dialogs))
    }

    fn load_state(&self, id: &ConversationId) -> Result<Vec<StateEntry>> {
        Ok(self.read(id)?.state)
    }

    fn save_state(&self, id: &ConversationId, state: &[StateEntry]) -> Result<()> {
        self.update(id, |doc| doc.state = state.to_vec())
    }

    fn load_breakpoints(&self, id: &ConversationId) -> Result<Vec<Breakpoint>> {
        Ok(self.read(id)?.breakpoints)
    }

    fn save_breakpoints(&self, id: &ConversationId, breakpoints: &[Breakpoint]) -> Result<()> {
        self.update(id, |doc| doc.breakpoints = breakpoints.to_vec())
    }

    fn apply(&self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.update(&batch.conversation_id, |doc| {
            if let Some(state) = &batch.state {
                doc.state.clone_from(state);
            }
            if let Some(breakpoints) = &batch.breakpoints {
                doc.breakpoints.clone_from(breakpoints);
            }
            match &batch.dialogs {
                Some(DialogWrite::Replace(dialogs)) => doc.dialogs.clone_from(dialogs),
                Some(DialogWrite::Append(dialogs)) => doc.dialogs.extend_from_slice(dialogs),
                None => {}
            }
            if let Some(summary) = &batch.summary {
                doc.summary = Some(summary.clone());
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
