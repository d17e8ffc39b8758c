//! Backend selection from settings.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use rewind_settings::{StorageBackend, StorageSettings};

use crate::documents::DocumentRepository;
use crate::errors::Result;
use crate::memory::MemoryRepository;
use crate::repository::ConversationRepository;
use crate::sqlite::{ConnectionConfig, SqliteRepository};

/// Build the backend `settings` selects.
///
/// The `sqlite` backend creates the database's parent directory and runs
/// pending migrations; the `documents` backend creates its directory.
pub fn open_repository(settings: &StorageSettings) -> Result<Arc<dyn ConversationRepository>> {
    let repo: Arc<dyn ConversationRepository> = match settings.backend {
        StorageBackend::Memory => Arc::new(MemoryRepository::new()),
        StorageBackend::Sqlite => {
            let path = Path::new(&settings.sqlite_path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(SqliteRepository::open(path, &ConnectionConfig::from(settings))?)
        }
        StorageBackend::Documents => Arc::new(DocumentRepository::open(&settings.documents_dir)?),
    };
    info!(backend = ?settings.backend, "conversation repository opened");
    Ok(repo)
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use rewind_core::{ConversationId, ConversationSummary};

    use super::*;

    fn settings(backend: StorageBackend, dir: &Path) -> StorageSettings {
        StorageSettings {
            backend,
            sqlite_path: dir.join("nested/rewind.db").to_string_lossy().into_owned(),
            documents_dir: dir.join("docs").to_string_lossy().into_owned(),
            pool_size: 2,
            ..StorageSettings::default()
        }
    }

    #[test]
    fn opens_every_backend() {
        let dir = tempfile::tempdir().unwrap();
        for backend in [StorageBackend::Memory, StorageBackend::Sqlite, StorageBackend::Documents] {
            let repo = open_repository(&settings(backend, dir.path())).unwrap();
            let id = ConversationId::from("c1");
            repo.save_summary(&ConversationSummary::new(id.clone(), "a1")).unwrap();
            assert!(repo.load_summary(&id).unwrap().is_some(), "{backend:?}");
        }
        assert!(dir.path().join("nested/rewind.db").exists());
        assert!(dir.path().join("docs/c1.json").exists());
    }
}
