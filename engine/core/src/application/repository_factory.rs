// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend configuration,
//! keeping the domain layer free of infrastructure dependencies.

use std::path::Path;
use std::sync::Arc;

use crate::domain::repository::{JudgeRepository, MemoryRepository, RepositoryError, StorageBackend};
use crate::infrastructure::repositories::{InMemoryJudgeRepository, InMemoryMemoryRepository, SledStore};

/// Judge and memory repositories sharing one backend
#[derive(Clone)]
pub struct Repositories {
    pub judges: Arc<dyn JudgeRepository>,
    pub memory: Arc<dyn MemoryRepository>,
}

/// Creates the repositories for the configured backend; sled opens `<data_dir>/db`
pub fn create_repositories(backend: StorageBackend, data_dir: &Path) -> Result<Repositories, RepositoryError> {
    match backend {
        StorageBackend::Memory => Ok(Repositories {
            judges: Arc::new(InMemoryJudgeRepository::new()),
            memory: Arc::new(InMemoryMemoryRepository::new()),
        }),
        StorageBackend::Sled => {
            let store = Arc::new(SledStore::open(data_dir.join("db"))?);
            Ok(Repositories {
                judges: store.clone(),
                memory: store,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sled_backend_shares_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let repos = create_repositories(StorageBackend::Sled, dir.path()).unwrap();
        assert!(repos.judges.list_all().await.unwrap().is_empty());
        assert!(dir.path().join("db").exists());
    }

    #[tokio::test]
    async fn test_memory_backend_touches_no_disk() {
        let dir = tempfile::tempdir().unwrap();
        let repos = create_repositories(StorageBackend::Memory, &dir.path().join("unused")).unwrap();
        assert!(repos.judges.list_all().await.unwrap().is_empty());
        assert!(!dir.path().join("unused").exists());
    }
}
