// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Sled Store
//!
//! Durable `JudgeRepository` + `MemoryRepository` backed by an embedded
//! `sled` database under `data_dir`. Records are JSON-encoded, one tree per
//! record family:
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `judges` | `<judge>` | `Judge` |
//! | `principles` | `<judge>/<principle id>` | `Principle` (with embedding) |
//! | `examples` | `<judge>/<example id>` | `Example` (with embedding) |
//!
//! Judge names cannot contain `/`, so prefix scans are unambiguous. Every
//! write is flushed before returning.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::judge::{Judge, JudgeName};
use crate::domain::memory::{Example, ExampleId, Principle, PrincipleId};
use crate::domain::repository::{JudgeRepository, MemoryRepository, RepositoryError};

use super::{sort_examples, sort_principles};

impl From<sled::Error> for RepositoryError {
    fn from(err: sled::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    judges: sled::Tree,
    principles: sled::Tree,
    examples: sled::Tree,
}

fn record_key(judge: &JudgeName, id: impl std::fmt::Display) -> String {
    format!("{}/{}", judge, id)
}

fn judge_prefix(judge: &JudgeName) -> String {
    format!("{}/", judge)
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| {
            RepositoryError::Database(format!("Failed to create {}: {}", path.display(), e))
        })?;

        let db = sled::open(path)?;
        Ok(Self {
            judges: db.open_tree("judges")?,
            principles: db.open_tree("principles")?,
            examples: db.open_tree("examples")?,
            db,
        })
    }

    async fn put<T: serde::Serialize>(
        &self,
        tree: &sled::Tree,
        key: &str,
        value: &T,
    ) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec(value)?;
        tree.insert(key.as_bytes(), bytes)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn remove(&self, tree: &sled::Tree, key: &str) -> Result<bool, RepositoryError> {
        let existed = tree.remove(key.as_bytes())?.is_some();
        if existed {
            self.db.flush_async().await?;
        }
        Ok(existed)
    }

    fn scan<T: serde::de::DeserializeOwned>(
        tree: &sled::Tree,
        prefix: &str,
    ) -> Result<Vec<T>, RepositoryError> {
        tree.scan_prefix(prefix.as_bytes())
            .values()
            .map(|value| -> Result<T, RepositoryError> { Ok(serde_json::from_slice(&value?)?) })
            .collect()
    }
}

#[async_trait]
impl JudgeRepository for SledStore {
    async fn save(&self, judge: &Judge) -> Result<(), RepositoryError> {
        self.put(&self.judges, judge.name.as_str(), judge).await
    }

    async fn find_by_name(&self, name: &JudgeName) -> Result<Option<Judge>, RepositoryError> {
        match self.judges.get(name.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Judge>, RepositoryError> {
        // sled iterates keys in byte order, which is name order
        Self::scan(&self.judges, "")
    }

    async fn delete(&self, name: &JudgeName) -> Result<bool, RepositoryError> {
        self.remove(&self.judges, name.as_str()).await
    }
}

#[async_trait]
impl MemoryRepository for SledStore {
    async fn save_principle(&self, principle: &Principle) -> Result<(), RepositoryError> {
        let key = record_key(&principle.judge_name, principle.id);
        self.put(&self.principles, &key, principle).await
    }

    async fn delete_principle(&self, judge: &JudgeName, id: PrincipleId) -> Result<(), RepositoryError> {
        self.remove(&self.principles, &record_key(judge, id)).await?;
        Ok(())
    }

    async fn load_principles(&self, judge: &JudgeName) -> Result<Vec<Principle>, RepositoryError> {
        let mut principles: Vec<Principle> = Self::scan(&self.principles, &judge_prefix(judge))?;
        sort_principles(&mut principles);
        Ok(principles)
    }

    async fn merge_principles(&self, survivor: &Principle, removed: PrincipleId) -> Result<(), RepositoryError> {
        let mut batch = sled::Batch::default();
        batch.insert(
            record_key(&survivor.judge_name, survivor.id).as_bytes(),
            serde_json::to_vec(survivor)?,
        );
        batch.remove(record_key(&survivor.judge_name, removed).as_bytes());
        self.principles.apply_batch(batch)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn save_example(&self, example: &Example) -> Result<(), RepositoryError> {
        let key = record_key(&example.judge_name, example.id);
        self.put(&self.examples, &key, example).await
    }

    async fn delete_example(&self, judge: &JudgeName, id: ExampleId) -> Result<(), RepositoryError> {
        self.remove(&self.examples, &record_key(judge, id)).await?;
        Ok(())
    }

    async fn load_examples(&self, judge: &JudgeName) -> Result<Vec<Example>, RepositoryError> {
        let mut examples: Vec<Example> = Self::scan(&self.examples, &judge_prefix(judge))?;
        sort_examples(&mut examples);
        Ok(examples)
    }

    async fn purge_judge(&self, judge: &JudgeName) -> Result<(), RepositoryError> {
        let prefix = judge_prefix(judge);
        for tree in [&self.principles, &self.examples] {
            let mut batch = sled::Batch::default();
            for key in tree.scan_prefix(prefix.as_bytes()).keys() {
                batch.remove(key?);
            }
            tree.apply_batch(batch)?;
        }
        self.db.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::FeedbackInput;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let safety = JudgeName::parse("safety").unwrap();
        let principle = Principle::new(safety.clone(), "Refuse illegal requests".into(), vec![0.5, 0.5], None);

        {
            let store = SledStore::open(dir.path()).unwrap();
            store.save(&Judge::new("safety", "safety", "", 1, 5).unwrap()).await.unwrap();
            store.save_principle(&principle).await.unwrap();
            store
                .save_example(&Example::new(safety.clone(), FeedbackInput::new("in", "fb", 2), vec![1.0, 0.0]))
                .await
                .unwrap();
        }

        let store = SledStore::open(dir.path()).unwrap();
        assert!(store.find_by_name(&safety).await.unwrap().is_some());
        assert_eq!(store.load_principles(&safety).await.unwrap(), vec![principle]);
        assert_eq!(store.load_examples(&safety).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prefix_scan_isolates_judges() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let a = JudgeName::parse("tone").unwrap();
        let b = JudgeName::parse("tone-strict").unwrap();

        store.save_principle(&Principle::new(a.clone(), "a".into(), vec![1.0], None)).await.unwrap();
        store.save_principle(&Principle::new(b.clone(), "b".into(), vec![1.0], None)).await.unwrap();

        assert_eq!(store.load_principles(&a).await.unwrap().len(), 1);
        store.purge_judge(&a).await.unwrap();
        assert!(store.load_principles(&a).await.unwrap().is_empty());
        assert_eq!(store.load_principles(&b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_judges_listed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        store.save(&Judge::new("beta", "c", "", 1, 5).unwrap()).await.unwrap();
        store.save(&Judge::new("alpha", "c", "", 1, 5).unwrap()).await.unwrap();

        let names: Vec<String> = store.list_all().await.unwrap().into_iter().map(|j| j.name.into()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(store.delete(&JudgeName::parse("beta").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_merge_principles_is_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let safety = JudgeName::parse("safety").unwrap();
        let mut survivor = Principle::new(safety.clone(), "a".into(), vec![1.0], None);
        let removed = Principle::new(safety.clone(), "a again".into(), vec![1.0], None);

        {
            let store = SledStore::open(dir.path()).unwrap();
            store.save_principle(&survivor).await.unwrap();
            store.save_principle(&removed).await.unwrap();
            survivor.absorb(&removed);
            store.merge_principles(&survivor, removed.id).await.unwrap();
        }

        let store = SledStore::open(dir.path()).unwrap();
        let principles = store.load_principles(&safety).await.unwrap();
        assert_eq!(principles, vec![survivor]);
        assert_eq!(principles[0].support_count, 2);
    }
}
