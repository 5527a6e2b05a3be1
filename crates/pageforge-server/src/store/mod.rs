//! File-backed page store: one JSON file per record, named by id.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use pageforge_shared::PageRecord;
use tracing::{info, warn};
use uuid::Uuid;

/// Repository interface the API layer is written against. Keeps the mutation
/// contract independent of the storage choice.
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<PageRecord>>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<PageRecord>>;
    async fn list(&self) -> Result<Vec<PageRecord>>;
    async fn put(&self, record: &PageRecord) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn slug_taken(&self, slug: &str) -> Result<bool> {
        Ok(self.get_by_slug(slug).await?.is_some())
    }
}

/// Normalize a user-supplied slug: lowercase, runs of non-alphanumerics
/// collapsed to single hyphens, leading/trailing hyphens trimmed. An empty
/// result means the input had nothing usable in it.
pub fn normalize_slug(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub struct FsPageStore {
    dir: PathBuf,
}

impl FsPageStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create pages directory {}", dir.display()))?;

        let count = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .count();
        info!("Page store ready: {} pages in {}", count, dir.display());

        Ok(Self { dir })
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl PageStore for FsPageStore {
    async fn get(&self, id: Uuid) -> Result<Option<PageRecord>> {
        let path = self.record_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        let record = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        Ok(Some(record))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PageRecord>> {
        // Linear scan; the store holds tens of pages, not thousands.
        Ok(self.list().await?.into_iter().find(|r| r.slug == slug))
    }

    async fn list(&self) -> Result<Vec<PageRecord>> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("failed to read {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|ext| ext != "json").unwrap_or(true) {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<PageRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping undecodable page file {}: {}", path.display(), e),
            }
        }

        records.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(records)
    }

    async fn put(&self, record: &PageRecord) -> Result<()> {
        let path = self.record_path(record.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;

        // Write-then-rename so readers never observe a half-written record.
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let path = self.record_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Deleting a page that is already gone is a success.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_store() -> (TempDir, FsPageStore) {
        let dir = TempDir::new().unwrap();
        let store = FsPageStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_normalize_slug() {
        assert_eq!(normalize_slug("My Page!"), "my-page");
        assert_eq!(normalize_slug("  --Hello---World--  "), "hello-world");
        assert_eq!(normalize_slug("already-fine"), "already-fine");
        assert_eq!(normalize_slug("!!!"), "");
        assert_eq!(normalize_slug(""), "");
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let (_dir, store) = make_store();
        let record = PageRecord::new("home".to_string(), "Home".to_string());
        store.put(&record).await.unwrap();

        let loaded = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.slug, "home");
        assert_eq!(loaded.draft.version, 1);
        assert!(loaded.published.schema.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_dir, store) = make_store();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_slug_exact_match() {
        let (_dir, store) = make_store();
        let a = PageRecord::new("about".to_string(), "About".to_string());
        let b = PageRecord::new("about-us".to_string(), "About us".to_string());
        store.put(&a).await.unwrap();
        store.put(&b).await.unwrap();

        let found = store.get_by_slug("about").await.unwrap().unwrap();
        assert_eq!(found.id, a.id);
        assert!(store.get_by_slug("nope").await.unwrap().is_none());
        assert!(store.slug_taken("about-us").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_skips_undecodable_files() {
        let (dir, store) = make_store();
        let record = PageRecord::new("home".to_string(), "Home".to_string());
        store.put(&record).await.unwrap();
        std::fs::write(dir.path().join("garbage.json"), b"not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, record.id);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = make_store();
        let record = PageRecord::new("home".to_string(), "Home".to_string());
        store.put(&record).await.unwrap();

        store.delete(record.id).await.unwrap();
        assert!(store.get(record.id).await.unwrap().is_none());
        // second delete is still a success
        store.delete(record.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_overwrites_wholesale() {
        let (_dir, store) = make_store();
        let mut record = PageRecord::new("home".to_string(), "Home".to_string());
        store.put(&record).await.unwrap();

        record.title = "Homepage".to_string();
        record.draft.version = 2;
        store.put(&record).await.unwrap();

        let loaded = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Homepage");
        assert_eq!(loaded.draft.version, 2);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
