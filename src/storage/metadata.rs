//! Durable per-article metadata store.
//!
//! One JSON document (`message.json`) maps article ids (string keys) to
//! their last-known metadata. The snapshot is loaded fully at startup and
//! rewritten wholesale on every upsert: O(n) per write, but the corpus is
//! hundreds to low thousands of articles and durability wins over
//! throughput here.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{ArticleDetail, ArticleMetadata};

/// On-disk snapshot shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataSnapshot {
    /// Timestamp of the last write
    pub last_update: Option<DateTime<Utc>>,

    /// Article id (stringified) -> metadata
    pub articles: BTreeMap<String, ArticleMetadata>,
}

/// Store for article metadata backed by a single JSON file.
///
/// The snapshot mutex serializes the whole load-modify-write cycle so two
/// workers finishing near-simultaneously cannot lose each other's upsert.
pub struct MetadataStore {
    path: PathBuf,
    snapshot: Mutex<MetadataSnapshot>,
}

impl MetadataStore {
    /// Open the store, loading an existing snapshot or starting empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No metadata snapshot at {:?}, starting empty", path);
                MetadataSnapshot::default()
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        let store = Self {
            path,
            snapshot: Mutex::new(snapshot),
        };

        // First run: put an empty snapshot on disk so later failures are
        // distinguishable from a fresh start.
        {
            let snapshot = store.snapshot.lock().await;
            if snapshot.last_update.is_none() {
                store.persist(&snapshot).await?;
            }
        }

        Ok(store)
    }

    /// Whether metadata for the given article id is already stored.
    pub async fn has(&self, id: u64) -> bool {
        self.snapshot
            .lock()
            .await
            .articles
            .contains_key(&id.to_string())
    }

    /// Ids of all stored articles.
    pub async fn all_ids(&self) -> HashSet<u64> {
        self.snapshot
            .lock()
            .await
            .articles
            .values()
            .map(|meta| meta.id)
            .collect()
    }

    /// Number of stored articles.
    pub async fn len(&self) -> usize {
        self.snapshot.lock().await.articles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Insert or replace metadata for one article and flush the snapshot.
    ///
    /// The body is stripped; last write wins on re-download.
    pub async fn upsert(&self, detail: &ArticleDetail) -> Result<()> {
        let meta = ArticleMetadata::from(detail);
        let mut snapshot = self.snapshot.lock().await;
        snapshot.articles.insert(meta.id.to_string(), meta);
        snapshot.last_update = Some(Utc::now());
        self.persist(&snapshot).await
    }

    /// Most recent stored article by `created_time`.
    ///
    /// Returns the sentinel `(0, minimum timestamp)` on an empty store.
    pub async fn latest(&self) -> (u64, DateTime<Utc>) {
        let snapshot = self.snapshot.lock().await;
        snapshot
            .articles
            .values()
            .max_by_key(|meta| meta.created_time)
            .map(|meta| (meta.id, meta.created_time))
            .unwrap_or((0, DateTime::<Utc>::MIN_UTC))
    }

    /// Write the full snapshot atomically (temp file, then rename).
    async fn persist(&self, snapshot: &MetadataSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleKind, ArticleSummary};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn detail(id: u64, title: &str, time: DateTime<Utc>) -> ArticleDetail {
        ArticleDetail {
            summary: ArticleSummary {
                id,
                kind: ArticleKind::Article,
                title: title.to_string(),
                created_time: time,
            },
            body: "body text".to_string(),
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn empty_store_returns_sentinel() {
        let tmp = TempDir::new().unwrap();
        let store = MetadataStore::open(tmp.path().join("message.json"))
            .await
            .unwrap();

        assert!(store.is_empty().await);
        assert_eq!(store.latest().await, (0, DateTime::<Utc>::MIN_UTC));
        assert!(store.all_ids().await.is_empty());
    }

    #[tokio::test]
    async fn upsert_persists_and_reloads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("message.json");

        {
            let store = MetadataStore::open(&path).await.unwrap();
            store.upsert(&detail(10, "first", ts(100))).await.unwrap();
            store.upsert(&detail(20, "second", ts(200))).await.unwrap();
        }

        let reloaded = MetadataStore::open(&path).await.unwrap();
        assert_eq!(reloaded.len().await, 2);
        assert!(reloaded.has(10).await);
        assert!(reloaded.has(20).await);
        assert_eq!(reloaded.latest().await, (20, ts(200)));
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_id() {
        let tmp = TempDir::new().unwrap();
        let store = MetadataStore::open(tmp.path().join("message.json"))
            .await
            .unwrap();

        store.upsert(&detail(5, "title", ts(100))).await.unwrap();
        store.upsert(&detail(5, "title", ts(100))).await.unwrap();

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn snapshot_keys_match_ids() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("message.json");
        let store = MetadataStore::open(&path).await.unwrap();
        store.upsert(&detail(123, "t", ts(1))).await.unwrap();
        drop(store);

        let raw = std::fs::read_to_string(&path).unwrap();
        let snapshot: MetadataSnapshot = serde_json::from_str(&raw).unwrap();
        for (key, meta) in &snapshot.articles {
            assert_eq!(key.parse::<u64>().unwrap(), meta.id);
        }
        assert!(snapshot.last_update.is_some());
    }

    #[tokio::test]
    async fn body_is_never_persisted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("message.json");
        let store = MetadataStore::open(&path).await.unwrap();
        store.upsert(&detail(1, "t", ts(1))).await.unwrap();
        drop(store);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("body text"));
    }

    #[tokio::test]
    async fn concurrent_upserts_are_not_lost() {
        use std::sync::Arc;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("message.json");
        let store = Arc::new(MetadataStore::open(&path).await.unwrap());

        let mut tasks = Vec::new();
        for id in 1..=20u64 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.upsert(&detail(id, "t", ts(id as i64))).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 20);
        let reloaded = MetadataStore::open(&path).await.unwrap();
        assert_eq!(reloaded.len().await, 20);
    }
}
