//! Incremental sync engine.
//!
//! One `sync` run walks the remote month index, accumulates the combined
//! listing, diffs it against the metadata store, and dispatches one worker
//! per missing article to a bounded pool. Workers fetch detail, rewrite the
//! body, persist the document, then record metadata. Failures at every stage
//! are logged and skipped; a failed article simply stays "not downloaded"
//! and is picked up by the next incremental run.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::ArticleSummary;
use crate::pipeline::rewrite::ContentRewriter;
use crate::services::BlogClient;
use crate::storage::{DocumentStore, MetadataStore};

/// Orchestrates listing, diffing, and concurrent downloads.
pub struct SyncEngine {
    client: Arc<BlogClient>,
    rewriter: Arc<ContentRewriter>,
    metadata: Arc<MetadataStore>,
    documents: Arc<DocumentStore>,
    max_workers: usize,
}

impl SyncEngine {
    pub fn new(
        client: Arc<BlogClient>,
        rewriter: Arc<ContentRewriter>,
        metadata: Arc<MetadataStore>,
        documents: Arc<DocumentStore>,
        max_workers: usize,
    ) -> Self {
        Self {
            client,
            rewriter,
            metadata,
            documents,
            max_workers: max_workers.max(1),
        }
    }

    /// Fetch the combined listing across all months.
    ///
    /// A month whose listing fails is logged and skipped; partial results
    /// still drive the rest of the sync.
    async fn fetch_all_summaries(&self) -> Result<Vec<ArticleSummary>> {
        let months = self.client.list_months().await?;
        if months.is_empty() {
            log::info!("Remote month index is empty, nothing to do");
            return Ok(Vec::new());
        }
        log::info!("Found {} months with content", months.len());

        let mut summaries = Vec::new();
        for month in months.keys() {
            match self.client.list_month(month).await {
                Ok(entries) => {
                    log::info!("Listed {}: {} entries", month, entries.len());
                    summaries.extend(entries);
                }
                Err(e) => {
                    log::warn!("Failed to list month {}: {}", month, e);
                }
            }
        }

        log::info!("Combined listing: {} entries", summaries.len());
        Ok(summaries)
    }

    /// Run one incremental sync, returning the persisted document paths.
    ///
    /// With `force`, the local id set is treated as empty and everything is
    /// re-downloaded.
    pub async fn sync(&self, force: bool) -> Result<Vec<PathBuf>> {
        let all = self.fetch_all_summaries().await?;

        let downloaded = if force {
            Default::default()
        } else {
            self.metadata.all_ids().await
        };
        log::info!("{} articles already downloaded", downloaded.len());

        let to_download: Vec<ArticleSummary> = all
            .into_iter()
            .filter(|summary| !downloaded.contains(&summary.id))
            .collect();
        log::info!("{} articles to download", to_download.len());

        let mut saved = Vec::new();
        let mut jobs = stream::iter(to_download)
            .map(|summary| async move {
                let id = summary.id;
                (id, self.download_one(summary).await)
            })
            .buffer_unordered(self.max_workers);

        while let Some((id, result)) = jobs.next().await {
            match result {
                Ok(path) => {
                    log::info!("Saved {:?}", path);
                    saved.push(path);
                }
                Err(e) => {
                    log::warn!("Failed to download article {}: {}", id, e);
                }
            }
        }

        Ok(saved)
    }

    /// One worker: fetch detail, rewrite images, persist, record metadata.
    async fn download_one(&self, summary: ArticleSummary) -> Result<PathBuf> {
        let detail = self.client.get_detail(summary.id, summary.kind).await?;
        let rewritten = self.rewriter.rewrite(&detail.body).await;
        let path = self.documents.save(&detail, &rewritten).await?;
        self.metadata.upsert(&detail).await?;
        Ok(path)
    }

    /// Most recent remote article by `created_time`.
    ///
    /// There is no cheaper "latest" endpoint, so this scans the full
    /// listing. Sentinel on an empty remote.
    async fn latest_remote(&self) -> Result<(u64, DateTime<Utc>)> {
        let all = self.fetch_all_summaries().await?;
        Ok(all
            .iter()
            .max_by_key(|summary| summary.created_time)
            .map(|summary| (summary.id, summary.created_time))
            .unwrap_or((0, DateTime::<Utc>::MIN_UTC)))
    }

    /// Check whether the remote has anything newer than the local store.
    ///
    /// Either a higher id or a later timestamp counts as an update; the two
    /// signals guard each other against id reuse and backfilled posts.
    pub async fn check_updates(&self) -> Result<bool> {
        let (remote_id, remote_time) = self.latest_remote().await?;
        let (local_id, local_time) = self.metadata.latest().await;

        let has_updates = remote_id > local_id || remote_time > local_time;
        log::info!(
            "Latest remote: id={} time={}; latest local: id={} time={}; updates: {}",
            remote_id,
            remote_time,
            local_id,
            local_time,
            has_updates
        );
        Ok(has_updates)
    }
}
