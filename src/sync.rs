use chrono::{Duration, Utc};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{AppConfig, ArchiveMode};
use crate::feed::{FeedError, FeedSource};
use crate::models::feed::{FeedPost, TransformError};
use crate::models::sighting::NewSighting;
use crate::store::SightingStore;

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub retention: Duration,
    pub max_pages: u32,
    pub archive_mode: ArchiveMode,
}

impl SyncOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.sync_batch_size,
            retention: Duration::days(config.retention_days),
            max_pages: config.feed_max_pages,
            archive_mode: config.archive_mode,
        }
    }
}

/// Failures that abort a sync run. Storage errors are not represented here;
/// they are logged and isolated to the affected item, batch, or sweep.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("feed fetch failed: {0}")]
    Feed(#[from] FeedError),
    #[error("feed record could not be transformed: {0}")]
    Transform(#[from] TransformError),
}

#[derive(Debug)]
pub struct SyncSummary {
    pub fetched: usize,
    pub inserted: u64,
    pub duplicates: usize,
    pub failed_batches: usize,
    pub duration: std::time::Duration,
}

impl SyncSummary {
    pub fn message(&self) -> String {
        format!(
            "Synced {} new sightings in {:.2}s",
            self.inserted,
            self.duration.as_secs_f64()
        )
    }
}

/// Reconciles the local store with the upstream wall feed: sweep expired
/// rows, fetch every page, keep what falls inside the retention window,
/// then insert in batches, skipping anything already present.
pub struct SyncJob<S, F> {
    store: S,
    feed: F,
    options: SyncOptions,
}

impl<S: SightingStore, F: FeedSource> SyncJob<S, F> {
    pub fn new(store: S, feed: F, options: SyncOptions) -> Self {
        Self {
            store,
            feed,
            options,
        }
    }

    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        let started = Instant::now();
        let now = Utc::now();
        let cutoff = now - self.options.retention;

        // Sweep before fetching so stale rows never coexist with a fresh
        // sync. Best effort: a failed sweep does not stop the run.
        if self.options.archive_mode == ArchiveMode::ArchiveThenDelete {
            match self.store.archive_expired(cutoff).await {
                Ok(archived) if archived > 0 => info!("Archived {} expired sightings", archived),
                Ok(_) => {}
                Err(e) => warn!("Error archiving expired sightings: {}", e),
            }
        }
        match self.store.delete_expired(cutoff).await {
            Ok(deleted) if deleted > 0 => info!("Deleted {} expired sightings", deleted),
            Ok(_) => {}
            Err(e) => warn!("Error deleting expired sightings: {}", e),
        }

        let posts = self.fetch_all_pages().await?;
        let fetched = posts.len();
        info!("Fetched {} items from feed", fetched);

        let mut duplicates = 0usize;
        let mut candidates: Vec<NewSighting> = Vec::new();
        for post in posts {
            // The feed reports creation time; anything outside the retention
            // window (or carrying no timestamp at all) is not kept.
            let within_window = post
                .created_at()
                .map(|t| t >= cutoff && t <= now)
                .unwrap_or(false);
            if !within_window {
                continue;
            }
            let sighting = post.into_sighting()?;
            // Guard against near-identical items arriving in the same feed
            // page before touching the store.
            if candidates.iter().any(|kept| kept.duplicates(&sighting)) {
                duplicates += 1;
            } else {
                candidates.push(sighting);
            }
        }
        info!("{} items within the retention window", candidates.len());

        let mut inserted = 0u64;
        let mut failed_batches = 0usize;
        let batch_count = candidates.len().div_ceil(self.options.batch_size.max(1));
        for (index, batch) in candidates.chunks(self.options.batch_size.max(1)).enumerate() {
            let mut staged: Vec<NewSighting> = Vec::new();
            for item in batch {
                match self
                    .store
                    .has_duplicate(item.lat, item.lng, item.time_date)
                    .await
                {
                    Ok(true) => duplicates += 1,
                    Ok(false) => staged.push(item.clone()),
                    Err(e) => warn!("Error checking for duplicate: {}", e),
                }
            }

            if staged.is_empty() {
                info!("Batch {}/{}: all items were duplicates", index + 1, batch_count);
                continue;
            }
            match self.store.insert_many(&staged).await {
                Ok(written) => {
                    inserted += written;
                    info!("Batch {}/{}: inserted {} items", index + 1, batch_count, written);
                }
                Err(e) => {
                    // The batch is abandoned; later batches still run.
                    failed_batches += 1;
                    warn!("Error inserting batch {}: {}", index + 1, e);
                }
            }
        }

        let summary = SyncSummary {
            fetched,
            inserted,
            duplicates,
            failed_batches,
            duration: started.elapsed(),
        };
        info!(
            "Sync summary: {} new items, {} duplicates, {} failed batches",
            summary.inserted, summary.duplicates, summary.failed_batches
        );
        Ok(summary)
    }

    /// Iterative pagination with a hard page cap. A feed that keeps handing
    /// out continuation tokens aborts the run instead of looping forever.
    async fn fetch_all_pages(&self) -> Result<Vec<FeedPost>, SyncError> {
        let mut posts = Vec::new();
        let mut page_start: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self.feed.fetch_page(page_start.as_deref()).await?;
            pages += 1;
            let next = page.next_page().map(str::to_string);
            posts.extend(page.data);

            match next {
                Some(token) => {
                    if pages >= self.options.max_pages {
                        return Err(FeedError::TooManyPages(self.options.max_pages).into());
                    }
                    page_start = Some(token);
                }
                None => break,
            }
        }
        Ok(posts)
    }
}
