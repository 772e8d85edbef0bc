//! Storage usage aggregation
//!
//! `UsageAggregator` answers two questions about a bucket prefix:
//! how much space incomplete multipart uploads hold (`aggregate`), and
//! how much space everything under the prefix holds, objects and
//! incomplete uploads together (`disk_usage`).
//!
//! Part listing is the expensive half: one request per 1000 parts of every
//! pending upload. It runs as a producer/worker pipeline, see `pipeline`.

mod observer;
mod pager;
mod pipeline;
mod totals;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::listing::{ListQuery, ListingSource, ObjectRecord};

pub use observer::{NoopObserver, UsageObserver};
pub use pager::{ObjectPages, PageFetcher, Pager, PartPages, UploadPages, VersionPages};
pub use totals::{AggregationTotals, Aggregator, DEFAULT_STORAGE_CLASS, StorageClassUsage};

use pipeline::PartPipeline;

/// Default capacity of the pending-upload work queue
pub const DEFAULT_QUEUE_DEPTH: usize = 1000;

/// Which objects `disk_usage` counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ObjectScope {
    /// Current object versions only
    #[default]
    Current,
    /// Every stored version, including noncurrent ones
    AllVersions,
}

/// Result of `disk_usage`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub totals: AggregationTotals,
    /// Object count and size per storage class
    pub storage_classes: BTreeMap<String, StorageClassUsage>,
}

/// Computes storage usage through a `ListingSource`
pub struct UsageAggregator {
    source: Arc<dyn ListingSource>,
    workers: usize,
    queue_depth: usize,
    ignore_missing_uploads: bool,
    observer: Arc<dyn UsageObserver>,
}

impl UsageAggregator {
    /// Create an aggregator with one part-listing worker per logical CPU
    pub fn new(source: Arc<dyn ListingSource>) -> Self {
        Self {
            source,
            workers: num_cpus::get().max(1),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            ignore_missing_uploads: false,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n.max(1);
        self
    }

    pub fn queue_depth(mut self, n: usize) -> Self {
        self.queue_depth = n.max(1);
        self
    }

    /// Skip uploads whose part listing reports NotFound instead of failing
    pub fn ignore_missing_uploads(mut self, ignore: bool) -> Self {
        self.ignore_missing_uploads = ignore;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn UsageObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Total the parts of every pending multipart upload under the prefix
    ///
    /// Object fields of the result stay zero. On error the partial totals
    /// are discarded.
    pub async fn aggregate(&self, query: &ListQuery) -> Result<AggregationTotals> {
        let totals = Arc::new(Aggregator::new());
        self.count_pending_uploads(query, &totals).await?;
        Ok(totals.snapshot())
    }

    /// Total objects and incomplete uploads under the prefix
    pub async fn disk_usage(&self, query: &ListQuery, scope: ObjectScope) -> Result<UsageReport> {
        let totals = Arc::new(Aggregator::new());

        let storage_classes = match scope {
            ObjectScope::Current => {
                let pager = Pager::new(ObjectPages::new(self.source.as_ref(), query));
                self.count_objects(pager, &totals).await?
            }
            ObjectScope::AllVersions => {
                let pager = Pager::new(VersionPages::new(self.source.as_ref(), query));
                self.count_objects(pager, &totals).await?
            }
        };

        self.count_pending_uploads(query, &totals).await?;

        Ok(UsageReport {
            totals: totals.snapshot(),
            storage_classes,
        })
    }

    async fn count_objects<F>(
        &self,
        mut pager: Pager<F>,
        totals: &Aggregator,
    ) -> Result<BTreeMap<String, StorageClassUsage>>
    where
        F: PageFetcher<Item = ObjectRecord>,
    {
        let mut classes: BTreeMap<String, StorageClassUsage> = BTreeMap::new();

        while let Some(objects) = pager.next_page().await? {
            totals.add_objects(&objects);
            for object in &objects {
                let class = object
                    .storage_class
                    .as_deref()
                    .unwrap_or(DEFAULT_STORAGE_CLASS);
                classes.entry(class.to_string()).or_default().add(object.size);
            }
            self.observer.objects_listed(&totals.snapshot());
        }

        Ok(classes)
    }

    async fn count_pending_uploads(&self, query: &ListQuery, totals: &Arc<Aggregator>) -> Result<()> {
        PartPipeline {
            source: Arc::clone(&self.source),
            query: Arc::new(query.clone()),
            totals: Arc::clone(totals),
            observer: Arc::clone(&self.observer),
            workers: self.workers,
            queue_depth: self.queue_depth,
            ignore_missing_uploads: self.ignore_missing_uploads,
        }
        .run()
        .await
    }
}
