//! Pending-upload fan-out
//!
//! One producer task walks the upload listing and feeds a bounded work
//! queue; `workers` tasks drain the queue, each walking the part listing
//! of one upload at a time and folding every page into the shared
//! counters. The coordinator waits for all `workers + 1` tasks and stops
//! at the first error.
//!
//! On success the queue closes through ownership: the producer holds the
//! only sender, so it closes whenever the producer returns. On the first
//! error the coordinator sets the shared halt flag and closes the queue
//! itself; the producer's next send fails and workers stop before their
//! next request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_channel::{Receiver, Sender};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::listing::{ListQuery, ListingSource, PendingUpload};

use super::observer::UsageObserver;
use super::pager::{PartPages, Pager, UploadPages};
use super::totals::Aggregator;

pub(crate) struct PartPipeline {
    pub source: Arc<dyn ListingSource>,
    pub query: Arc<ListQuery>,
    pub totals: Arc<Aggregator>,
    pub observer: Arc<dyn UsageObserver>,
    pub workers: usize,
    pub queue_depth: usize,
    pub ignore_missing_uploads: bool,
}

impl PartPipeline {
    /// Run the producer and the worker pool to completion
    ///
    /// On error, returns as soon as the first failing task reports it.
    /// The remaining tasks are detached, not aborted. The queue is closed
    /// before returning, so each of them issues at most one more request.
    pub(crate) async fn run(self) -> Result<()> {
        let workers = self.workers.max(1);
        let (sender, receiver) = async_channel::bounded(self.queue_depth.max(1));
        let halted = Arc::new(AtomicBool::new(false));

        let mut tasks = FuturesUnordered::new();
        tasks.push(tokio::spawn(produce(
            Arc::clone(&self.source),
            Arc::clone(&self.query),
            Arc::clone(&self.totals),
            Arc::clone(&self.observer),
            sender,
        )));
        for worker in 0..workers {
            tasks.push(tokio::spawn(drain(
                worker,
                Arc::clone(&self.source),
                Arc::clone(&self.query),
                Arc::clone(&self.totals),
                Arc::clone(&self.observer),
                receiver.clone(),
                Arc::clone(&halted),
                self.ignore_missing_uploads,
            )));
        }

        let expected = workers + 1;
        let mut completed = 0;
        while let Some(joined) = tasks.next().await {
            let err = match joined {
                Ok(Ok(())) => {
                    completed += 1;
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => Error::General(format!("aggregation task failed: {e}")),
            };
            debug!(completed, expected, error = %err, "part aggregation failed");
            halted.store(true, Ordering::Relaxed);
            receiver.close();
            return Err(err);
        }

        debug!(completed, bucket = %self.query.bucket, "part aggregation finished");
        Ok(())
    }
}

async fn produce(
    source: Arc<dyn ListingSource>,
    query: Arc<ListQuery>,
    totals: Arc<Aggregator>,
    observer: Arc<dyn UsageObserver>,
    queue: Sender<PendingUpload>,
) -> Result<()> {
    let mut pager = Pager::new(UploadPages::new(source.as_ref(), &query));

    while let Some(uploads) = pager.next_page().await? {
        totals.add_uploads(uploads.len());
        observer.uploads_listed(uploads.len(), &totals.snapshot());

        for upload in uploads {
            if queue.send(upload).await.is_err() {
                debug!("work queue closed, abandoning upload listing");
                return Ok(());
            }
        }
    }

    debug!(pages = pager.pages(), "upload listing exhausted");
    Ok(())
}

async fn drain(
    worker: usize,
    source: Arc<dyn ListingSource>,
    query: Arc<ListQuery>,
    totals: Arc<Aggregator>,
    observer: Arc<dyn UsageObserver>,
    queue: Receiver<PendingUpload>,
    halted: Arc<AtomicBool>,
    ignore_missing_uploads: bool,
) -> Result<()> {
    let mut handled = 0usize;

    while let Ok(upload) = queue.recv().await {
        if halted.load(Ordering::Relaxed) {
            break;
        }
        count_parts(
            source.as_ref(),
            &query,
            &upload,
            &totals,
            observer.as_ref(),
            &halted,
            ignore_missing_uploads,
        )
        .await?;
        handled += 1;
    }

    debug!(worker, handled, "worker stopped");
    Ok(())
}

async fn count_parts(
    source: &dyn ListingSource,
    query: &ListQuery,
    upload: &PendingUpload,
    totals: &Aggregator,
    observer: &dyn UsageObserver,
    halted: &AtomicBool,
    ignore_missing_uploads: bool,
) -> Result<()> {
    let mut pager = Pager::new(PartPages::new(source, query, upload));

    loop {
        if halted.load(Ordering::Relaxed) {
            return Ok(());
        }
        match pager.next_page().await {
            Ok(Some(parts)) => {
                totals.add_parts(&parts);
                observer.parts_listed(upload, &parts, &totals.snapshot());
            }
            Ok(None) => return Ok(()),
            // Completed or aborted after it was listed
            Err(e) if ignore_missing_uploads && e.is_not_found() => {
                warn!(
                    key = %upload.key,
                    upload_id = %upload.upload_id,
                    "upload vanished while listing parts, skipping"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}
