//! Progress callbacks
//!
//! Called from inside the pipeline after every page, possibly from
//! several workers at once. The totals passed in are a relaxed snapshot
//! and may trail the true running total.

use crate::listing::{PartRecord, PendingUpload};

use super::totals::AggregationTotals;

pub trait UsageObserver: Send + Sync {
    /// A page of objects (or object versions) has been counted
    fn objects_listed(&self, _totals: &AggregationTotals) {}

    /// A page of pending uploads has been queued for part listing
    fn uploads_listed(&self, _uploads: usize, _totals: &AggregationTotals) {}

    /// A page of parts of `upload` has been counted
    fn parts_listed(
        &self,
        _upload: &PendingUpload,
        _parts: &[PartRecord],
        _totals: &AggregationTotals,
    ) {
    }
}

/// Observer that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl UsageObserver for NoopObserver {}
