//! Shared usage counters
//!
//! Workers fold their results into one `Aggregator` concurrently. Every
//! counter only ever moves through `fetch_add`, so no update is lost and
//! no worker waits on another. Reads taken while a run is in flight are
//! advisory; the snapshot taken after the coordinator has joined every
//! task is exact.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::Serialize;

use crate::listing::{ObjectRecord, PartRecord};

/// Storage class assumed when the service reports none
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

#[derive(Debug, Default)]
pub struct Aggregator {
    object_count: AtomicI64,
    object_sum_size: AtomicI64,
    upload_count: AtomicI64,
    part_count: AtomicI64,
    part_sum_size: AtomicI64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one page of an object listing
    pub fn add_objects(&self, objects: &[ObjectRecord]) {
        let size: i64 = objects.iter().map(|o| o.size).sum();
        self.object_count.fetch_add(objects.len() as i64, Ordering::Relaxed);
        self.object_sum_size.fetch_add(size, Ordering::Relaxed);
    }

    /// Count pending uploads discovered by the upload listing
    pub fn add_uploads(&self, count: usize) {
        self.upload_count.fetch_add(count as i64, Ordering::Relaxed);
    }

    /// Fold one page of a part listing
    pub fn add_parts(&self, parts: &[PartRecord]) {
        let size: i64 = parts.iter().map(|p| p.size).sum();
        self.part_count.fetch_add(parts.len() as i64, Ordering::Relaxed);
        self.part_sum_size.fetch_add(size, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AggregationTotals {
        AggregationTotals {
            object_count: self.object_count.load(Ordering::Relaxed),
            object_sum_size: self.object_sum_size.load(Ordering::Relaxed),
            upload_count: self.upload_count.load(Ordering::Relaxed),
            part_count: self.part_count.load(Ordering::Relaxed),
            part_sum_size: self.part_sum_size.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregationTotals {
    /// Objects (or object versions) listed
    pub object_count: i64,
    pub object_sum_size: i64,
    /// Pending multipart uploads listed
    pub upload_count: i64,
    /// Parts listed across every pending upload
    pub part_count: i64,
    pub part_sum_size: i64,
}

impl AggregationTotals {
    /// Bytes held by objects plus bytes held by incomplete uploads
    pub fn total_size(&self) -> i64 {
        self.object_sum_size + self.part_sum_size
    }
}

/// Object count and size of one storage class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageClassUsage {
    pub count: i64,
    pub size: i64,
}

impl StorageClassUsage {
    pub fn add(&mut self, size: i64) {
        self.count += 1;
        self.size += size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_parts_and_objects() {
        let totals = Aggregator::new();
        totals.add_parts(&[PartRecord::new(1, 100), PartRecord::new(2, 200)]);
        totals.add_parts(&[PartRecord::new(3, 300)]);
        totals.add_objects(&[ObjectRecord::new("a", 5), ObjectRecord::new("b", 7)]);
        totals.add_uploads(1);

        let snap = totals.snapshot();
        assert_eq!(snap.part_count, 3);
        assert_eq!(snap.part_sum_size, 600);
        assert_eq!(snap.object_count, 2);
        assert_eq!(snap.object_sum_size, 12);
        assert_eq!(snap.upload_count, 1);
        assert_eq!(snap.total_size(), 612);
    }

    #[test]
    fn test_empty_pages_change_nothing() {
        let totals = Aggregator::new();
        totals.add_parts(&[]);
        totals.add_objects(&[]);
        totals.add_uploads(0);
        assert_eq!(totals.snapshot(), AggregationTotals::default());
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let totals = Arc::new(Aggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let totals = Arc::clone(&totals);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        totals.add_parts(&[PartRecord::new(i, 3)]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = totals.snapshot();
        assert_eq!(snap.part_count, 8000);
        assert_eq!(snap.part_sum_size, 24000);
    }

    #[test]
    fn test_storage_class_usage_add() {
        let mut usage = StorageClassUsage::default();
        usage.add(10);
        usage.add(32);
        assert_eq!(usage, StorageClassUsage { count: 2, size: 42 });
    }
}
