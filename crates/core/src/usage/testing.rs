//! In-memory listing source for tests
//!
//! Paginates fixed datasets the way the service does: markers name the
//! last item of the previous page, and `page_size` bounds every page.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::listing::{
    ListQuery, ListingSource, ObjectCursor, ObjectRecord, Page, PartCursor, PartRecord,
    PendingUpload, UploadCursor, VersionCursor,
};

#[derive(Default)]
pub struct FakeSource {
    objects: Vec<ObjectRecord>,
    versions: Vec<ObjectRecord>,
    uploads: Vec<PendingUpload>,
    parts: HashMap<String, Vec<PartRecord>>,
    fail_upload_page: Option<usize>,
    fail_parts_for: HashSet<String>,
    missing_uploads: HashSet<String>,
    replay_parts_for: HashSet<String>,
    upload_calls: AtomicUsize,
    part_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(mut self, objects: impl IntoIterator<Item = ObjectRecord>) -> Self {
        self.objects.extend(objects);
        self
    }

    pub fn with_versions(mut self, versions: impl IntoIterator<Item = ObjectRecord>) -> Self {
        self.versions.extend(versions);
        self
    }

    pub fn with_uploads(mut self, uploads: impl IntoIterator<Item = PendingUpload>) -> Self {
        self.uploads.extend(uploads);
        self
    }

    /// Register parts numbered from 1 with the given sizes
    pub fn with_parts(mut self, upload: &PendingUpload, sizes: &[i64]) -> Self {
        let parts = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| PartRecord::new(i as i32 + 1, *size))
            .collect();
        self.parts.insert(upload.upload_id.clone(), parts);
        self
    }

    /// Register an upload together with its parts
    pub fn with_upload(self, key: &str, upload_id: &str, sizes: &[i64]) -> Self {
        let upload = PendingUpload::new(key, upload_id);
        self.with_parts(&upload, sizes).with_uploads([upload])
    }

    /// Fail the n-th (0-based) pending-upload request
    pub fn fail_upload_page(mut self, page: usize) -> Self {
        self.fail_upload_page = Some(page);
        self
    }

    /// Fail every part request for this upload
    pub fn fail_parts_for(mut self, upload_id: &str) -> Self {
        self.fail_parts_for.insert(upload_id.to_string());
        self
    }

    /// Answer part requests for this upload with NotFound
    pub fn missing_upload(mut self, upload_id: &str) -> Self {
        self.missing_uploads.insert(upload_id.to_string());
        self
    }

    /// Make the first part page of this upload point back at its own start
    pub fn replay_parts_for(mut self, upload_id: &str) -> Self {
        self.replay_parts_for.insert(upload_id.to_string());
        self
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn part_calls(&self) -> usize {
        self.part_calls.load(Ordering::SeqCst)
    }

    /// Reference totals computed without the pipeline
    pub fn expected_parts(&self) -> (i64, i64) {
        self.uploads
            .iter()
            .filter_map(|u| self.parts.get(&u.upload_id))
            .flatten()
            .fold((0, 0), |(count, size), p| (count + 1, size + p.size))
    }
}

fn page_bounds(len: usize, start: usize, page_size: i32) -> (usize, bool) {
    let end = (start + page_size as usize).min(len);
    (end, end < len)
}

fn offset(marker: &Option<String>) -> usize {
    marker
        .as_deref()
        .and_then(|m| m.parse::<usize>().ok())
        .unwrap_or(0)
}

#[async_trait]
impl ListingSource for FakeSource {
    async fn list_objects(
        &self,
        query: &ListQuery,
        cursor: &ObjectCursor,
    ) -> Result<Page<ObjectRecord, ObjectCursor>> {
        let objects: Vec<_> = self
            .objects
            .iter()
            .filter(|o| o.key.starts_with(&query.prefix))
            .cloned()
            .collect();
        let start = offset(&cursor.continuation_token);
        let (end, truncated) = page_bounds(objects.len(), start, query.page_size);
        let items = objects[start..end].to_vec();

        Ok(if truncated {
            Page::more(
                items,
                ObjectCursor {
                    continuation_token: Some(end.to_string()),
                },
            )
        } else {
            Page::last(items)
        })
    }

    async fn list_object_versions(
        &self,
        query: &ListQuery,
        cursor: &VersionCursor,
    ) -> Result<Page<ObjectRecord, VersionCursor>> {
        let versions: Vec<_> = self
            .versions
            .iter()
            .filter(|o| o.key.starts_with(&query.prefix))
            .cloned()
            .collect();
        let start = offset(&cursor.key_marker);
        let (end, truncated) = page_bounds(versions.len(), start, query.page_size);
        let items = versions[start..end].to_vec();

        Ok(if truncated {
            Page::more(
                items,
                VersionCursor {
                    key_marker: Some(end.to_string()),
                    version_id_marker: Some(format!("v{end}")),
                },
            )
        } else {
            Page::last(items)
        })
    }

    async fn list_pending_uploads(
        &self,
        query: &ListQuery,
        cursor: &UploadCursor,
    ) -> Result<Page<PendingUpload, UploadCursor>> {
        let call = self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upload_page == Some(call) {
            return Err(Error::Network(format!(
                "connection reset listing uploads page {call}"
            )));
        }

        let uploads: Vec<_> = self
            .uploads
            .iter()
            .filter(|u| u.key.starts_with(&query.prefix))
            .cloned()
            .collect();
        let start = match (&cursor.key_marker, &cursor.upload_id_marker) {
            (Some(key), Some(id)) => uploads
                .iter()
                .position(|u| &u.key == key && &u.upload_id == id)
                .map_or(uploads.len(), |i| i + 1),
            _ => 0,
        };
        let (end, truncated) = page_bounds(uploads.len(), start, query.page_size);
        let items = uploads[start..end].to_vec();

        Ok(match items.last() {
            Some(last) if truncated => {
                let next = UploadCursor {
                    key_marker: Some(last.key.clone()),
                    upload_id_marker: Some(last.upload_id.clone()),
                };
                Page::more(items, next)
            }
            _ => Page::last(items),
        })
    }

    async fn list_parts(
        &self,
        query: &ListQuery,
        upload: &PendingUpload,
        cursor: &PartCursor,
    ) -> Result<Page<PartRecord, PartCursor>> {
        self.part_calls.fetch_add(1, Ordering::SeqCst);
        // Let other workers interleave between pages
        tokio::task::yield_now().await;

        if self.fail_parts_for.contains(&upload.upload_id) {
            return Err(Error::Network(format!(
                "read timeout listing parts of {}",
                upload.upload_id
            )));
        }
        if self.missing_uploads.contains(&upload.upload_id) {
            return Err(Error::NotFound(format!("upload {}", upload.upload_id)));
        }

        let parts = self
            .parts
            .get(&upload.upload_id)
            .cloned()
            .unwrap_or_default();
        let marker = cursor
            .part_number_marker
            .as_deref()
            .and_then(|m| m.parse::<i32>().ok());

        if marker.is_none() && self.replay_parts_for.contains(&upload.upload_id) {
            let (end, _) = page_bounds(parts.len(), 0, query.page_size);
            let next = PartCursor {
                part_number_marker: Some("0".to_string()),
            };
            return Ok(Page::more(parts[..end].to_vec(), next));
        }

        let remaining: Vec<_> = parts
            .into_iter()
            .filter(|p| marker.is_none_or(|m| p.part_number > m))
            .collect();
        let (end, truncated) = page_bounds(remaining.len(), 0, query.page_size);
        let items = remaining[..end].to_vec();

        Ok(match items.last() {
            Some(last) if truncated => {
                let next = PartCursor {
                    part_number_marker: Some(last.part_number.to_string()),
                };
                Page::more(items, next)
            }
            _ => Page::last(items),
        })
    }
}
