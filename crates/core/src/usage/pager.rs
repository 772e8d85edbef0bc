//! Page fetchers and the pager that drives them
//!
//! A `PageFetcher` binds one listing of a `ListingSource` to its query, so
//! the only thing left to vary between requests is the cursor. `Pager`
//! walks a fetcher from the empty cursor until the service reports a
//! non-truncated page.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::listing::{
    ListQuery, ListingSource, ObjectCursor, ObjectRecord, Page, PartCursor, PartRecord,
    PendingUpload, UploadCursor, VersionCursor,
};

/// Issues one bounded list request for a given cursor
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Item: Send;
    type Cursor: Default + PartialEq + Clone + std::fmt::Debug + Send + Sync;

    async fn fetch(&self, cursor: &Self::Cursor) -> Result<Page<Self::Item, Self::Cursor>>;
}

/// Pending multipart uploads under a prefix
pub struct UploadPages<'a> {
    source: &'a dyn ListingSource,
    query: &'a ListQuery,
}

impl<'a> UploadPages<'a> {
    pub fn new(source: &'a dyn ListingSource, query: &'a ListQuery) -> Self {
        Self { source, query }
    }
}

#[async_trait]
impl PageFetcher for UploadPages<'_> {
    type Item = PendingUpload;
    type Cursor = UploadCursor;

    async fn fetch(&self, cursor: &UploadCursor) -> Result<Page<PendingUpload, UploadCursor>> {
        self.source.list_pending_uploads(self.query, cursor).await
    }
}

/// Uploaded parts of one pending upload
pub struct PartPages<'a> {
    source: &'a dyn ListingSource,
    query: &'a ListQuery,
    upload: &'a PendingUpload,
}

impl<'a> PartPages<'a> {
    pub fn new(
        source: &'a dyn ListingSource,
        query: &'a ListQuery,
        upload: &'a PendingUpload,
    ) -> Self {
        Self {
            source,
            query,
            upload,
        }
    }
}

#[async_trait]
impl PageFetcher for PartPages<'_> {
    type Item = PartRecord;
    type Cursor = PartCursor;

    async fn fetch(&self, cursor: &PartCursor) -> Result<Page<PartRecord, PartCursor>> {
        self.source.list_parts(self.query, self.upload, cursor).await
    }
}

/// Current objects under a prefix
pub struct ObjectPages<'a> {
    source: &'a dyn ListingSource,
    query: &'a ListQuery,
}

impl<'a> ObjectPages<'a> {
    pub fn new(source: &'a dyn ListingSource, query: &'a ListQuery) -> Self {
        Self { source, query }
    }
}

#[async_trait]
impl PageFetcher for ObjectPages<'_> {
    type Item = ObjectRecord;
    type Cursor = ObjectCursor;

    async fn fetch(&self, cursor: &ObjectCursor) -> Result<Page<ObjectRecord, ObjectCursor>> {
        self.source.list_objects(self.query, cursor).await
    }
}

/// Every object version under a prefix
pub struct VersionPages<'a> {
    source: &'a dyn ListingSource,
    query: &'a ListQuery,
}

impl<'a> VersionPages<'a> {
    pub fn new(source: &'a dyn ListingSource, query: &'a ListQuery) -> Self {
        Self { source, query }
    }
}

#[async_trait]
impl PageFetcher for VersionPages<'_> {
    type Item = ObjectRecord;
    type Cursor = VersionCursor;

    async fn fetch(&self, cursor: &VersionCursor) -> Result<Page<ObjectRecord, VersionCursor>> {
        self.source.list_object_versions(self.query, cursor).await
    }
}

/// Walks a fetcher page by page
pub struct Pager<F: PageFetcher> {
    fetcher: F,
    cursor: F::Cursor,
    exhausted: bool,
    pages: usize,
}

impl<F: PageFetcher> Pager<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cursor: F::Cursor::default(),
            exhausted: false,
            pages: 0,
        }
    }

    /// Fetch the next page
    ///
    /// Returns `Ok(None)` once the final page has been handed out. After an
    /// error the pager should be dropped; it does not retry.
    pub async fn next_page(&mut self) -> Result<Option<Vec<F::Item>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self.fetcher.fetch(&self.cursor).await?;
        self.pages += 1;

        if page.truncated {
            if page.next == self.cursor {
                self.exhausted = true;
                return Err(Error::General(format!(
                    "listing did not advance past cursor {:?} on page {}",
                    self.cursor, self.pages
                )));
            }
            self.cursor = page.next;
        } else {
            self.exhausted = true;
            debug!(pages = self.pages, "listing complete");
        }

        Ok(Some(page.items))
    }

    /// Pages fetched so far
    pub fn pages(&self) -> usize {
        self.pages
    }
}
