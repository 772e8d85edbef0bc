//! Listing records and the ListingSource trait
//!
//! Every listing the usage pipeline consumes is a cursor-paginated RPC:
//! one request returns a bounded page of items, a continuation cursor,
//! and a truncation flag. `ListingSource` is the seam between the core
//! and whatever SDK actually performs those requests.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest page any list request may ask for (the service maximum)
pub const MAX_PAGE_SIZE: i32 = 1000;

/// A multipart upload that was initiated but never completed or aborted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpload {
    /// Object key the upload targets
    pub key: String,

    /// Upload ID assigned by the service
    pub upload_id: String,
}

impl PendingUpload {
    pub fn new(key: impl Into<String>, upload_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            upload_id: upload_id.into(),
        }
    }
}

/// One uploaded part of a pending upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    pub part_number: i32,

    /// Size in bytes
    pub size: i64,

    /// ETag without surrounding quotes
    pub etag: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl PartRecord {
    pub fn new(part_number: i32, size: i64) -> Self {
        Self {
            part_number,
            size,
            etag: String::new(),
            last_modified: None,
        }
    }
}

/// An object (or object version) returned by an object listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub key: String,

    /// Size in bytes
    pub size: i64,

    /// Storage class as reported by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size,
            storage_class: None,
            last_modified: None,
        }
    }

    pub fn with_storage_class(mut self, class: impl Into<String>) -> Self {
        self.storage_class = Some(class.into());
        self
    }
}

/// Resume point for ListMultipartUploads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadCursor {
    pub key_marker: Option<String>,
    pub upload_id_marker: Option<String>,
}

/// Resume point for ListParts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartCursor {
    pub part_number_marker: Option<String>,
}

/// Resume point for ListObjectsV2
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectCursor {
    pub continuation_token: Option<String>,
}

/// Resume point for ListObjectVersions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionCursor {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

/// One page of a paginated listing
///
/// When `truncated` is false, `next` carries no meaning and the listing
/// is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: C,
    pub truncated: bool,
}

impl<T, C: Default> Page<T, C> {
    /// A final page
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next: C::default(),
            truncated: false,
        }
    }

    /// A page followed by more, resuming at `next`
    pub fn more(items: Vec<T>, next: C) -> Self {
        Self {
            items,
            next,
            truncated: true,
        }
    }
}

/// Who pays for requests against a requester-pays bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPayer {
    Requester,
    BucketOwner,
}

impl RequestPayer {
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestPayer::Requester => "requester",
            RequestPayer::BucketOwner => "bucketowner",
        }
    }
}

impl FromStr for RequestPayer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "requester" => Ok(RequestPayer::Requester),
            "bucketowner" => Ok(RequestPayer::BucketOwner),
            _ => Err(Error::Usage(format!(
                "payer must be requester or bucketowner, got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for RequestPayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters shared by every list request of one aggregation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub bucket: String,

    /// Key prefix (empty for the whole bucket)
    pub prefix: String,

    pub payer: Option<RequestPayer>,

    /// Items requested per page, within 1..=MAX_PAGE_SIZE
    pub page_size: i32,
}

impl ListQuery {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            payer: None,
            page_size: MAX_PAGE_SIZE,
        }
    }

    pub fn with_payer(mut self, payer: Option<RequestPayer>) -> Self {
        self.payer = payer;
        self
    }

    pub fn with_page_size(mut self, size: i32) -> Self {
        self.page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Prefix as an optional request parameter
    pub fn prefix_param(&self) -> Option<&str> {
        if self.prefix.is_empty() {
            None
        } else {
            Some(&self.prefix)
        }
    }
}

/// Paginated list operations the usage pipeline depends on
///
/// Implementations must return transport and service errors verbatim;
/// retry policy, if any, belongs below this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// List one page of objects under the query prefix
    async fn list_objects(
        &self,
        query: &ListQuery,
        cursor: &ObjectCursor,
    ) -> Result<Page<ObjectRecord, ObjectCursor>>;

    /// List one page of object versions under the query prefix
    async fn list_object_versions(
        &self,
        query: &ListQuery,
        cursor: &VersionCursor,
    ) -> Result<Page<ObjectRecord, VersionCursor>>;

    /// List one page of pending multipart uploads under the query prefix
    async fn list_pending_uploads(
        &self,
        query: &ListQuery,
        cursor: &UploadCursor,
    ) -> Result<Page<PendingUpload, UploadCursor>>;

    /// List one page of the parts already uploaded for `upload`
    async fn list_parts(
        &self,
        query: &ListQuery,
        upload: &PendingUpload,
        cursor: &PartCursor,
    ) -> Result<Page<PartRecord, PartCursor>>;
}
