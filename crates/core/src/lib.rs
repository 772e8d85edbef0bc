//! ossdu-core: Core library for the ossdu storage usage client
//!
//! This crate provides the SDK-independent parts of ossdu:
//! - Configuration and endpoint profile management
//! - Remote path parsing
//! - The `ListingSource` trait over paginated list operations
//! - The concurrent usage aggregation pipeline
//!
//! Nothing in here talks to the network directly. The S3 adapter crate
//! implements `ListingSource`, and tests substitute in-memory sources.

pub mod config;
pub mod error;
pub mod listing;
pub mod path;
pub mod profile;
pub mod usage;

pub use config::{Config, ConfigManager, Defaults};
pub use error::{Error, Result};
pub use listing::{
    ListQuery, ListingSource, MAX_PAGE_SIZE, ObjectCursor, ObjectRecord, Page, PartCursor,
    PartRecord, PendingUpload, RequestPayer, UploadCursor, VersionCursor,
};
pub use path::{KeyEncoding, RemotePath, parse_remote_path};
pub use profile::{Profile, ProfileManager};
pub use usage::{
    AggregationTotals, ObjectScope, StorageClassUsage, UsageAggregator, UsageObserver, UsageReport,
};
