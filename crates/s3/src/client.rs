//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ListingSource trait from ossdu-core.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::RequestPayer as SdkRequestPayer;
use aws_smithy_types::error::display::DisplayErrorContext;
use tracing::debug;

use ossdu_core::{
    Error, ListQuery, ListingSource, ObjectCursor, ObjectRecord, Page, PartCursor, PartRecord,
    PendingUpload, Profile, RequestPayer, Result, UploadCursor, VersionCursor,
};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    profile: Profile,
}

impl S3Client {
    /// Create a new S3 client from an endpoint profile
    pub async fn new(profile: Profile) -> Result<Self> {
        profile.validate()?;

        let credentials = aws_credential_types::Credentials::new(
            profile.access_key.clone(),
            profile.secret_key.clone(),
            None, // session token
            None, // expiry
            "ossdu-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(profile.region.clone()))
            .endpoint_url(&profile.endpoint)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(profile.path_style)
            .build();

        debug!(
            profile = %profile.name,
            endpoint = %profile.endpoint,
            path_style = profile.path_style,
            "s3 client ready"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            profile,
        })
    }

    /// Profile this client was built from
    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}

#[async_trait]
impl ListingSource for S3Client {
    async fn list_objects(
        &self,
        query: &ListQuery,
        cursor: &ObjectCursor,
    ) -> Result<Page<ObjectRecord, ObjectCursor>> {
        let response = self
            .inner
            .list_objects_v2()
            .bucket(&query.bucket)
            .set_prefix(query.prefix_param().map(str::to_string))
            .max_keys(query.page_size)
            .set_continuation_token(cursor.continuation_token.clone())
            .set_request_payer(sdk_payer(query.payer))
            .send()
            .await
            .map_err(|e| map_sdk_error(&format!("listing objects in {}", query.bucket), e))?;

        let items = response
            .contents()
            .iter()
            .map(|object| ObjectRecord {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or(0),
                storage_class: object.storage_class().map(|c| c.as_str().to_string()),
                last_modified: object.last_modified().and_then(to_timestamp),
            })
            .collect();

        if !response.is_truncated().unwrap_or(false) {
            return Ok(Page::last(items));
        }

        let token = require_marker(
            response.next_continuation_token(),
            "ListObjectsV2",
            "continuation token",
        )?;
        Ok(Page::more(
            items,
            ObjectCursor {
                continuation_token: Some(token),
            },
        ))
    }

    async fn list_object_versions(
        &self,
        query: &ListQuery,
        cursor: &VersionCursor,
    ) -> Result<Page<ObjectRecord, VersionCursor>> {
        let response = self
            .inner
            .list_object_versions()
            .bucket(&query.bucket)
            .set_prefix(query.prefix_param().map(str::to_string))
            .max_keys(query.page_size)
            .set_key_marker(cursor.key_marker.clone())
            .set_version_id_marker(cursor.version_id_marker.clone())
            .set_request_payer(sdk_payer(query.payer))
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(&format!("listing object versions in {}", query.bucket), e)
            })?;

        // Delete markers hold no data and are left out
        let items = response
            .versions()
            .iter()
            .map(|version| ObjectRecord {
                key: version.key().unwrap_or_default().to_string(),
                size: version.size().unwrap_or(0),
                storage_class: version.storage_class().map(|c| c.as_str().to_string()),
                last_modified: version.last_modified().and_then(to_timestamp),
            })
            .collect();

        if !response.is_truncated().unwrap_or(false) {
            return Ok(Page::last(items));
        }

        let key_marker = require_marker(
            response.next_key_marker(),
            "ListObjectVersions",
            "key marker",
        )?;
        Ok(Page::more(
            items,
            VersionCursor {
                key_marker: Some(key_marker),
                version_id_marker: response.next_version_id_marker().map(str::to_string),
            },
        ))
    }

    async fn list_pending_uploads(
        &self,
        query: &ListQuery,
        cursor: &UploadCursor,
    ) -> Result<Page<PendingUpload, UploadCursor>> {
        let response = self
            .inner
            .list_multipart_uploads()
            .bucket(&query.bucket)
            .set_prefix(query.prefix_param().map(str::to_string))
            .max_uploads(query.page_size)
            .set_key_marker(cursor.key_marker.clone())
            .set_upload_id_marker(cursor.upload_id_marker.clone())
            .set_request_payer(sdk_payer(query.payer))
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(&format!("listing multipart uploads in {}", query.bucket), e)
            })?;

        let items = response
            .uploads()
            .iter()
            .map(|upload| {
                PendingUpload::new(
                    upload.key().unwrap_or_default(),
                    upload.upload_id().unwrap_or_default(),
                )
            })
            .collect();

        if !response.is_truncated().unwrap_or(false) {
            return Ok(Page::last(items));
        }

        let key_marker = require_marker(
            response.next_key_marker(),
            "ListMultipartUploads",
            "key marker",
        )?;
        Ok(Page::more(
            items,
            UploadCursor {
                key_marker: Some(key_marker),
                upload_id_marker: response.next_upload_id_marker().map(str::to_string),
            },
        ))
    }

    async fn list_parts(
        &self,
        query: &ListQuery,
        upload: &PendingUpload,
        cursor: &PartCursor,
    ) -> Result<Page<PartRecord, PartCursor>> {
        let response = self
            .inner
            .list_parts()
            .bucket(&query.bucket)
            .key(&upload.key)
            .upload_id(&upload.upload_id)
            .max_parts(query.page_size)
            .set_part_number_marker(cursor.part_number_marker.clone())
            .set_request_payer(sdk_payer(query.payer))
            .send()
            .await
            .map_err(|e| map_sdk_error(&format!("listing parts of {}", upload.key), e))?;

        let items = response
            .parts()
            .iter()
            .map(|part| PartRecord {
                part_number: part.part_number().unwrap_or(0),
                size: part.size().unwrap_or(0),
                etag: strip_etag(part.e_tag().unwrap_or_default()),
                last_modified: part.last_modified().and_then(to_timestamp),
            })
            .collect();

        if !response.is_truncated().unwrap_or(false) {
            return Ok(Page::last(items));
        }

        let marker = require_marker(
            response.next_part_number_marker(),
            "ListParts",
            "part number marker",
        )?;
        Ok(Page::more(
            items,
            PartCursor {
                part_number_marker: Some(marker),
            },
        ))
    }
}

/// Only `Requester` is sent; the bucket owner pays unless told otherwise
fn sdk_payer(payer: Option<RequestPayer>) -> Option<SdkRequestPayer> {
    match payer {
        Some(RequestPayer::Requester) => Some(SdkRequestPayer::Requester),
        Some(RequestPayer::BucketOwner) | None => None,
    }
}

/// A truncated page must say where to resume, or paging would restart
fn require_marker(marker: Option<&str>, operation: &str, what: &str) -> Result<String> {
    match marker {
        Some(m) if !m.is_empty() => Ok(m.to_string()),
        _ => Err(Error::General(format!(
            "{operation} returned a truncated page without a {what}"
        ))),
    }
}

fn strip_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

fn to_timestamp(dt: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(dt.secs()).ok()
}

fn map_sdk_error<E>(context: &str, err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let detail = format!("{context}: {}", DisplayErrorContext(&err));
    debug!(?code, ?status, "s3 request failed");
    classify(code.as_deref(), status, detail)
}

fn classify(code: Option<&str>, status: Option<u16>, detail: String) -> Error {
    match (code, status) {
        (Some("NoSuchBucket" | "NoSuchUpload" | "NoSuchKey" | "NotFound"), _)
        | (None, Some(404)) => Error::NotFound(detail),
        (
            Some(
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken",
            ),
            _,
        )
        | (None, Some(401 | 403)) => Error::Auth(detail),
        _ => Error::Network(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_service_codes() {
        assert!(matches!(
            classify(Some("NoSuchUpload"), Some(404), "gone".into()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            classify(Some("NoSuchBucket"), Some(404), "gone".into()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            classify(Some("AccessDenied"), Some(403), "denied".into()),
            Error::Auth(_)
        ));
        assert!(matches!(
            classify(Some("SignatureDoesNotMatch"), Some(403), "bad sig".into()),
            Error::Auth(_)
        ));
        assert!(matches!(
            classify(Some("InternalError"), Some(500), "boom".into()),
            Error::Network(_)
        ));
    }

    #[test]
    fn test_classify_falls_back_to_status() {
        assert!(matches!(classify(None, Some(404), "x".into()), Error::NotFound(_)));
        assert!(matches!(classify(None, Some(403), "x".into()), Error::Auth(_)));
        assert!(matches!(classify(None, None, "timeout".into()), Error::Network(_)));
    }

    #[test]
    fn test_classify_keeps_detail() {
        let err = classify(Some("SlowDown"), Some(503), "listing parts of a: slow down".into());
        assert_eq!(err.to_string(), "Network error: listing parts of a: slow down");
    }

    #[test]
    fn test_sdk_payer() {
        assert_eq!(
            sdk_payer(Some(RequestPayer::Requester)),
            Some(SdkRequestPayer::Requester)
        );
        assert_eq!(sdk_payer(Some(RequestPayer::BucketOwner)), None);
        assert_eq!(sdk_payer(None), None);
    }

    #[test]
    fn test_require_marker() {
        assert_eq!(require_marker(Some("k1"), "ListParts", "marker").unwrap(), "k1");
        assert!(require_marker(None, "ListParts", "marker").is_err());
        assert!(require_marker(Some(""), "ListParts", "marker").is_err());
    }

    #[test]
    fn test_strip_etag() {
        assert_eq!(strip_etag("\"abc123\""), "abc123");
        assert_eq!(strip_etag("abc123"), "abc123");
    }

    #[test]
    fn test_to_timestamp() {
        let dt = aws_smithy_types::DateTime::from_secs(1_700_000_000);
        assert_eq!(to_timestamp(&dt).map(|t| t.as_second()), Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_profile() {
        let profile = Profile::new("bad name", "http://localhost:9000", "ak", "sk");
        assert!(S3Client::new(profile).await.is_err());
    }

    #[tokio::test]
    async fn test_new_keeps_profile() {
        let profile = Profile::new("local", "http://localhost:9000", "ak", "sk");
        let client = S3Client::new(profile).await.unwrap();
        assert_eq!(client.profile().name, "local");
    }
}
