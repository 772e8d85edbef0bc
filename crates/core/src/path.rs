//! Remote path parsing
//!
//! Remote paths have the form `profile/bucket[/prefix]`. The prefix is
//! passed to list requests untouched, so `local/logs/2024` matches
//! `2024-01.gz` as well as `2024/01.gz`, exactly like a raw prefix query.
//! With `KeyEncoding::Url` the prefix is given in query-escaped form and
//! printed keys are escaped the same way.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::{Error, Result};

/// Bytes left alone by query escaping
const QUERY_UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encoding of object keys on the command line and in output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    /// Query escaping: reserved bytes as `%XX`, space as `+`
    Url,
}

impl KeyEncoding {
    /// Escape a key for display
    pub fn encode(self, key: &str) -> String {
        match self {
            KeyEncoding::Url => utf8_percent_encode(key, QUERY_UNRESERVED)
                .to_string()
                .replace("%20", "+"),
        }
    }

    /// Recover a raw key from its escaped form
    pub fn decode(self, key: &str) -> Result<String> {
        match self {
            KeyEncoding::Url => {
                let unplussed = key.replace('+', " ");
                percent_decode_str(&unplussed)
                    .decode_utf8()
                    .map(|k| k.into_owned())
                    .map_err(|e| {
                        Error::InvalidPath(format!("'{key}' is not a valid url-encoded key: {e}"))
                    })
            }
        }
    }
}

impl FromStr for KeyEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "url" => Ok(KeyEncoding::Url),
            _ => Err(Error::Usage(format!("encoding type must be url, got '{s}'"))),
        }
    }
}

/// A parsed remote location: a bucket and an optional key prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Profile name
    pub profile: String,
    pub bucket: String,
    /// Key prefix (empty for the whole bucket)
    pub prefix: String,
}

impl RemotePath {
    pub fn new(
        profile: impl Into<String>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            profile: profile.into(),
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Display path of an object in the same bucket
    pub fn object_path(&self, key: &str) -> String {
        format!("{}/{}/{}", self.profile, self.bucket, key)
    }

    /// Decode the prefix from its escaped command-line form
    pub fn decode_prefix(mut self, encoding: Option<KeyEncoding>) -> Result<Self> {
        if let Some(encoding) = encoding {
            self.prefix = encoding.decode(&self.prefix)?;
        }
        Ok(self)
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{}/{}", self.profile, self.bucket)
        } else {
            write!(f, "{}/{}/{}", self.profile, self.bucket, self.prefix)
        }
    }
}

/// Parse `profile/bucket[/prefix]`
pub fn parse_remote_path(path: &str) -> Result<RemotePath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let mut parts = path.splitn(3, '/');
    let profile = parts.next().unwrap_or_default();
    let bucket = parts.next().unwrap_or_default();
    let prefix = parts.next().unwrap_or_default();

    if !is_valid_profile_name(profile) {
        return Err(Error::InvalidPath(format!(
            "'{profile}' is not a valid profile name. Use format: profile/bucket[/prefix]"
        )));
    }

    if bucket.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Path '{path}' has no bucket. Use format: profile/bucket[/prefix]"
        )));
    }

    Ok(RemotePath::new(profile, bucket, prefix))
}

fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
