//! Shard identity and bucket ownership records.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

use super::bucket::{flatten, Bucket, BucketRange};

/// Connection string of one shard. Also the shard's identity.
///
/// `Display` and `Debug` hide the password so a DSN can be logged.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dsn(String);

impl Dsn {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self(dsn.into())
    }

    /// Raw connection string, credentials included. Only hand this to the driver.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The DSN with any password replaced by `***`.
    ///
    /// Strings that do not parse as URLs (e.g. `host=... password=...`
    /// keyword form) are reduced to the part before the first space.
    pub fn redacted(&self) -> String {
        match url::Url::parse(&self.0) {
            Ok(mut parsed) => {
                if parsed.password().is_some() && parsed.set_password(Some("***")).is_err() {
                    return "<redacted>".to_string();
                }
                parsed.to_string()
            },
            Err(_) => {
                let head = self.0.split_whitespace().next().unwrap_or_default();
                if head.contains("password") {
                    "<redacted>".to_string()
                } else {
                    head.to_string()
                }
            },
        }
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dsn").field(&self.redacted()).finish()
    }
}

impl From<&str> for Dsn {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Dsn {
    fn from(s: String) -> Self {
        Self(s)
    }
}

fn validate_dsn(dsn: &Dsn) -> Result<(), ValidationError> {
    if dsn.is_empty() {
        return Err(ValidationError::new("empty_dsn"));
    }
    Ok(())
}

/// Configuration record: one shard and the bucket ranges it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BucketToShard {
    /// Shard connection string
    #[validate(custom(function = "validate_dsn"))]
    pub dsn: Dsn,
    /// Bucket ranges owned by the shard
    #[serde(default)]
    pub buckets: Vec<BucketRange>,
}

impl BucketToShard {
    pub fn new(dsn: impl Into<Dsn>, buckets: Vec<BucketRange>) -> Self {
        Self { dsn: dsn.into(), buckets }
    }

    /// Every bucket named by this record, in range order.
    pub fn flattened(&self) -> Vec<Bucket> {
        flatten(&self.buckets)
    }
}
