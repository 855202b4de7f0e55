//! Buckets and half-open bucket ranges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest bucket number produced by key hashing. Buckets are 1-based.
pub const FIRST_BUCKET: Bucket = Bucket(1);

/// Token that query authors write wherever a bucket schema belongs.
pub const SCHEMA_PLACEHOLDER: &str = "_bucket_";

/// Schema name prefix; bucket `7` lives in schema `bucket_7`.
pub const SCHEMA_PREFIX: &str = "bucket";

/// Logical partition identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bucket(u32);

impl Bucket {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Schema that holds this bucket's tables, e.g. `bucket_7`.
    pub fn schema_name(self) -> String {
        format!("{}_{}", SCHEMA_PREFIX, self.0)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Bucket {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<Bucket> for u32 {
    fn from(bucket: Bucket) -> Self {
        bucket.0
    }
}

/// Half-open range `[from, to)` of buckets owned by one shard.
///
/// `from >= to` is an empty range, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRange {
    pub from: Bucket,
    pub to: Bucket,
}

impl BucketRange {
    pub const fn new(from: u32, to: u32) -> Self {
        Self { from: Bucket(from), to: Bucket(to) }
    }

    /// Buckets in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Bucket> {
        (self.from.0..self.to.0).map(Bucket)
    }

    pub fn len(&self) -> usize {
        self.to.0.saturating_sub(self.from.0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn contains(&self, bucket: Bucket) -> bool {
        self.from <= bucket && bucket < self.to
    }
}

impl fmt::Display for BucketRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

impl IntoIterator for &BucketRange {
    type Item = Bucket;
    type IntoIter = std::iter::Map<std::ops::Range<u32>, fn(u32) -> Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        (self.from.0..self.to.0).map(Bucket as fn(u32) -> Bucket)
    }
}

/// Expand ranges into individual buckets, preserving range order.
pub fn flatten(ranges: &[BucketRange]) -> Vec<Bucket> {
    let mut buckets = Vec::with_capacity(ranges.iter().map(BucketRange::len).sum());
    for range in ranges {
        buckets.extend(range.iter());
    }
    buckets
}
