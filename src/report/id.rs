//! Report identifiers and the stable hashing used to derive them.

use super::{InterviewInput, ReportError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use time::OffsetDateTime;

/// Number of hex characters kept from a stable hash.
const STABLE_HASH_LEN: usize = 16;
/// Number of hash characters used in a derived report id.
const REPORT_ID_HASH_LEN: usize = 8;

/// Opaque identifier correlating one job's progress, log and report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    /// Wrap a caller-supplied identifier.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the id for an interview run against a dataset.
    ///
    /// The id is `RPT-` followed by the first eight hash characters,
    /// uppercased, of the stable hash of `{"k": "<interview hash>::<signature>"}`,
    /// so rerunning the same interview on the same data yields the same id.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] if the interview cannot be encoded.
    pub fn for_interview(
        interview: &InterviewInput,
        signature: &DataSignature,
    ) -> Result<Self, ReportError> {
        let key = format!("{}::{signature}", interview.stable_hash()?);
        let digest = stable_hash(&serde_json::json!({ "k": key }))?;
        let prefix: String = digest.chars().take(REPORT_ID_HASH_LEN).collect();
        Ok(Self(format!("RPT-{}", prefix.to_ascii_uppercase())))
    }

    /// Fallback id derived from a timestamp: `RPT-<unix seconds>`.
    #[must_use]
    pub fn timestamped(at: OffsetDateTime) -> Self {
        Self(format!("RPT-{}", at.unix_timestamp()))
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ReportId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Cheap fingerprint of the grant dataset an analysis ran against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataSignature {
    /// Number of grant rows.
    pub rows: usize,
    /// Sum of the `amount_usd` column.
    pub total_amount_usd: f64,
}

impl fmt::Display for DataSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:.2}", self.rows, self.total_amount_usd)
    }
}

/// SHA-256 of the value's canonical JSON, truncated to 16 hex characters.
///
/// Canonical JSON sorts object keys and drops insignificant whitespace, so
/// the hash does not depend on field order.
///
/// # Errors
///
/// Returns [`ReportError::Serialize`] if the value cannot be encoded.
pub fn stable_hash<T: Serialize>(value: &T) -> Result<String, ReportError> {
    let canonical = serde_json_canonicalizer::to_string(value).map_err(ReportError::Serialize)?;
    let digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));
    Ok(digest.chars().take(STABLE_HASH_LEN).collect())
}
