use crate::error::UnknownValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FingerprintAlgorithm {
    Md5,
    Oshash,
    Phash,
}

impl FingerprintAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Oshash => "OSHASH",
            Self::Phash => "PHASH",
        }
    }
}

impl fmt::Display for FingerprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerprintAlgorithm {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "OSHASH" => Ok(Self::Oshash),
            "PHASH" => Ok(Self::Phash),
            other => Err(UnknownValue {
                kind: "fingerprint algorithm",
                value: other.to_string(),
                expected: "MD5, OSHASH, PHASH",
            }),
        }
    }
}

/// A fingerprint as carried in scene edits.
///
/// Identity is `(hash, algorithm)`; `duration` rides along and is only used
/// when the fingerprint row is first created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintKey {
    pub hash: String,
    pub algorithm: FingerprintAlgorithm,
    pub duration: i64,
}

impl PartialEq for FingerprintKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.algorithm == other.algorithm
    }
}

impl Eq for FingerprintKey {}

impl Hash for FingerprintKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
        self.algorithm.hash(state);
    }
}

/// A consensus fingerprint attached to a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub scene_id: Uuid,
    pub hash: String,
    pub algorithm: FingerprintAlgorithm,
    pub duration: i64,
    pub submissions: u32,
    pub submitters: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fingerprint {
    #[must_use]
    pub fn key(&self) -> FingerprintKey {
        FingerprintKey {
            hash: self.hash.clone(),
            algorithm: self.algorithm,
            duration: self.duration,
        }
    }
}
