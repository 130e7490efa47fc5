//! Catalog entities that edits target.
//!
//! Every entity carries a soft-delete flag: destroyed and merged-away rows
//! stay in place so edit history and redirects keep resolving.

use super::role::RoleSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered catalog user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub roles: RoleSet,
    pub created_at: DateTime<Utc>,
}

/// A link to an external page. Two URLs are equal when both the address and
/// the site match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Url {
    pub url: String,
    pub site: String,
}

/// A tattoo or piercing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyModification {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A performer billed on a scene, optionally under a different name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerformerAppearance {
    pub performer_id: Uuid,
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Studio {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub aliases: Vec<String>,
    pub urls: Vec<Url>,
    pub images: Vec<Uuid>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performer {
    pub id: Uuid,
    pub name: String,
    pub disambiguation: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub ethnicity: Option<String>,
    pub country: Option<String>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub height: Option<i64>,
    pub career_start_year: Option<i64>,
    pub career_end_year: Option<i64>,
    pub aliases: Vec<String>,
    pub urls: Vec<Url>,
    pub images: Vec<Uuid>,
    pub tattoos: Vec<BodyModification>,
    pub piercings: Vec<BodyModification>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: Uuid,
    pub title: Option<String>,
    pub details: Option<String>,
    pub date: Option<String>,
    pub studio_id: Option<Uuid>,
    pub duration: Option<i64>,
    pub director: Option<String>,
    pub code: Option<String>,
    pub urls: Vec<Url>,
    pub images: Vec<Uuid>,
    pub tags: Vec<Uuid>,
    pub performers: Vec<PerformerAppearance>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            aliases: Vec::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Studio {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
            aliases: Vec::new(),
            urls: Vec::new(),
            images: Vec::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Performer {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            disambiguation: None,
            gender: None,
            birthdate: None,
            ethnicity: None,
            country: None,
            eye_color: None,
            hair_color: None,
            height: None,
            career_start_year: None,
            career_end_year: None,
            aliases: Vec::new(),
            urls: Vec::new(),
            images: Vec::new(),
            tattoos: Vec::new(),
            piercings: Vec::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Scene {
    #[must_use]
    pub fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: None,
            details: None,
            date: None,
            studio_id: None,
            duration: None,
            director: None,
            code: None,
            urls: Vec::new(),
            images: Vec::new(),
            tags: Vec::new(),
            performers: Vec::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}
