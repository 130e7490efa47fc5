//! Client-supplied desired state for an edit.
//!
//! Scalars are `Option<T>`: `None` leaves the field alone. Collections are
//! `Option<Vec<T>>`: `None` leaves the collection alone and `Some(vec![])`
//! clears it.

use crate::model::{
    BodyModification, FingerprintKey, PerformerAppearance, TargetType, Url,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub aliases: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioInput {
    pub name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub aliases: Option<Vec<String>>,
    pub urls: Option<Vec<Url>>,
    pub images: Option<Vec<Uuid>>,
}

/// Desired performer state. An omitted scalar keeps its current value;
/// clearing an optional scalar such as `birthdate` is not supported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformerInput {
    pub name: Option<String>,
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
    pub aliases: Option<Vec<String>>,
    pub urls: Option<Vec<Url>>,
    pub images: Option<Vec<Uuid>>,
    pub tattoos: Option<Vec<BodyModification>>,
    pub piercings: Option<Vec<BodyModification>>,
}

/// Desired scene state. As with performers, `None` never clears a scalar:
/// a scene's date, studio, or director cannot be unset through an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneInput {
    pub title: Option<String>,
    pub details: Option<String>,
    pub date: Option<String>,
    pub studio_id: Option<Uuid>,
    pub duration: Option<i64>,
    pub director: Option<String>,
    pub code: Option<String>,
    pub urls: Option<Vec<Url>>,
    pub images: Option<Vec<Uuid>>,
    pub tags: Option<Vec<Uuid>>,
    pub performers: Option<Vec<PerformerAppearance>>,
    pub fingerprints: Option<Vec<FingerprintKey>>,
}

/// Desired state for one target type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditInput {
    Performer(PerformerInput),
    Scene(SceneInput),
    Studio(StudioInput),
    Tag(TagInput),
}

impl EditInput {
    #[must_use]
    pub const fn target_type(&self) -> TargetType {
        match self {
            Self::Performer(_) => TargetType::Performer,
            Self::Scene(_) => TargetType::Scene,
            Self::Studio(_) => TargetType::Studio,
            Self::Tag(_) => TargetType::Tag,
        }
    }

    /// An input that changes nothing, used for destroys.
    #[must_use]
    pub fn empty(target_type: TargetType) -> Self {
        match target_type {
            TargetType::Performer => Self::Performer(PerformerInput::default()),
            TargetType::Scene => Self::Scene(SceneInput::default()),
            TargetType::Studio => Self::Studio(StudioInput::default()),
            TargetType::Tag => Self::Tag(TagInput::default()),
        }
    }

    /// Trim text, drop blank strings, and collapse duplicate collection
    /// members.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Tag(input) => Self::Tag(TagInput {
                name: text(input.name),
                description: text(input.description),
                aliases: input.aliases.map(names),
            }),
            Self::Studio(input) => Self::Studio(StudioInput {
                name: text(input.name),
                parent_id: input.parent_id,
                aliases: input.aliases.map(names),
                urls: input.urls.map(urls),
                images: input.images,
            }),
            Self::Performer(input) => Self::Performer(PerformerInput {
                name: text(input.name),
                disambiguation: text(input.disambiguation),
                gender: text(input.gender),
                birthdate: text(input.birthdate),
                ethnicity: text(input.ethnicity),
                country: text(input.country),
                eye_color: text(input.eye_color),
                hair_color: text(input.hair_color),
                aliases: input.aliases.map(names),
                urls: input.urls.map(urls),
                tattoos: input.tattoos.map(body_mods),
                piercings: input.piercings.map(body_mods),
                ..input
            }),
            Self::Scene(input) => Self::Scene(SceneInput {
                title: text(input.title),
                details: text(input.details),
                date: text(input.date),
                director: text(input.director),
                code: text(input.code),
                urls: input.urls.map(urls),
                performers: input.performers.map(|list| {
                    list.into_iter()
                        .map(|appearance| PerformerAppearance {
                            alias: text(appearance.alias),
                            ..appearance
                        })
                        .collect()
                }),
                fingerprints: input.fingerprints.map(|list| {
                    list.into_iter()
                        .map(|key| FingerprintKey {
                            hash: key.hash.trim().to_string(),
                            ..key
                        })
                        .collect()
                }),
                ..input
            }),
        }
    }
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn names(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn urls(values: Vec<Url>) -> Vec<Url> {
    let mut out: Vec<Url> = Vec::with_capacity(values.len());
    for value in values {
        let value = Url {
            url: value.url.trim().to_string(),
            site: value.site.trim().to_string(),
        };
        if !value.url.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn body_mods(values: Vec<BodyModification>) -> Vec<BodyModification> {
    let mut out: Vec<BodyModification> = Vec::with_capacity(values.len());
    for value in values {
        let value = BodyModification {
            location: value.location.trim().to_string(),
            description: text(value.description),
        };
        if !value.location.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{EditInput, TagInput};

    #[test]
    fn absent_and_empty_collections_stay_distinct() {
        let absent: EditInput =
            serde_json::from_str(r#"{"type":"tag","name":"Foo"}"#).expect("parse");
        let cleared: EditInput =
            serde_json::from_str(r#"{"type":"tag","aliases":[]}"#).expect("parse");

        let EditInput::Tag(absent) = absent else {
            panic!("expected tag input");
        };
        let EditInput::Tag(cleared) = cleared else {
            panic!("expected tag input");
        };
        assert_eq!(absent.aliases, None);
        assert_eq!(cleared.aliases, Some(vec![]));
    }

    #[test]
    fn normalized_trims_and_dedups() {
        let input = EditInput::Tag(TagInput {
            name: Some("  Foo ".into()),
            description: Some("   ".into()),
            aliases: Some(vec!["a".into(), " a".into(), String::new(), "b".into()]),
        })
        .normalized();

        assert_eq!(
            input,
            EditInput::Tag(TagInput {
                name: Some("Foo".into()),
                description: None,
                aliases: Some(vec!["a".into(), "b".into()]),
            })
        );
    }
}
