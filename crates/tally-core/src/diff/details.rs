use super::input::{PerformerInput, SceneInput, StudioInput, TagInput};
use super::{SliceDiff, changed};
use crate::model::{
    BodyModification, FingerprintKey, Performer, PerformerAppearance, Scene, Studio, Tag,
    TargetType, Url,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub aliases: SliceDiff<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub aliases: SliceDiff<String>,
    pub urls: SliceDiff<Url>,
    pub images: SliceDiff<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformerDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name at proposal time, recorded whenever `name` changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hair_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career_start_year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career_end_year: Option<i64>,
    pub aliases: SliceDiff<String>,
    pub urls: SliceDiff<Url>,
    pub images: SliceDiff<Uuid>,
    pub tattoos: SliceDiff<BodyModification>,
    pub piercings: SliceDiff<BodyModification>,
    /// On rename, bill existing un-aliased appearances under the old name.
    pub preserve_alias_on_modify: bool,
    /// On merge, bill the moved appearances under the source's name.
    pub preserve_alias_on_merge: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub urls: SliceDiff<Url>,
    pub images: SliceDiff<Uuid>,
    pub tags: SliceDiff<Uuid>,
    pub performers: SliceDiff<PerformerAppearance>,
    pub fingerprints: SliceDiff<FingerprintKey>,
}

/// The typed diff of an edit, one variant per target type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "diff", rename_all = "lowercase")]
pub enum EditDetails {
    Performer(PerformerDiff),
    Scene(SceneDiff),
    Studio(StudioDiff),
    Tag(TagDiff),
}

impl EditDetails {
    #[must_use]
    pub const fn target_type(&self) -> TargetType {
        match self {
            Self::Performer(_) => TargetType::Performer,
            Self::Scene(_) => TargetType::Scene,
            Self::Studio(_) => TargetType::Studio,
            Self::Tag(_) => TargetType::Tag,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Performer(diff) => diff.is_empty(),
            Self::Scene(diff) => diff.is_empty(),
            Self::Studio(diff) => diff.is_empty(),
            Self::Tag(diff) => diff.is_empty(),
        }
    }

    /// Entities the diff links to and which therefore must exist.
    #[must_use]
    pub fn references(&self) -> Vec<(TargetType, Uuid)> {
        match self {
            Self::Studio(diff) => diff
                .parent_id
                .map(|id| (TargetType::Studio, id))
                .into_iter()
                .collect(),
            Self::Scene(diff) => diff
                .studio_id
                .map(|id| (TargetType::Studio, id))
                .into_iter()
                .chain(diff.tags.added.iter().map(|id| (TargetType::Tag, *id)))
                .chain(
                    diff.performers
                        .added
                        .iter()
                        .map(|p| (TargetType::Performer, p.performer_id)),
                )
                .collect(),
            Self::Performer(_) | Self::Tag(_) => Vec::new(),
        }
    }
}

impl TagDiff {
    #[must_use]
    pub fn build(input: &TagInput, current: Option<&Tag>) -> Self {
        let Some(tag) = current else {
            return Self {
                name: input.name.clone(),
                description: input.description.clone(),
                aliases: SliceDiff::created(input.aliases.as_deref().unwrap_or_default()),
            };
        };
        Self {
            name: changed(input.name.as_ref(), Some(&tag.name)),
            description: changed(input.description.as_ref(), tag.description.as_ref()),
            aliases: SliceDiff::from_input(input.aliases.as_deref(), &tag.aliases),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.aliases.is_empty()
    }

    pub fn apply_to(&self, tag: &mut Tag) {
        if let Some(name) = &self.name {
            tag.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            tag.description = Some(description.clone());
        }
        tag.aliases = self.aliases.apply_to(&tag.aliases);
    }
}

impl StudioDiff {
    #[must_use]
    pub fn build(input: &StudioInput, current: Option<&Studio>) -> Self {
        let Some(studio) = current else {
            return Self {
                name: input.name.clone(),
                parent_id: input.parent_id,
                aliases: SliceDiff::created(input.aliases.as_deref().unwrap_or_default()),
                urls: SliceDiff::created(input.urls.as_deref().unwrap_or_default()),
                images: SliceDiff::created(input.images.as_deref().unwrap_or_default()),
            };
        };
        Self {
            name: changed(input.name.as_ref(), Some(&studio.name)),
            parent_id: changed(input.parent_id.as_ref(), studio.parent_id.as_ref()),
            aliases: SliceDiff::from_input(input.aliases.as_deref(), &studio.aliases),
            urls: SliceDiff::from_input(input.urls.as_deref(), &studio.urls),
            images: SliceDiff::from_input(input.images.as_deref(), &studio.images),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.parent_id.is_none()
            && self.aliases.is_empty()
            && self.urls.is_empty()
            && self.images.is_empty()
    }

    pub fn apply_to(&self, studio: &mut Studio) {
        if let Some(name) = &self.name {
            studio.name.clone_from(name);
        }
        if let Some(parent_id) = self.parent_id {
            studio.parent_id = Some(parent_id);
        }
        studio.aliases = self.aliases.apply_to(&studio.aliases);
        studio.urls = self.urls.apply_to(&studio.urls);
        studio.images = self.images.apply_to(&studio.images);
    }
}

impl PerformerDiff {
    #[must_use]
    pub fn build(input: &PerformerInput, current: Option<&Performer>) -> Self {
        let Some(performer) = current else {
            return Self {
                name: input.name.clone(),
                disambiguation: input.disambiguation.clone(),
                gender: input.gender.clone(),
                birthdate: input.birthdate.clone(),
                ethnicity: input.ethnicity.clone(),
                country: input.country.clone(),
                eye_color: input.eye_color.clone(),
                hair_color: input.hair_color.clone(),
                height: input.height,
                career_start_year: input.career_start_year,
                career_end_year: input.career_end_year,
                aliases: SliceDiff::created(input.aliases.as_deref().unwrap_or_default()),
                urls: SliceDiff::created(input.urls.as_deref().unwrap_or_default()),
                images: SliceDiff::created(input.images.as_deref().unwrap_or_default()),
                tattoos: SliceDiff::created(input.tattoos.as_deref().unwrap_or_default()),
                piercings: SliceDiff::created(input.piercings.as_deref().unwrap_or_default()),
                ..Self::default()
            };
        };
        let name = changed(input.name.as_ref(), Some(&performer.name));
        Self {
            previous_name: name.as_ref().map(|_| performer.name.clone()),
            name,
            disambiguation: changed(
                input.disambiguation.as_ref(),
                performer.disambiguation.as_ref(),
            ),
            gender: changed(input.gender.as_ref(), performer.gender.as_ref()),
            birthdate: changed(input.birthdate.as_ref(), performer.birthdate.as_ref()),
            ethnicity: changed(input.ethnicity.as_ref(), performer.ethnicity.as_ref()),
            country: changed(input.country.as_ref(), performer.country.as_ref()),
            eye_color: changed(input.eye_color.as_ref(), performer.eye_color.as_ref()),
            hair_color: changed(input.hair_color.as_ref(), performer.hair_color.as_ref()),
            height: changed(input.height.as_ref(), performer.height.as_ref()),
            career_start_year: changed(
                input.career_start_year.as_ref(),
                performer.career_start_year.as_ref(),
            ),
            career_end_year: changed(
                input.career_end_year.as_ref(),
                performer.career_end_year.as_ref(),
            ),
            aliases: SliceDiff::from_input(input.aliases.as_deref(), &performer.aliases),
            urls: SliceDiff::from_input(input.urls.as_deref(), &performer.urls),
            images: SliceDiff::from_input(input.images.as_deref(), &performer.images),
            tattoos: SliceDiff::from_input(input.tattoos.as_deref(), &performer.tattoos),
            piercings: SliceDiff::from_input(input.piercings.as_deref(), &performer.piercings),
            preserve_alias_on_modify: false,
            preserve_alias_on_merge: false,
        }
    }

    /// True when the diff changes nothing. The alias-preservation flags
    /// are options, not changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.disambiguation.is_none()
            && self.gender.is_none()
            && self.birthdate.is_none()
            && self.ethnicity.is_none()
            && self.country.is_none()
            && self.eye_color.is_none()
            && self.hair_color.is_none()
            && self.height.is_none()
            && self.career_start_year.is_none()
            && self.career_end_year.is_none()
            && self.aliases.is_empty()
            && self.urls.is_empty()
            && self.images.is_empty()
            && self.tattoos.is_empty()
            && self.piercings.is_empty()
    }

    pub fn apply_to(&self, performer: &mut Performer) {
        if let Some(name) = &self.name {
            performer.name.clone_from(name);
        }
        set(&mut performer.disambiguation, self.disambiguation.as_ref());
        set(&mut performer.gender, self.gender.as_ref());
        set(&mut performer.birthdate, self.birthdate.as_ref());
        set(&mut performer.ethnicity, self.ethnicity.as_ref());
        set(&mut performer.country, self.country.as_ref());
        set(&mut performer.eye_color, self.eye_color.as_ref());
        set(&mut performer.hair_color, self.hair_color.as_ref());
        set(&mut performer.height, self.height.as_ref());
        set(&mut performer.career_start_year, self.career_start_year.as_ref());
        set(&mut performer.career_end_year, self.career_end_year.as_ref());
        performer.aliases = self.aliases.apply_to(&performer.aliases);
        performer.urls = self.urls.apply_to(&performer.urls);
        performer.images = self.images.apply_to(&performer.images);
        performer.tattoos = self.tattoos.apply_to(&performer.tattoos);
        performer.piercings = self.piercings.apply_to(&performer.piercings);
    }
}

impl SceneDiff {
    #[must_use]
    pub fn build(
        input: &SceneInput,
        current: Option<&Scene>,
        current_fingerprints: &[FingerprintKey],
    ) -> Self {
        let Some(scene) = current else {
            return Self {
                title: input.title.clone(),
                details: input.details.clone(),
                date: input.date.clone(),
                studio_id: input.studio_id,
                duration: input.duration,
                director: input.director.clone(),
                code: input.code.clone(),
                urls: SliceDiff::created(input.urls.as_deref().unwrap_or_default()),
                images: SliceDiff::created(input.images.as_deref().unwrap_or_default()),
                tags: SliceDiff::created(input.tags.as_deref().unwrap_or_default()),
                performers: SliceDiff::created(input.performers.as_deref().unwrap_or_default()),
                fingerprints: SliceDiff::created(
                    input.fingerprints.as_deref().unwrap_or_default(),
                ),
            };
        };
        Self {
            title: changed(input.title.as_ref(), scene.title.as_ref()),
            details: changed(input.details.as_ref(), scene.details.as_ref()),
            date: changed(input.date.as_ref(), scene.date.as_ref()),
            studio_id: changed(input.studio_id.as_ref(), scene.studio_id.as_ref()),
            duration: changed(input.duration.as_ref(), scene.duration.as_ref()),
            director: changed(input.director.as_ref(), scene.director.as_ref()),
            code: changed(input.code.as_ref(), scene.code.as_ref()),
            urls: SliceDiff::from_input(input.urls.as_deref(), &scene.urls),
            images: SliceDiff::from_input(input.images.as_deref(), &scene.images),
            tags: SliceDiff::from_input(input.tags.as_deref(), &scene.tags),
            performers: SliceDiff::from_input(input.performers.as_deref(), &scene.performers),
            fingerprints: SliceDiff::from_input(
                input.fingerprints.as_deref(),
                current_fingerprints,
            ),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.details.is_none()
            && self.date.is_none()
            && self.studio_id.is_none()
            && self.duration.is_none()
            && self.director.is_none()
            && self.code.is_none()
            && self.urls.is_empty()
            && self.images.is_empty()
            && self.tags.is_empty()
            && self.performers.is_empty()
            && self.fingerprints.is_empty()
    }

    /// Applies every field except fingerprints, which live in the
    /// fingerprint store and are applied by the edit applier.
    pub fn apply_to(&self, scene: &mut Scene) {
        set(&mut scene.title, self.title.as_ref());
        set(&mut scene.details, self.details.as_ref());
        set(&mut scene.date, self.date.as_ref());
        set(&mut scene.studio_id, self.studio_id.as_ref());
        set(&mut scene.duration, self.duration.as_ref());
        set(&mut scene.director, self.director.as_ref());
        set(&mut scene.code, self.code.as_ref());
        scene.urls = self.urls.apply_to(&scene.urls);
        scene.images = self.images.apply_to(&scene.images);
        scene.tags = self.tags.apply_to(&scene.tags);

        // A performer appears at most once per scene; a re-billed
        // appearance replaces the one it was compared against.
        let mut performers: Vec<PerformerAppearance> = Vec::new();
        for appearance in self.performers.apply_to(&scene.performers) {
            performers.retain(|p| p.performer_id != appearance.performer_id);
            performers.push(appearance);
        }
        scene.performers = performers;
    }
}

fn set<T: Clone>(field: &mut Option<T>, value: Option<&T>) {
    if let Some(value) = value {
        *field = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{EditDetails, PerformerDiff, SceneDiff, TagDiff};
    use crate::diff::{PerformerInput, SceneInput, TagInput};
    use crate::model::{PerformerAppearance, Scene, Tag, TargetType};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn create_diff_adds_everything() {
        let diff = TagDiff::build(
            &TagInput {
                name: Some("Foo".into()),
                description: None,
                aliases: Some(vec!["f".into()]),
            },
            None,
        );
        assert_eq!(diff.name.as_deref(), Some("Foo"));
        assert_eq!(diff.aliases.added, vec!["f".to_string()]);
        assert!(diff.aliases.removed.is_empty());
    }

    #[test]
    fn modify_diff_ignores_unchanged_fields() {
        let mut tag = Tag::new(Uuid::new_v4(), "Foo", Utc::now());
        tag.aliases = vec!["f".into()];

        let diff = TagDiff::build(
            &TagInput {
                name: Some("Foo".into()),
                description: None,
                aliases: Some(vec!["f".into()]),
            },
            Some(&tag),
        );
        assert!(diff.is_empty());
    }

    #[test]
    fn rename_records_previous_name() {
        let performer = crate::model::Performer::new(Uuid::new_v4(), "Old", Utc::now());
        let diff = PerformerDiff::build(
            &PerformerInput {
                name: Some("New".into()),
                ..PerformerInput::default()
            },
            Some(&performer),
        );
        assert_eq!(diff.name.as_deref(), Some("New"));
        assert_eq!(diff.previous_name.as_deref(), Some("Old"));
    }

    #[test]
    fn omitted_scalars_keep_their_value() {
        let mut performer = crate::model::Performer::new(Uuid::new_v4(), "Kept", Utc::now());
        performer.birthdate = Some("1990-01-01".into());
        let diff = PerformerDiff::build(
            &PerformerInput {
                birthdate: None,
                height: Some(170),
                ..PerformerInput::default()
            },
            Some(&performer),
        );
        diff.apply_to(&mut performer);
        assert_eq!(performer.birthdate.as_deref(), Some("1990-01-01"));
        assert_eq!(performer.height, Some(170));
    }

    #[test]
    fn rebilled_appearance_replaces_previous_billing() {
        let performer_id = Uuid::new_v4();
        let mut scene = Scene::new(Uuid::new_v4(), Utc::now());
        scene.performers = vec![PerformerAppearance {
            performer_id,
            alias: None,
        }];

        let diff = SceneDiff::build(
            &SceneInput {
                performers: Some(vec![PerformerAppearance {
                    performer_id,
                    alias: Some("Stage".into()),
                }]),
                ..SceneInput::default()
            },
            Some(&scene),
            &[],
        );
        diff.apply_to(&mut scene);

        assert_eq!(scene.performers.len(), 1);
        assert_eq!(scene.performers[0].alias.as_deref(), Some("Stage"));
    }

    #[test]
    fn scene_references_include_added_links_only() {
        let studio = Uuid::new_v4();
        let tag = Uuid::new_v4();
        let details = EditDetails::Scene(SceneDiff {
            studio_id: Some(studio),
            tags: crate::diff::SliceDiff {
                added: vec![tag],
                removed: vec![Uuid::new_v4()],
            },
            ..SceneDiff::default()
        });
        assert_eq!(
            details.references(),
            vec![(TargetType::Studio, studio), (TargetType::Tag, tag)]
        );
    }

    #[test]
    fn details_serialize_with_type_tag() {
        let details = EditDetails::Tag(TagDiff {
            name: Some("Foo".into()),
            ..TagDiff::default()
        });
        let json = serde_json::to_value(&details).expect("serialize");
        assert_eq!(json["type"], "tag");
        assert_eq!(json["diff"]["name"], "Foo");
        let back: EditDetails = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, details);
    }
}
