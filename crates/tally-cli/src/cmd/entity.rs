//! `tally entity`: read a catalog entity, following merge redirects.

use super::run_as;
use crate::output::{OutputMode, Renderable, pretty_kv, pretty_section, render_item};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tally_core::CatalogError;
use tally_core::db::{performers, redirects, scenes, studios, tags};
use tally_core::model::{Performer, Role, Scene, Studio, Tag, TargetType};
use tally_core::session::Session;
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct EntityArgs {
    pub target_type: TargetType,
    pub id: Uuid,

    /// Show a merged-away entity itself instead of its surviving target.
    #[arg(long)]
    pub no_follow: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "entity", rename_all = "lowercase")]
enum Entity {
    Performer(Performer),
    Scene(Scene),
    Studio(Studio),
    Tag(Tag),
}

impl Entity {
    fn label(&self) -> (Uuid, String, bool) {
        match self {
            Self::Performer(p) => (p.id, p.name.clone(), p.deleted),
            Self::Scene(s) => (s.id, s.title.clone().unwrap_or_default(), s.deleted),
            Self::Studio(s) => (s.id, s.name.clone(), s.deleted),
            Self::Tag(t) => (t.id, t.name.clone(), t.deleted),
        }
    }

    const fn target_type(&self) -> TargetType {
        match self {
            Self::Performer(_) => TargetType::Performer,
            Self::Scene(_) => TargetType::Scene,
            Self::Studio(_) => TargetType::Studio,
            Self::Tag(_) => TargetType::Tag,
        }
    }
}

#[derive(Debug, Serialize)]
struct EntityView {
    #[serde(flatten)]
    entity: Entity,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirected_from: Option<Uuid>,
}

impl Renderable for EntityView {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let (id, name, deleted) = self.entity.label();
        pretty_section(w, &format!("{} {name}", self.entity.target_type()))?;
        pretty_kv(w, "ID", id.to_string())?;
        if let Some(from) = self.redirected_from {
            pretty_kv(w, "Merged", format!("{from} -> {id}"))?;
        }
        if deleted {
            pretty_kv(w, "Deleted", "yes")?;
        }
        let body = serde_json::to_string_pretty(&self.entity).map_err(io::Error::other)?;
        writeln!(w, "{body}")
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, self).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let (id, name, deleted) = self.entity.label();
        writeln!(w, "{}\t{id}\t{name}\t{deleted}", self.entity.target_type())
    }
}

/// A scene row in lookup results.
pub struct SceneView(pub Scene);

impl Renderable for SceneView {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let scene = &self.0;
        pretty_kv(w, "Scene", scene.id.to_string())?;
        pretty_kv(w, "Title", scene.title.as_deref().unwrap_or("-"))?;
        if let Some(date) = &scene.date {
            pretty_kv(w, "Date", date)?;
        }
        if let Some(studio) = scene.studio_id {
            pretty_kv(w, "Studio", studio.to_string())?;
        }
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, &self.0).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let scene = &self.0;
        writeln!(
            w,
            "{}\t{}\t{}",
            scene.id,
            scene.title.as_deref().unwrap_or("-"),
            scene.date.as_deref().unwrap_or("-")
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["id", "title", "date"]
    }
}

fn load(session: &Session<'_>, target_type: TargetType, id: Uuid) -> tally_core::Result<Option<Entity>> {
    let conn = session.conn();
    Ok(match target_type {
        TargetType::Performer => performers::find(conn, id)?.map(Entity::Performer),
        TargetType::Scene => scenes::find(conn, id)?.map(Entity::Scene),
        TargetType::Studio => studios::find(conn, id)?.map(Entity::Studio),
        TargetType::Tag => tags::find(conn, id)?.map(Entity::Tag),
    })
}

/// # Errors
///
/// Returns an error if the entity does not exist.
pub fn run_entity(
    args: &EntityArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let view = run_as(user_flag, output, project_root, |s| {
        s.actor().require(Role::Read)?;
        let redirect = if args.no_follow {
            None
        } else {
            redirects::resolve(s.conn(), args.target_type, args.id)?
        };
        let id = redirect.unwrap_or(args.id);
        let entity = load(s, args.target_type, id)?
            .ok_or_else(|| CatalogError::not_found(args.target_type.as_str(), args.id))?;
        Ok(EntityView {
            entity,
            redirected_from: redirect.map(|_| args.id),
        })
    })?;
    render_item(&view, output)?;
    Ok(())
}
