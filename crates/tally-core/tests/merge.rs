use chrono::Utc;
use tally_core::config::CatalogConfig;
use tally_core::db::{fingerprints, performers, redirects, scenes, studios, tags};
use tally_core::diff::{EditInput, PerformerInput, SceneInput, StudioInput, TagInput};
use tally_core::edit::{EditOptions, ProposeEdit, apply_edit, find_edit, propose_edit};
use tally_core::fingerprint::{FingerprintSubmission, submit_fingerprint};
use tally_core::model::{
    EditStatus, FingerprintAlgorithm, FingerprintKey, Performer, PerformerAppearance, Role,
    RoleSet, Scene, Studio, Tag, TargetType,
};
use tally_core::session::register_user;
use tally_core::{Actor, CatalogConn, CatalogError};
use uuid::Uuid;

fn open() -> (CatalogConn, Actor) {
    let mut conn = CatalogConn::in_memory(CatalogConfig::default()).expect("open catalog");
    let admin = conn
        .bootstrap_admin("admin")
        .expect("seed admin")
        .expect("empty catalog");
    (conn, Actor::from_user(&admin))
}

fn performer(conn: &CatalogConn, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    performers::insert(conn.connection(), &Performer::new(id, name, Utc::now())).expect("insert performer");
    id
}

fn tag(conn: &CatalogConn, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    tags::insert(conn.connection(), &Tag::new(id, name, Utc::now())).expect("insert tag");
    id
}

fn studio(conn: &CatalogConn, name: &str, parent: Option<Uuid>) -> Uuid {
    let id = Uuid::new_v4();
    let mut studio = Studio::new(id, name, Utc::now());
    studio.parent_id = parent;
    studios::insert(conn.connection(), &studio).expect("insert studio");
    id
}

fn scene(conn: &CatalogConn, build: impl FnOnce(&mut Scene)) -> Uuid {
    let id = Uuid::new_v4();
    let mut scene = Scene::new(id, Utc::now());
    build(&mut scene);
    scenes::insert(conn.connection(), &scene).expect("insert scene");
    id
}

fn billed(performer_id: Uuid) -> PerformerAppearance {
    PerformerAppearance {
        performer_id,
        alias: None,
    }
}

fn immediately(request: ProposeEdit, preserve_alias: bool) -> ProposeEdit {
    request.with_options(EditOptions {
        apply_immediately: true,
        preserve_alias_on_merge: preserve_alias,
        ..EditOptions::default()
    })
}

#[test]
fn performer_merge_keeps_billing_under_the_source_name() {
    let (mut conn, admin) = open();
    let alpha = performer(&conn, "A");
    let beta = performer(&conn, "B");
    let target = performer(&conn, "T");
    let solo = scene(&conn, |s| s.performers = vec![billed(alpha)]);
    let shared = scene(&conn, |s| s.performers = vec![billed(beta), billed(target)]);

    let edit = conn
        .with_txn(&admin, |s| {
            propose_edit(
                s,
                immediately(
                    ProposeEdit::merge(
                        target,
                        vec![alpha, beta],
                        EditInput::Performer(PerformerInput::default()),
                    ),
                    true,
                ),
            )
        })
        .expect("merge");
    assert_eq!(edit.status, EditStatus::ImmediateAccepted);
    assert!(edit.applied);

    let db = conn.connection();
    let solo = scenes::find(db, solo).expect("query").expect("scene");
    assert_eq!(
        solo.performers,
        vec![PerformerAppearance {
            performer_id: target,
            alias: Some("A".into()),
        }]
    );

    let shared = scenes::find(db, shared).expect("query").expect("scene");
    assert_eq!(shared.performers, vec![billed(target)]);

    for source in [alpha, beta] {
        let merged = performers::find(db, source).expect("query").expect("performer");
        assert!(merged.deleted);
        assert_eq!(
            redirects::resolve(db, TargetType::Performer, source).expect("resolve"),
            Some(target)
        );
    }
    assert!(!performers::find(db, target).expect("query").expect("target").deleted);
}

#[test]
fn performer_merge_without_preserve_leaves_appearances_unbilled() {
    let (mut conn, admin) = open();
    let source = performer(&conn, "Old");
    let target = performer(&conn, "New");
    let scene_id = scene(&conn, |s| s.performers = vec![billed(source)]);

    conn.with_txn(&admin, |s| {
        propose_edit(
            s,
            immediately(
                ProposeEdit::merge(
                    target,
                    vec![source],
                    EditInput::Performer(PerformerInput::default()),
                ),
                false,
            ),
        )
    })
    .expect("merge");

    let loaded = scenes::find(conn.connection(), scene_id).expect("query").expect("scene");
    assert_eq!(loaded.performers, vec![billed(target)]);
}

#[test]
fn tag_merge_drops_duplicate_scene_links_and_applies_the_diff() {
    let (mut conn, admin) = open();
    let source = tag(&conn, "outdoors");
    let target = tag(&conn, "Outdoor");
    let both = scene(&conn, |s| s.tags = vec![source, target]);
    let only_source = scene(&conn, |s| s.tags = vec![source]);

    conn.with_txn(&admin, |s| {
        propose_edit(
            s,
            immediately(
                ProposeEdit::merge(
                    target,
                    vec![source],
                    EditInput::Tag(TagInput {
                        aliases: Some(vec!["outdoors".into()]),
                        ..TagInput::default()
                    }),
                ),
                false,
            ),
        )
    })
    .expect("merge");

    let db = conn.connection();
    assert_eq!(
        scenes::find(db, both).expect("query").expect("scene").tags,
        vec![target]
    );
    assert_eq!(
        scenes::find(db, only_source).expect("query").expect("scene").tags,
        vec![target]
    );
    let merged = tags::find(db, target).expect("query").expect("tag");
    assert_eq!(merged.aliases, vec!["outdoors".to_string()]);
    assert!(tags::find(db, source).expect("query").expect("tag").deleted);
}

#[test]
fn studio_merge_moves_scenes_and_children() {
    let (mut conn, admin) = open();
    let source = studio(&conn, "Old Network", None);
    let target = studio(&conn, "Network", None);
    let child = studio(&conn, "Sub Label", Some(source));
    let scene_id = scene(&conn, |s| s.studio_id = Some(source));

    conn.with_txn(&admin, |s| {
        propose_edit(
            s,
            immediately(
                ProposeEdit::merge(target, vec![source], EditInput::Studio(StudioInput::default())),
                false,
            ),
        )
    })
    .expect("merge");

    let db = conn.connection();
    assert_eq!(
        scenes::find(db, scene_id).expect("query").expect("scene").studio_id,
        Some(target)
    );
    assert_eq!(
        studios::find(db, child).expect("query").expect("studio").parent_id,
        Some(target)
    );
}

#[test]
fn merged_sources_redirect_to_the_final_target() {
    let (mut conn, admin) = open();
    let first = tag(&conn, "a");
    let middle = tag(&conn, "b");
    let last = tag(&conn, "c");

    for (target, source) in [(middle, first), (last, middle)] {
        conn.with_txn(&admin, |s| {
            propose_edit(
                s,
                immediately(
                    ProposeEdit::merge(target, vec![source], EditInput::Tag(TagInput::default())),
                    false,
                ),
            )
        })
        .expect("merge");
    }

    let db = conn.connection();
    assert_eq!(
        redirects::resolve(db, TargetType::Tag, first).expect("resolve"),
        Some(last)
    );

    let stale = conn.with_txn(&admin, |s| {
        propose_edit(
            s,
            ProposeEdit::merge(last, vec![first], EditInput::Tag(TagInput::default())),
        )
    });
    assert!(matches!(stale, Err(CatalogError::InvalidOperation(msg)) if msg.contains("is deleted")));
}

#[test]
fn failed_merge_rolls_back_every_relation() {
    let (mut conn, admin) = open();
    let first = tag(&conn, "src");
    let second = tag(&conn, "src2");
    let target = tag(&conn, "dst");
    let scene_id = scene(&conn, |s| s.tags = vec![first]);

    let edit = conn
        .with_txn(&admin, |s| {
            propose_edit(
                s,
                ProposeEdit::merge(target, vec![first, second], EditInput::Tag(TagInput::default())),
            )
        })
        .expect("propose merge");
    assert_eq!(edit.status, EditStatus::Pending);

    // The second source disappears before the deciding vote; the first
    // source's scenes have already moved when the apply fails.
    tags::soft_delete(conn.connection(), second, Utc::now()).expect("delete source");
    let result = conn.with_txn(&admin, |s| apply_edit(s, edit.id));
    assert!(matches!(result, Err(CatalogError::NotFound { .. })));

    let reloaded = conn
        .with_txn(&admin, |s| find_edit(s, edit.id))
        .expect("find edit");
    assert_eq!(reloaded.status, EditStatus::Pending);
    assert!(!reloaded.applied);
    assert!(reloaded.votes.is_empty());

    let db = conn.connection();
    assert_eq!(
        scenes::find(db, scene_id).expect("query").expect("scene").tags,
        vec![first]
    );
    assert!(!tags::find(db, first).expect("query").expect("tag").deleted);
    assert_eq!(redirects::resolve(db, TargetType::Tag, first).expect("resolve"), None);
}

#[test]
fn scene_merge_combines_fingerprints_and_unions_submitters() {
    let (mut conn, admin) = open();
    let alice = conn
        .with_txn(&admin, |s| register_user(s, "alice", RoleSet::new([Role::Read])))
        .map(|u| Actor::from_user(&u))
        .expect("register alice");
    let bob = conn
        .with_txn(&admin, |s| register_user(s, "bob", RoleSet::new([Role::Read])))
        .map(|u| Actor::from_user(&u))
        .expect("register bob");

    let source = scene(&conn, |s| s.title = Some("Dup".into()));
    let target = scene(&conn, |s| s.title = Some("Keep".into()));
    let submit = |conn: &mut CatalogConn, actor: &Actor, scene_id: Uuid, hash: &str| {
        conn.with_txn(actor, |s| {
            submit_fingerprint(
                s,
                &FingerprintSubmission {
                    scene_id,
                    key: FingerprintKey {
                        hash: hash.to_string(),
                        algorithm: FingerprintAlgorithm::Md5,
                        duration: 1800,
                    },
                    unmatch: false,
                },
            )
        })
        .expect("submit");
    };
    // alice vouches for "abc" on both scenes; bob only on the source.
    submit(&mut conn, &alice, source, "abc");
    submit(&mut conn, &bob, source, "abc");
    submit(&mut conn, &alice, target, "abc");
    submit(&mut conn, &bob, source, "def");

    conn.with_txn(&admin, |s| {
        propose_edit(
            s,
            immediately(
                ProposeEdit::merge(target, vec![source], EditInput::Scene(SceneInput::default())),
                false,
            ),
        )
    })
    .expect("merge");

    let db = conn.connection();
    assert!(fingerprints::for_scene(db, source).expect("query").is_empty());

    let merged = fingerprints::for_scene(db, target).expect("query");
    let summary: Vec<(&str, u32, usize)> = merged
        .iter()
        .map(|fp| (fp.hash.as_str(), fp.submissions, fp.submitters.len()))
        .collect();
    assert_eq!(summary, vec![("abc", 2, 2), ("def", 1, 1)]);

    let abc = &merged[0];
    assert!(abc.submitters.contains(&alice.user_id));
    assert!(abc.submitters.contains(&bob.user_id));
    assert!(scenes::find(db, source).expect("query").expect("scene").deleted);
}
