use chrono::{TimeDelta, Utc};
use tally_core::config::CatalogConfig;
use tally_core::db::{edits::EditFilter, tags};
use tally_core::diff::{EditInput, TagInput};
use tally_core::edit::{
    ProposeEdit, apply_edit, cancel_edit, close_completed, comment_edit, find_edit, propose_edit,
    query_edits, update_edit, vote_edit,
};
use tally_core::model::{Edit, EditStatus, Role, RoleSet, Tag, TargetType, VoteValue};
use tally_core::session::register_user;
use tally_core::{Actor, CatalogConn, CatalogError};
use uuid::Uuid;

struct Fixture {
    conn: CatalogConn,
    admin: Actor,
}

impl Fixture {
    fn new(config: CatalogConfig) -> Self {
        let mut conn = CatalogConn::in_memory(config).expect("open catalog");
        let admin = conn
            .bootstrap_admin("admin")
            .expect("seed admin")
            .expect("empty catalog");
        Self {
            conn,
            admin: Actor::from_user(&admin),
        }
    }

    fn user(&mut self, name: &str, roles: &[Role]) -> Actor {
        let admin = self.admin.clone();
        let user = self
            .conn
            .with_txn(&admin, |s| {
                register_user(s, name, RoleSet::new(roles.iter().copied()))
            })
            .expect("register user");
        Actor::from_user(&user)
    }

    fn propose_tag(&mut self, actor: &Actor, name: &str) -> Edit {
        self.conn
            .with_txn(actor, |s| propose_edit(s, ProposeEdit::create(tag_input(name))))
            .expect("propose tag")
    }

    fn tag(&self, id: Uuid) -> Tag {
        tags::find(self.conn.connection(), id)
            .expect("query tag")
            .expect("tag exists")
    }
}

fn tag_input(name: &str) -> EditInput {
    EditInput::Tag(TagInput {
        name: Some(name.to_string()),
        ..TagInput::default()
    })
}

fn threshold(n: u32) -> CatalogConfig {
    let mut config = CatalogConfig::default();
    config.voting.accept_threshold = n;
    config
}

#[test]
fn created_tag_stays_pending_until_admin_applies() {
    let mut fx = Fixture::new(CatalogConfig::default());
    let editor = fx.user("editor", &[Role::Edit]);

    let edit = fx.propose_tag(&editor, "Foo");
    assert_eq!(edit.status, EditStatus::Pending);
    assert!(!edit.applied);
    assert!(edit.target_id.is_none());

    let admin = fx.admin.clone();
    let applied = fx
        .conn
        .with_txn(&admin, |s| apply_edit(s, edit.id))
        .expect("apply");
    assert_eq!(applied.status, EditStatus::ImmediateAccepted);
    assert!(applied.applied);
    assert!(applied.closed_at.is_some());
    assert!(
        applied
            .votes
            .iter()
            .any(|v| v.vote == VoteValue::ImmediateAccept && v.user_id == admin.user_id)
    );

    let tag = fx.tag(applied.target_id.expect("target assigned"));
    assert_eq!(tag.name, "Foo");
    assert!(!tag.deleted);
}

#[test]
fn reaching_the_threshold_applies_in_the_voting_transaction() {
    let mut fx = Fixture::new(threshold(2));
    let editor = fx.user("editor", &[Role::Edit]);
    let v1 = fx.user("v1", &[Role::Vote]);
    let v2 = fx.user("v2", &[Role::Vote]);
    let edit = fx.propose_tag(&editor, "Outdoor");

    let after_one = fx
        .conn
        .with_txn(&v1, |s| vote_edit(s, edit.id, VoteValue::Accept))
        .expect("first vote");
    assert_eq!(after_one.status, EditStatus::Pending);
    assert_eq!(after_one.vote_count, 1);

    let after_two = fx
        .conn
        .with_txn(&v2, |s| vote_edit(s, edit.id, VoteValue::Accept))
        .expect("second vote");
    assert_eq!(after_two.status, EditStatus::Accepted);
    assert!(after_two.applied);
    assert_eq!(fx.tag(after_two.target_id.expect("target")).name, "Outdoor");
}

#[test]
fn revoting_replaces_the_earlier_vote() {
    let mut fx = Fixture::new(threshold(2));
    let editor = fx.user("editor", &[Role::Edit]);
    let voter = fx.user("voter", &[Role::Vote]);
    let edit = fx.propose_tag(&editor, "Indoor");

    fx.conn
        .with_txn(&voter, |s| vote_edit(s, edit.id, VoteValue::Accept))
        .expect("accept");
    let revoted = fx
        .conn
        .with_txn(&voter, |s| vote_edit(s, edit.id, VoteValue::Reject))
        .expect("reject");
    assert_eq!(revoted.votes.len(), 1);
    assert_eq!(revoted.vote_count, -1);
    assert_eq!(revoted.status, EditStatus::Pending);
}

#[test]
fn admin_reject_vote_closes_the_edit() {
    let mut fx = Fixture::new(CatalogConfig::default());
    let editor = fx.user("editor", &[Role::Edit]);
    let edit = fx.propose_tag(&editor, "Spam");

    let admin = fx.admin.clone();
    let rejected = fx
        .conn
        .with_txn(&admin, |s| vote_edit(s, edit.id, VoteValue::Reject))
        .expect("vote");
    assert_eq!(rejected.status, EditStatus::Rejected);
    assert!(!rejected.applied);
}

#[test]
fn proposers_cannot_vote_on_their_own_edits() {
    let mut fx = Fixture::new(CatalogConfig::default());
    let author = fx.user("author", &[Role::Edit, Role::Vote]);
    let edit = fx.propose_tag(&author, "Mine");

    let result = fx
        .conn
        .with_txn(&author, |s| vote_edit(s, edit.id, VoteValue::Accept));
    assert!(matches!(result, Err(CatalogError::Unauthorized)));
}

#[test]
fn apply_is_exactly_once() {
    let mut fx = Fixture::new(CatalogConfig::default());
    let editor = fx.user("editor", &[Role::Edit]);
    let voter = fx.user("voter", &[Role::Vote]);
    let edit = fx.propose_tag(&editor, "Once");
    let admin = fx.admin.clone();

    fx.conn
        .with_txn(&admin, |s| apply_edit(s, edit.id))
        .expect("first apply");
    let again = fx.conn.with_txn(&admin, |s| apply_edit(s, edit.id));
    assert!(matches!(
        again,
        Err(CatalogError::AlreadyTerminal {
            status: EditStatus::ImmediateAccepted
        })
    ));
    let late_vote = fx
        .conn
        .with_txn(&voter, |s| vote_edit(s, edit.id, VoteValue::Accept));
    assert!(matches!(late_vote, Err(CatalogError::AlreadyTerminal { .. })));

    let tags_named_once: i64 = fx
        .conn
        .connection()
        .query_row("SELECT COUNT(*) FROM tags WHERE name = 'Once'", [], |row| row.get(0))
        .expect("count");
    assert_eq!(tags_named_once, 1);
}

#[test]
fn applying_requires_the_modify_role() {
    let mut fx = Fixture::new(CatalogConfig::default());
    let editor = fx.user("editor", &[Role::Edit, Role::Vote]);
    let edit = fx.propose_tag(&editor, "Nope");

    let result = fx.conn.with_txn(&editor, |s| apply_edit(s, edit.id));
    assert!(matches!(result, Err(CatalogError::Unauthorized)));
}

#[test]
fn cancel_rules() {
    let mut fx = Fixture::new(CatalogConfig::default());
    let editor = fx.user("editor", &[Role::Edit]);
    let stranger = fx.user("stranger", &[Role::Edit, Role::Vote]);
    let admin = fx.admin.clone();

    let own = fx.propose_tag(&editor, "Mine");
    let canceled = fx
        .conn
        .with_txn(&editor, |s| cancel_edit(s, own.id))
        .expect("owner cancel");
    assert_eq!(canceled.status, EditStatus::Canceled);
    assert!(!canceled.applied);

    let other = fx.propose_tag(&editor, "Theirs");
    let denied = fx.conn.with_txn(&stranger, |s| cancel_edit(s, other.id));
    assert!(matches!(denied, Err(CatalogError::Unauthorized)));

    let rejected = fx
        .conn
        .with_txn(&admin, |s| cancel_edit(s, other.id))
        .expect("admin cancel");
    assert_eq!(rejected.status, EditStatus::ImmediateRejected);
    assert!(
        rejected
            .votes
            .iter()
            .any(|v| v.vote == VoteValue::ImmediateReject)
    );

    let twice = fx.conn.with_txn(&editor, |s| cancel_edit(s, own.id));
    assert!(matches!(twice, Err(CatalogError::AlreadyTerminal { .. })));
}

#[test]
fn amend_rebuilds_the_diff_and_resets_votes() {
    let mut fx = Fixture::new(threshold(3));
    let editor = fx.user("editor", &[Role::Edit]);
    let voter = fx.user("voter", &[Role::Vote]);
    let edit = fx.propose_tag(&editor, "Draft");
    fx.conn
        .with_txn(&voter, |s| vote_edit(s, edit.id, VoteValue::Accept))
        .expect("vote");

    let amended = fx
        .conn
        .with_txn(&editor, |s| update_edit(s, edit.id, tag_input("Final")))
        .expect("amend");
    assert_eq!(amended.update_count, 1);
    assert_eq!(amended.vote_count, 0);
    assert!(amended.updated_at.is_some());

    let reloaded = fx
        .conn
        .with_txn(&editor, |s| find_edit(s, edit.id))
        .expect("find");
    assert!(reloaded.votes.is_empty());

    let over_limit = fx
        .conn
        .with_txn(&editor, |s| update_edit(s, edit.id, tag_input("Again")));
    assert!(matches!(over_limit, Err(CatalogError::InvalidOperation(_))));

    let not_owner = fx
        .conn
        .with_txn(&voter, |s| update_edit(s, edit.id, tag_input("Hijack")));
    assert!(matches!(not_owner, Err(CatalogError::Unauthorized)));
}

#[test]
fn invalid_proposals_leave_no_trace() {
    let mut config = CatalogConfig::default();
    config.edits.enabled_targets = vec![TargetType::Tag, TargetType::Studio];
    let mut fx = Fixture::new(config);
    let editor = fx.user("editor", &[Role::Edit]);
    let admin = fx.admin.clone();

    let created = fx.propose_tag(&editor, "Base");
    let tag_id = fx
        .conn
        .with_txn(&admin, |s| apply_edit(s, created.id))
        .expect("apply")
        .target_id
        .expect("target");

    let unchanged = fx
        .conn
        .with_txn(&editor, |s| propose_edit(s, ProposeEdit::modify(tag_id, tag_input("Base"))));
    assert!(matches!(unchanged, Err(CatalogError::InvalidOperation(msg)) if msg == "edit contains no changes"));

    let disabled = fx.conn.with_txn(&editor, |s| {
        propose_edit(s, ProposeEdit::destroy(TargetType::Scene, Uuid::new_v4()))
    });
    assert!(matches!(
        disabled,
        Err(CatalogError::NotImplemented(TargetType::Scene))
    ));

    let missing = fx.conn.with_txn(&editor, |s| {
        propose_edit(s, ProposeEdit::destroy(TargetType::Tag, Uuid::new_v4()))
    });
    assert!(matches!(missing, Err(CatalogError::NotFound { kind: "tag", .. })));

    let nameless = fx.conn.with_txn(&editor, |s| {
        propose_edit(s, ProposeEdit::create(EditInput::Tag(TagInput::default())))
    });
    assert!(matches!(nameless, Err(CatalogError::InvalidOperation(_))));

    let self_merge = fx.conn.with_txn(&editor, |s| {
        propose_edit(s, ProposeEdit::merge(tag_id, vec![tag_id], tag_input("Base")))
    });
    assert!(matches!(self_merge, Err(CatalogError::InvalidOperation(_))));

    let all = fx
        .conn
        .with_txn(&editor, |s| query_edits(s, &EditFilter::default()))
        .expect("list");
    assert_eq!(all.len(), 1);
}

#[test]
fn proposals_need_the_edit_role() {
    let mut fx = Fixture::new(CatalogConfig::default());
    let voter = fx.user("voter", &[Role::Vote]);
    let result = fx
        .conn
        .with_txn(&voter, |s| propose_edit(s, ProposeEdit::create(tag_input("X"))));
    assert!(matches!(result, Err(CatalogError::Unauthorized)));
}

#[test]
fn comments_are_allowed_for_voters_and_the_proposer() {
    let mut fx = Fixture::new(CatalogConfig::default());
    let editor = fx.user("editor", &[Role::Edit]);
    let voter = fx.user("voter", &[Role::Vote]);
    let other_editor = fx.user("other", &[Role::Edit]);
    let edit = fx.propose_tag(&editor, "Chatty");

    fx.conn
        .with_txn(&editor, |s| comment_edit(s, edit.id, "source: label site"))
        .expect("owner comment");
    fx.conn
        .with_txn(&voter, |s| comment_edit(s, edit.id, "looks right"))
        .expect("voter comment");
    let denied = fx
        .conn
        .with_txn(&other_editor, |s| comment_edit(s, edit.id, "hi"));
    assert!(matches!(denied, Err(CatalogError::Unauthorized)));

    let loaded = fx
        .conn
        .with_txn(&voter, |s| find_edit(s, edit.id))
        .expect("find");
    assert_eq!(loaded.comments.len(), 2);
    assert_eq!(loaded.comments[0].body, "source: label site");
}

#[test]
fn sweep_accepts_matured_destructive_edits_and_expires_stale_ones() {
    let mut fx = Fixture::new(threshold(1));
    let editor = fx.user("editor", &[Role::Edit]);
    let voter = fx.user("voter", &[Role::Vote]);
    let admin = fx.admin.clone();

    let created = fx.propose_tag(&editor, "Doomed");
    let tag_id = fx
        .conn
        .with_txn(&admin, |s| apply_edit(s, created.id))
        .expect("apply")
        .target_id
        .expect("target");

    let destroy = fx
        .conn
        .with_txn(&editor, |s| {
            propose_edit(s, ProposeEdit::destroy(TargetType::Tag, tag_id))
        })
        .expect("propose destroy");
    let voted = fx
        .conn
        .with_txn(&voter, |s| vote_edit(s, destroy.id, VoteValue::Accept))
        .expect("vote");
    assert_eq!(voted.status, EditStatus::Pending, "destructive edits wait");

    let stale = fx.propose_tag(&editor, "Ignored");

    let in_three_days = Utc::now() + TimeDelta::days(3);
    let report = fx
        .conn
        .with_txn_at(&admin, in_three_days, close_completed)
        .expect("sweep");
    assert_eq!(report.accepted, vec![destroy.id]);
    assert!(report.rejected.is_empty());
    assert!(fx.tag(tag_id).deleted);

    let in_eight_days = Utc::now() + TimeDelta::days(8);
    let report = fx
        .conn
        .with_txn_at(&admin, in_eight_days, close_completed)
        .expect("sweep");
    assert_eq!(report.rejected, vec![stale.id]);

    let sweep_denied = fx.conn.with_txn(&editor, close_completed);
    assert!(matches!(sweep_denied, Err(CatalogError::Unauthorized)));
}

#[test]
fn votes_after_the_voting_period_reject_instead_of_applying() {
    let mut fx = Fixture::new(threshold(1));
    let editor = fx.user("editor", &[Role::Edit]);
    let voter = fx.user("voter", &[Role::Vote]);
    let edit = fx.propose_tag(&editor, "Late");

    let in_eight_days = edit.created_at + TimeDelta::days(8);
    let voted = fx
        .conn
        .with_txn_at(&voter, in_eight_days, |s| {
            vote_edit(s, edit.id, VoteValue::Accept)
        })
        .expect("vote");
    assert_eq!(voted.status, EditStatus::Rejected);
    assert!(!voted.applied);
    assert!(voted.target_id.is_none());

    let created: i64 = fx
        .conn
        .connection()
        .query_row("SELECT COUNT(*) FROM tags WHERE name = 'Late'", [], |row| {
            row.get(0)
        })
        .expect("count tags");
    assert_eq!(created, 0);
}
