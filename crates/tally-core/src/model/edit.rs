use crate::diff::EditDetails;
use crate::error::UnknownValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// The kind of entity an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Performer,
    Scene,
    Studio,
    Tag,
}

impl TargetType {
    pub const ALL: [Self; 4] = [Self::Performer, Self::Scene, Self::Studio, Self::Tag];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Performer => "performer",
            Self::Scene => "scene",
            Self::Studio => "studio",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "performer" => Ok(Self::Performer),
            "scene" => Ok(Self::Scene),
            "studio" => Ok(Self::Studio),
            "tag" => Ok(Self::Tag),
            other => Err(UnknownValue {
                kind: "target type",
                value: other.to_string(),
                expected: "performer, scene, studio, tag",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Modify,
    Destroy,
    Merge,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Destroy => "destroy",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "modify" => Ok(Self::Modify),
            "destroy" => Ok(Self::Destroy),
            "merge" => Ok(Self::Merge),
            other => Err(UnknownValue {
                kind: "operation",
                value: other.to_string(),
                expected: "create, modify, destroy, merge",
            }),
        }
    }
}

/// Lifecycle status of an edit. Everything except `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    Pending,
    Accepted,
    Rejected,
    ImmediateAccepted,
    ImmediateRejected,
    Canceled,
}

impl EditStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::ImmediateAccepted => "immediate_accepted",
            Self::ImmediateRejected => "immediate_rejected",
            Self::Canceled => "canceled",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Statuses under which the edit's changes are applied.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted | Self::ImmediateAccepted)
    }
}

impl fmt::Display for EditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "immediate_accepted" => Ok(Self::ImmediateAccepted),
            "immediate_rejected" => Ok(Self::ImmediateRejected),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            other => Err(UnknownValue {
                kind: "edit status",
                value: other.to_string(),
                expected: "pending, accepted, rejected, immediate_accepted, immediate_rejected, canceled",
            }),
        }
    }
}

/// A recorded vote. `ImmediateAccept`/`ImmediateReject` are written by
/// privileged apply/cancel actions and never count toward thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteValue {
    Accept,
    Reject,
    ImmediateAccept,
    ImmediateReject,
}

impl VoteValue {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::ImmediateAccept => "immediate_accept",
            Self::ImmediateReject => "immediate_reject",
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteValue {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "accept" | "yes" | "up" => Ok(Self::Accept),
            "reject" | "no" | "down" => Ok(Self::Reject),
            "immediate_accept" => Ok(Self::ImmediateAccept),
            "immediate_reject" => Ok(Self::ImmediateReject),
            other => Err(UnknownValue {
                kind: "vote",
                value: other.to_string(),
                expected: "accept, reject",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditVote {
    pub edit_id: Uuid,
    pub user_id: Uuid,
    pub vote: VoteValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditComment {
    pub id: Uuid,
    pub edit_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A proposed change to one catalog entity.
///
/// `applied` is only ever true under an accepted status, and a terminal edit
/// is never mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_type: TargetType,
    pub operation: Operation,
    pub status: EditStatus,
    pub applied: bool,
    pub target_id: Option<Uuid>,
    pub merge_source_ids: Vec<Uuid>,
    pub details: EditDetails,
    pub vote_count: i64,
    pub update_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub votes: Vec<EditVote>,
    #[serde(default)]
    pub comments: Vec<EditComment>,
}

impl Edit {
    /// Whether accepting this edit needs the longer destructive voting window.
    ///
    /// Destroys and merges always do; so does a performer rename that does
    /// not keep the old name as the billing alias on existing scenes.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        match self.operation {
            Operation::Destroy | Operation::Merge => true,
            Operation::Create => false,
            Operation::Modify => match &self.details {
                EditDetails::Performer(diff) => {
                    diff.name.is_some() && !diff.preserve_alias_on_modify
                }
                _ => false,
            },
        }
    }
}
