use crate::error::UnknownValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

/// Privileges a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Read,
    Vote,
    Edit,
    Modify,
    Admin,
}

impl Role {
    pub const ALL: [Self; 5] = [Self::Read, Self::Vote, Self::Edit, Self::Modify, Self::Admin];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Vote => "vote",
            Self::Edit => "edit",
            Self::Modify => "modify",
            Self::Admin => "admin",
        }
    }

    /// Whether holding `self` grants `other`.
    ///
    /// - `admin` grants everything
    /// - `modify` grants `edit`, `vote`, `read`
    /// - `edit` and `vote` each grant `read`
    #[must_use]
    pub const fn implies(self, other: Self) -> bool {
        match self {
            Self::Admin => true,
            Self::Modify => !matches!(other, Self::Admin),
            Self::Edit => matches!(other, Self::Edit | Self::Read),
            Self::Vote => matches!(other, Self::Vote | Self::Read),
            Self::Read => matches!(other, Self::Read),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "vote" => Ok(Self::Vote),
            "edit" => Ok(Self::Edit),
            "modify" => Ok(Self::Modify),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownValue {
                kind: "role",
                value: other.to_string(),
                expected: "read, vote, edit, modify, admin",
            }),
        }
    }
}

/// The roles granted to a user, stored as a comma-separated list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    /// True when any granted role implies `role`.
    #[must_use]
    pub fn has(&self, role: Role) -> bool {
        self.0.iter().any(|granted| granted.implies(role))
    }

    pub fn insert(&mut self, role: Role) {
        self.0.insert(role);
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn to_db_string(&self) -> String {
        self.iter().map(Role::as_str).collect::<Vec<_>>().join(",")
    }
}

impl FromStr for RoleSet {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Role::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }
}
