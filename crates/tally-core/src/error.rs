use crate::model::{EditStatus, TargetType};
use std::fmt;
use thiserror::Error;

/// Machine-readable error codes for client-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    Unauthorized,
    EntityNotFound,
    InvalidOperation,
    AlreadyTerminal,
    InvalidEnumValue,
    TooManyFingerprints,
    TooManyScenes,
    NotImplemented,
    StorageFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::Unauthorized => "E2001",
            Self::EntityNotFound => "E2002",
            Self::InvalidOperation => "E2003",
            Self::AlreadyTerminal => "E2004",
            Self::InvalidEnumValue => "E2005",
            Self::TooManyFingerprints => "E3001",
            Self::TooManyScenes => "E3002",
            Self::NotImplemented => "E4001",
            Self::StorageFailure => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Catalog not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::Unauthorized => "Not authorized",
            Self::EntityNotFound => "Entity not found",
            Self::InvalidOperation => "Invalid operation",
            Self::AlreadyTerminal => "Edit already closed",
            Self::InvalidEnumValue => "Invalid enum value",
            Self::TooManyFingerprints => "Too many fingerprints",
            Self::TooManyScenes => "Too many scenes",
            Self::NotImplemented => "Entity type not enabled",
            Self::StorageFailure => "Storage failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and clients.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `tally init` to initialize a catalog here."),
            Self::ConfigParseError => Some("Fix syntax in .tally/config.toml and retry."),
            Self::Unauthorized => Some("Ask an administrator for the required role."),
            Self::EntityNotFound => None,
            Self::InvalidOperation => Some("Check the edit payload against the target entity."),
            Self::AlreadyTerminal => Some("Closed edits are immutable; propose a new edit."),
            Self::InvalidEnumValue => {
                Some("Use one of the documented type/operation/status values.")
            }
            Self::TooManyFingerprints => Some("Split the lookup into smaller batches."),
            Self::TooManyScenes => Some("Split the lookup into smaller batches of scenes."),
            Self::NotImplemented => Some("Enable the entity type under [edits] in config.toml."),
            Self::StorageFailure => Some("Check disk space, permissions, and retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure of a catalog operation.
///
/// Validation failures (`Unauthorized`, `NotFound`, `InvalidOperation`,
/// `AlreadyTerminal`, batch caps, `NotImplemented`) are raised before any
/// side effect. `Storage` and `Serialization` are unexpected and abort the
/// surrounding transaction.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not authorized")]
    Unauthorized,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("edit is already {status}")]
    AlreadyTerminal { status: EditStatus },

    #[error("too many fingerprints: {got} exceeds the limit of {max}")]
    TooManyFingerprints { got: usize, max: usize },

    #[error("too many scenes: {got} exceeds the limit of {max}")]
    TooManyScenes { got: usize, max: usize },

    #[error("{0} edits are not enabled")]
    NotImplemented(TargetType),

    #[error(transparent)]
    UnknownValue(#[from] UnknownValue),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// The stable code clients can branch on.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::NotFound { .. } => ErrorCode::EntityNotFound,
            Self::InvalidOperation(_) => ErrorCode::InvalidOperation,
            Self::AlreadyTerminal { .. } => ErrorCode::AlreadyTerminal,
            Self::TooManyFingerprints { .. } => ErrorCode::TooManyFingerprints,
            Self::TooManyScenes { .. } => ErrorCode::TooManyScenes,
            Self::NotImplemented(_) => ErrorCode::NotImplemented,
            Self::UnknownValue(_) => ErrorCode::InvalidEnumValue,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::Serialization(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// A string that does not name any variant of a closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}': expected one of {expected}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{CatalogError, ErrorCode};
    use crate::model::EditStatus;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::Unauthorized,
            ErrorCode::EntityNotFound,
            ErrorCode::InvalidOperation,
            ErrorCode::AlreadyTerminal,
            ErrorCode::InvalidEnumValue,
            ErrorCode::TooManyFingerprints,
            ErrorCode::TooManyScenes,
            ErrorCode::NotImplemented,
            ErrorCode::StorageFailure,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::AlreadyTerminal.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn unauthorized_message_does_not_leak_target() {
        let err = CatalogError::Unauthorized;
        assert_eq!(err.to_string(), "not authorized");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn terminal_error_names_status() {
        let err = CatalogError::AlreadyTerminal {
            status: EditStatus::ImmediateAccepted,
        };
        assert_eq!(err.to_string(), "edit is already immediate_accepted");
    }

    #[test]
    fn batch_caps_map_to_distinct_codes() {
        let fps = CatalogError::TooManyFingerprints { got: 101, max: 100 };
        let scenes = CatalogError::TooManyScenes { got: 41, max: 40 };
        assert_ne!(fps.code(), scenes.code());
        assert!(fps.to_string().contains("101"));
    }
}
