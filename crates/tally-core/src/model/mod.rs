pub mod edit;
pub mod entity;
pub mod fingerprint;
pub mod role;

pub use edit::{Edit, EditComment, EditStatus, EditVote, Operation, TargetType, VoteValue};
pub use entity::{BodyModification, Performer, PerformerAppearance, Scene, Studio, Tag, Url, User};
pub use fingerprint::{Fingerprint, FingerprintAlgorithm, FingerprintKey};
pub use role::{Role, RoleSet};
