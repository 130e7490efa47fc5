//! `tally propose`: submit a new edit.

use super::{read_json, run_as};
use crate::cmd::show::EditView;
use crate::output::{OutputMode, render_item};
use anyhow::Result;
use clap::Args;
use serde_json::Value;
use std::path::Path;
use tally_core::CatalogError;
use tally_core::diff::EditInput;
use tally_core::edit::{EditOptions, ProposeEdit, propose_edit};
use tally_core::model::{Operation, TargetType};
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct ProposeArgs {
    /// Entity type: performer, scene, studio, or tag.
    pub target_type: TargetType,

    /// Operation: create, modify, destroy, or merge.
    pub operation: Operation,

    /// Entity to modify, destroy, or merge into.
    #[arg(long)]
    pub target: Option<Uuid>,

    /// Entity merged into the target; repeat for several.
    #[arg(long = "merge-source")]
    pub merge_sources: Vec<Uuid>,

    /// Desired state as JSON, `@file`, or `-` for stdin.
    #[arg(long)]
    pub details: Option<String>,

    /// Accept and apply in the same step (modify role).
    #[arg(long)]
    pub apply: bool,

    /// On a performer rename, keep billing existing scenes under the old name.
    #[arg(long)]
    pub preserve_alias_on_modify: bool,

    /// On a performer merge, bill moved scenes under the source's name.
    #[arg(long)]
    pub preserve_alias_on_merge: bool,
}

/// Build the typed input for `target_type` from a JSON object. A missing
/// payload means "no changes".
///
/// # Errors
///
/// Returns [`CatalogError::InvalidOperation`] when the payload is not an
/// object or does not match the target type's fields.
pub fn edit_input(target_type: TargetType, payload: Option<Value>) -> tally_core::Result<EditInput> {
    let Some(payload) = payload else {
        return Ok(EditInput::empty(target_type));
    };
    let Value::Object(mut fields) = payload else {
        return Err(CatalogError::invalid("details must be a JSON object"));
    };
    fields.insert("type".to_string(), Value::String(target_type.as_str().to_string()));
    serde_json::from_value(Value::Object(fields))
        .map_err(|err| CatalogError::invalid(format!("invalid {target_type} details: {err}")))
}

/// # Errors
///
/// Returns an error if the payload is malformed or the proposal is rejected.
pub fn run_propose(
    args: &ProposeArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let payload = args.details.as_deref().map(read_json).transpose()?;
    let details = edit_input(args.target_type, payload).map_err(|err| super::fail(output, err))?;

    let request = ProposeEdit {
        operation: args.operation,
        target_id: args.target,
        merge_source_ids: args.merge_sources.clone(),
        details,
        options: EditOptions {
            preserve_alias_on_modify: args.preserve_alias_on_modify,
            preserve_alias_on_merge: args.preserve_alias_on_merge,
            apply_immediately: args.apply,
        },
    };

    let edit = run_as(user_flag, output, project_root, |s| propose_edit(s, request))?;
    render_item(&EditView(edit), output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::edit_input;
    use serde_json::json;
    use tally_core::CatalogError;
    use tally_core::diff::{EditInput, TagInput};
    use tally_core::model::TargetType;

    #[test]
    fn payload_is_tagged_with_the_target_type() {
        let input = edit_input(TargetType::Tag, Some(json!({ "name": "Foo" }))).expect("parse");
        assert_eq!(
            input,
            EditInput::Tag(TagInput {
                name: Some("Foo".into()),
                ..TagInput::default()
            })
        );
    }

    #[test]
    fn missing_payload_is_empty_input() {
        let input = edit_input(TargetType::Studio, None).expect("parse");
        assert_eq!(input, EditInput::empty(TargetType::Studio));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = edit_input(TargetType::Tag, Some(json!(["Foo"]))).expect_err("array");
        assert!(matches!(err, CatalogError::InvalidOperation(_)));
    }

    #[test]
    fn mistyped_field_is_rejected() {
        let err = edit_input(TargetType::Scene, Some(json!({ "duration": "long" }))).expect_err("type");
        assert!(matches!(err, CatalogError::InvalidOperation(msg) if msg.contains("scene")));
    }
}
