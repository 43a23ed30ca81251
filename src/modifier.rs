// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Schema-driven edits of a [`RecordDelta`].
//!
//! These helpers apply the rules of an [`AccountType`] to a record being edited: whether another
//! row of some kind may be added, what a new row starts out with, and which rows are so empty that
//! saving them would be pointless.
use crate::{
    columns,
    delta::{PlaceholderIds, RecordDelta, RecordDeltaList, ValueDelta},
    fields::{FieldMap, FieldValue},
    schema::{AccountType, AccountTypeProvider, DataKind, EditType},
    selector::TypeSelector,
};
use tracing::{debug, trace};

/// True if `record` may hold another row of `kind`.
pub fn can_insert(record: &RecordDelta, kind: &DataKind) -> bool {
    let visible = record.entry_count(&kind.mime_type, true);
    has_valid_types(record, kind) && kind.type_overall_max.is_none_or(|max| visible < max)
}

/// True if a new row of `kind` could be labelled with some type, or if the kind has no types.
pub fn has_valid_types(record: &RecordDelta, kind: &DataKind) -> bool {
    let selector = TypeSelector::new(kind);
    !selector.has_edit_types() || !selector.valid_types(record, None, true).is_empty()
}

/// Adds a row of `kind` to `record`, labelled with the best type still available.
pub fn insert_child<'r>(
    record: &'r mut RecordDelta,
    kind: &DataKind,
    ids: &mut PlaceholderIds,
) -> &'r mut ValueDelta {
    let edit_type = TypeSelector::new(kind).select(record);
    insert_child_with_type(record, kind, edit_type, ids)
}

/// Adds a row of `kind` to `record`, labelled with `edit_type`.
///
/// The row starts out with the kind's default values.
pub fn insert_child_with_type<'r>(
    record: &'r mut RecordDelta,
    kind: &DataKind,
    edit_type: Option<&EditType>,
    ids: &mut PlaceholderIds,
) -> &'r mut ValueDelta {
    let mut after = FieldMap::new().with(columns::TYPE_TAG, kind.mime_type.as_str());
    after.put_all(&kind.default_values);
    if let (Some(type_column), Some(edit_type)) = (&kind.type_column, edit_type) {
        after.put(type_column.as_str(), edit_type.raw_value);
    }
    trace!(tag = %kind.mime_type, %after, "inserting row");
    record.add_entry(ValueDelta::from_after(after, ids))
}

/// Makes sure `record` has a visible row of the kind `mime_type`, inserting one if needed.
///
/// Returns `None` if `account_type` does not support the kind.
pub fn ensure_kind_exists<'r>(
    record: &'r mut RecordDelta,
    account_type: &AccountType,
    mime_type: &str,
    ids: &mut PlaceholderIds,
) -> Option<&'r mut ValueDelta> {
    let kind = account_type.kind_for(mime_type)?;
    if record.entry_count(mime_type, true) > 0 {
        return record
            .entries_mut(mime_type)
            .iter_mut()
            .find(|entry| entry.is_visible());
    }
    let child = insert_child(record, kind, ids);
    if kind.template_rows {
        child.set_from_template(true);
    }
    Some(child)
}

/// True if none of the editable fields of `kind` holds anything visible in `entry`.
///
/// Kinds without editable fields are always empty.
pub fn is_empty(entry: &ValueDelta, kind: &DataKind) -> bool {
    !kind.fields.iter().any(|field| {
        entry
            .get(&field.column)
            .is_some_and(FieldValue::is_graphic)
    })
}

/// Drops the rows of `record` that were edited into emptiness, and `record` itself if nothing
/// worth saving remains.
///
/// Only rows of kinds known to `account_type` are considered. Rows that were not edited are left
/// alone and count as content, as do edited rows that are not empty unless they are still
/// templates.
pub fn trim_empty(record: &mut RecordDelta, account_type: &AccountType) {
    let mut has_values = false;
    for kind in &account_type.kinds {
        for entry in record.entries_mut(&kind.mime_type) {
            let touched = entry.is_insert() || entry.has_changes();
            if !touched {
                has_values = true;
            } else if is_empty(entry, kind) {
                trace!(tag = %kind.mime_type, row = ?entry.id(), "trimming empty row");
                entry.mark_deleted();
            } else if !entry.is_from_template() {
                has_values = true;
            }
        }
    }
    if !has_values {
        debug!(record = ?record.record_id(), "trimming empty record");
        record.mark_deleted();
    }
}

/// [`trim_empty`] for every member of `list`, each against its own account type.
pub fn trim_empty_all<P>(list: &mut RecordDeltaList, provider: &P)
where
    P: AccountTypeProvider + ?Sized,
{
    for member in list.iter_mut() {
        if let Some(account_type) = member.account_type_in(provider) {
            trim_empty(member, account_type);
        }
    }
}

/// True if saving `list` would change anything.
///
/// Inserted rows only count once they hold something. Pending splits and joins always count.
pub fn has_changes<P>(list: &RecordDeltaList, provider: &P) -> bool
where
    P: AccountTypeProvider + ?Sized,
{
    if list.is_marked_for_splitting() || list.is_marked_for_joining() {
        return true;
    }
    list.iter().any(|member| {
        member
            .account_type_in(provider)
            .is_some_and(|account_type| record_has_changes(member, account_type))
    })
}

fn record_has_changes(record: &RecordDelta, account_type: &AccountType) -> bool {
    account_type.kinds.iter().any(|kind| {
        record.entries(&kind.mime_type).iter().any(|entry| {
            (entry.is_insert() && !is_empty(entry, kind))
                || (entry.is_update() && entry.has_changes())
                || entry.is_delete()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field_map, schema::EditField};

    fn phone_kind() -> DataKind {
        DataKind::new("phone")
            .with_type_column("data2")
            .with_type(EditType::new(1, "home"))
            .with_field(EditField::new("data1", "number"))
    }

    #[test]
    fn empty_rows() {
        let kind = phone_kind();
        let mut ids = PlaceholderIds::new();
        let mut entry = ValueDelta::from_after(field_map! { "data2" => 1 }, &mut ids);
        assert!(is_empty(&entry, &kind));
        entry.put("data1", " \t");
        assert!(is_empty(&entry, &kind));
        entry.put("data1", "555");
        assert!(!is_empty(&entry, &kind));
        assert!(is_empty(&entry, &DataKind::new("phone")));
    }

    #[test]
    fn inserted_rows_start_with_defaults() {
        let kind = phone_kind().with_default(columns::IS_PRIMARY, 0);
        let mut ids = PlaceholderIds::new();
        let mut record = RecordDelta::default();
        let child = insert_child(&mut record, &kind, &mut ids);
        assert_eq!(child.type_tag(), Some("phone"));
        assert_eq!(child.get_long("data2"), Some(1));
        assert_eq!(child.get_long(columns::IS_PRIMARY), Some(0));
        assert_eq!(child.id(), Some(-1));

        let child = insert_child_with_type(&mut record, &kind, None, &mut ids);
        assert!(!child.contains_key("data2"));
        assert_eq!(record.entry_count("phone", true), 2);
    }

    #[test]
    fn ensure_kind_exists_reuses_visible_rows() {
        let account_type = AccountType::new(None, None)
            .with_kind(phone_kind())
            .with_kind(DataKind::new("photo").with_template_rows());
        let mut ids = PlaceholderIds::new();
        let mut record = RecordDelta::default();

        assert!(ensure_kind_exists(&mut record, &account_type, "email", &mut ids).is_none());

        let first = ensure_kind_exists(&mut record, &account_type, "phone", &mut ids)
            .and_then(|entry| entry.id());
        let again = ensure_kind_exists(&mut record, &account_type, "phone", &mut ids)
            .and_then(|entry| entry.id());
        assert_eq!(first, again);
        assert_eq!(record.entry_count("phone", false), 1);

        let photo = ensure_kind_exists(&mut record, &account_type, "photo", &mut ids).unwrap();
        assert!(photo.is_from_template());
    }
}
