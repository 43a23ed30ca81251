// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::value::{DeltaState, ValueDelta};
use crate::{
    columns::{self, GroupingMode},
    error::DiffError,
    fields::FieldMap,
    operation::{Collection, Operation, Reference},
    schema::{AccountType, AccountTypeProvider},
};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Rows sharing a type tag, in the order they were added.
type Bucket = SmallVec<[ValueDelta; 2]>;

/// A record and its rows as read from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSnapshot {
    pub values: FieldMap,
    pub rows: Vec<FieldMap>,
}

impl RecordSnapshot {
    pub fn new(values: FieldMap) -> Self {
        Self {
            values,
            rows: Vec::new(),
        }
    }

    /// Adds a row, tagging it with `type_tag`.
    pub fn with_row(mut self, type_tag: &str, mut row: FieldMap) -> Self {
        row.put(columns::TYPE_TAG, type_tag);
        self.rows.push(row);
        self
    }

    /// Adds a row as-is.
    pub fn push_row(&mut self, row: FieldMap) {
        self.rows.push(row);
    }
}

/// Change tracking for a record (the root) and the rows that belong to it.
///
/// Rows are grouped by their type tag, which is read from each row's own
/// [`TYPE_TAG`](columns::TYPE_TAG) column when the row is added. Rows without a tag are grouped
/// under the empty tag.
#[derive(Debug, Clone, Default)]
pub struct RecordDelta {
    root: ValueDelta,
    entries: BTreeMap<String, Bucket>,
}

impl RecordDelta {
    pub fn new(root: ValueDelta) -> Self {
        Self {
            root,
            entries: BTreeMap::new(),
        }
    }

    /// Starts tracking a record as read from the store.
    pub fn from_before(snapshot: RecordSnapshot) -> Self {
        let RecordSnapshot { values, rows } = snapshot;
        let mut delta = Self::new(ValueDelta::from_before(values));
        for row in rows {
            delta.add_entry(ValueDelta::from_before(row));
        }
        delta
    }

    pub fn root(&self) -> &ValueDelta {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut ValueDelta {
        &mut self.root
    }

    pub fn record_id(&self) -> Option<i64> {
        self.root.id()
    }

    /// The identifier the store holds the record under.
    ///
    /// Unlike [`RecordDelta::record_id`] this ignores `after`, which may still carry the old
    /// identifier of a record that is re-inserted after a merge.
    pub fn stored_id(&self) -> Option<i64> {
        self.root.before_id().filter(|&id| id >= 0)
    }

    pub fn account_name(&self) -> Option<&str> {
        self.root.get_str(columns::ACCOUNT_NAME)
    }

    pub fn account_type(&self) -> Option<&str> {
        self.root.get_str(columns::ACCOUNT_TYPE)
    }

    pub fn data_set(&self) -> Option<&str> {
        self.root.get_str(columns::DATA_SET)
    }

    /// Looks up the schema that governs this record.
    pub fn account_type_in<'p, P>(&self, provider: &'p P) -> Option<&'p AccountType>
    where
        P: AccountTypeProvider + ?Sized,
    {
        provider.account_type(self.account_type(), self.data_set())
    }

    pub fn is_visible(&self) -> bool {
        self.root.is_visible()
    }

    pub fn is_insert(&self) -> bool {
        self.root.is_insert()
    }

    /// Adds a row under the type tag it carries and returns it.
    pub fn add_entry(&mut self, entry: ValueDelta) -> &mut ValueDelta {
        let tag = entry.type_tag().unwrap_or_default().to_owned();
        let bucket = self.entries.entry(tag).or_default();
        let index = bucket.len();
        bucket.push(entry);
        &mut bucket[index]
    }

    /// The type tags that have at least one row, in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(tag, _)| tag.as_str())
    }

    pub fn entries(&self, tag: &str) -> &[ValueDelta] {
        match self.entries.get(tag) {
            Some(bucket) => bucket.as_slice(),
            None => &[],
        }
    }

    pub fn entries_mut(&mut self, tag: &str) -> &mut [ValueDelta] {
        match self.entries.get_mut(tag) {
            Some(bucket) => bucket.as_mut_slice(),
            None => Default::default(),
        }
    }

    /// Every row, ordered by type tag.
    pub fn all_entries(&self) -> impl Iterator<Item = &ValueDelta> {
        self.entries.values().flatten()
    }

    pub fn all_entries_mut(&mut self) -> impl Iterator<Item = &mut ValueDelta> {
        self.entries.values_mut().flatten()
    }

    pub fn has_entries(&self, tag: &str) -> bool {
        !self.entries(tag).is_empty()
    }

    pub fn entry_count(&self, tag: &str, only_visible: bool) -> usize {
        self.entries(tag)
            .iter()
            .filter(|entry| !only_visible || entry.is_visible())
            .count()
    }

    pub fn total_entry_count(&self, only_visible: bool) -> usize {
        self.all_entries()
            .filter(|entry| !only_visible || entry.is_visible())
            .count()
    }

    /// Finds a row by identifier, placeholders included.
    pub fn entry(&self, id: i64) -> Option<&ValueDelta> {
        self.all_entries().find(|entry| entry.id() == Some(id))
    }

    pub fn entry_mut(&mut self, id: i64) -> Option<&mut ValueDelta> {
        self.all_entries_mut().find(|entry| entry.id() == Some(id))
    }

    /// The primary row of `tag`, or the first row of `tag` if none is marked primary.
    pub fn primary_entry(&self, tag: &str) -> Option<&ValueDelta> {
        let entries = self.entries(tag);
        entries
            .iter()
            .find(|entry| entry.is_primary())
            .or_else(|| entries.first())
    }

    /// The super-primary row of `tag`.
    ///
    /// Without a super-primary row, `force_selection` falls back to the primary row and then to
    /// the first row of `tag`.
    pub fn super_primary_entry(&self, tag: &str, force_selection: bool) -> Option<&ValueDelta> {
        let entries = self.entries(tag);
        if let Some(entry) = entries.iter().find(|entry| entry.is_super_primary()) {
            return Some(entry);
        }
        if !force_selection {
            return None;
        }
        self.primary_entry(tag)
    }

    /// The complete values of every visible row.
    pub fn complete_rows(&self) -> Vec<FieldMap> {
        self.all_entries()
            .filter(|entry| entry.is_visible())
            .map(ValueDelta::complete_values)
            .collect()
    }

    /// Drops the record together with all of its rows.
    pub fn mark_deleted(&mut self) {
        self.root.mark_deleted();
        for entry in self.all_entries_mut() {
            entry.mark_deleted();
        }
    }

    /// Pushes an assert that the stored record still has the version it was read with.
    ///
    /// Nothing is pushed for a record that is being inserted, or whose identifier or version is
    /// unknown.
    pub fn build_assert(&self, out: &mut Vec<Operation>) {
        if self.root.is_insert() {
            return;
        }
        let (Some(id), Some(version)) = (
            self.root.before_id(),
            self.root.get_long(columns::VERSION),
        ) else {
            return;
        };
        out.push(
            Operation::assert(Collection::Records)
                .with_selector(self.root.id_key(), Reference::Id(id))
                .with_value(columns::VERSION, version),
        );
    }

    /// Pushes the operations that bring the store in line with this delta.
    ///
    /// Operations touching the rows of a stored record are bracketed by updates that suspend
    /// automatic grouping of the record and restore it afterwards. An inserted record is
    /// inserted with grouping suspended, and its rows refer back to the record's insert.
    ///
    /// On error, `out` may hold some of the operations already and must be discarded.
    pub fn build_diff(&mut self, out: &mut Vec<Operation>) -> Result<(), DiffError> {
        let first = out.len();
        let state = self.root.state();
        let is_insert = state == DeltaState::Insert;
        let is_delete = state == DeltaState::Delete;
        let record_id = self.root.before_id();

        if is_insert {
            self.root.put(columns::GROUPING_MODE, GroupingMode::Suspended);
        }
        if let Some(op) = self.root.build_diff(Collection::Records) {
            trace!(%op, "record");
            out.push(op);
        }

        let mut unattached = None;
        // deleting the record removes its rows along with it
        if !is_delete {
            for entry in self.all_entries() {
                let Some(op) = entry.build_diff(Collection::Rows) else {
                    continue;
                };
                let op = if entry.is_insert() {
                    let parent = if is_insert {
                        Reference::BackRef(first)
                    } else {
                        Reference::Id(record_id.ok_or_else(|| missing_record_id(entry))?)
                    };
                    op.with_reference(columns::PARENT_ID, parent)
                } else if is_insert {
                    return Err(DiffError::ChildOfInsertedRecord {
                        type_tag: entry.type_tag().map(str::to_owned),
                        row_id: entry.before_id(),
                    });
                } else {
                    if record_id.is_none() && unattached.is_none() {
                        unattached = Some(missing_record_id(entry));
                    }
                    op
                };
                trace!(%op, "row");
                out.push(op);
            }
        }

        if is_insert {
            out.push(self.grouping_mode(Reference::BackRef(first), GroupingMode::Default));
        } else if !is_delete && out.len() > first {
            let id = record_id.ok_or_else(|| {
                unattached.unwrap_or(DiffError::MissingRecordId {
                    type_tag: None,
                    row_id: None,
                })
            })?;
            out.insert(
                first,
                self.grouping_mode(Reference::Id(id), GroupingMode::Suspended),
            );
            out.push(self.grouping_mode(Reference::Id(id), GroupingMode::Default));
        }

        debug!(
            record = ?record_id,
            ?state,
            operations = out.len() - first,
            "compiled record"
        );
        Ok(())
    }

    fn grouping_mode(&self, record: Reference, mode: GroupingMode) -> Operation {
        Operation::update(Collection::Records)
            .with_selector(self.root.id_key(), record)
            .with_value(columns::GROUPING_MODE, mode)
    }

    /// Replays the edits of `remote` on top of `local`, usually a fresh read of the same record.
    ///
    /// The root merges as described on [`ValueDelta::merge_after`]. Each row of `remote` merges
    /// into the row of `local` with the same identifier; rows without a counterpart are appended
    /// to `local` if the merge leaves anything to replay.
    pub fn merge_after(local: Option<Self>, remote: &Self) -> Option<Self> {
        let mut local = match local {
            Some(local) => local,
            None if remote.root.is_delete() || remote.root.is_transient() => return None,
            None => Self::default(),
        };
        local.merge_from(remote);
        Some(local)
    }

    pub(crate) fn merge_from(&mut self, remote: &Self) {
        self.root.merge_from(&remote.root);
        for remote_entry in remote.all_entries() {
            if let Some(local_entry) = remote_entry.id().and_then(|id| self.entry_mut(id)) {
                local_entry.merge_from(remote_entry);
                continue;
            }
            if let Some(merged) = ValueDelta::merge_after(None, remote_entry) {
                trace!(
                    row = ?remote_entry.id(),
                    tag = ?merged.type_tag(),
                    "replaying row without counterpart"
                );
                self.add_entry(merged);
            }
        }
    }

    fn contains_all(&self, other: &Self) -> bool {
        other.entries.iter().all(|(tag, bucket)| {
            let ours = self.entries(tag);
            bucket.iter().all(|entry| ours.contains(entry))
        })
    }
}

fn missing_record_id(entry: &ValueDelta) -> DiffError {
    DiffError::MissingRecordId {
        type_tag: entry.type_tag().map(str::to_owned),
        row_id: entry.id(),
    }
}

/// Records are equal if their roots are, and every row of either has an equal row in the other.
impl PartialEq for RecordDelta {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.total_entry_count(false) == other.total_entry_count(false)
            && self.contains_all(other)
            && other.contains_all(self)
    }
}

impl From<RecordSnapshot> for RecordDelta {
    fn from(snapshot: RecordSnapshot) -> Self {
        Self::from_before(snapshot)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::RecordDelta;
    use serde::{
        Deserialize, Deserializer, Serialize, Serializer,
        de::{self, SeqAccess, Visitor},
        ser::SerializeSeq,
    };
    use std::fmt;

    /// Serialized as a flat sequence: the number of rows, the root, then every row.
    impl Serialize for RecordDelta {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let count = self.total_entry_count(false);
            let mut seq = serializer.serialize_seq(Some(count + 2))?;
            seq.serialize_element(&count)?;
            seq.serialize_element(&self.root)?;
            for entry in self.all_entries() {
                seq.serialize_element(entry)?;
            }
            seq.end()
        }
    }

    impl<'de> Deserialize<'de> for RecordDelta {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_seq(RecordDeltaVisitor)
        }
    }

    struct RecordDeltaVisitor;

    impl<'de> Visitor<'de> for RecordDeltaVisitor {
        type Value = RecordDelta;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a row count, a root and that many rows")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let count: usize = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(0, &self))?;
            let root = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(1, &self))?;
            let mut delta = RecordDelta::new(root);
            for i in 0..count {
                // rows are re-filed under the tag they carry
                let entry = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(i + 2, &self))?;
                delta.add_entry(entry);
            }
            Ok(delta)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{delta::value::PlaceholderIds, field_map, test_util::init_tracing};

    const TEST_ID: i64 = 10;
    const TEST_PHONE_ID: i64 = 24;

    fn stored() -> RecordSnapshot {
        RecordSnapshot::new(field_map! { "_id" => TEST_ID, "version" => 43i64 })
            .with_row(
                "phone",
                field_map! { "_id" => TEST_PHONE_ID, "data1" => "218-555-1111" },
            )
            .with_row("email", field_map! { "_id" => 25i64, "data1" => "a@b.c" })
    }

    fn rendered(ops: &[Operation]) -> Vec<String> {
        ops.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn rows_are_filed_by_tag() {
        let mut ids = PlaceholderIds::new();
        let mut delta = RecordDelta::from_before(stored());
        assert_eq!(delta.tags().collect::<Vec<_>>(), ["email", "phone"]);
        assert_eq!(delta.entry_count("phone", false), 1);

        delta.add_entry(ValueDelta::from_after(
            field_map! { columns::TYPE_TAG => "phone" },
            &mut ids,
        ));
        delta.add_entry(ValueDelta::from_after(field_map! { "data1" => "x" }, &mut ids));
        assert_eq!(delta.entry_count("phone", true), 2);
        assert_eq!(delta.entries("").len(), 1);
        assert_eq!(delta.total_entry_count(true), 4);

        delta.entry_mut(TEST_PHONE_ID).unwrap().mark_deleted();
        assert_eq!(delta.entry_count("phone", true), 1);
        assert_eq!(delta.total_entry_count(false), 4);
        assert!(delta.entry(-1).is_some_and(ValueDelta::is_insert));
        assert!(!delta.has_entries("im"));
    }

    #[test]
    fn primary_entries() {
        let mut delta = RecordDelta::new(ValueDelta::default());
        let mut ids = PlaceholderIds::new();
        for primary in [false, true, false] {
            delta.add_entry(ValueDelta::from_after(
                field_map! { columns::TYPE_TAG => "phone", columns::IS_PRIMARY => primary },
                &mut ids,
            ));
        }
        assert_eq!(delta.primary_entry("phone").and_then(ValueDelta::id), Some(-2));
        assert_eq!(delta.super_primary_entry("phone", false), None);
        assert_eq!(
            delta.super_primary_entry("phone", true).and_then(ValueDelta::id),
            Some(-2)
        );

        delta.entries_mut("phone")[2].set_super_primary(true);
        assert_eq!(
            delta.super_primary_entry("phone", false).and_then(ValueDelta::id),
            Some(-3)
        );
        assert_eq!(delta.primary_entry("email"), None);
    }

    #[test]
    fn unchanged_record_compiles_to_nothing() {
        let mut delta = RecordDelta::from_before(stored());
        let mut out = Vec::new();
        delta.build_diff(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn assert_needs_id_and_version() {
        let mut out = Vec::new();
        RecordDelta::from_before(stored()).build_assert(&mut out);
        assert_eq!(
            rendered(&out),
            ["assert records where _id=10 {version=43}"]
        );

        out.clear();
        RecordDelta::from_before(RecordSnapshot::new(field_map! { "_id" => 3i64 }))
            .build_assert(&mut out);
        let mut ids = PlaceholderIds::new();
        RecordDelta::new(ValueDelta::from_after(
            field_map! { columns::VERSION => 1i64 },
            &mut ids,
        ))
        .build_assert(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn row_edits_are_bracketed() {
        init_tracing();
        let mut ids = PlaceholderIds::new();
        let mut delta = RecordDelta::from_before(stored());
        delta
            .entry_mut(TEST_PHONE_ID)
            .unwrap()
            .put("data1", "218-555-2222");
        delta.add_entry(ValueDelta::from_after(
            field_map! { columns::TYPE_TAG => "email", "data1" => "x@y.z" },
            &mut ids,
        ));

        let mut out = Vec::new();
        delta.build_diff(&mut out).unwrap();
        assert_eq!(
            rendered(&out),
            [
                "update records where _id=10 {aggregation_mode=2}",
                r#"insert rows {data1="x@y.z", mimetype="email", raw_contact_id=10}"#,
                r#"update rows where _id=24 {data1="218-555-2222"}"#,
                "update records where _id=10 {aggregation_mode=0}",
            ]
        );
    }

    #[test]
    fn inserted_record_refers_back() {
        let mut ids = PlaceholderIds::new();
        let mut out = vec![Operation::assert(Collection::Records)];
        let mut delta = RecordDelta::new(ValueDelta::from_after(
            field_map! { columns::ACCOUNT_NAME => "me" },
            &mut ids,
        ));
        delta.add_entry(ValueDelta::from_after(
            field_map! { columns::TYPE_TAG => "phone", "data1" => "555" },
            &mut ids,
        ));
        delta.build_diff(&mut out).unwrap();
        assert_eq!(
            rendered(&out[1..]),
            [
                r#"insert records {account_name="me", aggregation_mode=2}"#,
                r#"insert rows {data1="555", mimetype="phone", raw_contact_id=#1}"#,
                "update records where _id=#1 {aggregation_mode=0}",
            ]
        );
    }

    #[test]
    fn deleted_record_skips_rows() {
        let mut delta = RecordDelta::from_before(stored());
        delta.entry_mut(TEST_PHONE_ID).unwrap().put("data1", "x");
        delta.root_mut().mark_deleted();
        let mut out = Vec::new();
        delta.build_diff(&mut out).unwrap();
        assert_eq!(rendered(&out), ["delete records where _id=10"]);
    }

    #[test]
    fn stored_row_under_inserted_record_fails() {
        let mut ids = PlaceholderIds::new();
        let mut delta = RecordDelta::new(ValueDelta::from_after(FieldMap::new(), &mut ids));
        delta
            .add_entry(ValueDelta::from_before(
                field_map! { "_id" => 7i64, columns::TYPE_TAG => "phone" },
            ))
            .mark_deleted();
        let err = delta.build_diff(&mut Vec::new()).unwrap_err();
        assert_eq!(
            err,
            DiffError::ChildOfInsertedRecord {
                type_tag: Some("phone".into()),
                row_id: Some(7),
            }
        );
    }

    #[test]
    fn row_insert_needs_record_id() {
        let mut ids = PlaceholderIds::new();
        let mut delta = RecordDelta::default();
        delta.add_entry(ValueDelta::from_after(
            field_map! { columns::TYPE_TAG => "phone" },
            &mut ids,
        ));
        let err = delta.build_diff(&mut Vec::new()).unwrap_err();
        assert_eq!(
            err,
            DiffError::MissingRecordId {
                type_tag: Some("phone".into()),
                row_id: Some(-1),
            }
        );
    }

    #[test]
    fn row_update_needs_record_id() {
        let mut delta = RecordDelta::default();
        delta.add_entry(ValueDelta::from_before(field_map! {
            columns::ID => 24i64,
            columns::TYPE_TAG => "email",
            "data1" => "a@b.c",
        }));
        delta.entry_mut(24).unwrap().put("data1", "c@b.a");
        let err = delta.build_diff(&mut Vec::new()).unwrap_err();
        assert_eq!(
            err,
            DiffError::MissingRecordId {
                type_tag: Some("email".into()),
                row_id: Some(24),
            }
        );
    }

    #[test]
    fn mark_deleted_drops_rows() {
        let mut delta = RecordDelta::from_before(stored());
        delta.mark_deleted();
        assert!(!delta.is_visible());
        assert_eq!(delta.total_entry_count(true), 0);
        assert!(delta.complete_rows().is_empty());
    }

    #[test]
    fn merge_replays_vanished_rows() {
        let mut edits = RecordDelta::from_before(stored());
        edits.entry_mut(TEST_PHONE_ID).unwrap().put("data1", "218-555-2222");

        let mut fresh = RecordSnapshot::new(field_map! { "_id" => TEST_ID, "version" => 44i64 });
        fresh.push_row(field_map! {
            "_id" => 25i64,
            columns::TYPE_TAG => "email",
            "data1" => "a@b.c",
        });
        let mut merged = RecordDelta::merge_after(Some(fresh.into()), &edits).unwrap();
        let phone = &merged.entries("phone")[0];
        assert!(phone.is_insert());
        assert_eq!(phone.get_str("data1"), Some("218-555-2222"));

        let mut out = Vec::new();
        merged.build_assert(&mut out);
        merged.build_diff(&mut out).unwrap();
        assert_eq!(
            rendered(&out),
            [
                "assert records where _id=10 {version=44}",
                "update records where _id=10 {aggregation_mode=2}",
                r#"insert rows {data1="218-555-2222", mimetype="phone", raw_contact_id=10}"#,
                "update records where _id=10 {aggregation_mode=0}",
            ]
        );
    }

    #[test]
    fn merge_onto_nothing() {
        let mut deleted = RecordDelta::from_before(stored());
        deleted.mark_deleted();
        assert_eq!(RecordDelta::merge_after(None, &deleted), None);

        let merged = RecordDelta::merge_after(None, &RecordDelta::from_before(stored())).unwrap();
        assert!(merged.is_insert());
        assert_eq!(merged.total_entry_count(true), 2);
        assert!(merged.all_entries().all(ValueDelta::is_insert));
    }

    #[test]
    fn equality_ignores_row_order() {
        let mut a = RecordDelta::new(ValueDelta::default());
        let mut b = RecordDelta::new(ValueDelta::default());
        let x = ValueDelta::from_before(field_map! { "_id" => 1i64 });
        let y = ValueDelta::from_before(field_map! { "_id" => 2i64 });
        a.add_entry(x.clone());
        a.add_entry(y.clone());
        b.add_entry(y);
        assert_ne!(a, b);
        b.add_entry(x);
        assert_eq!(a, b);
    }

    #[cfg(feature = "json")]
    #[test]
    fn serde_refiles_rows() {
        let mut delta = RecordDelta::from_before(stored());
        delta.entry_mut(TEST_PHONE_ID).unwrap().put("data1", "x");
        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.starts_with("[2,"));
        let back: RecordDelta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, delta);
        assert_eq!(back.tags().collect::<Vec<_>>(), ["email", "phone"]);
        assert!(back.entry(TEST_PHONE_ID).is_some_and(ValueDelta::is_update));
    }

    #[quickcheck]
    fn merging_a_fresh_read_is_identity(snapshot: RecordSnapshot) -> bool {
        let delta = RecordDelta::from_before(snapshot);
        RecordDelta::merge_after(Some(delta.clone()), &delta).as_ref() == Some(&delta)
    }

    #[quickcheck]
    fn unedited_records_compile_to_nothing(snapshot: RecordSnapshot) -> bool {
        let mut delta = RecordDelta::from_before(snapshot);
        let mut out = Vec::new();
        delta.build_diff(&mut out).is_ok() && out.is_empty()
    }
}
