// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use crate::{
    columns,
    fields::{FieldMap, FieldValue},
    operation::{Collection, Operation, Reference},
};
use std::collections::BTreeSet;

/// What compiling a [`ValueDelta`] would do to the store.
///
/// Every delta is in exactly one state, see [`ValueDelta::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaState {
    /// Never stored and already dropped again. Compiles to nothing.
    Transient,
    Insert,
    Delete,
    /// Stored, with pending edits. Compiles to an update of the fields that changed, if any.
    Update,
    /// Stored, with no edits.
    NoOp,
}

impl DeltaState {
    /// Whether the row exists in the store before the delta is applied.
    pub fn exists_before(self) -> bool {
        matches!(self, Self::Delete | Self::Update | Self::NoOp)
    }
}

/// Allocator of placeholder identifiers for rows that have not been inserted yet.
///
/// Placeholders are negative and strictly decreasing, so they never collide with identifiers the
/// store hands out. They are stripped before an insert is compiled, but allow looking up a fresh
/// row by identifier in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderIds {
    next: i64,
}

impl Default for PlaceholderIds {
    fn default() -> Self {
        Self { next: -1 }
    }
}

impl PlaceholderIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused placeholder.
    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next -= 1;
        id
    }
}

/// Change tracking for a single record or row.
///
/// `before` is the state as last read from the store, `after` is an overlay of the edits made
/// since. Reads look at `after` first and fall back to `before`. The delta is *stored* when
/// `before` carries the identifier column, and *visible* while `after` is present; see
/// [`DeltaState`] for how the two combine.
#[derive(Debug, Clone)]
pub struct ValueDelta {
    before: Option<FieldMap>,
    after: Option<FieldMap>,
    id_key: String,
    from_template: bool,
}

impl Default for ValueDelta {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
            id_key: columns::ID.to_owned(),
            from_template: false,
        }
    }
}

impl ValueDelta {
    /// Starts tracking a row as read from the store.
    pub fn from_before(before: FieldMap) -> Self {
        Self {
            before: Some(before),
            after: Some(FieldMap::new()),
            ..Self::default()
        }
    }

    /// Starts tracking a row that is to be inserted.
    ///
    /// The row is given a placeholder identifier from `ids`.
    pub fn from_after(mut after: FieldMap, ids: &mut PlaceholderIds) -> Self {
        let mut delta = Self::default();
        after.put(delta.id_key.clone(), ids.next_id());
        delta.after = Some(after);
        delta
    }

    /// Uses `id_key` rather than [`columns::ID`] as the identifier column.
    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }

    pub fn before(&self) -> Option<&FieldMap> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&FieldMap> {
        self.after.as_ref()
    }

    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// The identifier, which is a placeholder for rows that are yet to be inserted.
    pub fn id(&self) -> Option<i64> {
        self.get_long(&self.id_key)
    }

    /// The identifier as stored.
    pub fn before_id(&self) -> Option<i64> {
        self.before.as_ref()?.get_long(&self.id_key)
    }

    pub fn before_exists(&self) -> bool {
        self.before
            .as_ref()
            .is_some_and(|before| before.contains_key(&self.id_key))
    }

    pub fn state(&self) -> DeltaState {
        match (self.before_exists(), &self.after) {
            (false, None) => DeltaState::Transient,
            (false, Some(_)) => DeltaState::Insert,
            (true, None) => DeltaState::Delete,
            (true, Some(after)) if after.is_empty() => DeltaState::NoOp,
            (true, Some(_)) => DeltaState::Update,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.state() == DeltaState::Insert
    }

    pub fn is_delete(&self) -> bool {
        self.state() == DeltaState::Delete
    }

    pub fn is_update(&self) -> bool {
        self.state() == DeltaState::Update
    }

    pub fn is_noop(&self) -> bool {
        self.state() == DeltaState::NoOp
    }

    pub fn is_transient(&self) -> bool {
        self.state() == DeltaState::Transient
    }

    /// A row is visible until it is marked deleted.
    pub fn is_visible(&self) -> bool {
        self.after.is_some()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.after
            .as_ref()
            .and_then(|after| after.get(key))
            .or_else(|| self.before.as_ref().and_then(|before| before.get(key)))
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(FieldValue::as_long)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(FieldValue::as_bytes)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The type tag of a row.
    pub fn type_tag(&self) -> Option<&str> {
        self.get_str(columns::TYPE_TAG)
    }

    pub fn is_primary(&self) -> bool {
        self.get_long(columns::IS_PRIMARY).is_some_and(|v| v != 0)
    }

    pub fn is_super_primary(&self) -> bool {
        self.get_long(columns::IS_SUPER_PRIMARY).is_some_and(|v| v != 0)
    }

    pub fn set_super_primary(&mut self, super_primary: bool) {
        self.put(columns::IS_SUPER_PRIMARY, super_primary);
    }

    /// Rows created from a template (rather than by the user) do not count as content of their
    /// record until they are edited.
    pub fn is_from_template(&self) -> bool {
        self.from_template
    }

    pub fn set_from_template(&mut self, from_template: bool) {
        self.from_template = from_template;
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.after.get_or_insert_with(FieldMap::new).put(key, value);
    }

    pub fn put_null(&mut self, key: impl Into<String>) {
        self.after.get_or_insert_with(FieldMap::new).put_null(key);
    }

    /// Drops the row. A stored row compiles to a delete from now on, any other row to nothing.
    ///
    /// There is no way back: a later [`ValueDelta::put`] starts a fresh set of edits on top of
    /// `before`, it does not restore the edits made so far.
    pub fn mark_deleted(&mut self) {
        self.after = None;
    }

    /// True if `after` holds `key` with a value different from `before`.
    pub fn is_changed(&self, key: &str) -> bool {
        let Some(new) = self.after.as_ref().and_then(|after| after.get(key)) else {
            return false;
        };
        match self.before.as_ref().and_then(|before| before.get(key)) {
            None => !new.is_null(),
            Some(old) => old != new,
        }
    }

    /// True if compiling the delta as an update would write anything.
    pub fn has_changes(&self) -> bool {
        self.after
            .as_ref()
            .is_some_and(|after| after.keys().any(|key| self.is_changed(key)))
    }

    /// `before` overlaid with `after`.
    pub fn complete_values(&self) -> FieldMap {
        let mut values = self.before.clone().unwrap_or_default();
        if let Some(after) = &self.after {
            values.put_all(after);
        }
        values
    }

    /// Every key present in either `before` or `after`.
    pub fn keys(&self) -> BTreeSet<&str> {
        self.before
            .iter()
            .chain(self.after.iter())
            .flat_map(FieldMap::keys)
            .collect()
    }

    fn subset_of(&self, other: &Self) -> bool {
        self.keys()
            .into_iter()
            .all(|key| self.get(key) == other.get(key))
    }

    /// Replays the edits of `remote` on top of `local`, usually a fresh read of the same row.
    ///
    /// The `before` of `local` survives; the `after` of `remote` replaces its `after`. If `local`
    /// is not stored (any longer), the complete state of `remote` is replayed instead, which
    /// re-inserts a row that was edited but has been deleted from the store in the meantime.
    ///
    /// Returns `None` if there is nothing to replay onto a missing `local`.
    pub fn merge_after(local: Option<Self>, remote: &Self) -> Option<Self> {
        let mut local = match local {
            Some(local) => local,
            None if remote.is_delete() || remote.is_transient() => return None,
            None => Self {
                id_key: remote.id_key.clone(),
                ..Self::default()
            },
        };
        local.merge_from(remote);
        Some(local)
    }

    pub(crate) fn merge_from(&mut self, remote: &Self) {
        if self.before_exists() {
            self.after = remote.after.clone();
        } else {
            self.after = Some(remote.complete_values());
        }
    }

    /// Compiles the delta into at most one operation on `collection`.
    pub fn build_diff(&self, collection: Collection) -> Option<Operation> {
        match self.state() {
            DeltaState::Insert => {
                let mut values = self.after.clone()?;
                values.remove(&self.id_key);
                Some(Operation::insert(collection).with_values(values))
            }
            DeltaState::Delete => Some(
                Operation::delete(collection)
                    .with_selector(self.id_key.clone(), Reference::Id(self.before_id()?)),
            ),
            DeltaState::Update => {
                let changed: FieldMap = self
                    .after
                    .as_ref()?
                    .iter()
                    .filter(|(key, _)| self.is_changed(key))
                    .map(|(key, value)| (key, value.clone()))
                    .collect();
                if changed.is_empty() {
                    return None;
                }
                Some(
                    Operation::update(collection)
                        .with_selector(self.id_key.clone(), Reference::Id(self.before_id()?))
                        .with_values(changed),
                )
            }
            DeltaState::Transient | DeltaState::NoOp => None,
        }
    }
}

/// Two deltas are equal if they read the same for every key either of them holds.
impl PartialEq for ValueDelta {
    fn eq(&self, other: &Self) -> bool {
        self.subset_of(other) && other.subset_of(self)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::ValueDelta;
    use crate::fields::FieldMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialized as the tuple `(before, after, id_key)`.
    impl Serialize for ValueDelta {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            (&self.before, &self.after, &self.id_key).serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for ValueDelta {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let (before, after, id_key) =
                <(Option<FieldMap>, Option<FieldMap>, String)>::deserialize(deserializer)?;
            Ok(Self {
                before,
                after,
                id_key,
                from_template: false,
            })
        }
    }
}
