// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Choosing the type of a new row.
//!
//! When a row of some [`DataKind`] is added to a record, it should be labelled with the most
//! preferred [`EditType`] the record is still allowed to hold, and preferably one the record does
//! not hold yet. Limits are counted over visible rows only.
use crate::{
    FastMap, create_map,
    delta::{RecordDelta, ValueDelta},
    schema::{DataKind, EditType},
};

/// How often each type of a [`DataKind`] occurs among the visible rows of a record.
#[derive(Debug, Clone, Default)]
pub struct TypeFrequencies {
    per_type: FastMap<i64, usize>,
    total: usize,
}

impl TypeFrequencies {
    /// The number of visible rows labelled with `raw_value`.
    pub fn count(&self, raw_value: i64) -> usize {
        self.per_type.get(&raw_value).copied().unwrap_or(0)
    }

    /// The number of visible rows of the kind, labelled or not.
    pub fn total(&self) -> usize {
        self.total
    }
}

/// Picks types for the rows of one [`DataKind`].
#[derive(Debug, Clone, Copy)]
pub struct TypeSelector<'k> {
    kind: &'k DataKind,
}

impl<'k> TypeSelector<'k> {
    pub fn new(kind: &'k DataKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &'k DataKind {
        self.kind
    }

    pub fn has_edit_types(&self) -> bool {
        self.kind.has_edit_types()
    }

    /// The type `entry` is currently labelled with.
    pub fn current_type(&self, entry: &ValueDelta) -> Option<&'k EditType> {
        let type_column = self.kind.type_column.as_deref()?;
        self.kind.type_for(entry.get_long(type_column)?)
    }

    pub fn type_frequencies(&self, record: &RecordDelta) -> TypeFrequencies {
        let mut frequencies = TypeFrequencies {
            per_type: create_map(),
            total: 0,
        };
        for entry in record.entries(&self.kind.mime_type) {
            if !entry.is_visible() {
                continue;
            }
            frequencies.total += 1;
            if let Some(edit_type) = self.current_type(entry) {
                *frequencies.per_type.entry(edit_type.raw_value).or_default() += 1;
            }
        }
        frequencies
    }

    /// The types a new row of `record` may still be labelled with, in order of preference.
    ///
    /// `force_include` is part of the result even when it is otherwise exhausted, which is useful
    /// when offering a choice that includes the current type of an existing row.
    pub fn valid_types(
        &self,
        record: &RecordDelta,
        force_include: Option<&EditType>,
        include_secondary: bool,
    ) -> Vec<&'k EditType> {
        self.valid_types_with(&self.type_frequencies(record), force_include, include_secondary)
    }

    fn valid_types_with(
        &self,
        frequencies: &TypeFrequencies,
        force_include: Option<&EditType>,
        include_secondary: bool,
    ) -> Vec<&'k EditType> {
        let valid_overall = self
            .kind
            .type_overall_max
            .is_none_or(|max| frequencies.total() < max);
        self.kind
            .type_list
            .iter()
            .filter(|&edit_type| {
                let valid_specific = edit_type
                    .specific_max
                    .is_none_or(|max| frequencies.count(edit_type.raw_value) < max);
                let valid_secondary = include_secondary || !edit_type.secondary;
                force_include == Some(edit_type)
                    || (valid_overall && valid_specific && valid_secondary)
            })
            .collect()
    }

    /// The best type for a new row of `record`.
    ///
    /// A valid type with raw value `exact` wins outright. Otherwise this is the most preferred
    /// valid type that `record` does not hold yet, or the least preferred valid type if it holds
    /// all of them already. Returns `None` for kinds without types and when no type is valid.
    pub fn best_valid_type(
        &self,
        record: &RecordDelta,
        include_secondary: bool,
        exact: Option<i64>,
    ) -> Option<&'k EditType> {
        self.kind.type_column.as_ref()?;
        let frequencies = self.type_frequencies(record);
        let valid = self.valid_types_with(&frequencies, None, include_secondary);
        let last = *valid.last()?;

        if let Some(exact) = valid
            .iter()
            .find(|edit_type| Some(edit_type.raw_value) == exact)
        {
            return Some(exact);
        }
        valid
            .into_iter()
            .find(|edit_type| frequencies.count(edit_type.raw_value) == 0)
            .or(Some(last))
    }

    /// The type for a new row of `record`: primary types are preferred over secondary ones.
    pub fn select(&self, record: &RecordDelta) -> Option<&'k EditType> {
        self.best_valid_type(record, false, None)
            .or_else(|| self.best_valid_type(record, true, None))
    }
}
