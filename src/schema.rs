// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Schema data describing which row families a record may hold.
//!
//! A schema is plain data: an [`AccountType`] lists the [`DataKind`]s (row families, identified by
//! their type tag) records of that account type support, and each kind lists the sub-types a row
//! may be labelled with ([`EditType`]) together with the limits on how many rows of each may
//! exist. The engine only ever reads a schema, through an [`AccountTypeProvider`].
use crate::fields::{FieldMap, FieldValue};

/// A sub-type a row of some [`DataKind`] may be labelled with, like "home" or "work".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EditType {
    /// The value stored in the kind's type column.
    pub raw_value: i64,
    pub label: String,
    /// Secondary types are only offered once no primary type is left.
    pub secondary: bool,
    /// How many visible rows of this type a record may hold. Unlimited if `None`.
    pub specific_max: Option<usize>,
}

impl EditType {
    pub fn new(raw_value: i64, label: impl Into<String>) -> Self {
        Self {
            raw_value,
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn secondary(mut self) -> Self {
        self.secondary = true;
        self
    }

    pub fn with_specific_max(mut self, max: usize) -> Self {
        self.specific_max = Some(max);
        self
    }
}

/// A column of a [`DataKind`] the user can edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EditField {
    pub column: String,
    pub label: String,
    pub optional: bool,
}

impl EditField {
    pub fn new(column: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            label: label.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A family of rows, identified by the type tag its rows carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DataKind {
    pub mime_type: String,
    /// The column holding the [`EditType::raw_value`] of a row. Kinds without one have no types.
    pub type_column: Option<String>,
    /// How many visible rows of this kind a record may hold. Unlimited if `None`.
    pub type_overall_max: Option<usize>,
    /// Types in order of preference.
    pub type_list: Vec<EditType>,
    pub fields: Vec<EditField>,
    /// Values every newly inserted row of this kind starts out with.
    pub default_values: FieldMap,
    /// Rows of this kind that are created on the user's behalf start out as templates, see
    /// [`ValueDelta::is_from_template`](crate::ValueDelta::is_from_template).
    pub template_rows: bool,
}

impl DataKind {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            ..Self::default()
        }
    }

    pub fn with_type_column(mut self, column: impl Into<String>) -> Self {
        self.type_column = Some(column.into());
        self
    }

    pub fn with_overall_max(mut self, max: usize) -> Self {
        self.type_overall_max = Some(max);
        self
    }

    pub fn with_type(mut self, edit_type: EditType) -> Self {
        self.type_list.push(edit_type);
        self
    }

    pub fn with_field(mut self, field: EditField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.default_values.put(key, value);
        self
    }

    pub fn with_template_rows(mut self) -> Self {
        self.template_rows = true;
        self
    }

    /// True if rows of this kind are labelled with one of several types.
    pub fn has_edit_types(&self) -> bool {
        !self.type_list.is_empty()
    }

    /// The type with the given raw value.
    pub fn type_for(&self, raw_value: i64) -> Option<&EditType> {
        self.type_list
            .iter()
            .find(|edit_type| edit_type.raw_value == raw_value)
    }

    /// Position of the given type in order of preference, lower is preferred.
    pub fn type_precedence(&self, raw_value: i64) -> Option<usize> {
        self.type_list
            .iter()
            .position(|edit_type| edit_type.raw_value == raw_value)
    }
}

/// The schema of all records that belong to one kind of account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AccountType {
    pub account_type: Option<String>,
    pub data_set: Option<String>,
    /// Whether records of this account type may be edited at all.
    pub writable: bool,
    /// Supported kinds, in display order.
    pub kinds: Vec<DataKind>,
}

impl AccountType {
    pub fn new(account_type: Option<&str>, data_set: Option<&str>) -> Self {
        Self {
            account_type: account_type.map(str::to_owned),
            data_set: data_set.map(str::to_owned),
            ..Self::default()
        }
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    pub fn with_kind(mut self, kind: DataKind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn kind_for(&self, mime_type: &str) -> Option<&DataKind> {
        self.kinds.iter().find(|kind| kind.mime_type == mime_type)
    }

    fn matches(&self, account_type: Option<&str>, data_set: Option<&str>) -> bool {
        self.account_type.as_deref() == account_type && self.data_set.as_deref() == data_set
    }
}

/// Source of [`AccountType`]s, keyed by account type and data set.
pub trait AccountTypeProvider {
    fn account_type(
        &self,
        account_type: Option<&str>,
        data_set: Option<&str>,
    ) -> Option<&AccountType>;
}

/// An in-memory registry of account types.
///
/// Lookups that match no registered account type return the fallback, if one is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AccountTypes {
    types: Vec<AccountType>,
    fallback: Option<AccountType>,
}

impl AccountTypes {
    pub fn new(types: Vec<AccountType>) -> Self {
        Self {
            types,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: AccountType) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountType> {
        self.types.iter()
    }

    /// Loads a registry from its JSON representation.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl AccountTypeProvider for AccountTypes {
    fn account_type(
        &self,
        account_type: Option<&str>,
        data_set: Option<&str>,
    ) -> Option<&AccountType> {
        self.types
            .iter()
            .find(|candidate| candidate.matches(account_type, data_set))
            .or(self.fallback.as_ref())
    }
}
