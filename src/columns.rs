// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Well-known column names and enumerated column values.
//!
//! These are the only columns the engine itself reads or writes. Every other column is opaque
//! payload that flows from the before-snapshot, through user edits, into compiled operations.
use crate::fields::FieldValue;

/// Default identifier column of both records and rows.
pub const ID: &str = "_id";

/// Record column holding the optimistic-concurrency version.
pub const VERSION: &str = "version";

/// Record column controlling whether the store may automatically group the record with others.
pub const GROUPING_MODE: &str = "aggregation_mode";

pub const ACCOUNT_NAME: &str = "account_name";
pub const ACCOUNT_TYPE: &str = "account_type";
pub const DATA_SET: &str = "data_set";

/// Row column holding the type tag (the row family, e.g. phone or email).
pub const TYPE_TAG: &str = "mimetype";

/// Row column referencing the identifier of the owning record.
pub const PARENT_ID: &str = "raw_contact_id";

pub const IS_PRIMARY: &str = "is_primary";
pub const IS_SUPER_PRIMARY: &str = "is_super_primary";

/// Grouping rule column holding a [`RuleKind`].
pub const RULE_KIND: &str = "type";
/// Grouping rule column holding the first record of the pair.
pub const RULE_FIRST: &str = "raw_contact_id1";
/// Grouping rule column holding the second record of the pair.
pub const RULE_SECOND: &str = "raw_contact_id2";

/// Values of the [`GROUPING_MODE`] column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[repr(i32)]
pub enum GroupingMode {
    /// The store groups the record as it sees fit.
    Default = 0,
    Immediate = 1,
    /// Grouping is paused until the mode is set back.
    Suspended = 2,
    Disabled = 3,
}

impl From<GroupingMode> for FieldValue {
    fn from(value: GroupingMode) -> Self {
        FieldValue::Int(value as i32)
    }
}

impl TryFrom<i64> for GroupingMode {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => GroupingMode::Default,
            1 => GroupingMode::Immediate,
            2 => GroupingMode::Suspended,
            3 => GroupingMode::Disabled,
            _ => return Err(value),
        })
    }
}

/// Values of the [`RULE_KIND`] column of a grouping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[repr(i32)]
pub enum RuleKind {
    Automatic = 0,
    /// Both records must end up in the same aggregate.
    KeepTogether = 1,
    /// The records must never share an aggregate.
    KeepSeparate = 2,
}

impl From<RuleKind> for FieldValue {
    fn from(value: RuleKind) -> Self {
        FieldValue::Int(value as i32)
    }
}

impl TryFrom<i64> for RuleKind {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => RuleKind::Automatic,
            1 => RuleKind::KeepTogether,
            2 => RuleKind::KeepSeparate,
            _ => return Err(value),
        })
    }
}
