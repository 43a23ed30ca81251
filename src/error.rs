// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use std::fmt;

/// Error returned when a delta cannot be compiled into a consistent batch of operations.
///
/// These indicate a programming or data error in how the delta was assembled, not a concurrency
/// conflict. A batch that failed to compile must not be submitted, not even partially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// A row would update or delete stored data underneath a record that is itself being
    /// inserted, so there is no stored parent for the row to belong to.
    ChildOfInsertedRecord {
        type_tag: Option<String>,
        row_id: Option<i64>,
    },

    /// An operation has to address the record by identifier, but the record has none. Names the
    /// row that needed it.
    MissingRecordId {
        type_tag: Option<String>,
        row_id: Option<i64>,
    },
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffError::ChildOfInsertedRecord { type_tag, row_id } => write!(
                f,
                "row {} of type {} must be inserted when its record is inserted",
                OrUnknown(row_id),
                OrUnknown(type_tag)
            ),
            DiffError::MissingRecordId { type_tag, row_id } => write!(
                f,
                "record has no identifier for row {} of type {}",
                OrUnknown(row_id),
                OrUnknown(type_tag)
            ),
        }
    }
}

impl std::error::Error for DiffError {}

struct OrUnknown<'a, T>(&'a Option<T>);

impl<T: fmt::Display> fmt::Display for OrUnknown<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => v.fmt(f),
            None => f.write_str("<unknown>"),
        }
    }
}
