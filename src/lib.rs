// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # rowdelta: Change Tracking and Diff Compilation for Record/Row Snapshots
//!
//! This crate reconciles a client-held, possibly edited, copy of structured records against the
//! authoritative record store. A record (for example a contact) is a root row plus any number of
//! typed child rows (phone numbers, email addresses, names, ...). The crate tracks what the caller
//! changed, compiles those changes into a minimal and safely ordered [`Batch`] of store
//! [`Operation`]s, and, when the store reports that the records changed underneath the caller,
//! re-parents the pending edits onto a fresh read.
//!
//! ## Core Concepts
//!
//! - [`ValueDelta`]: a single record or row as a `before` snapshot (what the store holds) and an
//!   `after` overlay (what the caller wants). Whether the pair describes an insert, update,
//!   delete or nothing at all follows from which of the two is present; see [`DeltaState`].
//! - [`RecordDelta`]: a root [`ValueDelta`] and its child rows, grouped by type tag.
//! - [`RecordDeltaList`]: the records that are edited together, along with pending requests to
//!   split them apart or join them with other records.
//!
//! ## Optimistic Concurrency
//!
//! Every compiled batch starts with one assert per stored record, checking that the record's
//! `version` column still holds the value that was read. If any assert fails the store rejects
//! the whole batch. The caller then re-reads the records and calls
//! [`RecordDeltaList::merge_after`], which replays the pending edits onto the fresh read:
//!
//! ```rust
//! use rowdelta::{RecordDeltaList, RecordSnapshot, field_map};
//!
//! let mut edits: RecordDeltaList = std::iter::once(RecordSnapshot::new(
//!     field_map! { "_id" => 10i64, "version" => 1i64, "starred" => 0 },
//! ))
//! .collect();
//! edits[0].root_mut().put("starred", 1);
//!
//! // someone else bumped the version in the meantime
//! let fresh: RecordDeltaList = std::iter::once(RecordSnapshot::new(
//!     field_map! { "_id" => 10i64, "version" => 2i64, "starred" => 0 },
//! ))
//! .collect();
//! let mut merged = RecordDeltaList::merge_after(Some(fresh), &edits);
//! let batch = merged.build_diff().unwrap();
//! assert_eq!(
//!     batch.to_string(),
//!     "0: assert records where _id=10 {version=2}\n\
//!      1: update records where _id=10 {aggregation_mode=2}\n\
//!      2: update records where _id=10 {starred=1}\n\
//!      3: update records where _id=10 {aggregation_mode=0}"
//! );
//! ```
//!
//! ## Grouping
//!
//! The store aggregates records into groups on its own. While a batch changes rows that could
//! influence that grouping, automatic grouping of the affected record is suspended and restored
//! afterwards, and records of one list are bound together (or, when split, kept apart) with
//! explicit grouping rules.
//!
//! ## Schema-driven Editing
//!
//! The [`schema`] module describes which kinds of rows an account type supports and how many of
//! each a record may hold. The [`modifier`] module and [`TypeSelector`] apply those rules when
//! rows are added, and drop rows that were edited into emptiness before a batch is compiled.
//!
//! ## Scope of this Crate
//!
//! **It does not talk to any store.** Reading snapshots, executing batches and resolving
//! [`Reference::BackRef`]s to the identifiers produced by earlier inserts of a batch is up to the
//! caller.
//!
//! ## Features
//!
//! - `json`: Enables conversion of field maps and operations to `serde_json::Value`, and loading
//!   schemas from JSON. This feature is enabled by default.
//! - `serde`: Provides `serde` support for field maps, deltas, operations and schema data.
//! - `arbitrary`: Implements `quickcheck::Arbitrary` for field values, field maps and record
//!   snapshots, useful for property-based testing.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

use ahash::RandomState;
use std::collections::{HashMap, HashSet};

pub mod columns;
pub use columns::{GroupingMode, RuleKind};
pub mod delta;
pub use delta::{
    DeltaState, PlaceholderIds, RecordDelta, RecordDeltaList, RecordSnapshot, ValueDelta,
};
mod error;
pub use error::DiffError;
pub mod fields;
pub use fields::{FieldMap, FieldValue};
#[cfg(feature = "json")]
mod json;
/// Macros usable for tests and initialization
pub mod macros;
pub mod modifier;
pub mod operation;
pub use operation::{Batch, Collection, Operation, OperationKind, Reference, Selector};
pub mod schema;
pub use schema::{AccountType, AccountTypeProvider, AccountTypes, DataKind, EditField, EditType};
pub mod selector;
pub use selector::{TypeFrequencies, TypeSelector};
#[cfg(any(test, feature = "arbitrary"))]
mod test_util;

/// Hash map used for the short-lived lookup tables of the crate.
pub(crate) type FastMap<K, V> = HashMap<K, V, RandomState>;

fn create_map<K, V>() -> FastMap<K, V> {
    HashMap::with_hasher(RandomState::new())
}

fn create_set<T>() -> HashSet<T, RandomState> {
    HashSet::with_hasher(RandomState::new())
}
