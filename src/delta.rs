// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Deltas between what the store holds and what the caller wants it to hold.
//!
//! Three levels nest inside each other:
//!
//! - [`ValueDelta`] tracks a single record or row as a `before` snapshot and an `after` overlay.
//! - [`RecordDelta`] is a root [`ValueDelta`] together with its child rows, grouped by type tag.
//! - [`RecordDeltaList`] is an ordered set of records that are edited, and grouped, together.
//!
//! Each level can be compiled into store [`Operation`](crate::Operation)s with `build_diff`, and
//! each level can replay edits onto a fresh read of the store with `merge_after`. The latter is
//! what a caller does after the store rejected a batch because a version assert failed:
//!
//! ```rust
//! use rowdelta::{RecordDeltaList, RecordSnapshot, field_map};
//!
//! let read = || {
//!     RecordSnapshot::new(field_map! { "_id" => 10i64, "version" => 43i64 }).with_row(
//!         "phone",
//!         field_map! { "_id" => 24i64, "data1" => "218-555-1111" },
//!     )
//! };
//!
//! // the user edits their copy
//! let mut edits: RecordDeltaList = std::iter::once(read()).collect();
//! if let Some(row) = edits[0].entry_mut(24) {
//!     row.put("data1", "218-555-2222");
//! }
//!
//! // ... the store rejects the batch, so re-read and replay the edits
//! let fresh: RecordDeltaList = std::iter::once(read()).collect();
//! let mut merged = RecordDeltaList::merge_after(Some(fresh), &edits);
//! let batch = merged.build_diff().unwrap();
//! assert_eq!(batch.len(), 4);
//! ```
pub mod list;
pub mod record;
pub mod value;

pub use list::RecordDeltaList;
pub use record::{RecordDelta, RecordSnapshot};
pub use value::{DeltaState, PlaceholderIds, ValueDelta};
