// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{
    record::{RecordDelta, RecordSnapshot},
    value::ValueDelta,
};
use crate::{
    columns::RuleKind,
    create_set,
    error::DiffError,
    operation::{Batch, Operation, Reference},
    schema::AccountTypeProvider,
};
use std::ops::{Deref, DerefMut};
use tracing::{debug, trace};

/// Records that are edited, and saved, together.
///
/// Besides compiling each member, [`RecordDeltaList::build_diff`] emits the grouping rules that
/// decide which members the store aggregates into one: by default every inserted member is kept
/// together with the others, [`RecordDeltaList::mark_for_splitting`] keeps every pair of members
/// apart instead, and [`RecordDeltaList::set_join_with`] pulls further stored records in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDeltaList {
    members: Vec<RecordDelta>,
    split: bool,
    join_with: Option<Vec<i64>>,
}

impl RecordDeltaList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, member: RecordDelta) {
        self.members.push(member);
    }

    pub fn into_inner(self) -> Vec<RecordDelta> {
        self.members
    }

    /// The identifier of the first member that is stored, which the other members are bound to.
    pub fn find_root_id(&self) -> Option<i64> {
        self.members.iter().find_map(RecordDelta::stored_id)
    }

    /// The identifier of the member at `index`, as long as that member is visible.
    pub fn record_id(&self, index: usize) -> Option<i64> {
        let member = self.members.get(index)?;
        if member.is_visible() {
            member.record_id()
        } else {
            None
        }
    }

    /// Finds the visible member stored under `id`.
    pub fn index_of_record_id(&self, id: i64) -> Option<usize> {
        if id < 0 {
            return None;
        }
        (0..self.members.len()).find(|&index| self.record_id(index) == Some(id))
    }

    pub fn by_record_id(&self, id: i64) -> Option<&RecordDelta> {
        self.index_of_record_id(id).map(|index| &self.members[index])
    }

    pub fn by_record_id_mut(&mut self, id: i64) -> Option<&mut RecordDelta> {
        self.index_of_record_id(id)
            .map(|index| &mut self.members[index])
    }

    /// The super-primary row of `tag` across all members.
    ///
    /// Falls back to the first primary row, and then to the first row that is not primary.
    pub fn super_primary_entry(&self, tag: &str) -> Option<&ValueDelta> {
        let mut primary = None;
        let mut any = None;
        for entry in self.members.iter().flat_map(|member| member.entries(tag)) {
            if entry.is_super_primary() {
                return Some(entry);
            } else if primary.is_none() && entry.is_primary() {
                primary = Some(entry);
            } else if any.is_none() {
                any = Some(entry);
            }
        }
        primary.or(any)
    }

    /// The index of the first member whose account type accepts writes.
    pub fn index_of_first_writable<P>(&self, provider: &P) -> Option<usize>
    where
        P: AccountTypeProvider + ?Sized,
    {
        self.members.iter().position(|member| {
            member
                .account_type_in(provider)
                .is_some_and(|account_type| account_type.writable)
        })
    }

    /// Keeps every pair of members apart on the next save.
    pub fn mark_for_splitting(&mut self) {
        self.split = true;
    }

    pub fn is_marked_for_splitting(&self) -> bool {
        self.split
    }

    /// Binds the records stored under `ids` to this list's aggregate on the next save.
    pub fn set_join_with(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.join_with = Some(ids.into_iter().collect());
    }

    pub fn join_with(&self) -> Option<&[i64]> {
        self.join_with.as_deref()
    }

    pub fn is_marked_for_joining(&self) -> bool {
        self.join_with.as_ref().is_some_and(|ids| !ids.is_empty())
    }

    /// Compiles every member, plus the grouping rules between them, into one batch.
    ///
    /// Every stored member is asserted to still have the version it was read with, and those
    /// asserts come first. If nothing but asserts would be submitted, the batch is empty.
    ///
    /// On error, nothing must be submitted.
    pub fn build_diff(&mut self) -> Result<Batch, DiffError> {
        let root_id = self.find_root_id();
        let mut diff = Vec::new();

        for member in &self.members {
            member.build_assert(&mut diff);
        }
        let assert_mark = diff.len();

        let mut back_refs = Vec::with_capacity(self.members.len());
        let mut joined = create_set();
        let mut anchor = None;
        for member in &mut self.members {
            let first_batch = diff.len();
            let is_insert = member.is_insert();
            back_refs.push(is_insert.then_some(first_batch));
            member.build_diff(&mut diff)?;

            if let Some(join_with) = &self.join_with {
                let target = match root_id {
                    Some(id) => Some(Reference::Id(id)),
                    None => is_insert.then_some(Reference::BackRef(first_batch)),
                };
                if let Some(target) = target {
                    // the store rejects keeping a record together with itself
                    for &id in join_with.iter().filter(|&&id| Some(id) != root_id) {
                        if joined.insert((id, target)) {
                            trace!(joined = id, %target, "join");
                            diff.push(keep_together(Reference::Id(id), target));
                        }
                    }
                }
            }

            if !is_insert || self.split {
                continue;
            }
            match (root_id, anchor) {
                (Some(id), _) => {
                    diff.push(keep_together(Reference::Id(id), Reference::BackRef(first_batch)));
                }
                (None, None) => anchor = Some(first_batch),
                (None, Some(anchor_batch)) => {
                    diff.push(keep_together(
                        Reference::BackRef(anchor_batch),
                        Reference::BackRef(first_batch),
                    ));
                }
            }
        }

        if self.split {
            self.build_split_rules(&mut diff, &back_refs);
        }

        if diff.len() == assert_mark {
            diff.clear();
        }
        debug!(
            members = self.members.len(),
            root = ?root_id,
            split = self.split,
            operations = diff.len(),
            "compiled record list"
        );
        Ok(Batch::new(diff))
    }

    fn build_split_rules(&self, diff: &mut Vec<Operation>, back_refs: &[Option<usize>]) {
        // inserted members are addressed by their insert, even when re-inserted after a merge
        let reference = |index: usize| match back_refs[index] {
            Some(first_batch) => Some(Reference::BackRef(first_batch)),
            None => self.members[index].stored_id().map(Reference::Id),
        };
        for i in 0..self.members.len() {
            for j in (0..self.members.len()).filter(|&j| j != i) {
                match (reference(i), reference(j)) {
                    (Some(first), Some(second)) => diff.push(Operation::grouping_rule(
                        RuleKind::KeepSeparate,
                        first,
                        second,
                    )),
                    // neither stored nor inserted, so there is nothing to keep apart
                    _ => trace!(i, j, "skipping split of unidentified members"),
                }
            }
        }
    }

    /// Replays the edits of `remote` on top of `local`, usually a fresh read of the same records.
    ///
    /// Each member of `remote` merges into the visible member of `local` with the same stored
    /// identifier, as described on [`RecordDelta::merge_after`]. Members without a counterpart
    /// are appended to `local` if the merge leaves anything to replay.
    pub fn merge_after(local: Option<Self>, remote: &Self) -> Self {
        let mut local = local.unwrap_or_default();
        for remote_member in &remote.members {
            let index = remote_member
                .record_id()
                .and_then(|id| local.index_of_record_id(id));
            match index {
                Some(index) => local.members[index].merge_from(remote_member),
                None => {
                    if let Some(merged) = RecordDelta::merge_after(None, remote_member) {
                        trace!(record = ?remote_member.record_id(), "replaying record");
                        local.members.push(merged);
                    }
                }
            }
        }
        debug!(members = local.members.len(), "merged record list");
        local
    }
}

fn keep_together(first: Reference, second: Reference) -> Operation {
    Operation::grouping_rule(RuleKind::KeepTogether, first, second)
}

impl Deref for RecordDeltaList {
    type Target = [RecordDelta];

    fn deref(&self) -> &Self::Target {
        &self.members
    }
}

impl DerefMut for RecordDeltaList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.members
    }
}

impl FromIterator<RecordDelta> for RecordDeltaList {
    fn from_iter<T: IntoIterator<Item = RecordDelta>>(iter: T) -> Self {
        Self {
            members: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl FromIterator<RecordSnapshot> for RecordDeltaList {
    fn from_iter<T: IntoIterator<Item = RecordSnapshot>>(iter: T) -> Self {
        iter.into_iter().map(RecordDelta::from_before).collect()
    }
}

impl IntoIterator for RecordDeltaList {
    type Item = RecordDelta;
    type IntoIter = std::vec::IntoIter<RecordDelta>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordDeltaList {
    type Item = &'a RecordDelta;
    type IntoIter = std::slice::Iter<'a, RecordDelta>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::RecordDeltaList;
    use serde::{
        Deserialize, Deserializer, Serialize, Serializer,
        de::{self, SeqAccess, Visitor},
        ser::SerializeSeq,
    };
    use std::fmt;

    /// Serialized as a flat sequence: the number of members, every member, the records to join
    /// with, and whether to split.
    impl Serialize for RecordDeltaList {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut seq = serializer.serialize_seq(Some(self.members.len() + 3))?;
            seq.serialize_element(&self.members.len())?;
            for member in &self.members {
                seq.serialize_element(member)?;
            }
            seq.serialize_element(&self.join_with)?;
            seq.serialize_element(&self.split)?;
            seq.end()
        }
    }

    impl<'de> Deserialize<'de> for RecordDeltaList {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_seq(RecordDeltaListVisitor)
        }
    }

    struct RecordDeltaListVisitor;

    impl<'de> Visitor<'de> for RecordDeltaListVisitor {
        type Value = RecordDeltaList;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a member count, that many members, the records to join with and a split flag")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let count: usize = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(0, &self))?;
            let mut members = Vec::with_capacity(count.min(64));
            for i in 0..count {
                members.push(
                    seq.next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i + 1, &self))?,
                );
            }
            let join_with = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(count + 1, &self))?;
            let split = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(count + 2, &self))?;
            Ok(RecordDeltaList {
                members,
                split,
                join_with,
            })
        }
    }
}
