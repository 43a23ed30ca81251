// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Persistence operations produced by compiling a delta.
//!
//! An [`Operation`] is addressed to one [`Collection`] of the record store and is one of
//! assert, insert, update or delete. Operations are meant to be submitted together as a
//! [`Batch`], which the store applies in order and atomically. Later operations may refer to the
//! identifier produced by an earlier insert of the same batch through a
//! [`Reference::BackRef`].
use crate::{
    columns::{self, RuleKind},
    fields::{FieldMap, FieldValue},
};
use std::{collections::BTreeMap, fmt, ops::Deref};

/// The kind of change an [`Operation`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum OperationKind {
    /// Fails the whole batch unless the selected row holds the given values.
    Assert,
    Insert,
    Update,
    Delete,
}

/// The named collection of the record store an [`Operation`] is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum Collection {
    /// Root records, one per raw contact.
    Records,
    /// Typed data rows belonging to a record.
    Rows,
    /// Keep-together / keep-separate rules between pairs of records.
    GroupingRules,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collection::Records => "records",
            Collection::Rows => "rows",
            Collection::GroupingRules => "grouping_rules",
        })
    }
}

/// A value that is either known now, or produced by an earlier operation of the same batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum Reference {
    /// A literal identifier.
    Id(i64),
    /// The identifier produced by the operation at this index of the batch.
    BackRef(usize),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Id(id) => write!(f, "{id}"),
            Reference::BackRef(index) => write!(f, "#{index}"),
        }
    }
}

/// Selects the rows an update, delete or assert applies to: those where `key` equals `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct Selector {
    pub key: String,
    pub target: Reference,
}

/// A single store operation.
///
/// Literal values live in [`Operation::values`]; values that must be resolved against earlier
/// results of the batch live in [`Operation::back_references`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct Operation {
    pub kind: OperationKind,
    pub collection: Collection,
    pub selector: Option<Selector>,
    pub values: FieldMap,
    pub back_references: BTreeMap<String, usize>,
}

impl Operation {
    fn new(kind: OperationKind, collection: Collection) -> Self {
        Self {
            kind,
            collection,
            selector: None,
            values: FieldMap::new(),
            back_references: BTreeMap::new(),
        }
    }

    pub fn assert(collection: Collection) -> Self {
        Self::new(OperationKind::Assert, collection)
    }

    pub fn insert(collection: Collection) -> Self {
        Self::new(OperationKind::Insert, collection)
    }

    pub fn update(collection: Collection) -> Self {
        Self::new(OperationKind::Update, collection)
    }

    pub fn delete(collection: Collection) -> Self {
        Self::new(OperationKind::Delete, collection)
    }

    pub fn with_selector(mut self, key: impl Into<String>, target: Reference) -> Self {
        self.selector = Some(Selector {
            key: key.into(),
            target,
        });
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.put(key, value);
        self
    }

    pub fn with_values(mut self, values: FieldMap) -> Self {
        self.values.extend(values);
        self
    }

    /// Sets `key` to a literal identifier or to a back-reference, depending on `reference`.
    pub fn with_reference(mut self, key: impl Into<String>, reference: Reference) -> Self {
        let key = key.into();
        match reference {
            Reference::Id(id) => {
                self.back_references.remove(&key);
                self.values.put(key, id);
            }
            Reference::BackRef(index) => {
                self.values.remove(&key);
                self.back_references.insert(key, index);
            }
        }
        self
    }

    /// Reads `key` as a [`Reference`], whether it was set literally or as a back-reference.
    pub fn reference(&self, key: &str) -> Option<Reference> {
        if let Some(&index) = self.back_references.get(key) {
            return Some(Reference::BackRef(index));
        }
        self.values.get_long(key).map(Reference::Id)
    }

    /// Builds a grouping rule between two records.
    pub fn grouping_rule(kind: RuleKind, first: Reference, second: Reference) -> Self {
        Self::update(Collection::GroupingRules)
            .with_value(columns::RULE_KIND, kind)
            .with_reference(columns::RULE_FIRST, first)
            .with_reference(columns::RULE_SECOND, second)
    }

    /// Decodes a grouping rule built by [`Operation::grouping_rule`].
    ///
    /// Returns `None` for any operation that is not a well-formed grouping rule.
    pub fn as_grouping_rule(&self) -> Option<(RuleKind, Reference, Reference)> {
        if self.collection != Collection::GroupingRules || self.kind != OperationKind::Update {
            return None;
        }
        let kind = RuleKind::try_from(self.values.get_long(columns::RULE_KIND)?).ok()?;
        Some((
            kind,
            self.reference(columns::RULE_FIRST)?,
            self.reference(columns::RULE_SECOND)?,
        ))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            OperationKind::Assert => "assert",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        write!(f, "{kind} {}", self.collection)?;
        if let Some(Selector { key, target }) = &self.selector {
            write!(f, " where {key}={target}")?;
        }

        // literal values and back-references are interleaved in key order
        let mut fields: BTreeMap<&str, String> = self
            .values
            .iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        fields.extend(
            self.back_references
                .iter()
                .map(|(k, index)| (k.as_str(), format!("#{index}"))),
        );
        if !fields.is_empty() {
            f.write_str(" {")?;
            for (i, (key, value)) in fields.into_iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

/// An ordered list of operations meant to be applied atomically.
///
/// An empty batch means there is nothing to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[must_use = "batches should be submitted to the record store"]
pub struct Batch(pub Vec<Operation>);

impl Batch {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self(operations)
    }

    pub fn into_inner(self) -> Vec<Operation> {
        self.0
    }

    /// Iterates over the grouping rules contained in the batch.
    pub fn grouping_rules(&self) -> impl Iterator<Item = (RuleKind, Reference, Reference)> + '_ {
        self.0.iter().filter_map(Operation::as_grouping_rule)
    }
}

impl Deref for Batch {
    type Target = [Operation];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for Batch {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{i}: {op}")?;
        }
        Ok(())
    }
}
