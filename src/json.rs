// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! JSON representation
//!
//! Field maps become JSON objects, with byte arrays encoded as base64 strings. An operation is an
//! object naming its kind and collection, with the selector and values only present when set:
//!
//! ```json
//! {
//!   "kind": "insert",
//!   "collection": "rows",
//!   "values": { "data1": "218-555-1111", "mimetype": "phone" },
//!   "back_references": { "raw_contact_id": 0 }
//! }
//! ```
//!
//! A batch is the JSON array of its operations.
use crate::{
    fields::{FieldMap, FieldValue},
    operation::{Batch, Operation, OperationKind, Reference},
};
use serde_json::{Map, Value, json};

/// Converts a [`FieldValue`] to a [`serde_json::Value`].
impl From<FieldValue> for Value {
    fn from(val: FieldValue) -> Self {
        match val {
            FieldValue::Null => Value::Null,
            FieldValue::Int(v) => v.into(),
            FieldValue::Long(v) => v.into(),
            FieldValue::String(v) => v.into(),
            FieldValue::Bytes(v) => {
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, v).into()
            }
        }
    }
}

/// Converts a [`FieldMap`] to a JSON object.
impl From<&FieldMap> for Value {
    fn from(map: &FieldMap) -> Self {
        let obj = map
            .iter()
            .map(|(k, v)| (k.to_owned(), v.clone().into()))
            .collect();
        Value::Object(obj)
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        match reference {
            Reference::Id(id) => json!({ "id": id }),
            Reference::BackRef(index) => json!({ "back_ref": index }),
        }
    }
}

/// Converts an [`Operation`] to a JSON object.
impl From<&Operation> for Value {
    fn from(op: &Operation) -> Self {
        let kind = match op.kind {
            OperationKind::Assert => "assert",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        let mut obj = Map::new();
        obj.insert("kind".into(), kind.into());
        obj.insert("collection".into(), op.collection.to_string().into());
        if let Some(selector) = &op.selector {
            obj.insert(
                "selector".into(),
                json!({ "key": selector.key, "target": Value::from(selector.target) }),
            );
        }
        if !op.values.is_empty() {
            obj.insert("values".into(), (&op.values).into());
        }
        if !op.back_references.is_empty() {
            let refs = op
                .back_references
                .iter()
                .map(|(k, index)| (k.clone(), (*index).into()))
                .collect();
            obj.insert("back_references".into(), Value::Object(refs));
        }
        Value::Object(obj)
    }
}

/// Converts a [`Batch`] to a JSON array.
impl From<&Batch> for Value {
    fn from(batch: &Batch) -> Self {
        Value::Array(batch.iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{columns, field_map, operation::Collection};

    #[test]
    fn field_map_to_json() {
        let map = field_map! {
            "data1" => "218-555-1111",
            "data2" => 2,
            "data15" => vec![1u8, 2, 3],
            "data3" => FieldValue::Null,
        };
        assert_eq!(
            Value::from(&map),
            json!({ "data1": "218-555-1111", "data2": 2, "data15": "AQID", "data3": null })
        );
    }

    #[test]
    fn batch_to_json() {
        let batch = Batch::new(vec![
            Operation::insert(Collection::Records),
            Operation::insert(Collection::Rows)
                .with_value(columns::TYPE_TAG, "phone")
                .with_reference(columns::PARENT_ID, Reference::BackRef(0)),
            Operation::update(Collection::Records)
                .with_selector(columns::ID, Reference::BackRef(0))
                .with_value(columns::GROUPING_MODE, columns::GroupingMode::Default),
        ]);
        assert_eq!(
            Value::from(&batch),
            json!([
                { "kind": "insert", "collection": "records" },
                {
                    "kind": "insert",
                    "collection": "rows",
                    "values": { "mimetype": "phone" },
                    "back_references": { "raw_contact_id": 0 }
                },
                {
                    "kind": "update",
                    "collection": "records",
                    "selector": { "key": "_id", "target": { "back_ref": 0 } },
                    "values": { "aggregation_mode": 0 }
                }
            ])
        );
    }
}
