// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Implementation of the quickcheck::Arbitrary trait for field data and record snapshots.
use crate::{
    columns,
    delta::RecordSnapshot,
    fields::{FieldMap, FieldValue},
};
use quickcheck::{Arbitrary, Gen};

// A small pool so that generated maps often share keys.
const KEYS: [&str; 7] = ["_id", "data1", "data2", "data3", "label", "is_primary", "notes"];
const TAGS: [&str; 3] = ["phone", "email", "name"];

impl Arbitrary for FieldValue {
    fn arbitrary(g: &mut Gen) -> Self {
        match *g.choose(&["null", "int", "long", "string", "bytes"]).unwrap() {
            "null" => Self::Null,
            "int" => Self::Int(i32::arbitrary(g)),
            "long" => Self::Long(i64::arbitrary(g)),
            "string" => Self::String(String::arbitrary(g)),
            "bytes" => Self::Bytes(Vec::arbitrary(g)),
            _ => unreachable!(),
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Self::Null => quickcheck::empty_shrinker(),
            Self::Int(v) => Box::new(v.shrink().map(Self::Int)),
            Self::Long(v) => Box::new(v.shrink().map(Self::Long)),
            Self::String(v) => Box::new(v.shrink().map(Self::String)),
            Self::Bytes(v) => Box::new(v.shrink().map(Self::Bytes)),
        }
    }
}

impl Arbitrary for FieldMap {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % KEYS.len();
        (0..len)
            .map(|_| (*g.choose(&KEYS).unwrap(), FieldValue::arbitrary(g)))
            .collect()
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let pairs: Vec<(String, FieldValue)> = self.clone().into_iter().collect();
        Box::new(pairs.shrink().map(|pairs| pairs.into_iter().collect()))
    }
}

/// Generates stored records only: the record and every row carry a distinct non-negative
/// identifier.
impl Arbitrary for RecordSnapshot {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut next_id = u16::arbitrary(g) as i64;
        let mut values = FieldMap::arbitrary(g);
        values.put(columns::ID, next_id);
        values.put(columns::VERSION, u8::arbitrary(g) as i64);

        let mut snapshot = RecordSnapshot::new(values);
        for _ in 0..usize::arbitrary(g) % 5 {
            next_id += 1;
            let mut row = FieldMap::arbitrary(g);
            row.put(columns::ID, next_id);
            snapshot = snapshot.with_row(g.choose(&TAGS).unwrap(), row);
        }
        snapshot
    }
}

/// Routes `tracing` output of the code under test through the test harness.
///
/// Filtered by `RUST_LOG`, silent by default.
#[cfg(test)]
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
