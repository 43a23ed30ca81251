// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Field maps: the unit of data for a single record or row.
//!
//! A [`FieldMap`] is a bag of column name → [`FieldValue`] pairs. It plays the role of one row
//! as read from (or written to) the record store. Keys are kept sorted so that everything built
//! from a field map, compiled operations in particular, comes out in a reproducible order.
use std::{collections::BTreeMap, fmt};

/// A single scalar stored under a column of a [`FieldMap`].
///
/// `Int` and `Long` are distinct so that a value read from the store can be written back with the
/// same width, but they compare equal whenever they hold the same number.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum FieldValue {
    /// An explicitly cleared column.
    Null,
    Int(i32),
    Long(i64),
    String(String),
    // NOTE: the #[serde] here gives compact byte-array encoding for formats that support it.
    Bytes(#[cfg_attr(feature = "serde", serde(with = "serde_bytes"))] Vec<u8>),
}

impl FieldValue {
    /// Returns the value as an `i64` if it is numeric, or a string holding a number.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i64::from(*i)),
            Self::Long(l) => Some(*l),
            Self::String(s) => s.trim().parse().ok(),
            Self::Null | Self::Bytes(_) => None,
        }
    }

    /// Returns the value if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value if it is a byte array.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True if the value carries something a user could see.
    ///
    /// Strings must contain at least one non-whitespace character, byte arrays must be non-empty,
    /// and numbers always count.
    pub fn is_graphic(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Int(_) | Self::Long(_) => true,
            Self::String(s) => s.chars().any(|c| !c.is_whitespace()),
            Self::Bytes(b) => !b.is_empty(),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Int(_) | Long(_), Int(_) | Long(_)) => self.as_long() == other.as_long(),
            (String(a), String(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for FieldValue {}

impl PartialEq<str> for FieldValue {
    fn eq(&self, other: &str) -> bool {
        matches!(self, Self::String(s) if s == other)
    }
}
impl PartialEq<&str> for FieldValue {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Self::String(s) if s == other)
    }
}
impl PartialEq<i64> for FieldValue {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Self::Int(_) | Self::Long(_)) && self.as_long() == Some(*other)
    }
}

macro_rules! impl_from {
(
    $(
        $source:ty => $target:ident $(with $conv:ident)?
    ),* $(,)?
    ) => {
        $(
            impl From<$source> for FieldValue {
                fn from(value: $source) -> Self {
                    Self::$target(impl_from!(value$(, $conv)?))
                }
            }
        )*
    };

    ($value:ident, $conv:ident) => {
        $value.$conv()
    };

    ($value:ident) => {
        $value
    };
}

impl_from!(
    &[u8]   => Bytes with into,
    Vec<u8> => Bytes,
    String  => String,
    &str    => String with to_string,
    i32     => Int,
    i64     => Long,
    u32     => Long with into,
);

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Int(i32::from(value))
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Int(inner) => write!(f, "{inner}"),
            Self::Long(inner) => write!(f, "{inner}"),
            Self::String(inner) => write!(f, "{inner:?}"),
            Self::Bytes(inner) => write!(f, "<{} bytes>", inner.len()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An ordered column name → [`FieldValue`] map.
#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, returning the previous value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Explicitly clears `key`.
    ///
    /// Unlike [`FieldMap::remove`], the key stays present and is written to the store as null.
    pub fn put_null(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), FieldValue::Null);
    }

    /// Copies every field of `other` into `self`, overwriting existing keys.
    pub fn put_all(&mut self, other: &FieldMap) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(FieldValue::as_long)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(FieldValue::as_bytes)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builder-style variant of [`FieldMap::put`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.put(key, value);
        self
    }
}

impl fmt::Debug for FieldMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for FieldMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V> Extend<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_long_compare_numerically() {
        assert_eq!(FieldValue::Int(7), FieldValue::Long(7));
        assert_ne!(FieldValue::Int(7), FieldValue::Long(8));
        assert_ne!(FieldValue::Long(7), FieldValue::String("7".into()));
        assert_eq!(FieldValue::Int(7), 7i64);
    }

    #[test]
    fn as_long_parses_numeric_strings() {
        assert_eq!(FieldValue::from("42").as_long(), Some(42));
        assert_eq!(FieldValue::from("forty-two").as_long(), None);
        assert_eq!(FieldValue::Null.as_long(), None);
    }

    #[test]
    fn graphic_values() {
        assert!(!FieldValue::from("  \t").is_graphic());
        assert!(FieldValue::from(" x ").is_graphic());
        assert!(!FieldValue::Bytes(vec![]).is_graphic());
        assert!(!FieldValue::Null.is_graphic());
        assert!(FieldValue::Int(0).is_graphic());
    }

    #[test]
    fn put_null_keeps_key() {
        let mut map = FieldMap::new().with("data1", "x");
        map.put_null("data1");
        assert!(map.contains_key("data1"));
        assert!(map.get("data1").unwrap().is_null());
        assert_eq!(map.get_str("data1"), None);
    }

    #[test]
    fn display_is_sorted() {
        let map: FieldMap = [("b", FieldValue::from(2)), ("a", FieldValue::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(map.to_string(), r#"{a="x", b=2}"#);
    }
}
