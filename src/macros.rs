// (c) Copyright 2025 Helsing GmbH. All rights reserved.
/// Convenience macro for creating a [`FieldMap`](crate::FieldMap).
///
/// Values are converted with [`Into<FieldValue>`](crate::FieldValue), so integer literals
/// default to [`FieldValue::Int`](crate::FieldValue::Int); suffix them with `i64` for a `Long`.
///
/// ```rust
/// # use rowdelta::field_map;
/// let row = field_map! {
///     "_id" => 24i64,
///     "mimetype" => "phone",
///     "is_primary" => 1,
/// };
/// assert_eq!(row.get_long("_id"), Some(24));
/// assert_eq!(row.get_str("mimetype"), Some("phone"));
/// ```
#[macro_export]
macro_rules! field_map {
    () => {
        $crate::FieldMap::new()
    };
    ($($k:expr => $v:expr),+ $(,)?) => {
        {
            let mut map = $crate::FieldMap::new();
            $( map.put($k, $v); )+
            map
        }
    };
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    #[test]
    fn field_map_macro() {
        let map = field_map! {
            "data1" => "218-555-1111",
            "_id" => 24i64,
            "data15" => vec![0u8, 1, 2],
            "data2" => crate::FieldValue::Null,
        };
        assert_debug_snapshot!(map, @r#"
        {
            "_id": 24,
            "data1": "218-555-1111",
            "data15": <3 bytes>,
            "data2": null,
        }
        "#);
        assert!(field_map! {}.is_empty());
    }
}
