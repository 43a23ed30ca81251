use insta::assert_snapshot;
use rowdelta::{
    AccountType, DataKind, EditField, EditType, FieldMap, OperationKind, PlaceholderIds,
    RecordDelta, RecordDeltaList, RecordSnapshot, Reference, RuleKind, ValueDelta, columns,
    field_map, modifier,
};

const CONTACT_BOB: i64 = 10;
const CONTACT_MARY: i64 = 11;
const PHONE_RED: i64 = 21;
const PHONE_GREEN: i64 = 22;
const PHONE_BLUE: i64 = 23;
const EMAIL_YELLOW: i64 = 31;
const VER_FIRST: i64 = 100;
const VER_SECOND: i64 = 200;
const TEST_PHONE: &str = "555-1212";

fn phone(id: i64) -> FieldMap {
    field_map! {
        columns::ID => id,
        columns::TYPE_TAG => "phone",
        "data1" => id.to_string(),
        "data2" => 1,
    }
}

fn email(id: i64) -> FieldMap {
    field_map! {
        columns::ID => id,
        columns::TYPE_TAG => "email",
        "data1" => id.to_string(),
        "data2" => 1,
    }
}

fn before_entity(id: i64, version: i64, rows: impl IntoIterator<Item = FieldMap>) -> RecordDelta {
    let mut snapshot = RecordSnapshot::new(field_map! { "_id" => id, "version" => version });
    snapshot.rows.extend(rows);
    RecordDelta::from_before(snapshot)
}

fn list(members: impl IntoIterator<Item = RecordDelta>) -> RecordDeltaList {
    members.into_iter().collect()
}

fn account_type() -> AccountType {
    AccountType::new(None, None)
        .writable()
        .with_kind(
            DataKind::new("phone")
                .with_type_column("data2")
                .with_type(EditType::new(1, "home"))
                .with_type(EditType::new(2, "work"))
                .with_field(EditField::new("data1", "number")),
        )
        .with_kind(
            DataKind::new("email")
                .with_type_column("data2")
                .with_type(EditType::new(1, "home"))
                .with_field(EditField::new("data1", "address")),
        )
}

#[test]
fn remote_insert_is_picked_up() {
    let first = list([before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)])]);
    let second = list([before_entity(
        CONTACT_BOB,
        VER_SECOND,
        [phone(PHONE_RED), phone(PHONE_GREEN)],
    )]);
    let merged = RecordDeltaList::merge_after(Some(second.clone()), &first);
    assert_eq!(merged, second);
}

#[test]
fn merge_uses_new_version() {
    let first = list([before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)])]);
    let second = list([before_entity(CONTACT_BOB, VER_SECOND, [phone(PHONE_RED)])]);
    let merged = RecordDeltaList::merge_after(Some(second), &first);
    assert_eq!(
        merged
            .by_record_id(CONTACT_BOB)
            .and_then(|bob| bob.root().get_long(columns::VERSION)),
        Some(VER_SECOND)
    );
}

#[test]
fn local_update_survives_remote_insert() {
    let mut first = list([before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)])]);
    let second = list([before_entity(
        CONTACT_BOB,
        VER_SECOND,
        [phone(PHONE_RED), phone(PHONE_GREEN)],
    )]);
    first[0].entry_mut(PHONE_RED).unwrap().put("data1", TEST_PHONE);
    assert_snapshot!(first.build_diff().unwrap(), @r#"
    0: assert records where _id=10 {version=100}
    1: update records where _id=10 {aggregation_mode=2}
    2: update rows where _id=21 {data1="555-1212"}
    3: update records where _id=10 {aggregation_mode=0}
    "#);

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    assert_snapshot!(merged.build_diff().unwrap(), @r#"
    0: assert records where _id=10 {version=200}
    1: update records where _id=10 {aggregation_mode=2}
    2: update rows where _id=21 {data1="555-1212"}
    3: update records where _id=10 {aggregation_mode=0}
    "#);
}

#[test]
fn local_update_of_remotely_deleted_row_becomes_insert() {
    let mut first = list([before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)])]);
    let second = list([before_entity(CONTACT_BOB, VER_SECOND, [phone(PHONE_GREEN)])]);
    first[0].entry_mut(PHONE_RED).unwrap().put("data1", TEST_PHONE);

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    assert_snapshot!(merged.build_diff().unwrap(), @r#"
    0: assert records where _id=10 {version=200}
    1: update records where _id=10 {aggregation_mode=2}
    2: insert rows {data1="555-1212", data2=1, mimetype="phone", raw_contact_id=10}
    3: update records where _id=10 {aggregation_mode=0}
    "#);
}

#[test]
fn local_delete_survives_remote_update() {
    let mut first = list([before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)])]);
    let mut changed = phone(PHONE_RED);
    changed.put("data1", TEST_PHONE);
    let second = list([before_entity(CONTACT_BOB, VER_SECOND, [changed])]);
    first[0].entry_mut(PHONE_RED).unwrap().mark_deleted();

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    assert_snapshot!(merged.build_diff().unwrap(), @r"
    0: assert records where _id=10 {version=200}
    1: update records where _id=10 {aggregation_mode=2}
    2: delete rows where _id=21
    3: update records where _id=10 {aggregation_mode=0}
    ");
}

#[test]
fn local_insert_survives_remote_insert() {
    let mut ids = PlaceholderIds::new();
    let mut first = list([before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)])]);
    let second = list([before_entity(
        CONTACT_BOB,
        VER_SECOND,
        [phone(PHONE_RED), phone(PHONE_GREEN)],
    )]);
    let mut blue = phone(PHONE_BLUE);
    blue.remove(columns::ID);
    first[0].add_entry(ValueDelta::from_after(blue, &mut ids));

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    assert_snapshot!(merged.build_diff().unwrap(), @r#"
    0: assert records where _id=10 {version=200}
    1: update records where _id=10 {aggregation_mode=2}
    2: insert rows {data1="23", data2=1, mimetype="phone", raw_contact_id=10}
    3: update records where _id=10 {aggregation_mode=0}
    "#);
}

#[test]
fn local_record_insert_survives_remote_insert() {
    let mut ids = PlaceholderIds::new();
    let mut first = list([before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)])]);
    let second = list([
        before_entity(CONTACT_BOB, VER_SECOND, [phone(PHONE_RED)]),
        before_entity(CONTACT_MARY, VER_SECOND, [phone(PHONE_GREEN)]),
    ]);
    let mut joe = RecordDelta::new(ValueDelta::from_after(
        field_map! { columns::ACCOUNT_TYPE => "com.example" },
        &mut ids,
    ));
    let mut joe_phone = phone(PHONE_BLUE);
    joe_phone.remove(columns::ID);
    joe.add_entry(ValueDelta::from_after(joe_phone, &mut ids));
    first.push(joe);

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    assert_snapshot!(merged.build_diff().unwrap(), @r#"
    0: assert records where _id=10 {version=200}
    1: assert records where _id=11 {version=200}
    2: insert records {account_type="com.example", aggregation_mode=2}
    3: insert rows {data1="23", data2=1, mimetype="phone", raw_contact_id=#2}
    4: update records where _id=#2 {aggregation_mode=0}
    5: update grouping_rules {raw_contact_id1=10, raw_contact_id2=#2, type=1}
    "#);
}

#[test]
fn local_record_delete_of_remotely_deleted_record_is_dropped() {
    let mut first = list([
        before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)]),
        before_entity(CONTACT_MARY, VER_FIRST, [phone(PHONE_GREEN)]),
    ]);
    let second = list([before_entity(CONTACT_BOB, VER_SECOND, [phone(PHONE_RED)])]);
    first.by_record_id_mut(CONTACT_MARY).unwrap().mark_deleted();
    assert_snapshot!(first.build_diff().unwrap(), @r"
    0: assert records where _id=10 {version=100}
    1: assert records where _id=11 {version=100}
    2: delete records where _id=11
    ");

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    assert!(merged.build_diff().unwrap().is_empty());
}

#[test]
fn local_update_of_remotely_deleted_record_becomes_insert() {
    let mut first = list([
        before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)]),
        before_entity(CONTACT_MARY, VER_FIRST, [phone(PHONE_GREEN)]),
    ]);
    let second = list([before_entity(CONTACT_BOB, VER_SECOND, [phone(PHONE_RED)])]);
    first
        .by_record_id_mut(CONTACT_MARY)
        .and_then(|mary| mary.entry_mut(PHONE_GREEN))
        .unwrap()
        .put("data1", TEST_PHONE);

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    let batch = merged.build_diff().unwrap();
    assert_snapshot!(batch, @r#"
    0: assert records where _id=10 {version=200}
    1: insert records {aggregation_mode=2, version=100}
    2: insert rows {data1="555-1212", data2=1, mimetype="phone", raw_contact_id=#1}
    3: update records where _id=#1 {aggregation_mode=0}
    4: update grouping_rules {raw_contact_id1=10, raw_contact_id2=#1, type=1}
    "#);
    assert_eq!(batch[1].kind, OperationKind::Insert);
}

#[test]
fn split_addresses_reinserted_record_by_back_reference() {
    let mut first = list([
        before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)]),
        before_entity(CONTACT_MARY, VER_FIRST, [phone(PHONE_GREEN)]),
    ]);
    let second = list([before_entity(CONTACT_BOB, VER_SECOND, [phone(PHONE_RED)])]);
    first
        .by_record_id_mut(CONTACT_MARY)
        .and_then(|mary| mary.entry_mut(PHONE_GREEN))
        .unwrap()
        .put("data1", TEST_PHONE);

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    merged.mark_for_splitting();
    let batch = merged.build_diff().unwrap();
    assert_snapshot!(batch, @r#"
    0: assert records where _id=10 {version=200}
    1: insert records {aggregation_mode=2, version=100}
    2: insert rows {data1="555-1212", data2=1, mimetype="phone", raw_contact_id=#1}
    3: update records where _id=#1 {aggregation_mode=0}
    4: update grouping_rules {raw_contact_id1=10, raw_contact_id2=#1, type=2}
    5: update grouping_rules {raw_contact_id1=#1, raw_contact_id2=10, type=2}
    "#);
    assert_eq!(
        batch.grouping_rules().collect::<Vec<_>>(),
        [
            (
                RuleKind::KeepSeparate,
                Reference::Id(CONTACT_BOB),
                Reference::BackRef(1)
            ),
            (
                RuleKind::KeepSeparate,
                Reference::BackRef(1),
                Reference::Id(CONTACT_BOB)
            ),
        ]
    );
}

#[test]
fn reinserted_record_is_not_a_root() {
    let mut first = list([before_entity(CONTACT_MARY, VER_FIRST, [phone(PHONE_GREEN)])]);
    first[0]
        .entry_mut(PHONE_GREEN)
        .unwrap()
        .put("data1", TEST_PHONE);

    // every record is gone from the store
    let mut merged = RecordDeltaList::merge_after(Some(RecordDeltaList::new()), &first);
    assert_eq!(merged.find_root_id(), None);
    assert_eq!(merged[0].record_id(), Some(CONTACT_MARY));
    assert_eq!(merged[0].stored_id(), None);
    assert_snapshot!(merged.build_diff().unwrap(), @r#"
    0: insert records {aggregation_mode=2, version=100}
    1: insert rows {data1="555-1212", data2=1, mimetype="phone", raw_contact_id=#0}
    2: update records where _id=#0 {aggregation_mode=0}
    "#);
}

#[test]
fn merge_after_ensure_and_trim_stays_empty() {
    let account_type = account_type();
    let mut ids = PlaceholderIds::new();
    let mut first = list([before_entity(CONTACT_BOB, VER_FIRST, [email(EMAIL_YELLOW)])]);
    let second = list([before_entity(CONTACT_BOB, VER_SECOND, [email(EMAIL_YELLOW)])]);

    let bob = first.by_record_id_mut(CONTACT_BOB).unwrap();
    modifier::ensure_kind_exists(bob, &account_type, "phone", &mut ids).unwrap();
    assert!(bob.super_primary_entry("phone", true).is_some());
    assert_snapshot!(first.clone().build_diff().unwrap(), @r#"
    0: assert records where _id=10 {version=100}
    1: update records where _id=10 {aggregation_mode=2}
    2: insert rows {data2=1, mimetype="phone", raw_contact_id=10}
    3: update records where _id=10 {aggregation_mode=0}
    "#);

    let bob = first.by_record_id_mut(CONTACT_BOB).unwrap();
    modifier::trim_empty(bob, &account_type);
    assert!(first.clone().build_diff().unwrap().is_empty());

    let mut merged = RecordDeltaList::merge_after(Some(second), &first);
    assert!(merged.build_diff().unwrap().is_empty());
}

#[test]
fn merging_onto_nothing_replays_inserts_only() {
    let mut ids = PlaceholderIds::new();
    let mut first = list([before_entity(CONTACT_BOB, VER_FIRST, [phone(PHONE_RED)])]);
    first.push(RecordDelta::new(ValueDelta::from_after(
        field_map! { columns::ACCOUNT_NAME => "me" },
        &mut ids,
    )));
    first[0].mark_deleted();

    let merged = RecordDeltaList::merge_after(None, &first);
    assert_eq!(merged.len(), 1);
    assert!(merged[0].is_insert());
    assert!(!merged.is_marked_for_splitting());
}
