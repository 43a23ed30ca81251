// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! This example walks through the life of an edit session.
//! We read a contact, edit it, and compile the edits into a batch. The store then rejects the
//! batch because someone else changed the contact in the meantime, so we re-read it, re-parent
//! our edits onto the fresh read and compile again.
use rowdelta::{
    AccountType, AccountTypes, DataKind, EditField, EditType, PlaceholderIds, RecordDeltaList,
    RecordSnapshot, columns, field_map, modifier,
};
use std::error::Error;

const ACCOUNT_TYPE: &str = "com.example";

fn schema() -> AccountTypes {
    AccountTypes::new(vec![
        AccountType::new(Some(ACCOUNT_TYPE), None)
            .writable()
            .with_kind(
                DataKind::new("phone")
                    .with_type_column("data2")
                    .with_overall_max(3)
                    .with_type(EditType::new(1, "home"))
                    .with_type(EditType::new(2, "mobile"))
                    .with_type(EditType::new(3, "work").with_specific_max(1))
                    .with_field(EditField::new("data1", "number")),
            )
            .with_kind(
                DataKind::new("email")
                    .with_type_column("data2")
                    .with_type(EditType::new(1, "home"))
                    .with_field(EditField::new("data1", "address")),
            ),
    ])
}

// What the store holds for contact 10, as of the given version.
fn read(version: i64, rows: &[(i64, &str, &str)]) -> RecordDeltaList {
    let mut snapshot = RecordSnapshot::new(field_map! {
        columns::ID => 10i64,
        columns::VERSION => version,
        columns::ACCOUNT_TYPE => ACCOUNT_TYPE,
    });
    for &(id, tag, value) in rows {
        snapshot = snapshot.with_row(
            tag,
            field_map! { columns::ID => id, "data1" => value, "data2" => 1 },
        );
    }
    std::iter::once(snapshot).collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    let schema = schema();
    let mut ids = PlaceholderIds::new();

    // READ
    println!("1. We read contact 10 with a home phone number.");
    let mut edits = read(1, &[(21, "phone", "218-555-1111")]);

    // EDIT
    println!("2. We change the number and add a mobile number and an email address.");
    let contact = &mut edits[0];
    if let Some(phone) = contact.entry_mut(21) {
        phone.put("data1", "218-555-2222");
    }
    let account_type = contact
        .account_type_in(&schema)
        .ok_or("no schema for the contact's account type")?;
    let phone_kind = account_type.kind_for("phone").ok_or("phones are not supported")?;
    let email_kind = account_type.kind_for("email").ok_or("emails are not supported")?;
    modifier::insert_child(contact, phone_kind, &mut ids).put("data1", "218-555-3333");
    // the user opens an email field but never fills it in
    modifier::insert_child(contact, email_kind, &mut ids);

    // TRIM AND COMPILE
    println!("3. We drop the empty email row and compile the batch.");
    modifier::trim_empty_all(&mut edits, &schema);
    assert!(modifier::has_changes(&edits, &schema));
    let batch = edits.clone().build_diff()?;
    println!("{batch}\n");

    // CONFLICT
    // Meanwhile another client added an email address, which bumped the version. Our assert on
    // version 1 fails and the store rejects the whole batch.
    println!("4. The store rejects the batch: contact 10 is at version 2 now.");
    let fresh = read(
        2,
        &[(21, "phone", "218-555-1111"), (31, "email", "someone@example.com")],
    );

    // RE-PARENT
    println!("5. We replay our edits onto the fresh read and compile again.");
    let mut merged = RecordDeltaList::merge_after(Some(fresh), &edits);
    let batch = merged.build_diff()?;
    println!("{batch}");
    assert_eq!(merged[0].entry_count("email", true), 1);

    #[cfg(feature = "json")]
    println!(
        "\nThe same batch as JSON:\n{}",
        serde_json::to_string_pretty(&serde_json::Value::from(&batch))?
    );

    Ok(())
}
