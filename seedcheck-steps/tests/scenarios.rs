//! End-to-end seed and verify scenarios against the in-memory store.

use proptest::prelude::*;
use seedcheck_core::{
    FieldValue, FixtureConfig, FixtureError, Predicate, PredicateError, Row, Table,
    UnknownColumnPolicy,
};
use seedcheck_steps::{Seeder, Verifier};
use seedcheck_storage::InMemoryStore;
use seedcheck_test_utils::{assertions::*, fixtures, generators, init_test_tracing, Account, Person};

#[test]
fn test_seed_with_default_age() {
    init_test_tracing();
    let store = InMemoryStore::new();

    let people = Seeder::<Person, _>::builder(&store)
        .default_value("Age", 25)
        .unwrap()
        .build()
        .execute(&fixtures::alice_and_bob_table())
        .unwrap();

    assert_eq!(people, vec![Person::new("Alice", 30), Person::new("Bob", 25)]);
    assert_eq!(store.all::<Person>().unwrap(), people);
}

#[test]
fn test_verify_reports_age_mismatch() {
    init_test_tracing();
    let store = fixtures::seeded_store(&[Person::new("Alice", 30)]);
    let table = Table::parse(
        "| Name  | Age |
         | Alice | 31  |",
    )
    .unwrap();

    let result = Verifier::<Person, _>::builder(&store, ["Name"])
        .unwrap()
        .check_fields(["Age"])
        .unwrap()
        .build()
        .execute(&table);

    assert_eq!(
        result,
        Err(FixtureError::Mismatch {
            entity: "Person",
            row: 1,
            field: "Age".to_string(),
            expected: FieldValue::Int(31),
            actual: FieldValue::Int(30),
        })
    );
}

#[test]
fn test_seed_then_verify_round_trip() {
    let store = InMemoryStore::new();
    let table = fixtures::people_table(&fixtures::sample_people());

    let seeded = Seeder::<Person, _>::builder(&store)
        .build()
        .execute(&table)
        .unwrap();
    let found = Verifier::<Person, _>::builder(&store, ["Name"])
        .unwrap()
        .check_supplied_columns()
        .build()
        .execute(&table)
        .unwrap();

    assert_eq!(found, seeded);
    assert_eq!(found, fixtures::sample_people());
}

#[test]
fn test_fixed_override_wins_over_row() {
    let store = InMemoryStore::new();
    let people = Seeder::<Person, _>::builder(&store)
        .fixed_value("Active", true)
        .unwrap()
        .build()
        .execute(&Table::from_rows([
            Row::new().with("Name", "Alice").with("Active", "false"),
            Row::new().with("Name", "Bob"),
        ]))
        .unwrap();

    assert!(people.iter().all(|p| p.active));
}

#[test]
fn test_verify_stops_at_first_failing_row() {
    let store = fixtures::seeded_store(&[Person::new("Alice", 30), Person::new("Bob", 40)]);
    let table = Table::from_rows([
        Row::new().with("Name", "Alice").with("Age", "30"),
        Row::new().with("Name", "Bob").with("Age", "41"),
        Row::new().with("Name", "Nobody").with("Age", "1"),
    ]);

    let result = Verifier::<Person, _>::builder(&store, ["Name"])
        .unwrap()
        .check_fields(["Age"])
        .unwrap()
        .build()
        .execute(&table);

    // row 3 would be NotFound, but row 2 aborts first
    assert_mismatch(&result, 2, "Age");
}

#[test]
fn test_verify_not_found_names_row() {
    let store = fixtures::seeded_store(&fixtures::sample_people());
    let result = Verifier::<Person, _>::builder(&store, ["Name", "Age"])
        .unwrap()
        .build()
        .execute(&Table::from_rows([Row::new().with("Name", "Alice").with("Age", "31")]));

    assert_not_found(&result, 1);
    assert_eq!(
        result.unwrap_err().to_string(),
        "Row 1: no Person found where Name = \"Alice\" AND Age = 31"
    );
}

#[test]
fn test_commit_failure_surfaces_as_persistence() {
    let store = InMemoryStore::new();
    store.fail_next_commit("connection reset").unwrap();

    let result = Seeder::<Person, _>::builder(&store)
        .build()
        .execute(&fixtures::alice_and_bob_table());

    assert_persistence(&result);
    assert_eq!(store.count::<Person>().unwrap(), 0);

    // next attempt goes through
    Seeder::<Person, _>::builder(&store)
        .build()
        .execute(&fixtures::alice_and_bob_table())
        .unwrap();
    assert_eq!(store.count::<Person>().unwrap(), 2);
}

#[test]
fn test_text_lookup_value_coerces_to_integer() {
    let store = fixtures::seeded_store(&[Person::new("Alice", 42)]);

    let exact = Predicate::<Person>::from_named([("Age", FieldValue::from("42"))]).unwrap();
    assert_eq!(
        seedcheck_storage::EntityStore::find_one(&store, &exact).unwrap(),
        Some(Person::new("Alice", 42))
    );

    let err = Predicate::<Person>::from_named([("Age", FieldValue::from("42 "))]).unwrap_err();
    assert!(matches!(err, PredicateError::Coercion { ref field, .. } if field == "Age"));

    let result = Verifier::<Person, _>::builder(&store, ["Age"])
        .unwrap()
        .build()
        .execute(&Table::from_rows([Row::new().with("Age", "42 ")]));
    assert_materialize_error(&result);
    assert_eq!(result.unwrap_err().row(), Some(1));

    let found = Verifier::<Person, _>::builder(&store, ["Age"])
        .unwrap()
        .with_config(FixtureConfig::default().with_trim_cells(true))
        .build()
        .execute(&Table::from_rows([Row::new().with("Age", "42 ")]))
        .unwrap();
    assert_eq!(found[0].name, "Alice");
}

#[test]
fn test_duplicate_store_entries_are_ambiguous() {
    let store = fixtures::seeded_store(&[Person::new("Alice", 30), Person::new("Alice", 30)]);
    let result = Verifier::<Person, _>::builder(&store, ["Name"])
        .unwrap()
        .build()
        .execute(&Table::from_rows([Row::new().with("Name", "Alice")]));
    assert_ambiguous(&result, 1, 2);
}

#[test]
fn test_configuration_errors_surface_before_execute() {
    let store = InMemoryStore::new();

    let result = Seeder::<Person, _>::builder(&store).fixed_value("DisplayName", "x");
    assert_config_error(&result);

    let result = Verifier::<Person, _>::builder(&store, Vec::<&'static str>::new());
    assert_config_error(&result);

    let result = Verifier::<Person, _>::builder(&store, ["Name"])
        .unwrap()
        .check_fields(["Salary"]);
    assert_config_error(&result);
}

#[test]
fn test_header_policies() {
    let store = InMemoryStore::new();
    let table = Table::parse(
        "| name  | age | Nickname |
         | Alice | 30  | Al       |",
    )
    .unwrap();

    let result = Seeder::<Person, _>::builder(&store).build().execute(&table);
    assert_materialize_error(&result);

    let people = Seeder::<Person, _>::builder(&store)
        .with_config(FixtureConfig::default().with_unknown_columns(UnknownColumnPolicy::Ignore))
        .build()
        .execute(&table)
        .unwrap();
    assert_eq!(people, vec![Person::new("Alice", 30)]);

    let result = Seeder::<Person, _>::builder(&store)
        .with_config(FixtureConfig::strict().with_unknown_columns(UnknownColumnPolicy::Ignore))
        .build()
        .execute(&Table::from_rows([Row::new().with("age", "30")]));
    // nothing matches exactly, so every column is ignored
    assert_eq!(result.unwrap(), vec![Person::default()]);
}

#[test]
fn test_account_lookup_by_uuid() {
    let account = Account::new("Alice", 10.25);
    let store = fixtures::seeded_store(&[account.clone(), Account::new("Bob", 3.0)]);

    let found = Verifier::<Account, _>::builder(&store, ["Id"])
        .unwrap()
        .check_fields(["Owner", "Balance"])
        .unwrap()
        .build()
        .execute(&Table::from_rows([fixtures::account_row(&account)]))
        .unwrap();
    assert_same_record(&found[0], &account);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Seed and verify both return entities in table row order.
    #[test]
    fn prop_results_follow_row_order(people in generators::arb_people(12)) {
        let store = InMemoryStore::new();
        let table = fixtures::people_table(&people);

        let seeded = Seeder::<Person, _>::builder(&store).build().execute(&table).unwrap();
        prop_assert_eq!(&seeded, &people);

        let found = Verifier::<Person, _>::builder(&store, ["Name"])
            .unwrap()
            .check_supplied_columns()
            .build()
            .execute(&table)
            .unwrap();
        let names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
        let expected: Vec<_> = people.iter().map(|p| p.name.as_str()).collect();
        prop_assert_eq!(names, expected);
    }

    /// A default never replaces a supplied age, and fills every missing one.
    #[test]
    fn prop_default_applies_only_when_absent(
        ages in proptest::collection::vec(proptest::option::of(0i64..120), 1..10),
        fallback in 0i64..120,
    ) {
        let store = InMemoryStore::new();
        let table = Table::from_rows(ages.iter().enumerate().map(|(i, age)| {
            Row::new()
                .with("Name", format!("P{}", i))
                .with("Age", age.map(|a| a.to_string()).unwrap_or_default())
        }));

        let people = Seeder::<Person, _>::builder(&store)
            .default_value("Age", fallback)
            .unwrap()
            .build()
            .execute(&table)
            .unwrap();

        for (person, age) in people.iter().zip(&ages) {
            prop_assert_eq!(person.age, age.unwrap_or(fallback));
        }
    }

    /// A verified entity must exist for every lookup; an unseen name is NotFound.
    #[test]
    fn prop_unseen_lookup_is_not_found(people in generators::arb_people(6), missing in "[0-9]{4}") {
        let store = fixtures::seeded_store(&people);
        let mut table = fixtures::people_table(&people);
        table.push_row(Row::new().with("Name", missing));

        let result = Verifier::<Person, _>::builder(&store, ["Name"]).unwrap().build().execute(&table);
        match result {
            Err(FixtureError::NotFound { row, .. }) => prop_assert_eq!(row, people.len() + 1),
            other => prop_assert!(false, "Expected NotFound, got: {:?}", other),
        }
    }
}
