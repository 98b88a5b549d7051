//! seedcheck Test Utilities
//!
//! Shared test infrastructure for the seedcheck workspace:
//! - Sample entities (`Person`, `Account`)
//! - Proptest generators for entities and tables
//! - Canned tables and pre-seeded stores
//! - Assertions for each fixture error kind
//! - Tracing setup for test output

// Re-export the in-memory store from its source crate
pub use seedcheck_storage::{EntityStore, InMemoryStore};

// Re-export core types for convenience
pub use seedcheck_core::{
    ConfigError, Entity, FieldError, FieldValue, FixtureConfig, FixtureError, FixtureResult,
    MaterializeError, Row, StoreError, Table, Timestamp,
};

use seedcheck_core::entity_schema;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ============================================================================
// SAMPLE ENTITIES
// ============================================================================

/// A person with one member of each kind.
///
/// `DisplayName` is computed and `Scratch` is declared without a backing
/// property, so both are rejected as selectors and as table columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i64,
    pub email: Option<String>,
    pub active: bool,
    pub joined: Option<Timestamp>,
}

entity_schema! {
    Person as "Person" {
        "Name" => name: String,
        "Age" => age: i64,
        "Email" => email: Option<String>,
        "Active" => active: bool,
        "Joined" => joined: Option<Timestamp>,
    }
    computed {
        "DisplayName": String => |p: &Person| FieldValue::from(format!("{} ({})", p.name, p.age)),
    }
    unmapped {
        "Scratch": String,
    }
}

impl Person {
    pub fn new(name: impl Into<String>, age: i64) -> Self {
        Self {
            name: name.into(),
            age,
            ..Default::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A bank account, keyed by a UUID. `Branch` is an `i32` column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub owner: String,
    pub balance: f64,
    pub branch: i32,
    pub opened: Timestamp,
}

entity_schema! {
    Account as "Account" {
        "Id" => id: Uuid,
        "Owner" => owner: String,
        "Balance" => balance: f64,
        "Branch" => branch: i32,
        "Opened" => opened: Timestamp,
    }
}

impl Account {
    pub fn new(owner: impl Into<String>, balance: f64) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner: owner.into(),
            balance,
            branch: 1,
            opened: chrono::Utc::now(),
        }
    }
}

// ============================================================================
// TRACING
// ============================================================================

/// Install a fmt subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`. Safe to call from every test; only the first call
/// installs anything.
pub fn init_test_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("seedcheck_steps=debug,seedcheck_storage=debug,warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for sample entities and tables.

    use super::*;
    use proptest::prelude::*;

    /// Capitalized name, never empty.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{2,9}"
    }

    pub fn arb_email() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[a-z]{3,8}@example\\.com")
    }

    /// Generate a Timestamp with whole seconds (2020-2030).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default()
        })
    }

    pub fn arb_person() -> impl Strategy<Value = Person> {
        (
            arb_name(),
            0i64..120,
            arb_email(),
            any::<bool>(),
            proptest::option::of(arb_timestamp()),
        )
            .prop_map(|(name, age, email, active, joined)| Person {
                name,
                age,
                email,
                active,
                joined,
            })
    }

    /// People with distinct names, in random order.
    pub fn arb_people(max: usize) -> impl Strategy<Value = Vec<Person>> {
        proptest::collection::btree_map(
            arb_name(),
            (0i64..120, arb_email(), any::<bool>()),
            1..max.max(2),
        )
        .prop_map(|by_name| {
            by_name
                .into_iter()
                .map(|(name, (age, email, active))| Person {
                    name,
                    age,
                    email,
                    active,
                    joined: None,
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
    }

    pub fn arb_account() -> impl Strategy<Value = Account> {
        (
            any::<[u8; 16]>().prop_map(Uuid::from_bytes),
            arb_name(),
            -10_000i64..10_000,
            1i32..500,
            arb_timestamp(),
        )
            .prop_map(|(id, owner, cents, branch, opened)| Account {
                id,
                owner,
                balance: cents as f64 / 100.0,
                branch,
                opened,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Canned tables and stores for common scenarios.

    use super::*;

    /// `Alice` with age 30, `Bob` with the age cell left empty.
    pub fn alice_and_bob_table() -> Table {
        Table::from_rows([
            Row::new().with("Name", "Alice").with("Age", "30"),
            Row::new().with("Name", "Bob").with("Age", ""),
        ])
    }

    pub fn sample_people() -> Vec<Person> {
        vec![
            Person {
                email: Some("alice@example.com".to_string()),
                active: true,
                ..Person::new("Alice", 30)
            },
            Person::new("Bob", 25),
            Person {
                active: true,
                ..Person::new("Carol", 52)
            },
        ]
    }

    /// Every property of `person` as a row. `None` becomes an empty cell.
    pub fn person_row(person: &Person) -> Row {
        Row::new()
            .with("Name", person.name.as_str())
            .with("Age", person.age.to_string())
            .with("Email", person.email.clone().unwrap_or_default())
            .with("Active", person.active.to_string())
            .with(
                "Joined",
                person.joined.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
            )
    }

    pub fn people_table(people: &[Person]) -> Table {
        Table::from_rows(people.iter().map(person_row))
    }

    pub fn account_row(account: &Account) -> Row {
        Row::new()
            .with("Id", account.id.to_string())
            .with("Owner", account.owner.as_str())
            .with("Balance", account.balance.to_string())
            .with("Branch", account.branch.to_string())
            .with("Opened", account.opened.to_rfc3339())
    }

    /// Store with `entities` already committed, bypassing staging.
    pub fn seeded_store<T: Entity>(entities: &[T]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for entity in entities {
            if let Err(err) = store.insert_committed(entity) {
                panic!("Failed to seed {}: {}", T::ENTITY_NAME, err);
            }
        }
        store
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for each fixture error kind.

    use super::*;

    /// Assert that a FixtureResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &FixtureResult<T>) {
        match result {
            Err(FixtureError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a FixtureResult is a Materialize error.
    #[track_caller]
    pub fn assert_materialize_error<T: std::fmt::Debug>(result: &FixtureResult<T>) {
        match result {
            Err(FixtureError::Materialize(_)) => {}
            other => panic!("Expected Materialize error, got: {:?}", other),
        }
    }

    /// Assert that a FixtureResult is a Coercion error on the given row.
    #[track_caller]
    pub fn assert_coercion_error<T: std::fmt::Debug>(result: &FixtureResult<T>, row: usize) {
        match result {
            Err(FixtureError::Coercion { row: r, .. }) => {
                assert_eq!(*r, row, "Wrong row in Coercion error");
            }
            other => panic!("Expected Coercion error on row {}, got: {:?}", row, other),
        }
    }

    /// Assert that a FixtureResult is a MissingLookup error on the given row and field.
    #[track_caller]
    pub fn assert_missing_lookup<T: std::fmt::Debug>(
        result: &FixtureResult<T>,
        row: usize,
        field: &str,
    ) {
        match result {
            Err(FixtureError::MissingLookup {
                row: r, field: f, ..
            }) => {
                assert_eq!(*r, row, "Wrong row in MissingLookup error");
                assert_eq!(f, field, "Wrong field in MissingLookup error");
            }
            other => panic!(
                "Expected MissingLookup on row {} field {}, got: {:?}",
                row, field, other
            ),
        }
    }

    /// Assert that a FixtureResult is a NotFound error on the given row.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &FixtureResult<T>, row: usize) {
        match result {
            Err(FixtureError::NotFound { row: r, .. }) => {
                assert_eq!(*r, row, "Wrong row in NotFound error");
            }
            other => panic!("Expected NotFound error on row {}, got: {:?}", row, other),
        }
    }

    /// Assert that a FixtureResult is an Ambiguous error with `matches` hits.
    #[track_caller]
    pub fn assert_ambiguous<T: std::fmt::Debug>(
        result: &FixtureResult<T>,
        row: usize,
        matches: usize,
    ) {
        match result {
            Err(FixtureError::Ambiguous {
                row: r, matches: m, ..
            }) => {
                assert_eq!(*r, row, "Wrong row in Ambiguous error");
                assert_eq!(*m, matches, "Wrong match count in Ambiguous error");
            }
            other => panic!("Expected Ambiguous error on row {}, got: {:?}", row, other),
        }
    }

    /// Assert that a FixtureResult is a Mismatch on the given row and field.
    #[track_caller]
    pub fn assert_mismatch<T: std::fmt::Debug>(result: &FixtureResult<T>, row: usize, field: &str) {
        match result {
            Err(FixtureError::Mismatch {
                row: r, field: f, ..
            }) => {
                assert_eq!(*r, row, "Wrong row in Mismatch error");
                assert_eq!(f, field, "Wrong field in Mismatch error");
            }
            other => panic!(
                "Expected Mismatch on row {} field {}, got: {:?}",
                row, field, other
            ),
        }
    }

    /// Assert that a FixtureResult is a Persistence error.
    #[track_caller]
    pub fn assert_persistence<T: std::fmt::Debug>(result: &FixtureResult<T>) {
        match result {
            Err(FixtureError::Persistence(_)) => {}
            other => panic!("Expected Persistence error, got: {:?}", other),
        }
    }

    /// Assert that two people agree on every property.
    #[track_caller]
    pub fn assert_same_record<E: Entity>(actual: &E, expected: &E) {
        assert_eq!(
            actual.to_record(),
            expected.to_record(),
            "{} records differ",
            E::ENTITY_NAME
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
