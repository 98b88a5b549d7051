//! Seeding entities from a table.

use crate::mapper::{MappedRow, RowMapper, SchemaRowMapper};
use seedcheck_core::{
    ConfigError, Entity, FieldAccessor, FieldSelector, FieldValue, FixtureConfig, FixtureError,
    FixtureResult, Table,
};
use seedcheck_storage::EntityStore;
use std::fmt;

/// A field value applied to every seeded entity.
///
/// The value is already converted to the field's type.
#[derive(Debug, Clone, PartialEq)]
pub struct Override<T> {
    accessor: FieldAccessor<T>,
    value: FieldValue,
}

impl<T: Entity> Override<T> {
    fn resolve(selector: FieldSelector<T>, value: FieldValue) -> FixtureResult<Self> {
        let accessor = selector.resolve()?;
        let value = accessor
            .coerce(&value)
            .map_err(|source| ConfigError::InvalidOverride {
                field: accessor.name().to_string(),
                source,
            })?;
        Ok(Self { accessor, value })
    }

    fn apply(&self, entity: &mut T, row: usize) -> FixtureResult<()> {
        self.accessor
            .set(entity, self.value.clone())
            .map_err(|source| FixtureError::Coercion {
                row,
                field: self.accessor.name().to_string(),
                source,
            })
    }
}

impl<T> Override<T> {
    pub fn field(&self) -> &'static str {
        self.accessor.name()
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

/// Insert or replace in place, so a re-registered field keeps its slot.
fn register<T>(list: &mut Vec<Override<T>>, entry: Override<T>) {
    match list.iter_mut().find(|o| o.accessor == entry.accessor) {
        Some(existing) => existing.value = entry.value,
        None => list.push(entry),
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Accumulates overrides and settings for a [`Seeder`].
pub struct SeederBuilder<'s, T: Entity, S: EntityStore> {
    store: &'s S,
    fixed: Vec<Override<T>>,
    defaults: Vec<Override<T>>,
    config: FixtureConfig,
    mapper: Option<Box<dyn RowMapper<T> + 's>>,
}

impl<'s, T: Entity, S: EntityStore> SeederBuilder<'s, T, S> {
    fn new(store: &'s S) -> Self {
        Self {
            store,
            fixed: Vec::new(),
            defaults: Vec::new(),
            config: FixtureConfig::default(),
            mapper: None,
        }
    }

    /// Always write `value` to the field, replacing whatever the row supplied.
    pub fn fixed_value(
        mut self,
        selector: impl Into<FieldSelector<T>>,
        value: impl Into<FieldValue>,
    ) -> FixtureResult<Self> {
        let entry = Override::resolve(selector.into(), value.into())?;
        register(&mut self.fixed, entry);
        Ok(self)
    }

    /// Write `value` to the field only when the row left it empty.
    ///
    /// A fixed value registered for the same field takes precedence, whether
    /// or not the row supplied it.
    pub fn default_value(
        mut self,
        selector: impl Into<FieldSelector<T>>,
        value: impl Into<FieldValue>,
    ) -> FixtureResult<Self> {
        let entry = Override::resolve(selector.into(), value.into())?;
        register(&mut self.defaults, entry);
        Ok(self)
    }

    /// Settings for the default row mapper. Ignored when a custom mapper is set.
    pub fn with_config(mut self, config: FixtureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_mapper(mut self, mapper: impl RowMapper<T> + 's) -> Self {
        self.mapper = Some(Box::new(mapper));
        self
    }

    pub fn build(self) -> Seeder<'s, T, S> {
        let mapper: Box<dyn RowMapper<T> + 's> = match self.mapper {
            Some(mapper) => mapper,
            None => Box::new(SchemaRowMapper::new(self.config)),
        };
        Seeder {
            store: self.store,
            fixed: self.fixed,
            defaults: self.defaults,
            mapper,
        }
    }
}

// ============================================================================
// SEEDER
// ============================================================================

/// Materializes table rows, applies overrides and persists the result in one commit.
pub struct Seeder<'s, T: Entity, S: EntityStore> {
    store: &'s S,
    fixed: Vec<Override<T>>,
    defaults: Vec<Override<T>>,
    mapper: Box<dyn RowMapper<T> + 's>,
}

impl<'s, T: Entity, S: EntityStore> Seeder<'s, T, S> {
    pub fn builder(store: &'s S) -> SeederBuilder<'s, T, S> {
        SeederBuilder::new(store)
    }

    pub fn fixed_values(&self) -> &[Override<T>] {
        &self.fixed
    }

    pub fn default_values(&self) -> &[Override<T>] {
        &self.defaults
    }

    /// Seed every row of `table` and return the persisted entities in row order.
    ///
    /// # Errors
    /// Materialization failures and override coercion failures abort before
    /// anything is added. A failed add rolls back what was already staged.
    /// A failed add, rollback or commit surfaces as
    /// [`FixtureError::Persistence`].
    pub fn execute(&self, table: &Table) -> FixtureResult<Vec<T>> {
        let mapped = self.mapper.map_rows(table)?;

        let mut entities = Vec::with_capacity(mapped.len());
        for (index, row) in mapped.into_iter().enumerate() {
            entities.push(self.apply_overrides(row, index + 1)?);
        }

        for entity in &entities {
            if let Err(err) = self.store.add(entity) {
                tracing::warn!(entity = T::ENTITY_NAME, error = %err, "Add failed, rolling back");
                self.store.rollback()?;
                return Err(err.into());
            }
        }
        self.store.commit()?;

        tracing::info!(entity = T::ENTITY_NAME, rows = entities.len(), "Seeded table");
        Ok(entities)
    }

    fn apply_overrides(&self, row: MappedRow<T>, row_no: usize) -> FixtureResult<T> {
        let MappedRow { mut entity, supplied } = row;

        for fixed in &self.fixed {
            fixed.apply(&mut entity, row_no)?;
        }
        for default in &self.defaults {
            let pinned = self.fixed.iter().any(|f| f.field() == default.field());
            if !pinned && !supplied.contains(&default.field()) {
                default.apply(&mut entity, row_no)?;
            }
        }

        tracing::debug!(entity = T::ENTITY_NAME, row = row_no, supplied = supplied.len(), "Prepared row");
        Ok(entity)
    }
}

impl<T: Entity, S: EntityStore> fmt::Debug for SeederBuilder<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeederBuilder")
            .field("entity", &T::ENTITY_NAME)
            .field("fixed", &self.fixed)
            .field("defaults", &self.defaults)
            .field("config", &self.config)
            .field("custom_mapper", &self.mapper.is_some())
            .finish()
    }
}

impl<T: Entity, S: EntityStore> fmt::Debug for Seeder<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seeder")
            .field("entity", &T::ENTITY_NAME)
            .field("fixed", &self.fixed)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use seedcheck_core::{FieldError, Row, StoreError};
    use seedcheck_storage::InMemoryStore;
    use seedcheck_test_utils::{assertions::*, Account, Person};

    fn alice_and_bob() -> Table {
        Table::from_rows([
            Row::new().with("Name", "Alice").with("Age", "30"),
            Row::new().with("Name", "Bob"),
        ])
    }

    #[test]
    fn test_default_applies_only_to_absent_fields() {
        let store = InMemoryStore::new();
        let people = Seeder::<Person, _>::builder(&store)
            .default_value("Age", 25)
            .unwrap()
            .build()
            .execute(&alice_and_bob())
            .unwrap();

        assert_eq!(people[0].age, 30);
        assert_eq!(people[1].age, 25);
        assert_eq!(store.count::<Person>().unwrap(), 2);
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_fixed_value_overwrites_row_value() {
        let store = InMemoryStore::new();
        let people = Seeder::<Person, _>::builder(&store)
            .fixed_value("Age", 99)
            .unwrap()
            .build()
            .execute(&alice_and_bob())
            .unwrap();

        assert!(people.iter().all(|p| p.age == 99));
    }

    #[test]
    fn test_fixed_value_beats_default_on_omitted_field() {
        let store = InMemoryStore::new();
        let people = Seeder::<Person, _>::builder(&store)
            .fixed_value("Age", 99)
            .unwrap()
            .default_value("Age", 25)
            .unwrap()
            .build()
            .execute(&Table::from_rows([Row::new().with("Name", "Bob")]))
            .unwrap();

        assert_eq!(people[0].age, 99);
        assert_eq!(store.all::<Person>().unwrap()[0].age, 99);
    }

    #[test]
    fn test_default_does_not_apply_to_explicit_zero() {
        let store = InMemoryStore::new();
        let table = Table::from_rows([Row::new().with("Name", "Zero").with("Age", "0")]);
        let people = Seeder::<Person, _>::builder(&store)
            .default_value("Age", 25)
            .unwrap()
            .build()
            .execute(&table)
            .unwrap();
        assert_eq!(people[0].age, 0);
    }

    #[test]
    fn test_re_registration_is_last_write_wins() {
        let store = InMemoryStore::new();
        let seeder = Seeder::<Person, _>::builder(&store)
            .default_value("Age", 1)
            .unwrap()
            .default_value("Active", true)
            .unwrap()
            .default_value("Age", 2)
            .unwrap()
            .build();

        let fields: Vec<_> = seeder.default_values().iter().map(|o| o.field()).collect();
        assert_eq!(fields, vec!["Age", "Active"]);
        assert_eq!(seeder.default_values()[0].value(), &FieldValue::Int(2));
    }

    #[test]
    fn test_bad_selector_fails_at_registration() {
        let store = InMemoryStore::new();
        let err = Seeder::<Person, _>::builder(&store)
            .fixed_value("DisplayName", "x")
            .unwrap_err();
        assert!(matches!(
            err,
            FixtureError::Config(ConfigError::InvalidField(FieldError::TargetsMethod { .. }))
        ));

        let result = Seeder::<Person, _>::builder(&store)
            .default_value("Salary", 1)
            .map(|_| ());
        assert_config_error(&result);
    }

    #[test]
    fn test_unconvertible_override_fails_at_registration() {
        let store = InMemoryStore::new();
        let err = Seeder::<Person, _>::builder(&store)
            .default_value("Age", "old")
            .unwrap_err();
        assert!(matches!(
            err,
            FixtureError::Config(ConfigError::InvalidOverride { .. })
        ));
    }

    #[test]
    fn test_commit_failure_is_persistence_error() {
        let store = InMemoryStore::new();
        store.fail_next_commit("disk full").unwrap();

        let err = Seeder::<Person, _>::builder(&store)
            .build()
            .execute(&alice_and_bob())
            .unwrap_err();
        assert_eq!(
            err,
            FixtureError::Persistence(StoreError::CommitFailed {
                reason: "disk full".to_string()
            })
        );
        assert_eq!(store.count::<Person>().unwrap(), 0);
        assert_eq!(store.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_add_failure_rolls_back_staged_entities() {
        let store = InMemoryStore::new();
        store.fail_add_after(1, "unique constraint").unwrap();

        let result = Seeder::<Person, _>::builder(&store)
            .build()
            .execute(&alice_and_bob());
        assert_eq!(
            result,
            Err(FixtureError::Persistence(StoreError::AddFailed {
                entity: "Person",
                reason: "unique constraint".to_string()
            }))
        );
        assert_eq!(store.pending_count().unwrap(), 0);

        // Alice was staged before Bob failed; a later commit must not publish her.
        store.commit().unwrap();
        assert_eq!(store.count::<Person>().unwrap(), 0);
    }

    #[test]
    fn test_override_outside_field_range_fails_on_apply() {
        let store = InMemoryStore::new();
        // i64::MAX is a valid Int at registration but does not fit Branch's i32
        let seeder = Seeder::<Account, _>::builder(&store)
            .fixed_value("Branch", i64::MAX)
            .unwrap()
            .build();

        let result = seeder.execute(&Table::from_rows([Row::new().with("Owner", "Alice")]));
        assert_coercion_error(&result, 1);
        match result {
            Err(FixtureError::Coercion { field, .. }) => assert_eq!(field, "Branch"),
            other => panic!("Expected Coercion error, got: {:?}", other),
        }
        assert_eq!(store.pending_count().unwrap(), 0);
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn test_materialize_failure_adds_nothing() {
        let store = InMemoryStore::new();
        let table = Table::from_rows([
            Row::new().with("Name", "Alice").with("Age", "30"),
            Row::new().with("Name", "Bob").with("Age", "x"),
        ]);
        let err = Seeder::<Person, _>::builder(&store)
            .build()
            .execute(&table)
            .unwrap_err();
        assert_eq!(err.row(), Some(2));
        assert_eq!(store.pending_count().unwrap(), 0);
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn test_custom_mapper_is_used() {
        struct Fixed;
        impl RowMapper<Person> for Fixed {
            fn map_rows(
                &self,
                _table: &Table,
            ) -> Result<Vec<MappedRow<Person>>, seedcheck_core::MaterializeError> {
                Ok(vec![MappedRow {
                    entity: Person::named("Mapped"),
                    supplied: vec!["Name"],
                }])
            }
        }

        let store = InMemoryStore::new();
        let people = Seeder::<Person, _>::builder(&store)
            .with_mapper(Fixed)
            .default_value("Age", 7)
            .unwrap()
            .build()
            .execute(&Table::new())
            .unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].name, "Mapped");
        assert_eq!(people[0].age, 7);
    }

    #[test]
    fn test_empty_table_commits_nothing_but_succeeds() {
        let store = InMemoryStore::new();
        let people = Seeder::<Person, _>::builder(&store)
            .build()
            .execute(&Table::new())
            .unwrap();
        assert!(people.is_empty());
        assert_eq!(store.commit_count(), 1);
    }
}
