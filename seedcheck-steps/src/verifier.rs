//! Verifying stored entities against a table.

use crate::mapper::{MappedRow, RowMapper, SchemaRowMapper};
use seedcheck_core::{
    ConfigError, Entity, FieldAccessor, FieldSelector, FixtureConfig, FixtureError, FixtureResult,
    Predicate, PredicateError, StoreError, Table,
};
use seedcheck_storage::EntityStore;
use std::fmt;

/// Which fields are compared once a row's entity has been found.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckFields<T> {
    /// Explicit ordered list. Empty means existence only.
    Listed(Vec<FieldAccessor<T>>),
    /// Every field the row supplied a cell for, in column order.
    SuppliedColumns,
}

impl<T> Default for CheckFields<T> {
    fn default() -> Self {
        CheckFields::Listed(Vec::new())
    }
}

fn resolve_all<T, I, F>(selectors: I) -> FixtureResult<Vec<FieldAccessor<T>>>
where
    T: Entity,
    I: IntoIterator<Item = F>,
    F: Into<FieldSelector<T>>,
{
    let mut resolved: Vec<FieldAccessor<T>> = Vec::new();
    for selector in selectors {
        let selector: FieldSelector<T> = selector.into();
        let accessor = selector.resolve()?;
        if !resolved.contains(&accessor) {
            resolved.push(accessor);
        }
    }
    Ok(resolved)
}

// ============================================================================
// BUILDER
// ============================================================================

/// Accumulates lookup and check configuration for a [`Verifier`].
pub struct VerifierBuilder<'s, T: Entity, S: EntityStore> {
    store: &'s S,
    lookup: Vec<FieldAccessor<T>>,
    check: CheckFields<T>,
    config: FixtureConfig,
    mapper: Option<Box<dyn RowMapper<T> + 's>>,
}

impl<'s, T: Entity, S: EntityStore> VerifierBuilder<'s, T, S> {
    /// Compare exactly these fields, in this order. An empty list checks existence only.
    pub fn check_fields<I, F>(mut self, selectors: I) -> FixtureResult<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldSelector<T>>,
    {
        self.check = CheckFields::Listed(resolve_all(selectors)?);
        Ok(self)
    }

    /// Compare every field each row supplied a value for.
    pub fn check_supplied_columns(mut self) -> Self {
        self.check = CheckFields::SuppliedColumns;
        self
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

    pub fn build(self) -> Verifier<'s, T, S> {
        let mapper: Box<dyn RowMapper<T> + 's> = match self.mapper {
            Some(mapper) => mapper,
            None => Box::new(SchemaRowMapper::new(self.config)),
        };
        Verifier {
            store: self.store,
            lookup: self.lookup,
            check: self.check,
            mapper,
        }
    }
}

// ============================================================================
// VERIFIER
// ============================================================================

/// Looks up each row's entity by its lookup fields and compares check fields.
///
/// Stops at the first row that fails. Never writes to the store.
pub struct Verifier<'s, T: Entity, S: EntityStore> {
    store: &'s S,
    lookup: Vec<FieldAccessor<T>>,
    check: CheckFields<T>,
    mapper: Box<dyn RowMapper<T> + 's>,
}

impl<'s, T: Entity, S: EntityStore> Verifier<'s, T, S> {
    /// Start a verifier that locates entities by `lookup`.
    ///
    /// # Errors
    /// Fails on an empty lookup list or a selector that does not resolve.
    /// Repeated selectors are collapsed, keeping the first position.
    pub fn builder<I, F>(store: &'s S, lookup: I) -> FixtureResult<VerifierBuilder<'s, T, S>>
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldSelector<T>>,
    {
        let lookup = resolve_all(lookup)?;
        if lookup.is_empty() {
            return Err(ConfigError::EmptyLookupFields {
                entity: T::ENTITY_NAME,
            }
            .into());
        }
        Ok(VerifierBuilder {
            store,
            lookup,
            check: CheckFields::default(),
            config: FixtureConfig::default(),
            mapper: None,
        })
    }

    pub fn lookup_fields(&self) -> &[FieldAccessor<T>] {
        &self.lookup
    }

    pub fn check(&self) -> &CheckFields<T> {
        &self.check
    }

    /// Verify every row of `table` and return the stored entities in row order.
    ///
    /// # Errors
    /// The first failing row aborts with [`FixtureError::MissingLookup`],
    /// [`FixtureError::NotFound`], [`FixtureError::Ambiguous`] or
    /// [`FixtureError::Mismatch`]. Other store failures surface as
    /// [`FixtureError::Persistence`].
    pub fn execute(&self, table: &Table) -> FixtureResult<Vec<T>> {
        let expected = self.mapper.map_rows(table)?;

        let mut found = Vec::with_capacity(expected.len());
        for (index, row) in expected.iter().enumerate() {
            let row_no = index + 1;
            match self.verify_row(row, row_no) {
                Ok(entity) => found.push(entity),
                Err(err) => {
                    tracing::warn!(entity = T::ENTITY_NAME, row = row_no, error = %err, "Verification failed");
                    return Err(err);
                }
            }
        }

        tracing::info!(entity = T::ENTITY_NAME, rows = found.len(), "Verified table");
        Ok(found)
    }

    fn verify_row(&self, row: &MappedRow<T>, row_no: usize) -> FixtureResult<T> {
        // an omitted lookup cell would otherwise search for the field's default
        if let Some(missing) = self.lookup.iter().find(|f| !row.supplied(f.name())) {
            return Err(FixtureError::MissingLookup {
                entity: T::ENTITY_NAME,
                row: row_no,
                field: missing.name().to_string(),
            });
        }

        let predicate = Predicate::matching(&row.entity, &self.lookup).map_err(|err| match err {
            PredicateError::Coercion { field, source } => FixtureError::Coercion {
                row: row_no,
                field,
                source,
            },
            PredicateError::Field(field) => field.into(),
            PredicateError::Empty { entity } => ConfigError::EmptyLookupFields { entity }.into(),
        })?;

        tracing::debug!(entity = T::ENTITY_NAME, row = row_no, lookup = %predicate, "Looking up row");
        let actual = match self.store.find_one(&predicate) {
            Ok(Some(actual)) => actual,
            Ok(None) => {
                return Err(FixtureError::NotFound {
                    entity: T::ENTITY_NAME,
                    row: row_no,
                    lookup: predicate.to_string(),
                })
            }
            Err(StoreError::AmbiguousMatch { matches, .. }) => {
                return Err(FixtureError::Ambiguous {
                    entity: T::ENTITY_NAME,
                    row: row_no,
                    matches,
                    lookup: predicate.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        match &self.check {
            CheckFields::Listed(fields) => {
                for field in fields {
                    compare(field, &row.entity, &actual, row_no)?;
                }
            }
            CheckFields::SuppliedColumns => {
                for name in &row.supplied {
                    let field = FieldSelector::<T>::from(*name).resolve()?;
                    compare(&field, &row.entity, &actual, row_no)?;
                }
            }
        }
        Ok(actual)
    }
}

fn compare<T: Entity>(
    field: &FieldAccessor<T>,
    expected: &T,
    actual: &T,
    row: usize,
) -> FixtureResult<()> {
    let expected = field.get(expected);
    let actual = field.get(actual);
    if expected == actual {
        return Ok(());
    }
    Err(FixtureError::Mismatch {
        entity: T::ENTITY_NAME,
        row,
        field: field.name().to_string(),
        expected,
        actual,
    })
}

impl<T: Entity, S: EntityStore> fmt::Debug for VerifierBuilder<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierBuilder")
            .field("entity", &T::ENTITY_NAME)
            .field("lookup", &self.lookup)
            .field("check", &self.check)
            .field("config", &self.config)
            .field("custom_mapper", &self.mapper.is_some())
            .finish()
    }
}

impl<T: Entity, S: EntityStore> fmt::Debug for Verifier<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("entity", &T::ENTITY_NAME)
            .field("lookup", &self.lookup)
            .field("check", &self.check)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
