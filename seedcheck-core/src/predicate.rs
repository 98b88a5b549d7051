//! Equality-conjunction predicates over entities.
//!
//! A [`Predicate`] is the AND of per-field equality tests. Target values are
//! converted to each field's declared type when the predicate is built, so
//! `"5"` against an integer field compares as `5`.

use crate::entity::{Entity, FieldAccessor, FieldSelector};
use crate::error::PredicateError;
use crate::value::FieldValue;
use std::fmt;

/// One `field == value` term with the value already in the field's type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEquals<T> {
    accessor: FieldAccessor<T>,
    value: FieldValue,
}

impl<T> FieldEquals<T> {
    pub fn field(&self) -> &'static str {
        self.accessor.name()
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn matches(&self, entity: &T) -> bool {
        self.accessor.get(entity) == self.value
    }
}

/// Conjunction of [`FieldEquals`] terms, evaluated in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate<T> {
    terms: Vec<FieldEquals<T>>,
}

impl<T: Entity> Predicate<T> {
    /// Build from resolved accessors and target values.
    ///
    /// A field that appears twice keeps its first position and its last value.
    pub fn build<I>(values: I) -> Result<Self, PredicateError>
    where
        I: IntoIterator<Item = (FieldAccessor<T>, FieldValue)>,
    {
        let mut terms: Vec<FieldEquals<T>> = Vec::new();
        for (accessor, value) in values {
            let value = accessor
                .coerce(&value)
                .map_err(|source| PredicateError::Coercion {
                    field: accessor.name().to_string(),
                    source,
                })?;
            match terms.iter_mut().find(|t| t.accessor == accessor) {
                Some(existing) => existing.value = value,
                None => terms.push(FieldEquals { accessor, value }),
            }
        }

        if terms.is_empty() {
            return Err(PredicateError::Empty {
                entity: T::ENTITY_NAME,
            });
        }
        Ok(Self { terms })
    }

    /// Build from field names, resolving each against the schema of `T`.
    pub fn from_named<I, S>(values: I) -> Result<Self, PredicateError>
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: Into<FieldSelector<T>>,
    {
        let resolved = values
            .into_iter()
            .map(|(selector, value)| {
                let selector: FieldSelector<T> = selector.into();
                Ok((selector.resolve()?, value))
            })
            .collect::<Result<Vec<_>, PredicateError>>()?;
        Self::build(resolved)
    }

    /// Equality predicate on `fields`, taking the target values from `entity`.
    pub fn matching(entity: &T, fields: &[FieldAccessor<T>]) -> Result<Self, PredicateError> {
        Self::build(fields.iter().map(|acc| (*acc, acc.get(entity))))
    }
}

impl<T> Predicate<T> {
    pub fn terms(&self) -> &[FieldEquals<T>] {
        &self.terms
    }

    /// True when every term holds. Stops at the first failing term.
    pub fn matches(&self, entity: &T) -> bool {
        self.terms.iter().all(|term| term.matches(entity))
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            match &term.value {
                FieldValue::Text(s) => write!(f, "{} = {:?}", term.field(), s)?,
                other => write!(f, "{} = {}", term.field(), other)?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
