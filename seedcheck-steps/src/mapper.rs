//! Row-to-entity materialization.

use seedcheck_core::{
    Entity, FieldAccessor, FieldValue, FixtureConfig, MaterializeError, Table,
    UnknownColumnPolicy,
};
use std::collections::HashMap;

/// An entity built from one row, with the fields that row actually supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow<T> {
    pub entity: T,
    /// Field names with a non-empty cell, in column order.
    pub supplied: Vec<&'static str>,
}

impl<T> MappedRow<T> {
    pub fn supplied(&self, field: &str) -> bool {
        self.supplied.iter().any(|f| *f == field)
    }
}

/// Converts table rows into entities of `T`, preserving row order.
pub trait RowMapper<T: Entity> {
    fn map_rows(&self, table: &Table) -> Result<Vec<MappedRow<T>>, MaterializeError>;
}

/// Row mapper driven by the entity schema.
///
/// An empty cell counts as "not supplied" and leaves the field at its
/// `Default` value. A header that loosely matches several members, or two
/// headers that land on the same field, fail the whole table.
#[derive(Debug, Clone, Default)]
pub struct SchemaRowMapper {
    config: FixtureConfig,
}

impl SchemaRowMapper {
    pub fn new(config: FixtureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    fn resolve_column<T: Entity>(
        &self,
        header: &str,
    ) -> Result<Option<FieldAccessor<T>>, MaterializeError> {
        let member = match T::member(header) {
            Some(member) => Some(member),
            None => {
                let loose: Vec<_> = T::members()
                    .iter()
                    .filter(|m| self.config.header_matching.matches(header, m.name()))
                    .collect();
                if loose.len() > 1 {
                    return Err(MaterializeError::AmbiguousColumn {
                        entity: T::ENTITY_NAME,
                        column: header.to_string(),
                        candidates: loose.iter().map(|m| m.name()).collect(),
                    });
                }
                loose.into_iter().next()
            }
        };

        match member {
            Some(member) => member
                .accessor()
                .map(Some)
                .ok_or_else(|| MaterializeError::ReadOnlyColumn {
                    entity: T::ENTITY_NAME,
                    column: header.to_string(),
                }),
            None => match self.config.unknown_columns {
                UnknownColumnPolicy::Reject => Err(MaterializeError::UnknownColumn {
                    entity: T::ENTITY_NAME,
                    column: header.to_string(),
                }),
                UnknownColumnPolicy::Ignore => {
                    tracing::debug!(entity = T::ENTITY_NAME, column = header, "Ignoring unknown column");
                    Ok(None)
                }
            },
        }
    }
}

impl<T: Entity> RowMapper<T> for SchemaRowMapper {
    fn map_rows(&self, table: &Table) -> Result<Vec<MappedRow<T>>, MaterializeError> {
        let mut columns: HashMap<&str, FieldAccessor<T>> = HashMap::new();
        let mut claimed: HashMap<&'static str, &str> = HashMap::new();
        for header in table.headers() {
            let Some(accessor) = self.resolve_column::<T>(header)? else {
                continue;
            };
            if let Some(first) = claimed.insert(accessor.name(), header) {
                return Err(MaterializeError::DuplicateColumn {
                    entity: T::ENTITY_NAME,
                    field: accessor.name(),
                    first: first.to_string(),
                    second: header.to_string(),
                });
            }
            columns.insert(header, accessor);
        }

        let mut mapped = Vec::with_capacity(table.len());
        for (index, row) in table.rows().iter().enumerate() {
            let row_no = index + 1;
            let mut entity = T::default();
            let mut supplied: Vec<&'static str> = Vec::new();

            for (header, cell) in row.cells() {
                let Some(accessor) = columns.get(header) else {
                    continue;
                };
                let text = if self.config.trim_cells { cell.trim() } else { cell };
                if text.is_empty() {
                    continue;
                }
                accessor
                    .set(&mut entity, FieldValue::Text(text.to_string()))
                    .map_err(|source| MaterializeError::InvalidCell {
                        row: row_no,
                        column: header.to_string(),
                        source,
                    })?;
                if !supplied.contains(&accessor.name()) {
                    supplied.push(accessor.name());
                }
            }

            mapped.push(MappedRow { entity, supplied });
        }

        tracing::debug!(entity = T::ENTITY_NAME, rows = mapped.len(), "Materialized table rows");
        Ok(mapped)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use seedcheck_core::{entity_schema, FieldType, HeaderMatching, Row};
    use seedcheck_test_utils::Person;

    fn map(config: FixtureConfig, table: &Table) -> Result<Vec<MappedRow<Person>>, MaterializeError> {
        SchemaRowMapper::new(config).map_rows(table)
    }

    #[test]
    fn test_maps_rows_in_order_with_presence() {
        let table = Table::parse(
            "| Name  | Age |
             | Alice | 30  |
             | Bob   |     |",
        )
        .unwrap();
        let rows = map(FixtureConfig::default(), &table).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entity.name, "Alice");
        assert_eq!(rows[0].entity.age, 30);
        assert_eq!(rows[0].supplied, vec!["Name", "Age"]);
        assert_eq!(rows[1].entity.name, "Bob");
        assert_eq!(rows[1].entity.age, 0);
        assert!(!rows[1].supplied("Age"));
    }

    #[test]
    fn test_loose_headers_match_field_names() {
        let table = Table::from_rows([Row::new().with("name", "Alice").with("E Mail", "a@x.io")]);
        let rows = map(FixtureConfig::default(), &table).unwrap();
        assert_eq!(rows[0].entity.email.as_deref(), Some("a@x.io"));

        let err = map(FixtureConfig::strict(), &table).unwrap_err();
        assert!(matches!(err, MaterializeError::UnknownColumn { .. }));
    }

    #[test]
    fn test_unknown_column_policy() {
        let table = Table::from_rows([Row::new().with("Name", "Alice").with("Shoe Size", "9")]);
        let err = map(FixtureConfig::default(), &table).unwrap_err();
        assert_eq!(
            err,
            MaterializeError::UnknownColumn {
                entity: "Person",
                column: "Shoe Size".to_string()
            }
        );

        let config = FixtureConfig::default().with_unknown_columns(UnknownColumnPolicy::Ignore);
        let rows = map(config, &table).unwrap();
        assert_eq!(rows[0].supplied, vec!["Name"]);
    }

    #[test]
    fn test_read_only_column_is_rejected() {
        let table = Table::from_rows([Row::new().with("DisplayName", "ALICE")]);
        let err = map(FixtureConfig::default(), &table).unwrap_err();
        assert!(matches!(err, MaterializeError::ReadOnlyColumn { .. }));
    }

    #[test]
    fn test_invalid_cell_names_row_and_column() {
        let table = Table::from_rows([
            Row::new().with("Name", "Alice").with("Age", "30"),
            Row::new().with("Name", "Bob").with("Age", "thirty"),
        ]);
        match map(FixtureConfig::default(), &table).unwrap_err() {
            MaterializeError::InvalidCell { row, column, source } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Age");
                assert_eq!(source.target, FieldType::Int);
            }
            other => panic!("Expected InvalidCell, got: {:?}", other),
        }
    }

    #[test]
    fn test_trim_cells() {
        let table = Table::from_rows([Row::new().with("Name", "Alice").with("Age", " 30 ")]);
        assert!(map(FixtureConfig::default(), &table).is_err());

        let rows = map(FixtureConfig::default().with_trim_cells(true), &table).unwrap();
        assert_eq!(rows[0].entity.age, 30);
    }

    #[test]
    fn test_exact_header_wins_over_loose_match() {
        let config = FixtureConfig::default().with_header_matching(HeaderMatching::Loose);
        let table = Table::from_rows([Row::new().with("Active", "true")]);
        let rows = map(config, &table).unwrap();
        assert!(rows[0].entity.active);
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Contact {
        first_name: String,
        legacy_first_name: String,
    }

    entity_schema! {
        Contact as "Contact" {
            "FirstName" => first_name: String,
            "First_Name" => legacy_first_name: String,
        }
    }

    #[test]
    fn test_loose_header_matching_two_members_is_ambiguous() {
        let table = Table::from_rows([Row::new().with("first name", "Ada")]);
        let result: Result<Vec<MappedRow<Contact>>, _> =
            SchemaRowMapper::new(FixtureConfig::default()).map_rows(&table);
        let err = result.unwrap_err();
        assert_eq!(
            err,
            MaterializeError::AmbiguousColumn {
                entity: "Contact",
                column: "first name".to_string(),
                candidates: vec!["FirstName", "First_Name"],
            }
        );

        // an exact header still picks its own member
        let table = Table::from_rows([Row::new().with("First_Name", "Ada")]);
        let rows: Vec<MappedRow<Contact>> =
            SchemaRowMapper::new(FixtureConfig::default()).map_rows(&table).unwrap();
        assert_eq!(rows[0].entity.legacy_first_name, "Ada");
        assert_eq!(rows[0].entity.first_name, "");
    }

    #[test]
    fn test_two_headers_for_one_field_are_rejected() {
        let table = Table::from_rows([Row::new().with("Age", "30").with("age", "31")]);
        let err = map(FixtureConfig::default(), &table).unwrap_err();
        assert_eq!(
            err,
            MaterializeError::DuplicateColumn {
                entity: "Person",
                field: "Age",
                first: "Age".to_string(),
                second: "age".to_string(),
            }
        );

        // strict matching leaves "age" unknown instead
        let err = map(FixtureConfig::strict(), &table).unwrap_err();
        assert!(matches!(err, MaterializeError::UnknownColumn { .. }));
    }
}
