//! seedcheck Core - Entity Schemas, Values and Predicates
//!
//! Shared building blocks for table-driven fixtures:
//! - Typed field values and string coercion
//! - Entity schemas with resolvable field selectors
//! - Equality-conjunction predicates over entities
//! - Tables and rows of string cells
//! - Configuration and the error taxonomy
//!
//! All other seedcheck crates depend on this one.

pub mod config;
pub mod entity;
pub mod error;
pub mod predicate;
pub mod table;
pub mod value;

pub use config::{FixtureConfig, HeaderMatching, UnknownColumnPolicy};
pub use entity::{Entity, FieldAccessor, FieldSelector, Member, MemberKind, Record};
pub use error::{
    CoercionError, ConfigError, FieldError, FixtureError, FixtureResult, MaterializeError,
    PredicateError, StoreError, TableError,
};
pub use predicate::{FieldEquals, Predicate};
pub use table::{Row, Table};
pub use value::{FieldData, FieldType, FieldValue, Timestamp};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
