//! seedcheck Steps - Table-Driven Seeding and Verification
//!
//! - [`Seeder`]: turn table rows into entities, apply fixed and default
//!   overrides, persist them in one commit.
//! - [`Verifier`]: locate each row's entity in the store by its lookup
//!   fields and compare its check fields, failing on the first bad row.
//!
//! ```ignore
//! let people = Seeder::<Person, _>::builder(&store)
//!     .default_value("Age", 25)?
//!     .build()
//!     .execute(&table)?;
//!
//! let found = Verifier::<Person, _>::builder(&store, ["Name"])?
//!     .check_fields(["Age"])?
//!     .build()
//!     .execute(&table)?;
//! ```

pub mod mapper;
pub mod seeder;
pub mod verifier;

pub use mapper::{MappedRow, RowMapper, SchemaRowMapper};
pub use seeder::{Override, Seeder, SeederBuilder};
pub use verifier::{CheckFields, Verifier, VerifierBuilder};
