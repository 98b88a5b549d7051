//! Configuration types

use serde::{Deserialize, Serialize};

/// How table headers are matched to entity field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderMatching {
    /// Header must equal the field name.
    Exact,
    /// Case-insensitive, ignoring whitespace and underscores ("First Name" ~ "FirstName").
    Loose,
}

impl HeaderMatching {
    /// True when `header` names the field `field` under this policy.
    pub fn matches(&self, header: &str, field: &str) -> bool {
        match self {
            HeaderMatching::Exact => header == field,
            HeaderMatching::Loose => normalize(header) == normalize(field),
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// What to do with a column that matches no property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnknownColumnPolicy {
    Reject,
    Ignore,
}

/// Settings shared by seeders and verifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub header_matching: HeaderMatching,
    pub unknown_columns: UnknownColumnPolicy,
    /// Trim cell text before conversion. Off by default so that `"42 "`
    /// is reported rather than silently accepted.
    pub trim_cells: bool,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            header_matching: HeaderMatching::Loose,
            unknown_columns: UnknownColumnPolicy::Reject,
            trim_cells: false,
        }
    }
}

impl FixtureConfig {
    /// Exact headers, unknown columns rejected, no trimming.
    pub fn strict() -> Self {
        Self {
            header_matching: HeaderMatching::Exact,
            ..Self::default()
        }
    }

    pub fn with_header_matching(mut self, header_matching: HeaderMatching) -> Self {
        self.header_matching = header_matching;
        self
    }

    pub fn with_unknown_columns(mut self, unknown_columns: UnknownColumnPolicy) -> Self {
        self.unknown_columns = unknown_columns;
        self
    }

    pub fn with_trim_cells(mut self, trim_cells: bool) -> Self {
        self.trim_cells = trim_cells;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
