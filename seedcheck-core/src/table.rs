//! Tables of string cells, as handed over by a scenario step.

use crate::error::TableError;
use serde::{Deserialize, Serialize};

/// One table record: ordered (header, cell) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(header, value);
        self
    }

    /// Set a cell. An existing header keeps its position and takes the new value.
    pub fn push(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((header, value)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<H: Into<String>, V: Into<String>> FromIterator<(H, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (H, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (h, v) in iter {
            row.push(h, v);
        }
        row
    }
}

/// Ordered sequence of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of all row headers in first-seen order.
    pub fn headers(&self) -> Vec<&str> {
        let mut headers: Vec<&str> = Vec::new();
        for header in self.rows.iter().flat_map(Row::headers) {
            if !headers.contains(&header) {
                headers.push(header);
            }
        }
        headers
    }

    /// Parse a Gherkin pipe table.
    ///
    /// The first non-blank line that is not a `#` comment is the header.
    /// Cells are trimmed; `\|`, `\\` and `\n` are unescaped.
    ///
    /// ```text
    /// | Name  | Age |
    /// | Alice | 30  |
    /// | Bob   |     |
    /// ```
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (header_line, header_text) = lines.next().ok_or(TableError::MissingHeader)?;
        let headers = split_cells(header_text, header_line)?;
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                return Err(TableError::EmptyHeader { column: i + 1 });
            }
            if headers[..i].contains(header) {
                return Err(TableError::DuplicateHeader {
                    header: header.clone(),
                });
            }
        }

        let mut table = Table::new();
        for (line, text) in lines {
            let cells = split_cells(text, line)?;
            if cells.len() != headers.len() {
                return Err(TableError::RaggedRow {
                    line,
                    expected: headers.len(),
                    found: cells.len(),
                });
            }
            table.push_row(headers.iter().cloned().zip(cells).collect());
        }
        Ok(table)
    }
}

fn split_cells(line: &str, line_no: usize) -> Result<Vec<String>, TableError> {
    let inner = line
        .strip_prefix('|')
        .and_then(|rest| rest.strip_suffix('|'))
        .ok_or(TableError::Malformed { line: line_no })?;

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => current.push('|'),
                Some('n') => current.push('\n'),
                Some('\\') => current.push('\\'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    Ok(cells)
}

// =============================================================================
// TESTS
// =============================================================================
