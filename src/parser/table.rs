use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").unwrap());

/// `None` is an absent cell (short row); `Some("")` is a present but empty one.
pub type Cell = Option<String>;

/// One HTML table as read from the page, before any reshaping.
///
/// A row that looks like a column header stays in `rows` and is only marked
/// by `header_row`; `promote_header` lifts it into `header` for tables that
/// are read by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub header: Option<Vec<String>>,
    pub header_row: Option<usize>,
    pub rows: Vec<Vec<Cell>>,
    /// Whole-table text content, used when a table is read as prose.
    pub text: String,
}

impl Grid {
    pub fn width(&self) -> usize {
        let header = self.header.as_ref().map_or(0, Vec::len);
        self.rows.iter().map(Vec::len).fold(header, usize::max)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Column names: the header where present, `x1..xn` elsewhere.
    pub fn column_names(&self) -> Vec<String> {
        (0..self.width())
            .map(|i| {
                self.header
                    .as_ref()
                    .and_then(|h| h.get(i))
                    .cloned()
                    .unwrap_or_else(|| format!("x{}", i + 1))
            })
            .collect()
    }

    /// Move the marked header row out of `rows` and into `header`.
    pub fn promote_header(&self) -> Grid {
        let Some(at) = self.header_row.filter(|&at| at < self.rows.len()) else {
            return self.clone();
        };
        let mut rows = self.rows.clone();
        let header = rows.remove(at).into_iter().map(Option::unwrap_or_default).collect();
        Grid {
            header: Some(header),
            header_row: None,
            rows,
            text: self.text.clone(),
        }
    }

    fn column_is_blank(&self, col: usize) -> bool {
        self.rows.iter().all(|r| is_blank(r.get(col).and_then(|c| c.as_deref())))
    }
}

pub fn is_blank(cell: Option<&str>) -> bool {
    cell.map_or(true, |s| s.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Datum {
    Number(f64),
    Text(String),
    Missing,
}

impl Datum {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Datum::Text(s) => Some(s),
            _ => None,
        }
    }

    fn from_cell(cell: Option<&Cell>) -> Self {
        match cell {
            Some(Some(s)) => Datum::Text(s.clone()),
            _ => Datum::Missing,
        }
    }
}

impl std::fmt::Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datum::Number(n) => write!(f, "{}", n),
            Datum::Text(s) => f.write_str(s),
            Datum::Missing => f.write_str("NA"),
        }
    }
}

/// A small named-column table nested inside one variable record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Datum>>,
}

impl NestedTable {
    /// Every row padded to `columns.len()` with missing cells.
    pub fn from_grid(grid: &Grid, columns: Vec<String>) -> Self {
        let rows = grid
            .rows
            .iter()
            .map(|r| (0..columns.len()).map(|i| Datum::from_cell(r.get(i))).collect())
            .collect();
        NestedTable { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Set `name` to the same value on every row, replacing an existing
    /// column of that name rather than adding a second one.
    pub fn broadcast(&mut self, name: &str, value: Datum) {
        match self.column_index(name) {
            Some(i) => {
                for row in &mut self.rows {
                    row[i] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    pub fn map_column(&mut self, name: &str, f: impl Fn(&Datum) -> Datum) {
        if let Some(i) = self.column_index(name) {
            for row in &mut self.rows {
                row[i] = f(&row[i]);
            }
        }
    }
}

#[cfg(test)]
impl Grid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Grid {
            rows,
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl NestedTable {
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Datum> + 'a> {
        let i = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[i]))
    }
}

// ── Reshaping rules ──

/// Name columns by position, ignoring any header the table carried.
pub fn rename_positional(grid: &Grid, names: &[&str]) -> NestedTable {
    NestedTable::from_grid(grid, names.iter().map(|n| n.to_string()).collect())
}

/// Remove every column whose cells are all absent or blank.
pub fn drop_empty_columns(grid: &Grid) -> Grid {
    let keep: Vec<usize> = (0..grid.width()).filter(|&c| !grid.column_is_blank(c)).collect();
    let names = grid.column_names();
    Grid {
        header: grid
            .header
            .as_ref()
            .map(|_| keep.iter().map(|&c| names[c].clone()).collect()),
        rows: grid
            .rows
            .iter()
            .map(|r| keep.iter().map(|&c| r.get(c).cloned().flatten()).collect())
            .collect(),
        header_row: grid.header_row,
        text: grid.text.clone(),
    }
}

/// Canonical lower-case/underscore form; `position` is 0-based.
/// `%` reads as `percent`.
pub fn normalize_column_name(name: &str, position: usize) -> String {
    let lower = name.trim().to_lowercase().replace('%', " percent ");
    let snake = NON_ALNUM_RE.replace_all(&lower, "_");
    let snake = snake.trim_matches('_');
    if snake.is_empty() {
        format!("x{}", position + 1)
    } else {
        snake.to_string()
    }
}

/// Normalize every name, suffixing repeats with `_2`, `_3`, ...
pub fn normalize_column_names(names: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let base = normalize_column_name(n, i);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            }
        })
        .collect()
}

pub fn is_plain_number(s: &str) -> bool {
    NUMBER_RE.is_match(s.trim())
}

/// Turn all-numeric text columns into numbers, except those in `keep_text`.
/// Blank cells do not block the conversion and become missing.
pub fn infer_column_types(table: &mut NestedTable, keep_text: &[&str]) {
    for (i, name) in table.columns.iter().enumerate() {
        if keep_text.contains(&name.as_str()) {
            continue;
        }
        let present: Vec<&str> = table
            .rows
            .iter()
            .filter_map(|r| r[i].as_text())
            .filter(|s| !s.trim().is_empty())
            .collect();
        if present.is_empty() || !present.iter().all(|s| is_plain_number(s)) {
            continue;
        }
        for row in &mut table.rows {
            let converted = match &row[i] {
                Datum::Text(s) if s.trim().is_empty() => Some(Datum::Missing),
                Datum::Text(s) => s.trim().parse::<f64>().ok().map(Datum::Number),
                _ => None,
            };
            if let Some(d) = converted {
                row[i] = d;
            }
        }
    }
}
