//! Column-addressed table of optional string cells
//!
//! NPPES files are wide (300+ columns) and sparse, so cells stay as text until
//! a stage needs a number. A missing cell is `None`; an empty CSV field reads
//! as missing.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use super::DatasetError;

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

/// Borrowed view of one row
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    cells: &'a [Cell],
}

impl<'a> RowRef<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = *self.table.index.get(column)?;
        self.cells.get(idx)?.as_deref()
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(parse_number)
    }

    pub fn is_present(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }
}

/// Parse a numeric cell. "nan" and friends read as missing.
pub fn parse_number(s: &str) -> Option<f64> {
    let v: f64 = s.trim().parse().ok()?;
    if v.is_nan() {
        None
    } else {
        Some(v)
    }
}

/// Render a number the way the CSV writer stores it ("3", "0.8")
pub fn format_number(v: f64) -> String {
    v.to_string()
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Self {
            headers,
            index,
            rows: Vec::new(),
        }
    }

    /// Read CSV with a header row, keeping at most `limit` data rows
    pub fn from_reader<R: Read>(reader: R, limit: Option<usize>) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let width = headers.len();
        let mut table = Self::new(headers);

        for record in rdr.records() {
            if limit.is_some_and(|n| table.rows.len() >= n) {
                break;
            }
            let record = record?;
            let mut row: Vec<Cell> = record
                .iter()
                .take(width)
                .map(|field| {
                    if field.is_empty() {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect();
            row.resize(width, None);
            table.rows.push(row);
        }

        Ok(table)
    }

    pub fn read_csv(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatasetError::NotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        Self::from_reader(file, limit)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write CSV, creating parent directories
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        self.to_writer(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Error unless `column` exists
    pub fn require(&self, column: &str) -> Result<usize, DatasetError> {
        self.column_index(column)
            .ok_or_else(|| DatasetError::MissingColumn(column.to_string()))
    }

    pub fn row(&self, row: usize) -> Option<RowRef<'_>> {
        self.rows.get(row).map(|cells| RowRef { table: self, cells })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |cells| RowRef { table: self, cells })
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    pub fn get_f64(&self, row: usize, column: &str) -> Option<f64> {
        self.get(row, column).and_then(parse_number)
    }

    /// Set one cell; unknown columns are ignored
    pub fn set(&mut self, row: usize, column: &str, value: Cell) {
        if let Some(idx) = self.column_index(column) {
            if let Some(cells) = self.rows.get_mut(row) {
                cells[idx] = value;
            }
        }
    }

    /// Append a data row; short rows are padded with missing cells
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    /// Add or replace a whole column
    pub fn add_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), DatasetError> {
        if values.len() != self.rows.len() {
            return Err(DatasetError::Shape(format!(
                "column {} has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.index.insert(name.to_string(), self.headers.len());
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Add or replace a numeric column; `None` stays missing
    pub fn add_numeric_column(
        &mut self,
        name: &str,
        values: Vec<Option<f64>>,
    ) -> Result<(), DatasetError> {
        let cells = values.into_iter().map(|v| v.map(format_number)).collect();
        self.add_column(name, cells)
    }

    pub fn column(&self, column: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r[idx].as_deref()).collect())
    }

    pub fn numeric_column(&self, column: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(|r| r[idx].as_deref().and_then(parse_number))
                .collect(),
        )
    }

    /// A column is numeric when every present cell parses as a number
    pub fn is_numeric_column(&self, column: &str) -> bool {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .filter_map(|r| r[idx].as_deref())
                .all(|s| s.trim().parse::<f64>().is_ok()),
            None => false,
        }
    }

    /// Keep rows matching `keep`
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(RowRef<'_>) -> bool,
    {
        let rows = std::mem::take(&mut self.rows);
        let mut kept = Vec::with_capacity(rows.len());
        for cells in rows {
            let view = RowRef {
                table: self,
                cells: &cells,
            };
            if keep(view) {
                kept.push(cells);
            }
        }
        self.rows = kept;
    }

    /// New table with the given columns in the given order; unknown names skipped
    pub fn select(&self, columns: &[String]) -> Table {
        let picked: Vec<(String, usize)> = columns
            .iter()
            .filter_map(|c| self.column_index(c).map(|i| (c.clone(), i)))
            .collect();

        let mut out = Table::new(picked.iter().map(|(c, _)| c.clone()).collect());
        out.rows = self
            .rows
            .iter()
            .map(|r| picked.iter().map(|(_, i)| r[*i].clone()).collect())
            .collect();
        out
    }

    /// Apply `f` to every cell in place
    pub fn map_cells<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, Cell) -> Cell,
    {
        for row in &mut self.rows {
            for (idx, cell) in row.iter_mut().enumerate() {
                let value = cell.take();
                *cell = f(&self.headers[idx], value);
            }
        }
    }
}
