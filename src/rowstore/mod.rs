// src/rowstore/mod.rs
//
// Narrow collaborator interface over the legacy row-store (originally a
// spreadsheet addressed by row/column position). The core assumes only
// that rows are ordered lists of text cells and that a header row names
// columns; everything position-dependent lives behind this boundary.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FunilError, Result};

/// Zero-based cell reference naming the top-left corner of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRef {
    pub row: usize,
    pub col: usize,
}

pub trait RowStore {
    /// All rows of a sheet, in order, header row first.
    fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    fn append_row(&mut self, sheet: &str, row: Vec<String>) -> Result<()>;

    /// Overlay `rows` onto the sheet starting at `range`, growing the
    /// sheet as needed.
    fn update_range(&mut self, sheet: &str, range: RangeRef, rows: Vec<Vec<String>>)
        -> Result<()>;
}

fn overlay(sheet: &mut Vec<Vec<String>>, range: RangeRef, rows: Vec<Vec<String>>) {
    for (i, incoming) in rows.into_iter().enumerate() {
        let row_idx = range.row + i;
        while sheet.len() <= row_idx {
            sheet.push(Vec::new());
        }
        let target = &mut sheet[row_idx];
        for (j, cell) in incoming.into_iter().enumerate() {
            let col_idx = range.col + j;
            while target.len() <= col_idx {
                target.push(String::new());
            }
            target[col_idx] = cell;
        }
    }
}

/// In-memory row-store used in tests and as the seed for new workspaces.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    sheets: HashMap<String, Vec<Vec<String>>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, rows: Vec<Vec<String>>) -> Self {
        self.sheets.insert(name.to_string(), rows);
        self
    }
}

impl RowStore for MemoryRowStore {
    fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(self.sheets.get(sheet).cloned().unwrap_or_default())
    }

    fn append_row(&mut self, sheet: &str, row: Vec<String>) -> Result<()> {
        self.sheets.entry(sheet.to_string()).or_default().push(row);
        Ok(())
    }

    fn update_range(
        &mut self,
        sheet: &str,
        range: RangeRef,
        rows: Vec<Vec<String>>,
    ) -> Result<()> {
        let target = self.sheets.entry(sheet.to_string()).or_default();
        overlay(target, range, rows);
        Ok(())
    }
}

/// Row-store persisted as one JSON file mapping sheet name to rows.
/// Saved after every mutation; the file doubles as the import/export
/// surface for the legacy spreadsheet data.
pub struct JsonRowStore {
    path: PathBuf,
    sheets: HashMap<String, Vec<Vec<String>>>,
}

impl JsonRowStore {
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = if path.exists() {
            let bytes = fs::read(path)?;
            serde_json::from_slice(&bytes)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    /// Create the backing file with seeded sheets, refusing to clobber
    /// an existing one.
    pub fn create(path: &Path, seed: HashMap<String, Vec<Vec<String>>>) -> Result<Self> {
        if path.exists() {
            return Err(FunilError::AlreadyInitialized);
        }
        let store = Self {
            path: path.to_path_buf(),
            sheets: seed,
        };
        store.save()?;
        Ok(store)
    }

    fn save(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.sheets)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl RowStore for JsonRowStore {
    fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(self.sheets.get(sheet).cloned().unwrap_or_default())
    }

    fn append_row(&mut self, sheet: &str, row: Vec<String>) -> Result<()> {
        self.sheets.entry(sheet.to_string()).or_default().push(row);
        self.save()
    }

    fn update_range(
        &mut self,
        sheet: &str,
        range: RangeRef,
        rows: Vec<Vec<String>>,
    ) -> Result<()> {
        let target = self.sheets.entry(sheet.to_string()).or_default();
        overlay(target, range, rows);
        self.save()
    }
}
