use tracing::debug;

use crate::cell::CellValue;
use crate::error::ModelError;
use crate::history::Snapshot;
use crate::locks::LockSet;

/// The mutable table model: ordered column names, rectangular rows, and the
/// set of locked coordinates. All write paths go through the lock check;
/// structural edits that shrink the grid prune stale locks themselves.
///
/// Column name collisions are allowed by the model (uniqueness is a UI
/// concern), but name-based lookups resolve to the first match.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    locks: LockSet,
    dirty: bool,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Build from loader output. Rows are padded with `Missing` to the
    /// column count; excess cells beyond the column count are dropped.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let cols = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(cols, CellValue::Missing);
                row
            })
            .collect();
        Self {
            columns,
            rows,
            locks: LockSet::new(),
            dirty: false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// First column with this name, if any.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<(), ModelError> {
        if row >= self.rows.len() || col >= self.columns.len() {
            return Err(ModelError::OutOfRange {
                row,
                col,
                rows: self.rows.len(),
                cols: self.columns.len(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cell access
    // -----------------------------------------------------------------------

    pub fn get_cell(&self, row: usize, col: usize) -> Result<&CellValue, ModelError> {
        self.check_bounds(row, col)?;
        Ok(&self.rows[row][col])
    }

    pub fn get_field(&self, row: usize, name: &str) -> Result<&CellValue, ModelError> {
        let col = self
            .column_index(name)
            .ok_or_else(|| ModelError::FieldNotFound(name.to_string()))?;
        self.get_cell(row, col)
    }

    /// Visible text at a coordinate; empty for out-of-bounds. Used by the
    /// writer and any presentation layer, which want text, not errors.
    pub fn display(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(CellValue::display)
            .unwrap_or("")
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) -> Result<(), ModelError> {
        self.check_bounds(row, col)?;
        if self.locks.contains(row, col) {
            return Err(ModelError::CellLocked { row, col });
        }
        self.rows[row][col] = value;
        self.dirty = true;
        Ok(())
    }

    pub fn set_field(&mut self, row: usize, name: &str, value: CellValue) -> Result<(), ModelError> {
        let col = self
            .column_index(name)
            .ok_or_else(|| ModelError::FieldNotFound(name.to_string()))?;
        self.set_cell(row, col, value)
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    pub fn insert_row(&mut self, at: usize, values: Vec<CellValue>) -> Result<(), ModelError> {
        if at > self.rows.len() {
            return Err(ModelError::OutOfRange {
                row: at,
                col: 0,
                rows: self.rows.len(),
                cols: self.columns.len(),
            });
        }
        let mut row = values;
        row.resize(self.columns.len(), CellValue::Missing);
        self.rows.insert(at, row);
        self.dirty = true;
        Ok(())
    }

    pub fn append_row(&mut self, values: Vec<CellValue>) {
        let mut row = values;
        row.resize(self.columns.len(), CellValue::Missing);
        self.rows.push(row);
        self.dirty = true;
    }

    pub fn remove_row(&mut self, index: usize) -> Result<(), ModelError> {
        if index >= self.rows.len() {
            return Err(ModelError::OutOfRange {
                row: index,
                col: 0,
                rows: self.rows.len(),
                cols: self.columns.len(),
            });
        }
        self.rows.remove(index);
        self.dirty = true;
        self.prune_locks();
        Ok(())
    }

    /// Copies of a row are appended at the end, not inserted adjacent to the
    /// source, and carry cell text only — never lock status.
    pub fn duplicate_row(&mut self, index: usize, copies: usize) -> Result<(), ModelError> {
        if index >= self.rows.len() {
            return Err(ModelError::OutOfRange {
                row: index,
                col: 0,
                rows: self.rows.len(),
                cols: self.columns.len(),
            });
        }
        for _ in 0..copies {
            let copy = self.rows[index].clone();
            self.rows.push(copy);
        }
        if copies > 0 {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn add_column(&mut self, name: &str) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(CellValue::Missing);
        }
        self.dirty = true;
    }

    pub fn remove_column(&mut self, index: usize) -> Result<(), ModelError> {
        if index >= self.columns.len() {
            return Err(ModelError::OutOfRange {
                row: 0,
                col: index,
                rows: self.rows.len(),
                cols: self.columns.len(),
            });
        }
        self.columns.remove(index);
        for row in &mut self.rows {
            row.remove(index);
        }
        self.dirty = true;
        self.prune_locks();
        Ok(())
    }

    pub fn rename_column(&mut self, index: usize, new_name: &str) -> Result<(), ModelError> {
        if index >= self.columns.len() {
            return Err(ModelError::OutOfRange {
                row: 0,
                col: index,
                rows: self.rows.len(),
                cols: self.columns.len(),
            });
        }
        self.columns[index] = new_name.to_string();
        self.dirty = true;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Locks
    // -----------------------------------------------------------------------

    pub fn lock_cells(&mut self, coords: impl IntoIterator<Item = (usize, usize)>) {
        self.locks.lock(coords);
    }

    pub fn unlock_cells(&mut self, coords: impl IntoIterator<Item = (usize, usize)>) {
        self.locks.unlock(coords);
    }

    pub fn is_locked(&self, row: usize, col: usize) -> bool {
        self.locks.contains(row, col)
    }

    pub fn locks(&self) -> &LockSet {
        &self.locks
    }

    /// Replace the lock set wholesale (load path). Stale entries are pruned
    /// against the current shape.
    pub fn set_locks(&mut self, locks: LockSet) {
        self.locks = locks;
        self.prune_locks();
    }

    pub fn prune_locks(&mut self) -> usize {
        self.locks.prune(self.rows.len(), self.columns.len())
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Full text copy of the grid. Locks and column names are not captured;
    /// locks persist independently and survive undo/redo.
    pub fn snapshot(&self) -> Snapshot {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.display().to_string()).collect())
            .collect()
    }

    /// Resize to the given shape. New cells are `Missing`; columns gained
    /// this way get placeholder names (snapshots carry no headers). Shrinking
    /// prunes locks that fall off the grid.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        while self.columns.len() < cols {
            self.columns.push(format!("col_{}", self.columns.len()));
        }
        self.columns.truncate(cols);
        self.rows.resize_with(rows, Vec::new);
        for row in &mut self.rows {
            row.resize(cols, CellValue::Missing);
        }
        self.prune_locks();
    }

    /// Overwrite grid content from a snapshot, resizing to its shape first.
    /// Locked coordinates keep their current value: lock inviolability covers
    /// undo-restore as much as edits and merges. Empty text restores to
    /// `Missing`, so blank semantics stay uniform after a round trip.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        let rows = snapshot.len();
        let cols = snapshot.iter().map(Vec::len).max().unwrap_or(0);
        self.resize(rows, cols);
        for (r, snap_row) in snapshot.iter().enumerate() {
            for c in 0..cols {
                if self.locks.contains(r, c) {
                    continue;
                }
                let text = snap_row.get(c).map(String::as_str).unwrap_or("");
                self.rows[r][c] = CellValue::from_input(text);
            }
        }
        self.dirty = true;
        debug!(rows, cols, "restored snapshot");
    }

    // -----------------------------------------------------------------------
    // Dirty flag
    // -----------------------------------------------------------------------

    /// Whether the table content has changed since the last save. Lock
    /// changes never set this; the sidecar is persisted by its own path.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }
}
