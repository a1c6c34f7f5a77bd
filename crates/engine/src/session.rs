use tracing::info;

use crate::cell::CellValue;
use crate::error::ModelError;
use crate::history::History;
use crate::locks::LockSet;
use crate::table::Table;

/// The orchestrator-facing facade: one table, one history, and the routing
/// between them. Every successful mutation notifies the history at the
/// caller-supplied tick; the presentation layer never reaches into either
/// component directly.
pub struct Session {
    table: Table,
    history: History,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
            history: History::new(),
        }
    }

    /// Establish the initial table and lock set. Stale lock entries are
    /// pruned to the loaded shape, the history is cleared, and the loaded
    /// state becomes the baseline snapshot undo returns to.
    pub fn load(&mut self, columns: Vec<String>, rows: Vec<Vec<CellValue>>, locks: LockSet) {
        let mut table = Table::from_parts(columns, rows);
        table.set_locks(locks);
        info!(
            rows = table.row_count(),
            cols = table.col_count(),
            locks = table.locks().len(),
            "loaded table"
        );
        self.table = table;
        self.history.clear();
        self.history.snapshot_now(&self.table);
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        self.table.rows()
    }

    pub fn locks(&self) -> &LockSet {
        self.table.locks()
    }

    pub fn display(&self, row: usize, col: usize) -> &str {
        self.table.display(row, col)
    }

    // -----------------------------------------------------------------------
    // Edits (each routes a change notification on success)
    // -----------------------------------------------------------------------

    pub fn set_cell(
        &mut self,
        now: u64,
        row: usize,
        col: usize,
        value: CellValue,
    ) -> Result<(), ModelError> {
        self.table.set_cell(row, col, value)?;
        self.history.note_change(now);
        Ok(())
    }

    pub fn set_field(
        &mut self,
        now: u64,
        row: usize,
        name: &str,
        value: CellValue,
    ) -> Result<(), ModelError> {
        self.table.set_field(row, name, value)?;
        self.history.note_change(now);
        Ok(())
    }

    pub fn insert_row(
        &mut self,
        now: u64,
        at: usize,
        values: Vec<CellValue>,
    ) -> Result<(), ModelError> {
        self.table.insert_row(at, values)?;
        self.history.note_change(now);
        Ok(())
    }

    pub fn remove_row(&mut self, now: u64, index: usize) -> Result<(), ModelError> {
        self.table.remove_row(index)?;
        self.history.note_change(now);
        Ok(())
    }

    pub fn duplicate_row(
        &mut self,
        now: u64,
        index: usize,
        copies: usize,
    ) -> Result<(), ModelError> {
        self.table.duplicate_row(index, copies)?;
        self.history.note_change(now);
        Ok(())
    }

    pub fn add_column(&mut self, now: u64, name: &str) {
        self.table.add_column(name);
        self.history.note_change(now);
    }

    pub fn remove_column(&mut self, now: u64, index: usize) -> Result<(), ModelError> {
        self.table.remove_column(index)?;
        self.history.note_change(now);
        Ok(())
    }

    pub fn rename_column(&mut self, now: u64, index: usize, new_name: &str) -> Result<(), ModelError> {
        self.table.rename_column(index, new_name)?;
        self.history.note_change(now);
        Ok(())
    }

    /// Batch mutation (merge, paste). The whole batch counts as one change
    /// for debounce purposes.
    pub fn with_table<R>(&mut self, now: u64, f: impl FnOnce(&mut Table) -> R) -> R {
        let result = f(&mut self.table);
        self.history.note_change(now);
        result
    }

    // -----------------------------------------------------------------------
    // Locks (not routed to history; locks live outside snapshots)
    // -----------------------------------------------------------------------

    pub fn lock_cells(&mut self, coords: impl IntoIterator<Item = (usize, usize)>) {
        self.table.lock_cells(coords);
    }

    pub fn unlock_cells(&mut self, coords: impl IntoIterator<Item = (usize, usize)>) {
        self.table.unlock_cells(coords);
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.table)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.table)
    }

    pub fn snapshot_now(&mut self) -> bool {
        self.history.snapshot_now(&self.table)
    }

    /// Drive the debounce clock. Returns true if a snapshot was captured.
    pub fn poll(&mut self, now: u64) -> bool {
        self.history.poll(now, &self.table)
    }

    pub fn is_dirty(&self) -> bool {
        self.table.is_dirty()
    }

    pub fn mark_saved(&mut self) {
        self.table.mark_saved();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn loaded() -> Session {
        let mut session = Session::new();
        session.load(
            vec!["contract_address".into(), "token_id".into(), "qty".into()],
            vec![
                vec![text("0xABC"), text("7"), text("3")],
                vec![text("0xDEF"), text("1"), text("10")],
            ],
            LockSet::new(),
        );
        session
    }

    #[test]
    fn load_prunes_stale_locks() {
        let mut session = Session::new();
        session.load(
            vec!["a".into()],
            vec![vec![text("1")]],
            LockSet::from_pairs([[0, 0], [7, 7]]),
        );
        assert_eq!(session.locks().len(), 1);
        assert!(session.locks().contains(0, 0));
    }

    #[test]
    fn load_pushes_baseline_snapshot() {
        let mut session = loaded();
        // One edit, one snapshot, then undo returns to the loaded state
        session.set_cell(0, 0, 2, text("99")).unwrap();
        assert!(session.poll(500));
        assert!(session.undo());
        assert_eq!(session.display(0, 2), "3");
    }

    #[test]
    fn burst_of_edits_polls_to_one_snapshot() {
        let mut session = loaded();
        for tick in 0..5u64 {
            session.set_cell(tick * 10, 0, 2, text(&tick.to_string())).unwrap();
        }
        assert!(session.poll(1000));
        assert!(!session.poll(2000));
        assert!(session.undo());
        assert_eq!(session.display(0, 2), "3");
    }

    #[test]
    fn locked_edit_is_rejected_and_not_recorded() {
        let mut session = loaded();
        session.lock_cells([(0, 2)]);
        assert!(matches!(
            session.set_cell(0, 0, 2, text("99")),
            Err(ModelError::CellLocked { .. })
        ));
        assert_eq!(session.display(0, 2), "3");
        // No change notification happened
        assert!(!session.poll(10_000));
    }

    #[test]
    fn with_table_notifies_once() {
        let mut session = loaded();
        session.with_table(0, |table| {
            table.set_cell(0, 2, text("4")).unwrap();
            table.set_cell(1, 2, text("11")).unwrap();
        });
        assert!(session.poll(500));
        assert!(session.undo());
        assert_eq!(session.display(0, 2), "3");
        assert_eq!(session.display(1, 2), "10");
    }
}
