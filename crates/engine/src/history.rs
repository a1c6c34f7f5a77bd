use tracing::debug;

use crate::table::Table;

/// Full text copy of the grid at one point in time. Ordered rows of ordered
/// cell text; no locks, no column names.
pub type Snapshot = Vec<Vec<String>>;

const DEFAULT_DEBOUNCE_MS: u64 = 200;
const DEFAULT_MAX_ENTRIES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// A debounce deadline is armed. Further changes re-arm it; the capture
    /// fires on the first `poll` at or past the deadline.
    Pending { deadline: u64 },
    /// A snapshot is being written back; change notifications are ignored so
    /// the restore cannot re-trigger a capture.
    Restoring,
}

/// Debounced snapshot history over a [`Table`].
///
/// Time is an explicit caller-supplied millisecond tick. Re-arming the single
/// deadline on every change coalesces a burst of edits (a multi-cell paste,
/// a merge) into one snapshot; there is never more than one pending capture.
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_entries: usize,
    debounce_ms: u64,
    state: State,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES, DEFAULT_DEBOUNCE_MS)
    }

    pub fn with_limits(max_entries: usize, debounce_ms: u64) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries,
            debounce_ms,
            state: State::Idle,
        }
    }

    /// A cell or structural change happened at tick `now`. (Re)arms the
    /// debounce deadline unless a restore is in progress.
    pub fn note_change(&mut self, now: u64) {
        if self.state == State::Restoring {
            return;
        }
        self.state = State::Pending {
            deadline: now + self.debounce_ms,
        };
    }

    /// Fire an elapsed debounce deadline. Returns true if a snapshot was
    /// pushed.
    pub fn poll(&mut self, now: u64, table: &Table) -> bool {
        match self.state {
            State::Pending { deadline } if now >= deadline => {
                self.state = State::Idle;
                self.capture(table)
            }
            _ => false,
        }
    }

    /// Capture immediately, bypassing the debounce. Cancels any pending
    /// deadline so a later poll cannot double-capture.
    pub fn snapshot_now(&mut self, table: &Table) -> bool {
        self.state = State::Idle;
        self.capture(table)
    }

    /// Empty grids and snapshots equal to the top of the undo stack are
    /// discarded. A push clears the redo stack and evicts the oldest entry
    /// past the cap.
    fn capture(&mut self, table: &Table) -> bool {
        if table.row_count() == 0 || table.col_count() == 0 {
            return false;
        }
        let snapshot = table.snapshot();
        if self.undo_stack.last() == Some(&snapshot) {
            return false;
        }
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
        debug!(depth = self.undo_stack.len(), "captured snapshot");
        true
    }

    /// Restore the previous snapshot. The top of the undo stack is the
    /// current state, so fewer than two entries means nothing earlier to
    /// return to.
    pub fn undo(&mut self, table: &mut Table) -> bool {
        if self.undo_stack.len() < 2 {
            return false;
        }
        let current = self.undo_stack.pop().unwrap();
        self.redo_stack.push(current);
        let target = self.undo_stack.last().unwrap().clone();
        self.restore(table, &target);
        true
    }

    pub fn redo(&mut self, table: &mut Table) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        self.restore(table, &snapshot);
        self.undo_stack.push(snapshot);
        true
    }

    fn restore(&mut self, table: &mut Table, snapshot: &Snapshot) {
        self.state = State::Restoring;
        table.restore(snapshot);
        // Any deadline armed before the undo/redo is gone: a pending capture
        // firing after a restore would push the restored state as a new edit.
        self.state = State::Idle;
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.state = State::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample() -> Table {
        Table::from_parts(
            vec!["a".into(), "b".into()],
            vec![vec![text("1"), text("2")]],
        )
    }

    #[test]
    fn debounce_coalesces_burst_into_one_entry() {
        let mut table = sample();
        let mut history = History::new();
        history.snapshot_now(&table);

        // Burst of edits within the 200ms window
        for (tick, value) in [(0u64, "x"), (50, "y"), (100, "z")] {
            table.set_cell(0, 0, text(value)).unwrap();
            history.note_change(tick);
        }
        // Deadline re-armed to 100 + 200
        assert!(!history.poll(250, &table));
        assert!(history.poll(300, &table));
        assert_eq!(history.undo_depth(), 2);

        // Nothing pending afterwards
        assert!(!history.poll(1000, &table));
    }

    #[test]
    fn duplicate_snapshot_suppressed() {
        let table = sample();
        let mut history = History::new();
        assert!(history.snapshot_now(&table));
        assert!(!history.snapshot_now(&table));
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn empty_grid_not_captured() {
        let table = Table::new();
        let mut history = History::new();
        assert!(!history.snapshot_now(&table));
        assert_eq!(history.undo_depth(), 0);
    }

    #[test]
    fn undo_restores_pre_edit_state() {
        let mut table = sample();
        let mut history = History::new();
        history.snapshot_now(&table);

        table.set_cell(0, 0, text("edited")).unwrap();
        history.snapshot_now(&table);

        assert!(history.undo(&mut table));
        assert_eq!(table.display(0, 0), "1");
        assert_eq!(table.display(0, 1), "2");
    }

    #[test]
    fn undo_with_single_entry_is_noop() {
        let mut table = sample();
        let mut history = History::new();
        history.snapshot_now(&table);
        assert!(!history.undo(&mut table));
        assert_eq!(table.display(0, 0), "1");
    }

    #[test]
    fn redo_round_trip() {
        let mut table = sample();
        let mut history = History::new();
        history.snapshot_now(&table);

        table.set_cell(0, 0, text("edited")).unwrap();
        history.snapshot_now(&table);

        history.undo(&mut table);
        assert!(history.redo(&mut table));
        assert_eq!(table.display(0, 0), "edited");
        assert!(!history.redo(&mut table));
    }

    #[test]
    fn new_capture_clears_redo() {
        let mut table = sample();
        let mut history = History::new();
        history.snapshot_now(&table);

        table.set_cell(0, 0, text("a")).unwrap();
        history.snapshot_now(&table);
        history.undo(&mut table);
        assert!(history.can_redo());

        table.set_cell(0, 1, text("b")).unwrap();
        history.snapshot_now(&table);
        assert!(!history.can_redo());
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut table = sample();
        let mut history = History::with_limits(3, 200);
        for i in 0..5 {
            table.set_cell(0, 0, text(&i.to_string())).unwrap();
            history.snapshot_now(&table);
        }
        assert_eq!(history.undo_depth(), 3);
        // Oldest surviving entry is "2"
        history.undo(&mut table);
        history.undo(&mut table);
        assert!(!history.undo(&mut table));
        assert_eq!(table.display(0, 0), "2");
    }

    #[test]
    fn pending_deadline_cancelled_by_undo() {
        let mut table = sample();
        let mut history = History::new();
        history.snapshot_now(&table);

        table.set_cell(0, 0, text("a")).unwrap();
        history.snapshot_now(&table);

        // Arm a deadline, then undo before it fires
        table.set_cell(0, 1, text("b")).unwrap();
        history.note_change(10);
        history.undo(&mut table);

        // The stale deadline must not capture the restored state
        assert!(!history.poll(10_000, &table));
    }

    #[test]
    fn undo_restores_snapshot_shape() {
        let mut table = sample();
        let mut history = History::new();
        history.snapshot_now(&table);

        table.append_row(vec![text("3"), text("4")]);
        table.add_column("c");
        history.snapshot_now(&table);

        history.undo(&mut table);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.col_count(), 2);
    }
}
