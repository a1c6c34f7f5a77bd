use std::collections::HashSet;

use tracing::warn;

/// Cell coordinates the user has marked immutable. Locks protect against
/// edits, paste, merge overwrite, and undo-restore; they are persisted in a
/// sidecar file next to the data file, not inside snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSet {
    cells: HashSet<(usize, usize)>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted `[row, col]` pairs. Bounds are not checked here;
    /// the caller prunes against the table shape after load.
    pub fn from_pairs(pairs: impl IntoIterator<Item = [usize; 2]>) -> Self {
        Self {
            cells: pairs.into_iter().map(|[r, c]| (r, c)).collect(),
        }
    }

    /// Sorted `[row, col]` pairs for the sidecar file. Sorting keeps the
    /// saved file stable across runs; order carries no meaning.
    pub fn to_pairs(&self) -> Vec<[usize; 2]> {
        let mut pairs: Vec<[usize; 2]> = self.cells.iter().map(|&(r, c)| [r, c]).collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells.contains(&(row, col))
    }

    /// Idempotent set union.
    pub fn lock(&mut self, coords: impl IntoIterator<Item = (usize, usize)>) {
        self.cells.extend(coords);
    }

    /// Idempotent set difference.
    pub fn unlock(&mut self, coords: impl IntoIterator<Item = (usize, usize)>) {
        for coord in coords {
            self.cells.remove(&coord);
        }
    }

    /// Drop entries outside the current table shape. Returns how many were
    /// dropped. Surviving entries are never remapped: a lock is a bare
    /// coordinate, exactly as the sidecar format stores it.
    pub fn prune(&mut self, rows: usize, cols: usize) -> usize {
        let before = self.cells.len();
        self.cells.retain(|&(r, c)| r < rows && c < cols);
        let dropped = before - self.cells.len();
        if dropped > 0 {
            warn!(dropped, rows, cols, "dropped out-of-bounds lock entries");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().copied()
    }
}
