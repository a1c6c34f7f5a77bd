use serde::Serialize;

// ---------------------------------------------------------------------------
// Per-row outcomes
// ---------------------------------------------------------------------------

/// What happened to one incoming row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowAction {
    /// Matched an existing row by key; `cells` non-blank values written.
    Updated { row: usize, cells: usize },
    /// No key match (or no derivable key); appended as a new entity.
    Appended { row: usize },
    /// The row could not be applied. The rest of the batch proceeds.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RowOutcome {
    /// Index of the row in the incoming batch, in original order.
    pub row: usize,
    /// Derived identity, if any. Keyless rows carry `null` here.
    pub key: Option<String>,
    pub action: RowAction,
}

// ---------------------------------------------------------------------------
// Batch summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub updated: usize,
    pub appended: usize,
    pub failed: usize,
    /// Writes skipped because the target cell was locked (stamp cells
    /// included). Locked skips are expected, not failures.
    pub locked_skips: usize,
    /// ISO date stamped into touched rows.
    pub stamped: String,
    pub outcomes: Vec<RowOutcome>,
}

impl MergeReport {
    pub fn new(stamped: String) -> Self {
        Self {
            updated: 0,
            appended: 0,
            failed: 0,
            locked_skips: 0,
            stamped,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome.action {
            RowAction::Updated { .. } => self.updated += 1,
            RowAction::Appended { .. } => self.appended += 1,
            RowAction::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}
