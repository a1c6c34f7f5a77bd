use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use tokengrid_engine::{CellValue, ModelError, Table};

use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::locator::parse_locator;
use crate::report::{MergeReport, RowAction, RowOutcome};

/// Merge an incoming batch into the base table by composite key.
///
/// Non-destructive update semantics: incoming data can add information or
/// refresh tracked fields, never erase a field the user has filled in —
/// unless the batch supplies a new non-blank value — and locked cells are
/// inviolable regardless of batch content. Matched rows keep their position;
/// new entities are appended in batch order, so repeated imports stay
/// diff-friendly.
///
/// Each incoming row is applied independently and reported as its own
/// outcome; a malformed row becomes a `Failed` entry, not a batch abort.
pub fn merge(
    base: &mut Table,
    mut incoming: Table,
    config: &MergeConfig,
    today: NaiveDate,
) -> Result<MergeReport, MergeError> {
    config.validate()?;
    let stamp_text = today.format("%Y-%m-%d").to_string();
    let mut report = MergeReport::new(stamp_text.clone());

    report.locked_skips += derive_keys(base, config);
    derive_keys(&mut incoming, config);

    strip_transient(&mut incoming, config);
    harmonize(base, &mut incoming, config);

    let mut index = build_key_index(base, config);

    for r in 0..incoming.row_count() {
        let key = row_identity(&incoming, r, config);
        let action = match key.as_ref().and_then(|k| index.get(k).copied()) {
            Some(base_row) => apply_update(
                base,
                &incoming,
                r,
                base_row,
                config,
                &stamp_text,
                &mut report.locked_skips,
            ),
            None => {
                if key.is_none() {
                    warn!(row = r, "incoming row has no derivable key, appending");
                }
                apply_append(base, &incoming, r, config, &stamp_text)
            }
        };

        let action = action.unwrap_or_else(|e| RowAction::Failed {
            reason: e.to_string(),
        });

        // Appended rows join the index so a duplicate key later in the same
        // batch updates the new row instead of appending again.
        if let (Some(k), RowAction::Appended { row }) = (&key, &action) {
            index.insert(k.clone(), *row);
        }

        debug!(row = r, key = key.as_deref(), ?action, "merged row");
        report.record(RowOutcome { row: r, key, action });
    }

    info!(
        updated = report.updated,
        appended = report.appended,
        failed = report.failed,
        locked_skips = report.locked_skips,
        "merge complete"
    );
    Ok(report)
}

/// Run the locator through key derivation for every row, overwriting the
/// chain/contract/token_id fields only with components that derived. A row
/// whose locator fails to parse keeps whatever those fields already held.
/// Returns the number of writes skipped by locks.
fn derive_keys(table: &mut Table, config: &MergeConfig) -> usize {
    let Some(locator_col) = table.column_index(&config.columns.locator) else {
        return 0;
    };

    for name in [
        &config.columns.chain,
        &config.columns.contract,
        &config.columns.token_id,
    ] {
        if table.column_index(name).is_none() {
            table.add_column(name);
        }
    }

    let mut locked_skips = 0;
    for row in 0..table.row_count() {
        let key = parse_locator(table.display(row, locator_col));
        let derived = [
            (&config.columns.chain, key.chain),
            (&config.columns.contract, key.contract),
            (&config.columns.token_id, key.token_id),
        ];
        for (name, component) in derived {
            let Some(text) = component else { continue };
            match table.set_field(row, name, CellValue::Text(text)) {
                Ok(()) => {}
                Err(ModelError::CellLocked { .. }) => locked_skips += 1,
                // Columns were just ensured; nothing else can fail here
                Err(_) => {}
            }
        }
    }
    locked_skips
}

/// Drop display-only columns from the batch (selection checkboxes, auto-index
/// columns exported by spreadsheet tools).
fn strip_transient(incoming: &mut Table, config: &MergeConfig) {
    for name in &config.transient_columns {
        while let Some(index) = incoming.column_index(name) {
            // remove_column only fails out of bounds; column_index said it's there
            let _ = incoming.remove_column(index);
        }
    }
}

/// Bring both sides to the union schema: base order first, incoming-only
/// columns appended to base, base-only columns appended to incoming. New
/// columns are filled with the absent value. The stamp column always exists
/// on base after this.
fn harmonize(base: &mut Table, incoming: &mut Table, config: &MergeConfig) {
    let incoming_cols = incoming.columns().to_vec();
    for name in &incoming_cols {
        if base.column_index(name).is_none() {
            base.add_column(name);
        }
    }
    if base.column_index(&config.columns.stamp).is_none() {
        base.add_column(&config.columns.stamp);
    }
    let base_cols = base.columns().to_vec();
    for name in &base_cols {
        if incoming.column_index(name).is_none() {
            incoming.add_column(name);
        }
    }
}

/// Identity string → base row index. Built by insertion order, so a later
/// row with a duplicate key replaces the earlier entry.
fn build_key_index(base: &Table, config: &MergeConfig) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for row in 0..base.row_count() {
        if let Some(key) = row_identity(base, row, config) {
            index.insert(key, row);
        }
    }
    index
}

/// `contract + "_" + token_id` if both cells are non-blank.
fn row_identity(table: &Table, row: usize, config: &MergeConfig) -> Option<String> {
    let contract = table.get_field(row, &config.columns.contract).ok()?;
    let token_id = table.get_field(row, &config.columns.token_id).ok()?;
    if contract.is_blank() || token_id.is_blank() {
        return None;
    }
    Some(format!("{}_{}", contract.display(), token_id.display()))
}

/// Overwrite matched-row fields with every non-blank incoming value, then
/// stamp the merge date. Blank incoming cells and locked targets are left
/// untouched; a locked stamp cell survives too.
fn apply_update(
    base: &mut Table,
    incoming: &Table,
    incoming_row: usize,
    base_row: usize,
    config: &MergeConfig,
    stamp_text: &str,
    locked_skips: &mut usize,
) -> Result<RowAction, ModelError> {
    let mut cells = 0;
    for (col, name) in incoming.columns().iter().enumerate() {
        let value = incoming.get_cell(incoming_row, col)?;
        if value.is_blank() {
            continue;
        }
        match base.set_field(base_row, name, value.clone()) {
            Ok(()) => cells += 1,
            Err(ModelError::CellLocked { .. }) => *locked_skips += 1,
            Err(e) => return Err(e),
        }
    }

    match base.set_field(
        base_row,
        &config.columns.stamp,
        CellValue::Text(stamp_text.to_string()),
    ) {
        Ok(()) => {}
        Err(ModelError::CellLocked { .. }) => *locked_skips += 1,
        Err(e) => return Err(e),
    }

    Ok(RowAction::Updated {
        row: base_row,
        cells,
    })
}

/// Construct a new entity row aligned to the base schema, stamp it, and
/// append it.
fn apply_append(
    base: &mut Table,
    incoming: &Table,
    incoming_row: usize,
    config: &MergeConfig,
    stamp_text: &str,
) -> Result<RowAction, ModelError> {
    let mut values = vec![CellValue::Missing; base.col_count()];
    for (col, name) in incoming.columns().iter().enumerate() {
        if let Some(base_col) = base.column_index(name) {
            values[base_col] = incoming.get_cell(incoming_row, col)?.clone();
        }
    }
    if let Some(stamp_col) = base.column_index(&config.columns.stamp) {
        values[stamp_col] = CellValue::Text(stamp_text.to_string());
    }
    base.append_row(values);
    Ok(RowAction::Appended {
        row: base.row_count() - 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
    }

    fn base_table() -> Table {
        Table::from_parts(
            vec![
                "contract_address".into(),
                "token_id".into(),
                "qty".into(),
            ],
            vec![
                vec![text("0xABC"), text("7"), text("3")],
                vec![text("0xDEF"), text("1"), text("10")],
            ],
        )
    }

    fn incoming_with(columns: Vec<&str>, rows: Vec<Vec<CellValue>>) -> Table {
        Table::from_parts(columns.into_iter().map(String::from).collect(), rows)
    }

    #[test]
    fn matched_row_updates_non_blank_fields_only() {
        let mut base = base_table();
        let incoming = incoming_with(
            vec!["link", "qty", "owner"],
            vec![vec![
                text("https://app.example.com/assets/eth/0xABC/7.0"),
                CellValue::Missing,
                text("alice"),
            ]],
        );

        let report = merge(&mut base, incoming, &MergeConfig::default(), today()).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.appended, 0);

        // qty stays: incoming was blank
        assert_eq!(base.get_field(0, "qty").unwrap().display(), "3");
        assert_eq!(base.get_field(0, "owner").unwrap().display(), "alice");
        assert_eq!(base.get_field(0, "chain").unwrap().display(), "eth");
        assert_eq!(
            base.get_field(0, "last_scrape_date").unwrap().display(),
            "2026-08-24"
        );
        // The other base row is untouched
        assert_eq!(base.get_field(1, "qty").unwrap().display(), "10");
        assert!(base.get_field(1, "last_scrape_date").unwrap().is_blank());
    }

    #[test]
    fn unmatched_rows_append_in_batch_order() {
        let mut base = base_table();
        let incoming = incoming_with(
            vec!["contract_address", "token_id", "qty"],
            vec![
                vec![text("0xNEW"), text("5"), text("1")],
                vec![text("0xNEW"), text("6"), text("2")],
            ],
        );

        let report = merge(&mut base, incoming, &MergeConfig::default(), today()).unwrap();
        assert_eq!(report.appended, 2);
        assert_eq!(base.row_count(), 4);
        assert_eq!(base.get_field(2, "token_id").unwrap().display(), "5");
        assert_eq!(base.get_field(3, "token_id").unwrap().display(), "6");
        assert_eq!(
            base.get_field(3, "last_scrape_date").unwrap().display(),
            "2026-08-24"
        );
    }

    #[test]
    fn locked_cells_survive_merge() {
        let mut base = base_table();
        let qty_col = base.column_index("qty").unwrap();
        base.lock_cells([(0, qty_col)]);

        let incoming = incoming_with(
            vec!["contract_address", "token_id", "qty"],
            vec![vec![text("0xABC"), text("7"), text("999")]],
        );

        let report = merge(&mut base, incoming, &MergeConfig::default(), today()).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.locked_skips, 1);
        assert_eq!(base.get_field(0, "qty").unwrap().display(), "3");
    }

    #[test]
    fn locked_stamp_cell_survives() {
        let mut base = base_table();
        base.add_column("last_scrape_date");
        base.set_field(0, "last_scrape_date", text("2020-01-01"))
            .unwrap();
        let stamp_col = base.column_index("last_scrape_date").unwrap();
        base.lock_cells([(0, stamp_col)]);

        let incoming = incoming_with(
            vec!["contract_address", "token_id"],
            vec![vec![text("0xABC"), text("7")]],
        );

        let report = merge(&mut base, incoming, &MergeConfig::default(), today()).unwrap();
        assert_eq!(report.locked_skips, 1);
        assert_eq!(
            base.get_field(0, "last_scrape_date").unwrap().display(),
            "2020-01-01"
        );
    }

    #[test]
    fn merge_is_idempotent_except_stamp() {
        let mut once = base_table();
        let batch = incoming_with(
            vec!["contract_address", "token_id", "qty", "owner"],
            vec![
                vec![text("0xABC"), text("7"), text("4"), text("bob")],
                vec![text("0xNEW"), text("2"), text("1"), CellValue::Missing],
            ],
        );

        merge(&mut once, batch.clone(), &MergeConfig::default(), today()).unwrap();
        let after_one = once.snapshot();

        merge(
            &mut once,
            batch,
            &MergeConfig::default(),
            NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(),
        )
        .unwrap();
        let after_two = once.snapshot();

        // Same shape and content apart from the stamp column
        assert_eq!(after_one.len(), after_two.len());
        let stamp_col = once.column_index("last_scrape_date").unwrap();
        for (row_a, row_b) in after_one.iter().zip(after_two.iter()) {
            for (col, (a, b)) in row_a.iter().zip(row_b.iter()).enumerate() {
                if col == stamp_col {
                    continue;
                }
                assert_eq!(a, b);
            }
        }
        assert_eq!(once.display(0, stamp_col), "2026-08-25");
    }

    #[test]
    fn transient_columns_are_stripped() {
        let mut base = base_table();
        let incoming = incoming_with(
            vec!["selected", "Unnamed: 0", "contract_address", "token_id"],
            vec![vec![text("true"), text("0"), text("0xABC"), text("7")]],
        );

        merge(&mut base, incoming, &MergeConfig::default(), today()).unwrap();
        assert!(base.column_index("selected").is_none());
        assert!(base.column_index("Unnamed: 0").is_none());
    }

    #[test]
    fn keyless_incoming_row_appends_with_null_key() {
        let mut base = base_table();
        let incoming = incoming_with(
            vec!["link", "qty"],
            vec![vec![text("not-a-locator"), text("8")]],
        );

        let report = merge(&mut base, incoming, &MergeConfig::default(), today()).unwrap();
        assert_eq!(report.appended, 1);
        assert_eq!(report.outcomes[0].key, None);
        assert_eq!(base.row_count(), 3);
        assert_eq!(base.get_field(2, "qty").unwrap().display(), "8");
    }

    #[test]
    fn duplicate_key_within_batch_updates_the_appended_row() {
        let mut base = base_table();
        let incoming = incoming_with(
            vec!["contract_address", "token_id", "qty"],
            vec![
                vec![text("0xNEW"), text("9"), text("1")],
                vec![text("0xNEW"), text("9"), text("2")],
            ],
        );

        let report = merge(&mut base, incoming, &MergeConfig::default(), today()).unwrap();
        assert_eq!(report.appended, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(base.row_count(), 3);
        assert_eq!(base.get_field(2, "qty").unwrap().display(), "2");
    }

    #[test]
    fn derivation_failure_leaves_existing_fields_untouched() {
        let mut base = base_table();
        base.add_column("link");
        base.add_column("chain");
        base.set_field(0, "chain", text("polygon")).unwrap();
        base.set_field(0, "link", text("garbage")).unwrap();

        let incoming = incoming_with(
            vec!["contract_address", "token_id"],
            vec![vec![text("0xABC"), text("7")]],
        );

        merge(&mut base, incoming, &MergeConfig::default(), today()).unwrap();
        // Never blank a field because derivation failed
        assert_eq!(base.get_field(0, "chain").unwrap().display(), "polygon");
        assert_eq!(base.get_field(0, "contract_address").unwrap().display(), "0xABC");
    }

    #[test]
    fn invalid_config_is_a_batch_error() {
        let mut base = base_table();
        let incoming = incoming_with(vec!["qty"], vec![]);
        let mut config = MergeConfig::default();
        config.columns.stamp = String::new();
        assert!(matches!(
            merge(&mut base, incoming, &config, today()),
            Err(MergeError::ConfigValidation(_))
        ));
    }
}
