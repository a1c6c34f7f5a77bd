// tokengrid CLI - headless token inventory operations

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;

use tokengrid_engine::{CellValue, ModelError, Session};
use tokengrid_merge::{merge, MergeConfig};

use exit_codes::{
    EXIT_ERROR, EXIT_IMPORT_INVALID_CONFIG, EXIT_IMPORT_PARTIAL, EXIT_IMPORT_RUNTIME,
    EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "tokengrid")]
#[command(about = "Token inventory spreadsheet (CLI mode, headless)")]
#[command(version)]
struct Cli {
    /// Suppress diagnostics (errors only); RUST_LOG overrides
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the table to stdout, tab-separated
    #[command(after_help = "\
Examples:
  tokengrid show tokens.csv
  tokengrid show tokens.csv | column -t")]
    Show {
        /// Inventory file (CSV/TSV, first record = column names)
        file: PathBuf,
    },

    /// Set one cell and save (a locked cell is left unchanged)
    #[command(after_help = "\
Examples:
  tokengrid set tokens.csv --row 0 --col 4 --value 5
  tokengrid set tokens.csv --row 2 --col 1 --value ''")]
    Set {
        /// Inventory file
        file: PathBuf,

        /// Row index (0-based, header excluded)
        #[arg(long)]
        row: usize,

        /// Column index (0-based)
        #[arg(long)]
        col: usize,

        /// New cell text (empty clears the cell)
        #[arg(long)]
        value: String,
    },

    /// Lock cells against edits, paste, and merge overwrite
    #[command(after_help = "\
Examples:
  tokengrid lock tokens.csv 0,4
  tokengrid lock tokens.csv 0,4 1,4 2,4")]
    Lock {
        /// Inventory file
        file: PathBuf,

        /// Cells as ROW,COL pairs
        #[arg(required = true)]
        cells: Vec<String>,
    },

    /// Unlock previously locked cells
    #[command(after_help = "\
Examples:
  tokengrid unlock tokens.csv 0,4")]
    Unlock {
        /// Inventory file
        file: PathBuf,

        /// Cells as ROW,COL pairs
        #[arg(required = true)]
        cells: Vec<String>,
    },

    /// Merge a scraped batch into the inventory by composite key
    #[command(after_help = "\
Locked cells are never overwritten; blank incoming fields never erase
existing data. New entities are appended. Exit 5 means some rows failed
to apply — the merged table is still saved and the report names them.

Examples:
  tokengrid import tokens.csv scraped.csv
  tokengrid import tokens.csv scraped.csv --date 2026-08-24
  tokengrid import tokens.csv scraped.csv --config merge.toml --report report.json
  tokengrid import tokens.csv scraped.csv -o merged.csv")]
    Import {
        /// Authoritative inventory file
        base: PathBuf,

        /// Incoming batch file
        incoming: PathBuf,

        /// Merge config TOML (column names, transient columns)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Merge date stamped into touched rows (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,

        /// Write the per-row JSON report to a file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output file (default: overwrite the base file)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let result = match cli.command {
        Commands::Show { file } => cmd_show(&file),
        Commands::Set { file, row, col, value } => cmd_set(&file, row, col, &value),
        Commands::Lock { file, cells } => cmd_lock(&file, &cells, true),
        Commands::Unlock { file, cells } => cmd_lock(&file, &cells, false),
        Commands::Import {
            base,
            incoming,
            config,
            date,
            report,
            output,
        } => cmd_import(&base, &incoming, config, date, report, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            if let Some(hint) = e.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(e.code)
        }
    }
}

fn init_logging(quiet: bool) {
    let default = if quiet { "error" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

fn usage_err(msg: impl Into<String>) -> CliError {
    CliError {
        code: EXIT_USAGE,
        message: msg.into(),
        hint: None,
    }
}

fn io_err(msg: impl Into<String>) -> CliError {
    CliError {
        code: EXIT_ERROR,
        message: msg.into(),
        hint: None,
    }
}

/// Load the inventory and its lock sidecar into a session. Stale lock
/// entries are pruned to the loaded shape.
fn load_session(file: &Path) -> Result<Session, CliError> {
    let table = tokengrid_io::csv::import(file)
        .map_err(|e| io_err(format!("cannot read {}: {e}", file.display())))?;
    let locks = tokengrid_io::locks::load(file).unwrap_or_default();

    let mut session = Session::new();
    session.load(table.columns().to_vec(), table.rows().to_vec(), locks);
    Ok(session)
}

fn save_table(session: &Session, path: &Path) -> Result<(), CliError> {
    tokengrid_io::csv::export(session.table(), path)
        .map_err(|e| io_err(format!("cannot write {}: {e}", path.display())))
}

/// Parse a `ROW,COL` cell spec.
fn parse_cell(spec: &str) -> Result<(usize, usize), CliError> {
    let parts: Vec<&str> = spec.split(',').collect();
    let parsed = if parts.len() == 2 {
        parts[0].trim().parse().ok().zip(parts[1].trim().parse().ok())
    } else {
        None
    };
    parsed.ok_or_else(|| usage_err(format!("invalid cell '{spec}' (expected ROW,COL)")))
}

// -----------------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------------

fn cmd_show(file: &Path) -> Result<(), CliError> {
    let session = load_session(file)?;
    let table = session.table();

    println!("{}", table.columns().join("\t"));
    for row in 0..table.row_count() {
        let fields: Vec<&str> = (0..table.col_count())
            .map(|col| table.display(row, col))
            .collect();
        println!("{}", fields.join("\t"));
    }
    Ok(())
}

fn cmd_set(file: &Path, row: usize, col: usize, value: &str) -> Result<(), CliError> {
    let mut session = load_session(file)?;

    match session.set_cell(0, row, col, CellValue::from_input(value)) {
        Ok(()) => {}
        // Locked writes are a silent no-op, not a failure
        Err(ModelError::CellLocked { row, col }) => {
            eprintln!("cell ({row}, {col}) is locked; value unchanged");
            return Ok(());
        }
        Err(e) => return Err(usage_err(e.to_string())),
    }

    save_table(&session, file)?;
    session.mark_saved();
    Ok(())
}

fn cmd_lock(file: &Path, specs: &[String], lock: bool) -> Result<(), CliError> {
    let mut session = load_session(file)?;

    let mut coords = Vec::with_capacity(specs.len());
    for spec in specs {
        let (row, col) = parse_cell(spec)?;
        if row >= session.table().row_count() || col >= session.table().col_count() {
            return Err(usage_err(format!(
                "cell ({row}, {col}) out of range for {}x{} table",
                session.table().row_count(),
                session.table().col_count()
            )));
        }
        coords.push((row, col));
    }

    if lock {
        session.lock_cells(coords);
    } else {
        session.unlock_cells(coords);
    }

    tokengrid_io::locks::save(session.locks(), file)
        .map_err(|e| io_err(format!("cannot write lock sidecar: {e}")))?;
    info!(locks = session.locks().len(), "saved lock sidecar");
    Ok(())
}

fn cmd_import(
    base: &Path,
    incoming: &Path,
    config_path: Option<PathBuf>,
    date: Option<String>,
    report_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(&path).map_err(|e| CliError {
                code: EXIT_IMPORT_RUNTIME,
                message: format!("cannot read config {}: {e}", path.display()),
                hint: None,
            })?;
            MergeConfig::from_toml(&text).map_err(|e| CliError {
                code: EXIT_IMPORT_INVALID_CONFIG,
                message: e.to_string(),
                hint: None,
            })?
        }
        None => MergeConfig::default(),
    };

    let today = match date {
        Some(s) => chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|_| usage_err(format!("invalid date '{s}' (expected YYYY-MM-DD)")))?,
        None => chrono::Local::now().date_naive(),
    };

    let mut session = load_session(base)?;
    let batch = tokengrid_io::csv::import(incoming)
        .map_err(|e| io_err(format!("cannot read {}: {e}", incoming.display())))?;

    let report = session
        .with_table(0, |table| merge(table, batch, &config, today))
        .map_err(|e| CliError {
            code: EXIT_IMPORT_INVALID_CONFIG,
            message: e.to_string(),
            hint: None,
        })?;

    let out_path = output.as_deref().unwrap_or(base);
    save_table(&session, out_path)?;
    session.mark_saved();

    if let Some(ref path) = report_path {
        let json = serde_json::to_string_pretty(&report).map_err(|e| CliError {
            code: EXIT_IMPORT_RUNTIME,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        std::fs::write(path, json).map_err(|e| CliError {
            code: EXIT_IMPORT_RUNTIME,
            message: format!("cannot write report: {e}"),
            hint: None,
        })?;
        eprintln!("wrote {}", path.display());
    }

    // Human summary to stderr
    eprintln!(
        "import: {} updated, {} appended, {} failed, {} locked skips — saved {}",
        report.updated,
        report.appended,
        report.failed,
        report.locked_skips,
        out_path.display()
    );

    if report.failed > 0 {
        return Err(CliError {
            code: EXIT_IMPORT_PARTIAL,
            message: format!("{} row(s) failed to apply", report.failed),
            hint: Some("re-run with --report to see per-row outcomes".to_string()),
        });
    }
    Ok(())
}
