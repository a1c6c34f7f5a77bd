use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum ModelError {
    /// A write targeted a locked coordinate. The grid is unchanged.
    CellLocked { row: usize, col: usize },
    /// An operation referenced a column name absent from the schema.
    FieldNotFound(String),
    /// A coordinate or index exceeds current table bounds.
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CellLocked { row, col } => write!(f, "cell ({row}, {col}) is locked"),
            Self::FieldNotFound(name) => write!(f, "field '{name}' not found"),
            Self::OutOfRange { row, col, rows, cols } => {
                write!(f, "({row}, {col}) out of range for {rows}x{cols} table")
            }
        }
    }
}

impl std::error::Error for ModelError {}
