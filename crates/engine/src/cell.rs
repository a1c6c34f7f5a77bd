use serde::{Deserialize, Serialize};

/// A cell is either absent or holds text. There is no null sentinel:
/// "no value" is a variant, not an empty string with special meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Missing,
    Text(String),
}

impl CellValue {
    pub fn from_input(input: &str) -> Self {
        if input.trim().is_empty() {
            CellValue::Missing
        } else {
            CellValue::Text(input.to_string())
        }
    }

    pub fn display(&self) -> &str {
        match self {
            CellValue::Missing => "",
            CellValue::Text(s) => s,
        }
    }

    /// Blank = absent, or text that trims to nothing. Blank incoming cells
    /// never overwrite existing data during a merge.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Missing => true,
            CellValue::Text(s) => s.trim().is_empty(),
        }
    }
}
