use serde::Deserialize;

use crate::error::MergeError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub columns: ColumnNames,
    /// Display-only column names stripped from the incoming batch before
    /// harmonization: selection checkboxes, spreadsheet auto-index columns.
    /// UI artifacts, never domain data.
    pub transient_columns: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            transient_columns: vec![
                "selected".to_string(),
                "Unnamed: 0".to_string(),
                "index".to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// The reference field holding the locator URL keys are derived from.
    pub locator: String,
    pub chain: String,
    pub contract: String,
    pub token_id: String,
    /// Stamped with the merge date on every touched row.
    pub stamp: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            locator: "link".to_string(),
            chain: "chain".to_string(),
            contract: "contract_address".to_string(),
            token_id: "token_id".to_string(),
            stamp: "last_scrape_date".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        let named = [
            ("locator", &self.columns.locator),
            ("chain", &self.columns.chain),
            ("contract", &self.columns.contract),
            ("token_id", &self.columns.token_id),
            ("stamp", &self.columns.stamp),
        ];

        for (role, name) in &named {
            if name.trim().is_empty() {
                return Err(MergeError::ConfigValidation(format!(
                    "column name for '{role}' must not be empty"
                )));
            }
        }

        // Stripping a key column from the batch would break matching
        for (role, name) in &named {
            if self.transient_columns.iter().any(|t| t == *name) {
                return Err(MergeError::ConfigValidation(format!(
                    "'{name}' ({role}) cannot be listed in transient_columns"
                )));
            }
        }

        Ok(())
    }
}
