// Lock sidecar: a JSON array of [row, col] pairs stored next to the data
// file. Out-of-bounds entries are not filtered here — the session prunes
// against the loaded table shape.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use tokengrid_engine::LockSet;

/// Sidecar path for a data file: `tokens.csv` → `tokens.locks.json`.
pub fn sidecar_path(data_path: &Path) -> PathBuf {
    let stem = data_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    data_path.with_file_name(format!("{stem}.locks.json"))
}

/// Load the sidecar, if present and parseable.
pub fn load(data_path: &Path) -> Option<LockSet> {
    let path = sidecar_path(data_path);
    let pairs: Vec<[usize; 2]> = fs::read_to_string(&path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())?;
    info!(count = pairs.len(), path = %path.display(), "loaded lock sidecar");
    Some(LockSet::from_pairs(pairs))
}

/// Save the sidecar. Pairs are written sorted so the file is stable across
/// runs; an empty lock set still writes a file (an explicit empty list).
pub fn save(locks: &LockSet, data_path: &Path) -> Result<(), String> {
    let path = sidecar_path(data_path);
    let json = serde_json::to_string_pretty(&locks.to_pairs()).map_err(|e| e.to_string())?;
    fs::write(&path, json).map_err(|e| e.to_string())
}
