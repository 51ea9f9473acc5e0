use std::fs;
use std::path::{Path, PathBuf};

use super::types::{ConvertError, ConvertResult};

/// Write validated steps as pretty-printed JSON (2-space indent).
///
/// The document is fully serialized before anything touches the disk, and is
/// written to a sibling `<output>.tmp` that is renamed into place. A stale temp
/// file from an earlier run is overwritten. The temp file is removed if either
/// the write or the rename fails, so no partial file is left behind.
pub fn write_steps(path: &Path, steps: &serde_json::Value) -> ConvertResult<()> {
    let mut body = serde_json::to_string_pretty(steps)?;
    body.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path);
    if let Err(e) = fs::write(&tmp_path, body).and_then(|()| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Read a steps document from disk
pub fn read_steps(path: &Path) -> ConvertResult<serde_json::Value> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ConvertError::InvalidSteps {
        path: path.to_path_buf(),
        source,
    })
}
