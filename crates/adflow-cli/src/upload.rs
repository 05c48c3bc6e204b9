// Upload metadata for local files
//
// The server stores metadata only; the file itself is expected at
// `<storage base>/<storage key>`.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use uuid::Uuid;

/// Guesses a MIME type from the file extension. Unknown extensions are left
/// empty so the server applies its own fallback.
pub fn guess_file_type(path: &Path) -> &'static str {
    mime_guess::from_path(path).first_raw().unwrap_or("")
}

/// Builds the upload request body for a local file.
pub fn describe_file(path: &Path, storage_base: &str) -> Result<Value> {
    let stat = std::fs::metadata(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    if !stat.is_file() {
        return Err(anyhow!("'{}' is not a file", path.display()));
    }

    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("'{}' has no file name", path.display()))?;
    let storage_key = format!("uploads/{}/{}", Uuid::new_v4(), filename);
    let storage_url = format!("{}/{}", storage_base.trim_end_matches('/'), storage_key);

    Ok(json!({
        "filename": filename,
        "storageKey": storage_key,
        "storageUrl": storage_url,
        "fileType": guess_file_type(path),
        "sizeBytes": stat.len(),
    }))
}
