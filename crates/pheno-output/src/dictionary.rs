use std::fs;
use std::path::Path;

use pheno_model::MetadataDictionary;

use crate::error::{OutputError, Result};

/// Pretty JSON for the dictionary, columns in table order.
pub fn render_dictionary(dictionary: &MetadataDictionary) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(dictionary)?;
    text.push('\n');
    Ok(text)
}

/// Writes the dictionary as the table's JSON sidecar.
pub fn write_dictionary(dictionary: &MetadataDictionary, path: &Path) -> Result<()> {
    let text = render_dictionary(dictionary).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|e| OutputError::io(path, e))
}
