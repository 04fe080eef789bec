// Whole-file JSON helpers
//
// Training artifacts are plain JSON arrays rewritten on every append. There is
// no locking: two writers racing on the same file can lose a record.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Load a JSON array. Missing, unreadable or malformed files read as empty.
pub fn load_json_array(path: &Path) -> Vec<Value> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Append one record to the array stored at `path`, creating it if needed
pub fn append_to_json_array<T: Serialize>(path: &Path, record: &T) -> Result<usize> {
    let mut items = load_json_array(path);
    items.push(serde_json::to_value(record).context("Failed to serialize record")?);
    write_pretty_json(path, &items)?;
    Ok(items.len())
}

/// Overwrite `path` with pretty-printed JSON, creating parent directories
pub fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Read and parse a JSON document, with the path in the error
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_creates_then_grows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("items.json");

        assert_eq!(append_to_json_array(&path, &json!({"n": 1})).unwrap(), 1);
        assert_eq!(append_to_json_array(&path, &json!({"n": 2})).unwrap(), 2);

        let items = load_json_array(&path);
        assert_eq!(items[1]["n"], 2);
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, "{not json").unwrap();

        assert!(load_json_array(&path).is_empty());
        assert_eq!(append_to_json_array(&path, &json!("x")).unwrap(), 1);
    }

    #[test]
    fn test_object_file_reads_as_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, r#"{"a": 1}"#).unwrap();
        assert!(load_json_array(&path).is_empty());
    }
}
