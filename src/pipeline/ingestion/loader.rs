use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::types::RawRecord;

/// Read the feed file and decode its top-level array. Elements are returned
/// as-is; cleaning happens in the sanitizer.
pub fn load_feed(path: &Path) -> Result<Vec<RawRecord>> {
    if !path.is_file() {
        return Err(ImportError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = content.len(), "feed read");

    let value: serde_json::Value = serde_json::from_str(&content)?;
    let serde_json::Value::Array(records) = value else {
        return Err(ImportError::InvalidFeed(format!(
            "expected a top-level array in {}",
            path.display()
        )));
    };

    info!(path = %path.display(), records = records.len(), "feed loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn feed(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_array_elements_untouched() {
        let file = feed(r#"[{"name": "Uni A"}, 42, {}]"#);
        let records = load_feed(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], serde_json::json!(42));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_feed(Path::new("/nonexistent/establishments.json")).unwrap_err();
        assert!(matches!(err, ImportError::MissingFile(_)));
    }

    #[test]
    fn non_array_is_invalid() {
        let file = feed(r#"{"name": "Uni A"}"#);
        assert!(matches!(load_feed(file.path()), Err(ImportError::InvalidFeed(_))));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let file = feed("[{\"name\": ");
        assert!(matches!(load_feed(file.path()), Err(ImportError::Json(_))));
    }
}
