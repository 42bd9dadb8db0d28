//! JSON I/O handling for the CLI
//!
//! - Input: one JSON payload file
//! - Output: one JSON object on stdout

use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{CliError, CliResult};

/// Read and decode a JSON payload file
pub fn read_payload<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("failed to read {}: {}", path.display(), e)))?;
    if content.trim().is_empty() {
        return Err(CliError::payload_error(format!("{} is empty", path.display())));
    }
    serde_json::from_str(&content)
        .map_err(|e| CliError::payload_error(format!("invalid payload in {}: {}", path.display(), e)))
}

/// Write one pretty-printed JSON value to stdout
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, value)
        .map_err(|e| CliError::io_error(format!("JSON error: {}", e)))?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_server::ProcessRequest;
    use tempfile::tempdir;

    #[test]
    fn test_read_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("study.json");
        std::fs::write(
            &path,
            r#"{"business_metadata": {"product_name": "P", "study": "s1", "study_type": "t"},
                "storage_setup": {"data_schemas": ["raw"]},
                "description": "from file"}"#,
        )
        .unwrap();

        let request: ProcessRequest = read_payload(&path).unwrap();
        assert_eq!(request.payload.study(), "s1");
        assert_eq!(request.metadata.description.as_deref(), Some("from file"));
    }

    #[test]
    fn test_read_empty_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "  \n").unwrap();

        let err = read_payload::<ProcessRequest>(&path).unwrap_err();
        assert!(err.message().contains("is empty"));
    }
}
