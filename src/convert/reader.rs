//! Batch input readers
//!
//! Every format is read into the same loose shape: one JSON object per
//! record. Entries that cannot be read as an object are counted as
//! malformed and skipped; only an unreadable file fails the input.

use crate::config::InputFormat;
use crate::HarvestError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One input record before mapping
pub type RawRecord = Map<String, Value>;

/// Records read from one input file
#[derive(Debug, Default)]
pub struct InputRecords {
    pub records: Vec<RawRecord>,
    pub malformed: u32,
}

/// Reads an input file in the given format
///
/// # Returns
///
/// * `Ok(InputRecords)` - Parsed records plus the count of malformed entries
/// * `Err(HarvestError::Input)` - The file could not be read at all
pub fn read_input(path: &Path, format: InputFormat) -> crate::Result<InputRecords> {
    let input_error = |message: String| HarvestError::Input {
        path: path.display().to_string(),
        message,
    };

    let content = fs::read(path).map_err(|e| input_error(e.to_string()))?;

    match format {
        InputFormat::Jsonl => Ok(read_jsonl(&content)),
        InputFormat::JsonArray => read_json_array(&content).map_err(input_error),
        InputFormat::Csv => read_csv(&content).map_err(input_error),
    }
}

fn read_jsonl(content: &[u8]) -> InputRecords {
    let mut input = InputRecords::default();

    for (index, line) in content.split(|byte| *byte == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<Value>(line) {
            Ok(Value::Object(record)) => input.records.push(record),
            Ok(_) | Err(_) => {
                tracing::debug!("Malformed JSONL line {}", index + 1);
                input.malformed += 1;
            }
        }
    }

    input
}

fn read_json_array(content: &[u8]) -> Result<InputRecords, String> {
    let items = match serde_json::from_slice::<Value>(content) {
        Ok(Value::Array(items)) => items,
        Ok(_) => return Err("expected a JSON array".to_string()),
        Err(e) => return Err(e.to_string()),
    };

    let mut input = InputRecords::default();
    for item in items {
        match item {
            Value::Object(record) => input.records.push(record),
            _ => input.malformed += 1,
        }
    }
    Ok(input)
}

/// Rows with invalid UTF-8 fail to deserialize and count as malformed
fn read_csv(content: &[u8]) -> Result<InputRecords, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content);

    // A missing or broken header row fails the whole file
    reader.headers().map_err(|e| e.to_string())?;

    let mut input = InputRecords::default();
    for (index, row) in reader.deserialize::<HashMap<String, String>>().enumerate() {
        match row {
            Ok(row) => input.records.push(
                row.into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
            ),
            Err(e) => {
                // Header is row 1
                tracing::debug!("Malformed CSV row {}: {}", index + 2, e);
                input.malformed += 1;
            }
        }
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_input(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_jsonl_counts_malformed() {
        let file = write_input(
            "{\"url\": \"https://a.test/1\"}\n\nnot json\n[1, 2]\n{\"url\": \"https://a.test/2\"}\n",
        );
        let input = read_input(file.path(), InputFormat::Jsonl).unwrap();
        assert_eq!(input.records.len(), 2);
        assert_eq!(input.malformed, 2);
    }

    fn write_bytes(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_read_jsonl_invalid_utf8_line_is_malformed() {
        let mut content = b"{\"url\": \"https://a.test/1\"}\n".to_vec();
        content.extend_from_slice(b"{\"url\": \"https://a.test/2\", \"body\": \"\xE0\xA6\"}\n");
        content.extend_from_slice(b"{\"url\": \"https://a.test/3\"}\n");
        let file = write_bytes(&content);

        let input = read_input(file.path(), InputFormat::Jsonl).unwrap();
        assert_eq!(input.records.len(), 2);
        assert_eq!(input.malformed, 1);
        assert_eq!(input.records[1]["url"], "https://a.test/3");
    }

    #[test]
    fn test_read_csv_invalid_utf8_row_is_malformed() {
        let mut content = b"url,title\nhttps://a.test/1,First\n".to_vec();
        content.extend_from_slice(b"https://a.test/2,\xE0\xA6\n");
        content.extend_from_slice(b"https://a.test/3,Third\n");
        let file = write_bytes(&content);

        let input = read_input(file.path(), InputFormat::Csv).unwrap();
        assert_eq!(input.records.len(), 2);
        assert_eq!(input.malformed, 1);
        assert_eq!(input.records[1]["title"], "Third");
    }

    #[test]
    fn test_read_json_array() {
        let file = write_input(r#"[{"url": "https://a.test/1", "title": "T"}, "oops"]"#);
        let input = read_input(file.path(), InputFormat::JsonArray).unwrap();
        assert_eq!(input.records.len(), 1);
        assert_eq!(input.records[0]["title"], "T");
        assert_eq!(input.malformed, 1);

        let file = write_input(r#"{"url": "https://a.test/1"}"#);
        assert!(matches!(
            read_input(file.path(), InputFormat::JsonArray),
            Err(HarvestError::Input { .. })
        ));
    }

    #[test]
    fn test_read_csv_rows() {
        let file = write_input(
            "url,title,body,category\n\
             https://a.test/1,\"Title, with comma\",Body text,Politics\n\
             https://a.test/2,Short\n\
             https://a.test/3,Third,More text,Sports\n",
        );
        let input = read_input(file.path(), InputFormat::Csv).unwrap();
        assert_eq!(input.records.len(), 2);
        assert_eq!(input.malformed, 1);
        assert_eq!(input.records[0]["title"], "Title, with comma");
        assert_eq!(input.records[1]["category"], "Sports");
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = read_input(Path::new("/nonexistent/input.jsonl"), InputFormat::Jsonl);
        assert!(matches!(err, Err(HarvestError::Input { .. })));
    }
}
