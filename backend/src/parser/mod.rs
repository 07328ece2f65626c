//! Input reader: CSV or JSON exports to [`RawRow`]s.
//!
//! CSV files get encoding and delimiter auto-detection. Cells stay text so
//! the locale parsers decide how to read numbers and dates; JSON numbers
//! become numeric cells.

use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{RawCell, RawRow};

/// Kind of input a [`ParseResult`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Csv,
    Json,
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub rows: Vec<RawRow>,
    pub format: InputFormat,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter (',' for JSON)
    pub delimiter: char,
    /// Column headers, in file order for CSV
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())),
        "iso-8859-1" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.into_owned())
        }
        label => encoding_rs::Encoding::for_label(label.as_bytes())
            .map(|enc| enc.decode(bytes).0.into_owned())
            .ok_or_else(|| CsvError::EncodingError(format!("unsupported encoding '{}'", label))),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Returns headers and rows. Blank lines are skipped, short lines are padded
/// with empty cells and extra trailing fields are ignored.
pub fn parse_csv(content: &str, delimiter: char) -> CsvResult<(Vec<String>, Vec<RawRow>)> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let row: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(i, header)| {
                let cell = match record.get(i) {
                    Some(value) if !value.is_empty() => RawCell::Text(value.to_string()),
                    _ => RawCell::Empty,
                };
                (header.clone(), cell)
            })
            .collect();
        rows.push(row);
    }

    Ok((headers, rows))
}

/// Parse a JSON array of objects (one object per row).
pub fn parse_json_rows(content: &str) -> CsvResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let value: Value = serde_json::from_str(content)?;
    let items = value.as_array().ok_or_else(|| CsvError::InvalidRow {
        line: 1,
        message: "expected an array of row objects".to_string(),
    })?;

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| CsvError::InvalidRow {
            line: i + 1,
            message: "expected an object".to_string(),
        })?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        rows.push(RawRow::from_json(item));
    }

    Ok(ParseResult {
        rows,
        format: InputFormat::Json,
        encoding: "utf-8".to_string(),
        delimiter: ',',
        headers,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let (headers, rows) = parse_csv(&content, delimiter)?;

    Ok(ParseResult {
        rows,
        format: InputFormat::Csv,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse a file: `.json` as a row dump, anything else as CSV.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let content = decode_content(&bytes, "utf-8")?;
        parse_json_rows(&content)
    } else {
        parse_bytes_auto(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(row: &RawRow, column: &str) -> Option<String> {
        row.get(column).and_then(RawCell::as_text)
    }

    #[test]
    fn test_simple_csv() {
        let (headers, rows) = parse_csv("name;age\nAlice;30\nBob;25", ';').unwrap();

        assert_eq!(headers, vec!["name", "age"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(text(&rows[0], "name").as_deref(), Some("Alice"));
        assert_eq!(text(&rows[1], "age").as_deref(), Some("25"));
    }

    #[test]
    fn test_quoted_values_keep_delimiters() {
        let csv = "SUPPLIER,Net KG Wt\n\"APP, China\",\"1,250.5\"";
        let (_, rows) = parse_csv(csv, ',').unwrap();

        assert_eq!(text(&rows[0], "SUPPLIER").as_deref(), Some("APP, China"));
        assert_eq!(rows[0].get("Net KG Wt"), Some(&RawCell::Text("1,250.5".into())));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let (_, rows) = parse_csv("a;b\n1;2\n\n;\n3;4\n", ';').unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_and_extra_values() {
        let (_, rows) = parse_csv("a;b;c\n1;;3\n4\n5;6;7;8", ';').unwrap();

        assert_eq!(rows[0].get("b"), Some(&RawCell::Empty));
        assert_eq!(rows[1].get("c"), Some(&RawCell::Empty));
        assert_eq!(rows[2].len(), 3);
    }

    #[test]
    fn test_bom_is_stripped() {
        let (headers, _) = parse_csv("\u{feff}DATE;HS CODE\n01/01/2024;4802", ';').unwrap();
        assert_eq!(headers[0], "DATE");
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv("", ';'), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b""), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto("name;age\nAlice;30\nBob;25".as_bytes()).unwrap();

        assert_eq!(result.format, InputFormat::Csv);
        assert_eq!(result.delimiter, ';');
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.headers, vec!["name", "age"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_unknown_encoding() {
        let err = decode_content(b"abc", "klingon-1").unwrap_err();
        assert!(matches!(err, CsvError::EncodingError(_)));
    }

    #[test]
    fn test_json_rows() {
        let content = r#"[{"DATE": "01/02/2024", "Net KG Wt": 12.5}, {"DATE": null, "ITEM": "HVS"}]"#;
        let result = parse_json_rows(content).unwrap();

        assert_eq!(result.format, InputFormat::Json);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("Net KG Wt"), Some(&RawCell::Number(12.5)));
        assert_eq!(result.rows[1].get("DATE"), Some(&RawCell::Empty));
        assert_eq!(result.headers.len(), 3);
    }

    #[test]
    fn test_json_rows_must_be_objects() {
        let err = parse_json_rows(r#"[{"a": 1}, 5]"#).unwrap_err();
        assert_eq!(err.to_string(), "Line 2: expected an object");
        assert!(parse_json_rows(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn test_parse_file_auto() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("impor.csv");
        std::fs::write(&csv_path, "HS CODE,qty\n4802,\"1,000\"\n").unwrap();
        let csv = parse_file_auto(&csv_path).unwrap();
        assert_eq!(csv.delimiter, ',');
        assert_eq!(csv.rows.len(), 1);

        let json_path = dir.path().join("impor.JSON");
        std::fs::write(&json_path, r#"[{"HS CODE": "4802"}]"#).unwrap();
        let json = parse_file_auto(&json_path).unwrap();
        assert_eq!(json.format, InputFormat::Json);

        let missing = parse_file_auto(dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(CsvError::IoError(_))));
    }
}
