//! Feed file parsing with encoding and delimiter auto-detection.
//!
//! Turns CSV or JSON input into [`Record`]s. Every CSV cell is kept as text;
//! an empty cell stays declared so that column presence still counts for
//! coverage.

use csv::{ReaderBuilder, Trim};
use serde_json::Value;
use std::path::Path;

use crate::error::{CsvError, CsvResult, PipelineError, PipelineResult};
use crate::models::{RawValue, Record};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records
    pub records: Vec<Record>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// A leading byte-order mark is dropped. Unknown encodings fall back to lossy
/// UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    if decoded.starts_with('\u{feff}') {
        Ok(decoded['\u{feff}'.len_utf8()..].to_string())
    } else {
        Ok(decoded)
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

/// Parse CSV text into records with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use feedcheck::parser::parse_str;
///
/// let records = parse_str("id;title\nSKU1;Shoe", ';').unwrap();
/// assert_eq!(records[0].text("title").as_deref(), Some("Shoe"));
/// ```
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<Vec<Record>> {
    parse_string_with_metadata(content, delimiter, "utf-8".to_string()).map(|r| r.records)
}

/// Parse CSV text with explicit delimiter and return metadata.
pub fn parse_string_with_metadata(content: &str, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let delimiter_byte = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::ParseError {
            line: 0,
            message: format!("Delimiter {:?} is not a single ASCII character", delimiter),
        })?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| row_error(&e))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| row_error(&e))?;
        if row.iter().all(str::is_empty) {
            continue;
        }

        // Short rows leave the trailing columns declared but empty
        let record: Record = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(i, header)| (header.clone(), RawValue::from(row.get(i).unwrap_or(""))))
            .collect();
        records.push(record);
    }

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
    })
}

fn row_error(e: &csv::Error) -> CsvError {
    CsvError::ParseError {
        line: e.position().map(|p| p.line() as usize).unwrap_or(0),
        message: e.to_string(),
    }
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("/path/to/feed.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Records: {}", result.records.len());
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse a JSON feed: an array of objects, or a single object.
pub fn parse_json_records(content: &str) -> PipelineResult<Vec<Record>> {
    let value: Value = serde_json::from_str(content)?;
    records_from_json(&value)
}

/// Convert decoded JSON into records. Every element must be an object.
pub fn records_from_json(value: &Value) -> PipelineResult<Vec<Record>> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Record::from_json(item).ok_or_else(|| {
                    PipelineError::UnsupportedInput(format!("element {} is not an object", i))
                })
            })
            .collect(),
        Value::Object(map) => Ok(vec![Record::from_map(map)]),
        _ => Err(PipelineError::UnsupportedInput(
            "expected a JSON array of objects".to_string(),
        )),
    }
}
