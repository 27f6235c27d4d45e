//! CSV row dump parser with encoding and delimiter auto-detection.
//!
//! Reads `psql \copy ... CSV HEADER` style exports into [`Row`]s. Empty
//! cells become `null` (that is how `psql` writes SQL `NULL`). Array
//! columns stay as their PostgreSQL literal text and are split later by
//! [`parse_pg_array`].

use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::transform::Row;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows
    pub rows: Vec<Row>,
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

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // UTF-8, ASCII and anything unknown: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the header line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
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

/// Parse CSV text into rows with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use disco_migrate::parser::parse_csv;
///
/// let csv = "_id,generos\n1,\"{Rock,Jazz}\"\n2,";
/// let rows = parse_csv(csv, ',').unwrap();
///
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0].columns()["generos"], "{Rock,Jazz}");
/// assert!(rows[1].columns()["generos"].is_null());
/// ```
pub fn parse_csv(content: &str, delimiter: char) -> SourceResult<Vec<Row>> {
    parse_with_headers(content, delimiter).map(|(_, rows)| rows)
}

fn parse_with_headers(content: &str, delimiter: char) -> SourceResult<(Vec<String>, Vec<Row>)> {
    let delimiter = u8::try_from(delimiter).map_err(|_| SourceError::Csv {
        line: 1,
        message: format!("Unsupported delimiter '{}'", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(1, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(SourceError::Csv {
            line: 1,
            message: "No headers found".to_string(),
        });
    }

    let mut rows = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let line_num = idx + 2; // +1 for 0-index, +1 for header
        let record = record.map_err(|e| csv_error(line_num, e))?;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut columns = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = match record.get(i).map(str::trim) {
                None | Some("") => Value::Null,
                Some(cell) => Value::String(cell.to_string()),
            };
            columns.insert(header.clone(), value);
        }
        rows.push(Row::new(columns));
    }

    Ok((headers, rows))
}

fn csv_error(line: usize, err: csv::Error) -> SourceError {
    let line = err
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(line);
    SourceError::Csv {
        line,
        message: err.to_string(),
    }
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> SourceResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let (headers, rows) = parse_with_headers(&content, delimiter)?;
    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> SourceResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_bytes_auto(&bytes)
}

/// Split a PostgreSQL array literal such as `{Rock,"Hard Rock",NULL}`.
///
/// Returns `None` when `literal` is not a one-dimensional array literal.
/// Unquoted `NULL` becomes `null`; every other element stays text.
pub fn parse_pg_array(literal: &str) -> Option<Vec<Value>> {
    let inner = literal.trim().strip_prefix('{')?.strip_suffix('}')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        if chars.peek() == Some(&'"') {
            chars.next();
            let mut item = String::new();
            loop {
                match chars.next()? {
                    '\\' => item.push(chars.next()?),
                    '"' => break,
                    c => item.push(c),
                }
            }
            items.push(Value::String(item));
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
        } else {
            let mut item = String::new();
            while let Some(&c) = chars.peek() {
                match c {
                    ',' => break,
                    '{' | '}' | '"' => return None,
                    _ => {
                        item.push(c);
                        chars.next();
                    }
                }
            }
            let item = item.trim();
            if item.eq_ignore_ascii_case("NULL") {
                items.push(Value::Null);
            } else {
                items.push(Value::String(item.to_string()));
            }
        }

        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }

    Some(items)
}
