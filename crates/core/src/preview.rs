//! Advisory client-side preview of a delimited-text file.
//!
//! Only a short slice is materialised: the header row plus at most
//! [`PREVIEW_ROW_LIMIT`] data rows. Every other non-blank line is counted
//! but not parsed. The authoritative parse happens server-side on the full
//! file once the job is created.

use serde::{Deserialize, Serialize};

use crate::error::FileError;
use crate::types::SourceRow;

/// Maximum number of data rows kept in a preview.
pub const PREVIEW_ROW_LIMIT: usize = 5;

/// Delimiters offered to the user, in detection priority order.
pub const SUPPORTED_DELIMITERS: &[char] = &[',', ';', '\t', '|'];

/// Characters stripped from both ends of every cell.
const QUOTE_CHARS: &[char] = &['"', '\''];

/// Delimiter and header settings chosen on the file step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub delimiter: char,
    pub has_header: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }
}

/// Headers and a sample of rows extracted from the start of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub headers: Vec<String>,
    /// At most [`PREVIEW_ROW_LIMIT`] rows keyed by header.
    pub rows: Vec<SourceRow>,
    /// Number of data rows in the whole file.
    pub total_row_count: usize,
}

/// Parse the start of `bytes` into a [`PreviewResult`].
///
/// Blank lines are ignored everywhere. With `has_header` the first
/// non-blank line supplies the column names; without it the columns are
/// named `Column 1`, `Column 2`, ... and every line is a data row.
pub fn parse_preview(bytes: &[u8], options: FormatOptions) -> Result<PreviewResult, FileError> {
    let text = decode(bytes)?;
    let mut lines = non_blank_lines(text);

    let first = lines.next().ok_or(FileError::Empty)?;
    let first_cells = split_line(first, options.delimiter);

    let (headers, mut rows, mut total_row_count) = if options.has_header {
        (first_cells, Vec::new(), 0)
    } else {
        let headers: Vec<String> = (1..=first_cells.len())
            .map(|i| format!("Column {i}"))
            .collect();
        let row = to_row(&headers, first_cells);
        (headers, vec![row], 1)
    };

    for line in lines {
        total_row_count += 1;
        if rows.len() < PREVIEW_ROW_LIMIT {
            rows.push(to_row(&headers, split_line(line, options.delimiter)));
        }
    }

    Ok(PreviewResult {
        headers,
        rows,
        total_row_count,
    })
}

/// Guess the delimiter from the first non-blank line.
///
/// Picks the most frequent supported delimiter; ties go to the earlier
/// entry of [`SUPPORTED_DELIMITERS`]. Falls back to `,` when none occurs
/// or the bytes are not text.
pub fn detect_delimiter(bytes: &[u8]) -> char {
    let Ok(text) = decode(bytes) else {
        return ',';
    };
    let Some(first) = non_blank_lines(text).next() else {
        return ',';
    };

    let mut best = (',', 0usize);
    for &d in SUPPORTED_DELIMITERS {
        let count = first.matches(d).count();
        if count > best.1 {
            best = (d, count);
        }
    }
    best.0
}

// ---- private helpers ----

fn decode(bytes: &[u8]) -> Result<&str, FileError> {
    let text = std::str::from_utf8(bytes).map_err(|e| FileError::Read(e.to_string()))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|l| !l.trim().is_empty())
}

fn split_line(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(clean_cell).collect()
}

fn clean_cell(cell: &str) -> String {
    cell.trim().trim_matches(QUOTE_CHARS).trim().to_string()
}

fn to_row(headers: &[String], cells: Vec<String>) -> SourceRow {
    let mut cells = cells.into_iter();
    headers
        .iter()
        .map(|h| (h.clone(), cells.next().unwrap_or_default()))
        .collect()
}
