//! Tesseract TSV parsing
//!
//! Tesseract's `tsv` output has one row per layout element:
//!
//! ```text
//! level page_num block_num par_num line_num word_num left top width height conf text
//! ```
//!
//! Only level 5 rows are words.

use super::types::{EngineWord, OcrError, RawBox};

/// Layout level of word rows
const WORD_LEVEL: u32 = 5;

/// Number of columns before `text`
const FIXED_COLUMNS: usize = 11;

/// Parse word rows out of Tesseract TSV output
pub fn parse_tsv_words(tsv: &str) -> Result<Vec<EngineWord>, OcrError> {
    let mut words = Vec::new();

    for (line_no, line) in tsv.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with("level") {
            continue;
        }

        let columns: Vec<&str> = line.splitn(FIXED_COLUMNS + 1, '\t').collect();
        if columns.len() < FIXED_COLUMNS {
            return Err(OcrError::MalformedOutput(format!(
                "line {}: expected at least {} columns, got {}",
                line_no + 1,
                FIXED_COLUMNS,
                columns.len()
            )));
        }

        let level: u32 = parse_column(&columns, 0, line_no)?;
        if level != WORD_LEVEL {
            continue;
        }

        let left: i32 = parse_column(&columns, 6, line_no)?;
        let top: i32 = parse_column(&columns, 7, line_no)?;
        let width: i32 = parse_column(&columns, 8, line_no)?;
        let height: i32 = parse_column(&columns, 9, line_no)?;
        let confidence: f64 = parse_column(&columns, 10, line_no)?;
        let text = columns.get(FIXED_COLUMNS).copied().unwrap_or("").to_string();

        let bbox = RawBox {
            x0: left,
            y0: top,
            x1: left + width,
            y1: top + height,
        };

        words.push(EngineWord {
            text,
            bbox: (!bbox.is_empty()).then_some(bbox),
            confidence,
        });
    }

    Ok(words)
}

fn parse_column<T: std::str::FromStr>(
    columns: &[&str],
    index: usize,
    line_no: usize,
) -> Result<T, OcrError> {
    let raw = columns[index].trim();
    raw.parse().map_err(|_| {
        OcrError::MalformedOutput(format!(
            "line {}: column {} is not numeric: {:?}",
            line_no + 1,
            index + 1,
            raw
        ))
    })
}
