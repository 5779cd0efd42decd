//! CSV parser for question bank files.
//!
//! # Format
//! ```text
//! 問題番号,古文単語,日本語訳
//! 1,をかし,趣がある・風情がある
//! 2,あはれなり,"しみじみとした趣がある、かわいそうだ"
//! ```
//!
//! Columns are fixed: id, prompt, expected answer. Records end at `\n`,
//! `\r\n` or a bare `\r`; fields may be quoted with `"` and `""` is an
//! escaped quote inside a quoted field.

use crate::types::QuestionRecord;

/// Parse CSV text into question records.
///
/// Never fails. Rows with fewer than three fields, or with a blank prompt or
/// answer, are skipped. A blank id falls back to the 1-based position of the
/// record among accepted rows.
pub fn parse(content: &str, skip_header: bool) -> Vec<QuestionRecord> {
    let mut rows = parse_rows(content);
    if skip_header && !rows.is_empty() {
        rows.remove(0);
    }

    let mut records = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        let line = idx + 1 + usize::from(skip_header);
        match build_record(row, records.len() + 1) {
            Some(record) => records.push(record),
            None => tracing::debug!(row = line, "skipping malformed question row"),
        }
    }
    records
}

fn build_record(row: Vec<String>, position: usize) -> Option<QuestionRecord> {
    if row.len() < 3 {
        return None;
    }

    let prompt = row[1].trim();
    let expected_answer = row[2].trim();
    if prompt.is_empty() || expected_answer.is_empty() {
        return None;
    }

    let id = match row[0].trim() {
        "" => position.to_string(),
        id => id.to_string(),
    };

    Some(QuestionRecord {
        id,
        prompt: prompt.to_string(),
        expected_answer: expected_answer.to_string(),
    })
}

/// Split CSV text into rows of raw fields.
///
/// Blank lines produce no row. A quote still open at the end of input makes
/// the trailing row malformed; it is dropped with a warning.
pub fn parse_rows(content: &str) -> Vec<Vec<String>> {
    let mut reader = RowReader::new();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if reader.in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    reader.field.push('"');
                }
                '"' => reader.in_quotes = false,
                _ => reader.field.push(c),
            }
            continue;
        }

        match c {
            '"' => reader.in_quotes = true,
            ',' => reader.push_field(),
            '\n' | '\r' => {
                reader.end_row();
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            _ => reader.field.push(c),
        }
    }

    reader.finish()
}

struct RowReader {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    field: String,
    in_quotes: bool,
}

impl RowReader {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            row: Vec::new(),
            field: String::new(),
            in_quotes: false,
        }
    }

    fn push_field(&mut self) {
        self.row.push(std::mem::take(&mut self.field));
    }

    fn end_row(&mut self) {
        if !self.field.is_empty() || !self.row.is_empty() {
            self.push_field();
        }
        if !self.row.is_empty() {
            self.rows.push(std::mem::take(&mut self.row));
        }
    }

    fn finish(mut self) -> Vec<Vec<String>> {
        if self.in_quotes {
            tracing::warn!(
                rows = self.rows.len(),
                "unterminated quoted field at end of question bank; dropping last row"
            );
            return self.rows;
        }
        self.end_row();
        self.rows
    }
}
