// ============================================================
// CSV INSPECTOR
// ============================================================
// Local pre-flight look at a CSV upload: encoding, delimiter,
// header and data row count

use csv::{ReaderBuilder, Trim};
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::borrow::Cow;

use crate::domain::error::AppError;

/// What the inspector learned about a CSV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSummary {
    pub encoding: &'static str,
    pub delimiter: u8,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl CsvSummary {
    /// Whether the service will only see the first `row_limit` rows
    pub fn exceeds(&self, row_limit: u32) -> bool {
        self.row_count > row_limit as usize
    }
}

/// CSV inspector with encoding and delimiter detection
pub struct CsvInspector {
    /// Number of lines sampled for delimiter detection
    sample_lines: usize,
}

impl Default for CsvInspector {
    fn default() -> Self {
        Self {
            sample_lines: 10,
        }
    }
}

impl CsvInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect raw file bytes
    pub fn inspect(&self, bytes: &[u8]) -> Result<CsvSummary, AppError> {
        let (content, encoding) = decode_content(bytes);
        let delimiter = Self::detect_delimiter(&content, self.sample_lines);

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.iter().all(|header| header.is_empty()) {
            return Err(AppError::ValidationError(
                "CSV file has no header row".to_string(),
            ));
        }

        let mut row_count = 0;
        for result in reader.records() {
            result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", row_count + 1, e))
            })?;
            row_count += 1;
        }

        Ok(CsvSummary {
            encoding,
            delimiter,
            headers,
            row_count,
        })
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str, sample_lines: usize) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];
        let lines: Vec<&str> = content.lines().take(sample_lines).collect();
        if lines.is_empty() {
            return b',';
        }

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        for &delimiter in &candidates {
            let counts: Vec<usize> = lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = counts.iter().sum::<usize>() as f32 / counts.len() as f32;
            let variance = counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / counts.len() as f32;
            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

/// UTF-8 (BOM stripped) when valid, Windows-1252 otherwise
fn decode_content(bytes: &[u8]) -> (Cow<'_, str>, &'static str) {
    let without_bom = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match UTF_8.decode_without_bom_handling_and_without_replacement(without_bom) {
        Some(content) => (content, UTF_8.name()),
        None => {
            let (content, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (content, WINDOWS_1252.name())
        }
    }
}
