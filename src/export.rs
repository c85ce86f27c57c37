//! Tabular exports (CSV, TSV, JSON) streamed as response bodies.

use axum::body::Body;
use bytes::Bytes;
use futures::stream;
use std::{convert::Infallible, fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),
    #[error("failed to encode export: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Tsv => "text/tab-separated-values; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    fn delimiter(self) -> Option<char> {
        match self {
            ExportFormat::Csv => Some(','),
            ExportFormat::Tsv => Some('\t'),
            ExportFormat::Json => None,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Header row plus data rows, all rendered as text
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Encode into chunks; delimited formats yield one chunk per line
    pub fn encode(&self, format: ExportFormat) -> Result<Vec<Bytes>, ExportError> {
        match format.delimiter() {
            Some(delimiter) => {
                let mut chunks = Vec::with_capacity(self.rows.len() + 1);
                chunks.push(Bytes::from(encode_line(&self.headers, delimiter)));
                for row in &self.rows {
                    chunks.push(Bytes::from(encode_line(row, delimiter)));
                }
                Ok(chunks)
            }
            None => {
                let records: Vec<serde_json::Map<String, serde_json::Value>> = self
                    .rows
                    .iter()
                    .map(|row| {
                        self.headers
                            .iter()
                            .cloned()
                            .zip(row.iter().cloned().map(serde_json::Value::String))
                            .collect()
                    })
                    .collect();
                let body = serde_json::to_vec_pretty(&records)
                    .map_err(|e| ExportError::Encode(e.to_string()))?;
                Ok(vec![Bytes::from(body)])
            }
        }
    }

    /// Streaming response body for `format`
    pub fn into_body(self, format: ExportFormat) -> Result<Body, ExportError> {
        let chunks = self.encode(format)?;
        Ok(Body::from_stream(stream::iter(
            chunks.into_iter().map(Ok::<Bytes, Infallible>),
        )))
    }
}

fn encode_line(fields: &[String], delimiter: char) -> String {
    let mut line = fields
        .iter()
        .map(|f| quote_field(f, delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string());
    line.push_str("\r\n");
    line
}

/// RFC 4180 quoting: wrap in quotes when the field contains the delimiter,
/// a quote or a line break, doubling embedded quotes
fn quote_field(field: &str, delimiter: char) -> String {
    let needs_quotes = field
        .chars()
        .any(|c| c == delimiter || c == '"' || c == '\n' || c == '\r');
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sample() -> Dataset {
        let mut data = Dataset::new(["Part", "Quantity", "Note"]);
        data.push(vec!["Bob".into(), "1".into(), "keep, dry".into()]);
        data.push(vec!["Widget".into(), "2.5".into(), "say \"hi\"".into()]);
        data
    }

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" tsv ".parse::<ExportFormat>().unwrap(), ExportFormat::Tsv);
        assert_matches!(
            "xlsx".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(f)) if f == "xlsx"
        );
    }

    #[test]
    fn csv_quotes_where_needed() {
        let chunks = sample().encode(ExportFormat::Csv).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Part,Quantity,Note\r\n");
        assert_eq!(chunks[1], "Bob,1,\"keep, dry\"\r\n");
        assert_eq!(chunks[2], "Widget,2.5,\"say \"\"hi\"\"\"\r\n");
    }

    #[test]
    fn tsv_leaves_commas_alone() {
        let chunks = sample().encode(ExportFormat::Tsv).unwrap();
        assert_eq!(chunks[1], "Bob\t1\tkeep, dry\r\n");
    }

    #[test]
    fn json_is_a_list_of_records() {
        let chunks = sample().encode(ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&chunks[0]).unwrap();
        assert_eq!(value[0]["Part"], "Bob");
        assert_eq!(value[1]["Quantity"], "2.5");
    }

    #[tokio::test]
    async fn body_streams_every_chunk() {
        let body = sample().into_body(ExportFormat::Csv).unwrap();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Part,Quantity,Note\r\n"));
        assert_eq!(text.lines().count(), 3);
    }
}
