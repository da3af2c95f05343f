//! CSV export of posts and comments
//!
//! Each row is built from a fixed list of fields of the raw API object.
//! A few fields are renamed on the way out (`selftext` -> `body`,
//! `created` -> `date`, `link_flair_text` -> `flair`), timestamps are
//! rendered in a fixed UTC offset and permalinks are made absolute. A
//! leading unnamed index column keeps the layout of a pandas DataFrame dump.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// How a field's value is turned into a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Plain,
    Timestamp,
    Permalink,
}

/// One output column
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub field: &'static str,
    pub header: &'static str,
    pub render: Render,
}

const fn plain(field: &'static str) -> Column {
    Column {
        field,
        header: field,
        render: Render::Plain,
    }
}

pub const POST_COLUMNS: &[Column] = &[
    plain("subreddit"),
    plain("query"),
    plain("id"),
    plain("title"),
    Column {
        field: "selftext",
        header: "body",
        render: Render::Plain,
    },
    Column {
        field: "created",
        header: "date",
        render: Render::Timestamp,
    },
    plain("author"),
    Column {
        field: "link_flair_text",
        header: "flair",
        render: Render::Plain,
    },
    Column {
        field: "permalink",
        header: "permalink",
        render: Render::Permalink,
    },
    plain("score"),
    plain("num_comments"),
];

pub const COMMENT_COLUMNS: &[Column] = &[
    plain("subreddit"),
    plain("id"),
    plain("parent_id"),
    plain("body"),
    Column {
        field: "created",
        header: "date",
        render: Render::Timestamp,
    },
    plain("author"),
    Column {
        field: "permalink",
        header: "permalink",
        render: Render::Permalink,
    },
    plain("score"),
];

/// Renders raw API objects into CSV rows
#[derive(Debug, Clone)]
pub struct CsvExporter {
    offset: FixedOffset,
    web_base_url: String,
}

impl CsvExporter {
    pub fn new(utc_offset_hours: i32, web_base_url: &str) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .with_context(|| format!("Invalid UTC offset: {} hours", utc_offset_hours))?;
        Ok(Self {
            offset,
            web_base_url: web_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Render epoch seconds as `YYYY-MM-DD HH:MM:SS+HH:MM`
    pub fn format_timestamp(&self, value: &Value) -> String {
        let seconds = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
            _ => None,
        };
        seconds
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .map(|dt| {
                dt.with_timezone(&self.offset)
                    .format("%Y-%m-%d %H:%M:%S%:z")
                    .to_string()
            })
            .unwrap_or_default()
    }

    fn cell(&self, record: &Value, column: &Column) -> String {
        let value = record.get(column.field).unwrap_or(&Value::Null);
        match column.render {
            Render::Timestamp => self.format_timestamp(value),
            Render::Permalink => match value {
                Value::String(path) if path.starts_with('/') => {
                    format!("{}{}", self.web_base_url, path)
                }
                other => plain_cell(other),
            },
            Render::Plain => plain_cell(value),
        }
    }

    /// Write `records` as CSV, returning the number of rows written
    pub fn write<W: Write>(&self, writer: W, records: &[Value], columns: &[Column]) -> Result<usize> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push("");
        header.extend(columns.iter().map(|c| c.header));
        wtr.write_record(&header)?;

        let mut rows = 0usize;
        for record in records {
            if record.get("id").is_none_or(Value::is_null) {
                warn!("Skipping record without an id: {}", truncate(&record.to_string(), 120));
                continue;
            }
            let mut row = Vec::with_capacity(columns.len() + 1);
            row.push(rows.to_string());
            row.extend(columns.iter().map(|c| self.cell(record, c)));
            wtr.write_record(&row)?;
            rows += 1;
        }

        wtr.flush()?;
        Ok(rows)
    }

    /// Write `records` to a CSV file at `path`
    pub fn write_file<P: AsRef<Path>>(&self, path: P, records: &[Value], columns: &[Column]) -> Result<usize> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let rows = self
            .write(file, records, columns)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(rows, path = %path.display(), "Wrote CSV");
        Ok(rows)
    }
}

fn plain_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exporter() -> CsvExporter {
        CsvExporter::new(-8, "https://www.reddit.com").unwrap()
    }

    fn render(records: &[Value], columns: &[Column]) -> String {
        let mut buf = Vec::new();
        exporter().write(&mut buf, records, columns).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_timestamp_in_fixed_offset() {
        // 2024-01-01T00:00:00Z
        assert_eq!(
            exporter().format_timestamp(&json!(1704067200.0)),
            "2023-12-31 16:00:00-08:00"
        );
        assert_eq!(
            exporter().format_timestamp(&json!(1704067200)),
            "2023-12-31 16:00:00-08:00"
        );
        assert_eq!(exporter().format_timestamp(&Value::Null), "");
    }

    #[test]
    fn test_post_rows() {
        let post = json!({
            "subreddit": "rust",
            "query": "async",
            "id": "abc",
            "title": "Hello, \"world\"",
            "selftext": "line one\nline two",
            "created": 1704067200.0,
            "author": "ferris",
            "link_flair_text": null,
            "permalink": "/r/rust/comments/abc/hello/",
            "score": 42,
            "num_comments": 7,
            "ups": 42
        });
        let out = render(&[post], POST_COLUMNS);
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            ",subreddit,query,id,title,body,date,author,flair,permalink,score,num_comments"
        );

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "0");
        assert_eq!(&row[4], "Hello, \"world\"");
        assert_eq!(&row[5], "line one\nline two");
        assert_eq!(&row[6], "2023-12-31 16:00:00-08:00");
        assert_eq!(&row[8], "");
        assert_eq!(&row[9], "https://www.reddit.com/r/rust/comments/abc/hello/");
        assert_eq!(&row[10], "42");
    }

    #[test]
    fn test_comment_rows_skip_records_without_id() {
        let comments = vec![
            json!({"subreddit": "rust", "id": "c1", "parent_id": "t3_abc", "body": "first",
                   "created": 1704067200, "author": "a", "permalink": "/r/rust/c1", "score": 1}),
            json!({"count": 0, "children": []}),
            json!({"subreddit": "rust", "id": "c2", "parent_id": "t1_c1", "body": "second",
                   "created": 1704067260, "author": "b", "permalink": "/r/rust/c2", "score": -3}),
        ];
        let out = render(&comments, COMMENT_COLUMNS);

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["", "subreddit", "id", "parent_id", "body", "date", "author", "permalink", "score"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "1");
        assert_eq!(&rows[1][2], "c2");
        assert_eq!(&rows[1][8], "-3");
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.csv");
        let rows = exporter()
            .write_file(&path, &[json!({"id": "abc"})], POST_COLUMNS)
            .unwrap();
        assert_eq!(rows, 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(",subreddit,"));
    }
}
