//! JSON-lines record streams.
//!
//! Each non-blank line is one flat JSON object:
//! ```jsonl
//! {"username": "a", "email": "a@x.com", "status": "ok"}
//! {"username": "b", "email": "b@x.com", "status": "ok"}
//! ```
//!
//! The configured keys become exact-term fields and the raw line is kept
//! as a stored exact-term field, which is also the upsert key, so feeding
//! the same line twice leaves one document.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{info, warn};

use crate::document::{Document, Field, Store};
use crate::error::{IndexerError, Result};
use crate::ingest::{IngestReport, ParseErrorPolicy, RecordConfig};
use crate::session::IndexSession;

/// A parsed line and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// 1-based line number.
    pub line: usize,
    pub document: Document,
}

/// Turns JSON-line records into documents and feeds them to a session.
#[derive(Debug, Clone, Default)]
pub struct LineRecordIngestor {
    config: RecordConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl LineRecordIngestor {
    pub fn new(config: RecordConfig) -> Self {
        LineRecordIngestor {
            config,
            cancel: None,
        }
    }

    /// Stop between records once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Parse one non-blank line.
    pub fn parse_line(&self, line_no: usize, line: &str) -> Result<Document> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| IndexerError::record_parse(line_no, e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(IndexerError::record_parse(
                line_no,
                "record is not a JSON object",
            ));
        };

        let mut doc = Document::new();
        for key in &self.config.expected_keys {
            let text = match map.get(key) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                Some(Value::Array(_) | Value::Object(_)) => {
                    return Err(IndexerError::record_parse(
                        line_no,
                        format!("value of '{key}' is not a scalar"),
                    ));
                }
            };
            doc.add(Field::string(key, text, self.config.key_storage));
        }
        doc.add(Field::string(&self.config.raw_field, line, Store::Stored));
        Ok(doc)
    }

    /// Iterate over the records of `reader`, skipping blank lines.
    pub fn documents<R: BufRead>(&self, reader: R) -> LineDocuments<'_, R> {
        LineDocuments {
            ingestor: self,
            reader,
            buf: Vec::new(),
            line_no: 0,
            blank_lines: 0,
        }
    }

    /// Parse every record of `reader` and submit it to `session`.
    ///
    /// Parse failures are skipped or abort the run per
    /// [`RecordConfig::on_parse_error`]. Recoverable write errors are
    /// counted; fatal ones abort.
    pub fn ingest<R: BufRead>(&self, reader: R, session: &mut IndexSession) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let key = self.config.upsert_key();
        let mut records = self.documents(reader);

        loop {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(item) = records.next() else {
                break;
            };

            match item {
                Ok(record) => match session.submit(record.document, Some(key)) {
                    Ok(_) => report.submitted += 1,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(line = record.line, error = %e, "record not written");
                        report.write_errors += 1;
                    }
                },
                Err(e @ IndexerError::RecordParse { .. }) => match self.config.on_parse_error {
                    ParseErrorPolicy::Skip => {
                        warn!(error = %e, "skipping record");
                        report.parse_errors += 1;
                    }
                    ParseErrorPolicy::Abort => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }

        report.blank_lines = records.blank_lines();
        info!(
            submitted = report.submitted,
            blank_lines = report.blank_lines,
            parse_errors = report.parse_errors,
            write_errors = report.write_errors,
            cancelled = report.cancelled,
            "record ingestion finished"
        );
        Ok(report)
    }
}

/// Iterator over the records of a JSON-lines stream.
///
/// Lines that are not valid UTF-8 yield a [`IndexerError::RecordParse`]
/// and iteration continues with the next line.
#[derive(Debug)]
pub struct LineDocuments<'a, R> {
    ingestor: &'a LineRecordIngestor,
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    blank_lines: usize,
}

impl<R> LineDocuments<'_, R> {
    /// Blank lines skipped so far.
    pub fn blank_lines(&self) -> usize {
        self.blank_lines
    }
}

impl<R: BufRead> Iterator for LineDocuments<'_, R> {
    type Item = Result<LineRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(e) => {
                    return Some(Err(IndexerError::record_parse(
                        self.line_no,
                        format!("invalid UTF-8: {e}"),
                    )));
                }
            };
            if line.trim().is_empty() {
                self.blank_lines += 1;
                continue;
            }

            return Some(
                self.ingestor
                    .parse_line(self.line_no, line)
                    .map(|document| LineRecord {
                        line: self.line_no,
                        document,
                    }),
            );
        }
    }
}
