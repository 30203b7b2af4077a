//! Integration tests for record ingestion.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use docindex::error::{IndexerError, Result};
use docindex::index::{IndexReader, OpenMode};
use docindex::ingest::{InlineRecord, LineRecordIngestor, ParseErrorPolicy, RecordConfig};
use docindex::session::{IndexSession, SessionConfig};
use docindex::storage::Storage;
use docindex::storage::memory::MemoryStorage;

const STREAM: &str = "{\"username\":\"a\",\"email\":\"a@x.com\",\"status\":\"ok\"}\n\n{\"username\":\"b\",\"email\":\"b@x.com\",\"status\":\"ok\"}";

fn open(storage: &Arc<dyn Storage>, mode: OpenMode) -> Result<IndexSession> {
    IndexSession::open_with_storage(storage.clone(), &SessionConfig::default().with_open_mode(mode))
}

#[test]
fn test_line_stream_with_blank_line() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
    let mut session = open(&storage, OpenMode::CreateOrAppend)?;

    let report = LineRecordIngestor::default().ingest(Cursor::new(STREAM), &mut session)?;
    session.close()?;

    assert_eq!(report.submitted, 2);
    assert_eq!(report.blank_lines, 1);
    assert_eq!(report.parse_errors, 0);
    assert_eq!(report.write_errors, 0);

    let reader = IndexReader::open(storage.as_ref())?;
    assert_eq!(reader.doc_count(), 2);

    let hits = reader.term_docs("email", "b@x.com");
    assert_eq!(hits.len(), 1);
    let doc = reader.document(hits[0]).unwrap();
    assert!(doc.get("email").is_none());
    let details = doc.get("details").unwrap().as_text().unwrap();
    assert!(details.contains("\"username\":\"b\""));
    Ok(())
}

#[test]
fn test_reingesting_lines_does_not_duplicate() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
    let ingestor = LineRecordIngestor::default();

    let mut session = open(&storage, OpenMode::Create)?;
    let doubled = format!("{STREAM}\n{STREAM}\n");
    let report = ingestor.ingest(Cursor::new(doubled), &mut session)?;
    assert_eq!(report.submitted, 4);
    session.close()?;
    assert_eq!(IndexReader::open(storage.as_ref())?.doc_count(), 2);

    let mut session = open(&storage, OpenMode::CreateOrAppend)?;
    ingestor.ingest(Cursor::new(STREAM), &mut session)?;
    session.close()?;
    assert_eq!(IndexReader::open(storage.as_ref())?.doc_count(), 2);
    Ok(())
}

#[test]
fn test_parse_errors_skip_by_default() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
    let input = "{\"username\":\"a\"}\n{broken\n[1,2]\n{\"username\":\"c\"}\n";

    let mut session = open(&storage, OpenMode::Create)?;
    let report = LineRecordIngestor::default().ingest(Cursor::new(input), &mut session)?;
    session.close()?;

    assert_eq!(report.submitted, 2);
    assert_eq!(report.parse_errors, 2);
    assert_eq!(IndexReader::open(storage.as_ref())?.doc_count(), 2);
    Ok(())
}

#[test]
fn test_parse_errors_abort_when_configured() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
    let input = "{\"username\":\"a\"}\n{broken\n{\"username\":\"c\"}\n";
    let ingestor = LineRecordIngestor::new(RecordConfig {
        on_parse_error: ParseErrorPolicy::Abort,
        ..Default::default()
    });

    let mut session = open(&storage, OpenMode::Create)?;
    let err = ingestor.ingest(Cursor::new(input), &mut session).unwrap_err();
    assert!(matches!(err, IndexerError::RecordParse { line: 2, .. }));
    assert_eq!(session.stats().written(), 1);
    session.close()?;
    Ok(())
}

#[test]
fn test_oversized_line_is_a_write_error() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
    let mut config = SessionConfig::default();
    config.writer.max_term_length = 64;
    let mut session = IndexSession::open_with_storage(storage.clone(), &config)?;

    let long = format!("{{\"username\":\"{}\"}}", "x".repeat(100));
    let input = format!("{long}\n{{\"username\":\"short\"}}\n");
    let report = LineRecordIngestor::default().ingest(Cursor::new(input), &mut session)?;
    session.close()?;

    assert_eq!(report.submitted, 1);
    assert_eq!(report.write_errors, 1);
    Ok(())
}

#[test]
fn test_cancel_flag_stops_ingestion() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
    let ingestor = LineRecordIngestor::default().with_cancel_flag(Arc::new(AtomicBool::new(true)));

    let mut session = open(&storage, OpenMode::Create)?;
    let report = ingestor.ingest(Cursor::new(STREAM), &mut session)?;
    assert!(report.cancelled);
    assert_eq!(report.submitted, 0);
    Ok(())
}

#[test]
fn test_inline_record_round_trip() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
    let record = InlineRecord::from_json(
        r#"{
            "fields": [
                {"key": "id", "key_value": "1", "store": "NO"},
                {"key": "name", "key_value": "nandakumar", "store": "NO"}
            ],
            "payload": {"name": "nandakumar", "id": "1"}
        }"#,
    )?;
    let doc = record.to_document(&RecordConfig::default())?;

    let mut session = open(&storage, OpenMode::Create)?;
    session.submit(doc, None)?;
    session.close()?;

    let reader = IndexReader::open(storage.as_ref())?;
    let hits = reader.term_docs("name", "nandakumar");
    assert_eq!(hits.len(), 1);

    let stored = reader.document(hits[0]).unwrap();
    assert!(stored.get("id").is_none());
    assert!(stored.get("name").is_none());
    let data = stored.get("data").unwrap().to_string();
    assert_eq!(data, record.payload_text().unwrap());
    Ok(())
}
