use crate::types::{EventRecord, LogRow, Sample};
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

const LINE_END: &str = "\r\n";

/// Column layout of a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Decoded game events, one column per payload field.
    Event,
    /// Stream timestamp and the payload as received.
    Raw,
}

impl Schema {
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Schema::Event => &[
                "timestamp_unix",
                "scene_name",
                "user_id",
                "event_type",
                "context",
                "value",
            ],
            Schema::Raw => &["lsl_timestamp", "payload"],
        }
    }

    pub fn row(self, sample: &Sample) -> LogRow {
        match self {
            Schema::Event => LogRow::Event {
                timestamp: sample.timestamp,
                record: EventRecord::parse(&sample.payload),
            },
            Schema::Raw => LogRow::Raw {
                timestamp: sample.timestamp,
                payload: sample.payload.clone(),
            },
        }
    }
}

/// How an existing log file is treated on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Create or truncate.
    Truncate,
    /// Create if missing, otherwise keep existing rows and add to the end.
    Append,
}

/// Open `path` for logging. The flag is true when the file holds no data
/// yet and therefore needs a header.
pub fn open_log_file(path: &Path, mode: FileMode) -> Result<(File, bool)> {
    match mode {
        FileMode::Truncate => Ok((File::create(path)?, true)),
        FileMode::Append => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let empty = file.metadata()?.len() == 0;
            Ok((file, empty))
        }
    }
}

/// Quote a cell only when it contains a delimiter, quote or line break.
pub fn escape_cell(cell: &str) -> std::borrow::Cow<'_, str> {
    if cell.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\"")).into()
    } else {
        cell.into()
    }
}

fn encode_line<S: AsRef<str>>(cells: &[S]) -> String {
    let mut line = cells
        .iter()
        .map(|c| escape_cell(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str(LINE_END);
    line
}

/// Comma-separated writer that flushes after every line, so a killed
/// process leaves only complete rows behind.
pub struct CsvSink<W: Write> {
    writer: W,
    schema: Schema,
    rows: u64,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, schema: Schema) -> Self {
        Self {
            writer,
            schema,
            rows: 0,
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Rows written through this sink (header excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.write_line(&encode_line(self.schema.header()))
    }

    pub fn write_row(&mut self, row: &LogRow) -> Result<()> {
        self.write_line(&encode_line(&row.cells()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    // The whole line goes out in one write_all before the flush.
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(payload: &str, timestamp: f64) -> Sample {
        Sample {
            payload: payload.into(),
            timestamp,
        }
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("plain"), "plain");
        assert_eq!(escape_cell(""), "");
        assert_eq!(escape_cell("a,b"), "\"a,b\"");
        assert_eq!(escape_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_cell("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_event_file_layout() {
        let mut sink = CsvSink::new(Vec::new(), Schema::Event);
        sink.write_header().unwrap();
        let row = Schema::Event.row(&sample("Hallway|U7|detected|guard1|0.8", 42.25));
        sink.write_row(&row).unwrap();
        let row = Schema::Event.row(&sample("Vault|U42|spotted", 43.0));
        sink.write_row(&row).unwrap();

        assert_eq!(sink.rows(), 2);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "timestamp_unix,scene_name,user_id,event_type,context,value\r\n\
             42.25,Hallway,U7,detected,guard1,0.8\r\n\
             43.0,Vault,U42,spotted,,\r\n"
        );
    }

    #[test]
    fn test_raw_file_layout() {
        let mut sink = CsvSink::new(Vec::new(), Schema::Raw);
        sink.write_header().unwrap();
        sink.write_row(&Schema::Raw.row(&sample("player,1 died", 7.5)))
            .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "lsl_timestamp,payload\r\n7.5,\"player,1 died\"\r\n");
    }

    #[test]
    fn test_append_writes_header_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_logs.csv");

        let (file, needs_header) = open_log_file(&path, FileMode::Append).unwrap();
        assert!(needs_header);
        let mut sink = CsvSink::new(file, Schema::Raw);
        sink.write_header().unwrap();
        sink.write_row(&Schema::Raw.row(&sample("first", 1.0))).unwrap();
        drop(sink);

        let (file, needs_header) = open_log_file(&path, FileMode::Append).unwrap();
        assert!(!needs_header);
        let mut sink = CsvSink::new(file, Schema::Raw);
        sink.write_row(&Schema::Raw.row(&sample("second", 2.0))).unwrap();
        drop(sink);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "lsl_timestamp,payload\r\n1.0,first\r\n2.0,second\r\n");
    }

    #[test]
    fn test_truncate_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");
        std::fs::write(&path, "stale").unwrap();

        let (_file, needs_header) = open_log_file(&path, FileMode::Truncate).unwrap();
        assert!(needs_header);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
