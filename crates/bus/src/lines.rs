//! JSON-lines adapters over tokio readers and writers.
//!
//! Inbound lines are either an envelope `{"key": "...", "value": {...}}` or a
//! bare record, in which case the record is keyed by its line number.
//! Outbound lines are [`OutboundRecord`]s.

use async_trait::async_trait;
use common::{ProductId, RecordKey};
use futures_util::stream;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::{
    DeltaSink, OutboundRecord, PublishError, RecordSource, RecordStream, SourceError, SourceRecord,
};

#[derive(Deserialize)]
struct LineEnvelope {
    key: String,
    value: serde_json::Value,
}

/// Splits one input line into key and payload.
///
/// Anything that is not an envelope becomes the payload as-is, so that an
/// unparsable line (including one that is not UTF-8) is rejected downstream
/// instead of ending the stream.
fn parse_line(line_no: u64, line: &[u8]) -> SourceRecord {
    match serde_json::from_slice::<LineEnvelope>(line) {
        Ok(envelope) => SourceRecord {
            key: RecordKey::new(envelope.key),
            payload: envelope.value.to_string().into_bytes(),
        },
        Err(_) => {
            tracing::debug!(line_no, "no envelope, keying record by line number");
            SourceRecord::new(format!("line-{line_no}"), line.to_vec())
        }
    }
}

fn trim_line_ending(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
    }
    if let Some(rest) = line.strip_suffix(b"\r") {
        line = rest;
    }
    line
}

/// Record source reading one JSON record per line.
///
/// End of input closes the stream; read errors disconnect it.
pub struct JsonLinesSource<R> {
    name: String,
    reader: Mutex<Option<R>>,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader: Mutex::new(Some(reader)),
        }
    }
}

#[async_trait]
impl<R> RecordSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn subscribe(&self) -> Result<RecordStream, SourceError> {
        let reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| SourceError::AlreadySubscribed(self.name.clone()))?;

        let state: (Option<R>, u64) = (Some(reader), 0);
        Ok(Box::pin(stream::unfold(
            state,
            |(reader, mut line_no)| async move {
                let mut reader = reader?;
                let mut buf = Vec::new();
                loop {
                    line_no += 1;
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf).await {
                        Ok(0) => return None,
                        Ok(_) => {
                            let line = trim_line_ending(&buf);
                            if line.iter().all(u8::is_ascii_whitespace) {
                                continue;
                            }
                            let record = parse_line(line_no, line);
                            return Some((Ok(record), (Some(reader), line_no)));
                        }
                        Err(e) => return Some((Err(SourceError::Io(e)), (None, line_no))),
                    }
                }
            },
        )))
    }
}

/// Delta sink writing one [`OutboundRecord`] per line.
///
/// Each line is flushed before the publish is acknowledged. A failure after
/// part of a line reached the writer is never transient, since a retry
/// would append the line a second time.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Writes `line` completely, tracking how much of it reached the writer.
async fn write_line<W>(writer: &mut W, line: &[u8]) -> Result<(), PublishError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < line.len() {
        match writer.write(&line[written..]).await {
            Ok(0) => {
                return Err(PublishError::Rejected(format!(
                    "writer closed after {written}/{} bytes",
                    line.len()
                )));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if written == 0 => return Err(classify_io(e)),
            Err(e) => {
                return Err(PublishError::Rejected(format!(
                    "partial line written ({written}/{} bytes): {e}",
                    line.len()
                )));
            }
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| PublishError::Rejected(format!("flush after full line failed: {e}")))
}

fn classify_io(e: std::io::Error) -> PublishError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut => {
            PublishError::Transient(e.to_string())
        }
        _ => PublishError::Rejected(e.to_string()),
    }
}

#[async_trait]
impl<W> DeltaSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&self, key: &ProductId, value: i64) -> Result<(), PublishError> {
        let record = OutboundRecord {
            key: key.as_str().to_string(),
            value,
        };
        let mut line =
            serde_json::to_vec(&record).map_err(|e| PublishError::Rejected(e.to_string()))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        write_line(&mut *writer, &line).await
    }
}
