use super::error::TraceError;
use super::record::{TracePosition, TraceRecord};
use std::io::{BufRead, Write};

/// Streams records out of a line-oriented trace.
pub struct TraceReader<R> {
    inner: R,
    line: usize,
    offset: u64,
    buffer: String,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            offset: 0,
            buffer: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<(TracePosition, TraceRecord), TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            let read = match self.inner.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(read) => read,
                Err(e) => return Some(Err(TraceError::Io(e))),
            };

            self.line += 1;
            let position = TracePosition {
                line: self.line,
                offset: self.offset,
            };
            self.offset += read as u64;

            match TraceRecord::parse_line(&self.buffer) {
                Ok(Some(record)) => return Some(Ok((position, record))),
                Ok(None) => continue,
                Err(reason) => {
                    return Some(Err(TraceError::Malformed {
                        position,
                        reason,
                        partial: Box::default(),
                    }))
                }
            }
        }
    }
}

/// Writes records in the trace line format.
pub struct TraceWriter<W> {
    inner: W,
    written: usize,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write(&mut self, record: &TraceRecord) -> std::io::Result<()> {
        writeln!(self.inner, "{}", record)?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a TraceRecord>,
    ) -> std::io::Result<()> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Render records as trace text.
pub fn to_trace_text<'a>(records: impl IntoIterator<Item = &'a TraceRecord>) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    out
}
