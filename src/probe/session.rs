use super::counter::{EnergyCounter, Sample};
use super::keys::ProbeKeyTable;
use crate::trace::{TraceRecord, TraceWriter};
use miette::Diagnostic;
use std::io::Write;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ProbeError {
    #[error("Energy counter failed: {0}")]
    #[diagnostic(code(probe::counter))]
    Counter(String),

    #[error("Probe key id {id} is not in the unit's key table")]
    #[diagnostic(
        code(probe::unknown_key),
        help("The unit was instrumented separately from the key table in use.")
    )]
    UnknownKey { id: i32 },

    #[error("Report for handle {found} while the innermost open call is {expected:?}")]
    #[diagnostic(code(probe::out_of_order))]
    OutOfOrder {
        expected: Option<i64>,
        found: i64,
    },

    #[error("Failed to write trace record: {0}")]
    #[diagnostic(code(probe::io))]
    Io(#[from] std::io::Error),
}

/// Opaque token returned by `begin` and passed back to `report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeHandle(i64);

impl ProbeHandle {
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }
}

struct OpenCall {
    key: String,
    start: Sample,
}

/// Records one Enter per `begin` and one Exit per `report`, with the
/// counter deltas between the two.
pub struct ProbeSession<C, W: Write> {
    counter: C,
    writer: TraceWriter<W>,
    keys: ProbeKeyTable,
    open: Vec<OpenCall>,
}

impl<C: EnergyCounter, W: Write> ProbeSession<C, W> {
    pub fn new(counter: C, writer: W) -> Self {
        Self {
            counter,
            writer: TraceWriter::new(writer),
            keys: ProbeKeyTable::default(),
            open: Vec::new(),
        }
    }

    pub fn with_keys(mut self, keys: ProbeKeyTable) -> Self {
        self.keys = keys;
        self
    }

    pub fn keys(&self) -> &ProbeKeyTable {
        &self.keys
    }

    pub fn open_calls(&self) -> usize {
        self.open.len()
    }

    pub fn begin(&mut self, key: &str) -> Result<ProbeHandle, ProbeError> {
        self.writer.write(&TraceRecord::enter(key))?;
        let start = self.counter.sample()?;
        let handle = ProbeHandle(self.open.len() as i64);
        self.open.push(OpenCall {
            key: key.to_string(),
            start,
        });
        Ok(handle)
    }

    /// Close the call opened by `handle`, which must be the innermost one.
    /// The Exit record carries `key`, as the injected call passes it.
    pub fn report(&mut self, handle: ProbeHandle, key: &str) -> Result<(), ProbeError> {
        let innermost = self.open.len().checked_sub(1).map(|i| i as i64);
        if innermost != Some(handle.0) {
            return Err(ProbeError::OutOfOrder {
                expected: innermost,
                found: handle.0,
            });
        }

        let end = self.counter.sample()?;
        let call = self.open.pop().ok_or(ProbeError::OutOfOrder {
            expected: None,
            found: handle.0,
        })?;
        let delta = end.since(&call.start);
        if call.key != key {
            tracing::debug!(opened = call.key.as_str(), reported = key, "Probe key changed between begin and report");
        }
        self.writer
            .write(&TraceRecord::exit(key, delta.energy_uj, delta.time_ns))?;
        Ok(())
    }

    pub fn begin_id(&mut self, id: i32) -> Result<i64, ProbeError> {
        let key = self.resolve(id)?;
        self.begin(&key).map(|handle| handle.raw())
    }

    pub fn report_id(&mut self, handle: i64, id: i32) -> Result<(), ProbeError> {
        let key = self.resolve(id)?;
        self.report(ProbeHandle(handle), &key)
    }

    fn resolve(&self, id: i32) -> Result<String, ProbeError> {
        self.keys
            .key(id)
            .map(str::to_string)
            .ok_or(ProbeError::UnknownKey { id })
    }

    pub fn records_written(&self) -> usize {
        self.writer.records_written()
    }

    pub fn finish(mut self) -> Result<(C, W), ProbeError> {
        self.writer.flush()?;
        Ok((self.counter, self.writer.into_inner()))
    }
}
