//! Host side of the injected probes.
//!
//! An instrumented unit imports `begin(key_id) -> handle` and
//! `report(handle, key_id)`. A [`ProbeSession`] answers those calls by
//! sampling an [`EnergyCounter`] and writing trace records.

pub mod counter;
pub mod keys;
pub mod session;

pub use counter::{EnergyCounter, Sample, ScriptedCounter};
pub use keys::ProbeKeyTable;
pub use session::{ProbeError, ProbeHandle, ProbeSession};
