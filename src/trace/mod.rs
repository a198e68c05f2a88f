pub mod error;
pub mod io;
pub mod record;

pub use error::TraceError;
pub use io::{to_trace_text, TraceReader, TraceWriter};
pub use record::{TracePosition, TraceRecord, FIELD_DELIMITER};
