pub mod error;
pub mod exits;
pub mod filter;
pub mod identity;
pub mod rewriter;

pub use error::InstrumentationError;
pub use exits::{plan_exits, ExitKind, ExitPlan, ExitPoint};
pub use filter::{FilterPattern, MethodFilter};
pub use identity::{CompiledUnit, MethodIdentity, MethodIndex, CONSTRUCTOR_NAME, KEY_SEPARATOR};
pub use rewriter::{
    InstrumentOptions, InstrumentationReport, InstrumentedUnit, Instrumenter, SkippedMethod,
    DEFAULT_PROBE_MODULE, MAX_FUNCTION_LOCALS, PROBE_KEYS_SECTION,
};
