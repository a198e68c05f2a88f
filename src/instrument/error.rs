use miette::Diagnostic;

/// Failures raised while indexing or rewriting a compiled unit.
///
/// Method-level variants leave the method untouched; unit-level variants
/// (`Parse`, `Verification`, `AlreadyInstrumented`) leave the whole unit
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum InstrumentationError {
    #[error("Failed to parse compiled unit `{unit}`: {reason}")]
    #[diagnostic(
        code(instrument::parse_failed),
        help("Make sure the file is a valid WebAssembly module. Tail calls and exception handling are not supported.")
    )]
    Parse { unit: String, reason: String },

    #[error("Method `{method}` needs {required} local slots, exceeding the limit of {limit}")]
    #[diagnostic(
        code(instrument::local_slots_exhausted),
        help("Exclude this method with an `instrument.exclude` pattern.")
    )]
    LocalSlotsExhausted {
        method: String,
        required: usize,
        limit: usize,
    },

    #[error("Method `{method}` has an unsupported shape: {reason}")]
    #[diagnostic(code(instrument::unsupported_shape))]
    UnsupportedShape { method: String, reason: String },

    #[error("Method `{method}` is not present in the method index")]
    #[diagnostic(
        code(instrument::not_indexed),
        help("Build the method index from the same set of units that is being instrumented.")
    )]
    NotIndexed { method: String },

    #[error("Compiled unit `{unit}` already carries energy probes")]
    #[diagnostic(
        code(instrument::already_instrumented),
        help("Instrument the original build output, not a previously instrumented copy.")
    )]
    AlreadyInstrumented { unit: String },

    #[error("Rewritten unit `{unit}` failed verification: {reason}")]
    #[diagnostic(code(instrument::verification_failed))]
    Verification { unit: String, reason: String },
}

impl InstrumentationError {
    /// Whether the failure affects a whole unit rather than a single method.
    pub fn is_unit_level(&self) -> bool {
        matches!(
            self,
            InstrumentationError::Parse { .. }
                | InstrumentationError::AlreadyInstrumented { .. }
                | InstrumentationError::Verification { .. }
        )
    }
}
