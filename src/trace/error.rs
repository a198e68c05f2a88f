use super::record::TracePosition;
use crate::callgraph::CallForest;
use miette::Diagnostic;

/// Failures while reading a trace or rebuilding its call forest.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum TraceError {
    #[error("Exit record at {position} has no open call to close")]
    #[diagnostic(
        code(trace::unbalanced_exit),
        help("The trace probably interleaves several threads or lost Enter records.")
    )]
    UnbalancedExit {
        position: TracePosition,
        /// Forest of the roots completed before the offending record.
        partial: Box<CallForest>,
    },

    #[error("Trace ended with {} unterminated call(s): {}", .open.len(), .open.join(" > "))]
    #[diagnostic(
        code(trace::unterminated_calls),
        help("The instrumented run crashed or the trace was truncated. Completed root calls are kept in the partial result.")
    )]
    UnterminatedCalls {
        /// Keys of the frames still open, outermost first.
        open: Vec<String>,
        /// Forest of the roots that did complete.
        partial: Box<CallForest>,
    },

    #[error("Exit record at {position} closes `{found}` but the open call is `{expected}`")]
    #[diagnostic(code(trace::mismatched_exit))]
    MismatchedExit {
        position: TracePosition,
        expected: String,
        found: String,
        partial: Box<CallForest>,
    },

    #[error("Malformed trace record at {position}: {reason}")]
    #[diagnostic(code(trace::malformed))]
    Malformed {
        position: TracePosition,
        reason: String,
        /// Empty when raised by the reader alone; the builder fills it in.
        partial: Box<CallForest>,
    },

    #[error("Failed to read trace: {0}")]
    #[diagnostic(code(trace::io))]
    Io(#[from] std::io::Error),
}

impl TraceError {
    /// Position of the offending record, when the error has one.
    pub fn position(&self) -> Option<TracePosition> {
        match self {
            TraceError::UnbalancedExit { position, .. }
            | TraceError::MismatchedExit { position, .. }
            | TraceError::Malformed { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// The partial forest kept for diagnostics, if any.
    pub fn partial_forest(&self) -> Option<&CallForest> {
        match self {
            TraceError::UnbalancedExit { partial, .. }
            | TraceError::UnterminatedCalls { partial, .. }
            | TraceError::MismatchedExit { partial, .. }
            | TraceError::Malformed { partial, .. } => Some(partial),
            TraceError::Io(_) => None,
        }
    }

    /// Move the partial forest out, leaving an empty one behind.
    pub fn take_partial(&mut self) -> Option<CallForest> {
        match self {
            TraceError::UnbalancedExit { partial, .. }
            | TraceError::UnterminatedCalls { partial, .. }
            | TraceError::MismatchedExit { partial, .. }
            | TraceError::Malformed { partial, .. } => Some(std::mem::take(&mut **partial)),
            TraceError::Io(_) => None,
        }
    }

    pub(crate) fn with_partial(mut self, forest: CallForest) -> Self {
        match &mut self {
            TraceError::UnbalancedExit { partial, .. }
            | TraceError::UnterminatedCalls { partial, .. }
            | TraceError::MismatchedExit { partial, .. }
            | TraceError::Malformed { partial, .. } => **partial = forest,
            TraceError::Io(_) => {}
        }
        self
    }
}
