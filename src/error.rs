//! Unified error handling for gantry.
//!
//! Every error in this module is recovered at the dispatch boundary and
//! converted into a failure envelope. Nothing here is allowed to propagate
//! to the transport layer.

use thiserror::Error;

/// Errors that can occur while dispatching a command.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed request: {0}")]
    Parse(String),

    #[error("no command named {0:?} is loaded")]
    CommandNotFound(String),

    #[error("command {command:?} is missing required argument(s): {}", .missing.join(", "))]
    MissingArgument {
        command: String,
        missing: Vec<String>,
    },

    #[error("command {command:?} argument {argument:?} is invalid: {reason}")]
    InvalidArgument {
        command: String,
        argument: String,
        reason: String,
    },

    /// The command implementation itself failed.
    #[error("{0}")]
    Invocation(String),

    #[error("the command timed out waiting for the executor thread")]
    ExecutorTimeout,

    #[error("failed to load module {module:?}: {reason}")]
    ModuleLoad { module: String, reason: String },
}

impl DispatchError {
    /// Get a static error code string for logging.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse_error",
            Self::CommandNotFound(_) => "command_not_found",
            Self::MissingArgument { .. } => "missing_argument",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Invocation(_) => "invocation_failure",
            Self::ExecutorTimeout => "executor_timeout",
            Self::ModuleLoad { .. } => "module_load_failure",
        }
    }
}

/// Failure raised by a command implementation.
///
/// Command callables are opaque to the dispatcher, so their failures are
/// carried as a message rather than a typed hierarchy.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct InvokeError(pub String);

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from module sources.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("no module source named {0:?} is available")]
    Unknown(String),

    #[error("module {0:?} failed to load: {1}")]
    Load(String, String),
}
