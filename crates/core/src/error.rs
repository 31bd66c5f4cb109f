use thiserror::Error;

use crate::function::FunctionId;

/// Errors raised while registering, serializing or invoking functions.
#[derive(Error, Debug)]
pub enum FunctionError {
    /// The id is not known to the registry that was asked to resolve it.
    #[error("unresolved function reference: {0}")]
    UnresolvedFunctionReference(FunctionId),

    /// A caller-side reference that no registry call ever produced.
    #[error("function reference was never registered")]
    UnregisteredReference,

    #[error("function {0} is already registered")]
    DuplicateFunction(FunctionId),

    #[error("invalid arguments for {function}: {message}")]
    InvalidArguments { function: String, message: String },

    #[error("function failed: {0}")]
    Failed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl FunctionError {
    /// Convenience for user functions that want to bail with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid_arguments(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            function: function.into(),
            message: message.into(),
        }
    }
}
