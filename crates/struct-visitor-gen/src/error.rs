use crate::expand::ExpandError;

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("max arity must be at least 1, got {0}")]
    InvalidMaxArity(i64),
    #[error("max arity {max} exceeds the supported limit of {limit}")]
    MaxArityTooLarge { max: i64, limit: usize },
    #[error("'{name}' is not a valid C identifier")]
    InvalidIdentifier { name: String },
    #[error("macro name '{name}' is used more than once")]
    NameCollision { name: String },
    #[error("macro name '{name}' collides with the generated arity macro of the same name")]
    ArityNameCollision { name: String },
    #[error("'{name}' collides with a macro parameter name")]
    ParameterCollision { name: String },
    #[error("receiver '{name}' collides with a generated macro name")]
    ReceiverCollision { name: String },
    #[error(transparent)]
    Format(#[from] std::fmt::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("no fields given, the smallest generated arity is 1")]
    NoFields,
    #[error("{count} fields given, but only arities up to {max} are generated")]
    OutOfRange { count: usize, max: usize },
}

/// Catch-all for callers that both generate a header and expand call sites with it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Gen(#[from] GenError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
}
