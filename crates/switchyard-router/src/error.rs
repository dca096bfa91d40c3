use thiserror::Error;

/// Errors produced while registering routes.
///
/// Every variant is a setup-time failure. Request-time misses are reported
/// as `None` from the lookup functions, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Same method, path and constraint set registered twice.
    #[error("Method '{method}' already declared for route '{path}' with constraints '{constraints}'")]
    RouteConflict {
        method: String,
        path: String,
        /// JSON rendering of the constraint set already declared.
        constraints: String,
    },

    /// The path pattern could not be parsed.
    #[error("invalid route pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    /// A constraint key or value was rejected by the matcher registry.
    #[error("invalid constraint on route '{pattern}': {source}")]
    Constraint {
        pattern: String,
        #[source]
        source: ConstraintError,
    },

    /// The HTTP method is empty or contains non-token characters.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// A registration named no HTTP method at all.
    #[error("no HTTP method given for route '{0}'")]
    NoMethods(String),
}

/// Malformed path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("wildcard '*' must be the last segment")]
    WildcardNotLast,

    #[error("parameter at segment {0} has no name")]
    EmptyParamName(usize),

    #[error("segment '{0}' follows an optional parameter")]
    SegmentAfterOptional(String),

    #[error("parameter ':{0}' is declared more than once")]
    DuplicateParam(String),
}

/// Rejected route constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("no matcher registered for constraint '{0}'")]
    UnknownKey(String),

    #[error("constraint '{key}' has invalid value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
