use thiserror::Error;

/// Errors raised while registering rules. Every rule is validated when it is
/// registered so that a built `Router` never fails on a malformed definition.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("rule pattern cannot be empty")]
    EmptyPattern,

    #[error("invalid regex rule {pattern}: {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("unsupported regex flag '{flag}' in rule {pattern}")]
    InvalidRegexFlag { pattern: String, flag: char },

    #[error("invalid method filter: {0}")]
    InvalidMethod(String),

    #[error("invalid redirect status for {address}: {status}")]
    InvalidStatus { address: String, status: String },

    #[error("group {0} requires a list of child routes")]
    ExpectedGroup(String),

    #[error("child routes given for non-group rule {0}")]
    UnexpectedGroup(String),
}

/// Errors raised while dispatching a request.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("request deadline exceeded during rule walk")]
    DeadlineExceeded,
}
