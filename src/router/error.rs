use thiserror::Error;

use crate::http::HttpMethod;
use crate::view::ViewError;

/// Failures raised while registering a route. Always fatal to that call.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route `{pattern}` mixes named (`:name`) and positional (`*`) placeholders")]
    ConflictingPlaceholderSyntax { pattern: String },

    #[error("route `{pattern}` has an unterminated or empty `[...]` constraint")]
    MalformedConstraint { pattern: String },

    #[error("route `{pattern}` does not compile: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("static route registered without a root directory")]
    MissingStaticRoot,

    #[error("no route table for method {0}")]
    UnsupportedMethod(HttpMethod),
}

/// Rejection of a handler's deferred result.
///
/// The dispatcher turns any of these into a 500 response; the value itself is
/// logged and handed to the error template.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("view rendering failed: {0}")]
    View(#[from] ViewError),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }

    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Other(Box::new(err))
    }
}
