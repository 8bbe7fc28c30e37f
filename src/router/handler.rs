use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::HttpRequest;
use crate::router::error::HandlerError;
use crate::router::pattern::Params;
use crate::router::response::Response;

/// A suspended handler result. Resolves to a further [`Outcome`], or rejects.
pub type Deferred = Pin<Box<dyn Future<Output = Result<Outcome, HandlerError>> + Send + 'static>>;

/// What a handler did with the request.
///
/// The dispatcher decides from this value alone whether to finalize or try
/// the next route; mutations of the response go through [`Response`].
pub enum Outcome {
    /// The handler passes. Dispatch moves on to the next matching route,
    /// unless the handler already claimed the response with a status.
    Declined,
    /// A body chunk. Appended to the response, which is then finalized.
    Value(Vec<u8>),
    /// Result not known yet. Dispatch waits for it before trying anything else.
    Deferred(Deferred),
}

impl Outcome {
    pub fn value(body: impl Into<Vec<u8>>) -> Self {
        Outcome::Value(body.into())
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Outcome, HandlerError>> + Send + 'static,
    {
        Outcome::Deferred(Box::pin(future))
    }

    /// Wraps a future producing an optional body: `Some` finalizes with it,
    /// `None` declines.
    pub fn resolve<F, B>(future: F) -> Self
    where
        F: Future<Output = Result<Option<B>, HandlerError>> + Send + 'static,
        B: Into<Vec<u8>>,
    {
        Outcome::deferred(async move {
            Ok::<_, HandlerError>(match future.await? {
                Some(body) => Outcome::Value(body.into()),
                None => Outcome::Declined,
            })
        })
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Declined => f.write_str("Declined"),
            Outcome::Value(body) => f.debug_tuple("Value").field(&body.len()).finish(),
            Outcome::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Everything a handler is invoked with, apart from the path parameters.
///
/// Derefs to the response accumulator, so `cx.ok("text/html")` works the
/// same as `cx.response.ok("text/html")`.
pub struct Context<'a, S> {
    /// Context the route was registered with.
    pub state: &'a Arc<S>,
    pub request: &'a Arc<HttpRequest>,
    pub response: &'a Response,
}

impl<S> Deref for Context<'_, S> {
    type Target = Response;

    fn deref(&self) -> &Response {
        self.response
    }
}

pub type BoxedHandler<S> = Arc<dyn Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync>;
