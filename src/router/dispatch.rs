//! Request dispatch over one method's route list.
//!
//! Routes are tried strictly in registration order. A handler that declines
//! without claiming the response lets the walk continue; a deferred outcome
//! suspends the walk until it settles, so a later route never runs before an
//! earlier one has given its answer.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::handler::responses;
use crate::http::request::HttpRequest;
use crate::http::response::{HttpResponse, ResponseHeader};
use crate::http::status::HttpStatus;
use crate::router::error::HandlerError;
use crate::router::handler::{Context, Deferred, Outcome};
use crate::router::response::Response;
use crate::router::table::Route;
use crate::view::{TemplateContext, View};

pub type PendingResponse<'a> = Pin<Box<dyn Future<Output = HttpResponse> + Send + 'a>>;

/// Result of dispatching one request: either finished synchronously or
/// waiting on a handler's deferred result.
pub enum Dispatch<'a> {
    Ready(HttpResponse),
    Pending(PendingResponse<'a>),
}

impl<'a> Dispatch<'a> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Dispatch::Ready(_))
    }

    /// The response, if dispatch completed without suspending.
    pub fn into_ready(self) -> Option<HttpResponse> {
        match self {
            Dispatch::Ready(res) => Some(res),
            Dispatch::Pending(_) => None,
        }
    }
}

impl<'a> IntoFuture for Dispatch<'a> {
    type Output = HttpResponse;
    type IntoFuture = PendingResponse<'a>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Dispatch::Ready(res) => Box::pin(std::future::ready(res)),
            Dispatch::Pending(pending) => pending,
        }
    }
}

/// Optional templated replacements for the fixed 404 and 500 bodies.
#[derive(Clone, Default)]
pub struct ErrorPages {
    pub(crate) view: Option<Arc<dyn View>>,
    pub(crate) not_found: Option<String>,
    pub(crate) internal_error: Option<String>,
}

impl ErrorPages {
    fn renders_not_found(&self) -> bool {
        self.view.is_some() && self.not_found.is_some()
    }

    async fn render(
        &self,
        template: Option<&String>,
        status: HttpStatus,
        context: TemplateContext,
    ) -> Option<HttpResponse> {
        let view = self.view.as_ref()?;
        let template = template?;

        match view.render(template, &context).await {
            Ok(body) => {
                let mut res = HttpResponse::new();
                res.status = status;
                res.set_header(ResponseHeader::ContentType, "text/html");
                res.body = body.into_bytes();
                Some(res)
            }
            Err(err) => {
                warn!(%template, %err, "error page failed to render, using fixed body");
                None
            }
        }
    }
}

enum Step {
    /// The response is complete.
    Finished,
    /// No route is left to try.
    Exhausted,
    /// The handler at `index` returned a deferred result.
    Suspended { index: usize, deferred: Deferred },
}

pub struct Dispatcher<'a, S> {
    routes: &'a [Route<S>],
    pages: &'a ErrorPages,
    request: Arc<HttpRequest>,
    response: Response,
}

impl<'a, S> Dispatcher<'a, S>
where
    S: Send + Sync + 'static,
{
    /// Dispatches `request` over `routes`, starting at `start`.
    pub fn dispatch(
        routes: &'a [Route<S>],
        pages: &'a ErrorPages,
        request: Arc<HttpRequest>,
        start: usize,
    ) -> Dispatch<'a> {
        let dispatcher = Dispatcher {
            routes,
            pages,
            response: Response::with_view(pages.view.clone()),
            request,
        };

        match dispatcher.walk(start) {
            Step::Finished => Dispatch::Ready(dispatcher.response.finalize()),
            Step::Exhausted if !pages.renders_not_found() => Dispatch::Ready(responses::not_found()),
            Step::Exhausted => Dispatch::Pending(Box::pin(async move { dispatcher.not_found().await })),
            Step::Suspended { index, deferred } => {
                Dispatch::Pending(Box::pin(dispatcher.resume(index, deferred)))
            }
        }
    }

    fn walk(&self, start: usize) -> Step {
        let path = self.request.path.as_str();

        for (index, route) in self.routes.iter().enumerate().skip(start) {
            let Some(params) = route.matcher().matches(&self.request, path) else {
                continue;
            };
            debug!(index, path, kind = route.matcher().kind(), "route matched");

            let cx = Context {
                state: &route.state,
                request: &self.request,
                response: &self.response,
            };

            match (route.handler)(&cx, params) {
                Outcome::Value(body) => {
                    self.response.add_to_body(body);
                    return Step::Finished;
                }
                Outcome::Declined if self.response.is_handled() => return Step::Finished,
                Outcome::Declined => debug!(index, path, "handler declined, falling through"),
                Outcome::Deferred(deferred) => return Step::Suspended { index, deferred },
            }
        }

        Step::Exhausted
    }

    async fn resume(self, mut index: usize, mut deferred: Deferred) -> HttpResponse {
        loop {
            match deferred.await {
                Ok(Outcome::Value(body)) => {
                    self.response.add_to_body(body);
                    return self.response.finalize();
                }
                Ok(Outcome::Deferred(next)) => deferred = next,
                Ok(Outcome::Declined) if self.response.is_handled() => {
                    return self.response.finalize();
                }
                Ok(Outcome::Declined) => {
                    debug!(index, path = %self.request.path, "deferred handler declined, falling through");
                    match self.walk(index + 1) {
                        Step::Finished => return self.response.finalize(),
                        Step::Exhausted => return self.not_found().await,
                        Step::Suspended {
                            index: next_index,
                            deferred: next,
                        } => {
                            index = next_index;
                            deferred = next;
                        }
                    }
                }
                Err(err) => return self.internal_error(err).await,
            }
        }
    }

    fn page_context(&self, status: HttpStatus) -> TemplateContext {
        let mut context = TemplateContext::new();
        context.insert("status".to_string(), status.code().to_string());
        context.insert("method".to_string(), self.request.method.to_string());
        context.insert("path".to_string(), self.request.path.clone());
        context
    }

    async fn not_found(&self) -> HttpResponse {
        let context = self.page_context(HttpStatus::NOT_FOUND);
        self.pages
            .render(self.pages.not_found.as_ref(), HttpStatus::NOT_FOUND, context)
            .await
            .unwrap_or_else(responses::not_found)
    }

    async fn internal_error(&self, err: HandlerError) -> HttpResponse {
        error!(method = %self.request.method, path = %self.request.path, %err, "handler rejected");

        let mut context = self.page_context(HttpStatus::INTERNAL_SERVER_ERROR);
        context.insert("error".to_string(), err.to_string());
        self.pages
            .render(
                self.pages.internal_error.as_ref(),
                HttpStatus::INTERNAL_SERVER_ERROR,
                context,
            )
            .await
            .unwrap_or_else(responses::internal_server_error)
    }
}
