//! Route registration and request dispatch.
//!
//! A [`Router`] owns one route table per supported method (`GET`, `POST`,
//! `PUT`, `DELETE`). Routes are compiled when registered, so a bad pattern
//! fails the registration call rather than a request:
//!
//! ```
//! use rustyroute::router::{Outcome, Router};
//!
//! let mut router = Router::new();
//! router
//!     .get("/users/:id", |cx, params| {
//!         cx.ok("text/plain");
//!         Outcome::value(format!("user {}", params.get("id").unwrap_or("?")))
//!     })
//!     .unwrap();
//! ```

pub mod dispatch;
pub mod error;
pub mod handler;
pub mod pattern;
pub mod response;
pub mod table;

use std::sync::Arc;

use tracing::debug;

use crate::handler::responses;
use crate::handler::static_files::StaticFiles;
use crate::http::HttpMethod;
use crate::http::request::HttpRequest;
use crate::view::View;

pub use dispatch::{Dispatch, Dispatcher, ErrorPages};
pub use error::{HandlerError, RouteError};
pub use handler::{BoxedHandler, Context, Deferred, Outcome};
pub use pattern::{Matcher, Params, RouteSpec, compile};
pub use response::Response;
pub use table::{Route, RouteTable};

pub struct Router<S = ()> {
    table: RouteTable<S>,
    state: Arc<S>,
    pages: ErrorPages,
}

impl Router<()> {
    pub fn new() -> Self {
        Self::with_state(())
    }
}

impl Default for Router<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Router<S>
where
    S: Send + Sync + 'static,
{
    /// Creates a router whose routes run with `state` as their context
    /// unless registered with their own.
    pub fn with_state(state: S) -> Self {
        Self {
            table: RouteTable::new(),
            state: Arc::new(state),
            pages: ErrorPages::default(),
        }
    }

    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    pub fn table(&self) -> &RouteTable<S> {
        &self.table
    }

    /// Registers `handler` for `method`, running with `state` (or the
    /// router's own state when `None`).
    pub fn route<H>(
        &mut self,
        method: HttpMethod,
        spec: impl Into<RouteSpec>,
        handler: H,
        state: Option<Arc<S>>,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        let matcher = pattern::compile(spec.into())?;
        debug!(%method, kind = matcher.kind(), ?matcher, "registering route");

        let state = state.unwrap_or_else(|| Arc::clone(&self.state));
        let route = Route::new(matcher, Arc::new(handler), state);
        self.table
            .push(method, route)
            .map_err(|_| RouteError::UnsupportedMethod(method))?;
        Ok(self)
    }

    pub fn get<H>(&mut self, spec: impl Into<RouteSpec>, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        self.route(HttpMethod::Get, spec, handler, None)
    }

    pub fn post<H>(&mut self, spec: impl Into<RouteSpec>, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        self.route(HttpMethod::Post, spec, handler, None)
    }

    pub fn put<H>(&mut self, spec: impl Into<RouteSpec>, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        self.route(HttpMethod::Put, spec, handler, None)
    }

    pub fn delete<H>(&mut self, spec: impl Into<RouteSpec>, handler: H) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        self.route(HttpMethod::Delete, spec, handler, None)
    }

    pub fn get_with<H>(
        &mut self,
        spec: impl Into<RouteSpec>,
        handler: H,
        state: Arc<S>,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        self.route(HttpMethod::Get, spec, handler, Some(state))
    }

    pub fn post_with<H>(
        &mut self,
        spec: impl Into<RouteSpec>,
        handler: H,
        state: Arc<S>,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        self.route(HttpMethod::Post, spec, handler, Some(state))
    }

    pub fn put_with<H>(
        &mut self,
        spec: impl Into<RouteSpec>,
        handler: H,
        state: Arc<S>,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        self.route(HttpMethod::Put, spec, handler, Some(state))
    }

    pub fn delete_with<H>(
        &mut self,
        spec: impl Into<RouteSpec>,
        handler: H,
        state: Arc<S>,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&Context<'_, S>, Params) -> Outcome + Send + Sync + 'static,
    {
        self.route(HttpMethod::Delete, spec, handler, Some(state))
    }

    /// Serves files under `root` for GET paths starting with `prefix`.
    ///
    /// Registered as an ordinary route, so it takes its place in match order.
    /// A missing file falls through to later routes.
    pub fn serve_static(&mut self, root: &str, prefix: &str) -> Result<&mut Self, RouteError> {
        let files = Arc::new(StaticFiles::new(root, prefix)?);
        let spec = files.route_spec()?;
        self.get(spec, move |cx, params| files.serve(cx, params))
    }

    /// View used by [`Response::render`] and the error pages.
    pub fn view(&mut self, view: Arc<dyn View>) -> &mut Self {
        self.pages.view = Some(view);
        self
    }

    /// Template rendered instead of the fixed 404 body.
    pub fn not_found_template(&mut self, template: impl Into<String>) -> &mut Self {
        self.pages.not_found = Some(template.into());
        self
    }

    /// Template rendered instead of the fixed 500 body. Its context carries
    /// the rejection under `error`.
    pub fn error_template(&mut self, template: impl Into<String>) -> &mut Self {
        self.pages.internal_error = Some(template.into());
        self
    }

    /// Dispatches `request` from the first route of its method's table.
    pub fn handle(&self, request: impl Into<Arc<HttpRequest>>) -> Dispatch<'_> {
        self.dispatch_from(request, 0)
    }

    /// Dispatches `request` starting at route index `start`.
    pub fn dispatch_from(&self, request: impl Into<Arc<HttpRequest>>, start: usize) -> Dispatch<'_> {
        let request = request.into();
        match self.table.routes(request.method) {
            Some(routes) => Dispatcher::dispatch(routes, &self.pages, request, start),
            None => Dispatch::Ready(responses::method_not_allowed()),
        }
    }
}
