//! Per-request response accumulator.
//!
//! Handlers build the response incrementally: status, headers and body
//! chunks. One [`ResponseState`] exists per request; [`Response`] is a handle
//! onto it that can be cloned into a deferred handler future.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::http::headers::HttpHeaders;
use crate::http::response::{HttpResponse, ResponseHeader};
use crate::http::status::HttpStatus;
use crate::router::error::HandlerError;
use crate::router::handler::{Deferred, Outcome};
use crate::view::{TemplateContext, View};

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

#[derive(Debug)]
pub struct ResponseState {
    /// `None` until a handler sets one.
    pub status: Option<HttpStatus>,
    pub headers: HttpHeaders,
    /// `None` until the first chunk is added.
    pub body: Option<Vec<Vec<u8>>>,
    pub handled: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        let mut headers = HttpHeaders::new();
        headers.set_raw(ResponseHeader::ContentType.name(), DEFAULT_CONTENT_TYPE);
        Self {
            status: None,
            headers,
            body: None,
            handled: false,
        }
    }
}

#[derive(Clone)]
pub struct Response {
    state: Arc<Mutex<ResponseState>>,
    view: Option<Arc<dyn View>>,
}

impl Response {
    pub fn new() -> Self {
        Self::with_view(None)
    }

    pub(crate) fn with_view(view: Option<Arc<dyn View>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ResponseState::default())),
            view,
        }
    }

    /// Sets the status and claims the response.
    pub fn set_status(&self, status: impl Into<HttpStatus>) -> &Self {
        let mut state = self.state.lock();
        state.status = Some(status.into());
        state.handled = true;
        self
    }

    pub fn set_type(&self, content_type: &str) -> &Self {
        self.set_header(ResponseHeader::ContentType.name(), content_type)
    }

    pub fn set_header(&self, name: &str, value: &str) -> &Self {
        self.state.lock().headers.set_raw(name, value);
        self
    }

    pub fn ok(&self, content_type: &str) -> &Self {
        self.set_status(HttpStatus::OK).set_type(content_type)
    }

    pub fn not_found(&self, content_type: &str) -> &Self {
        self.set_status(HttpStatus::NOT_FOUND).set_type(content_type)
    }

    pub fn internal_server_error(&self, content_type: &str) -> &Self {
        self.set_status(HttpStatus::INTERNAL_SERVER_ERROR)
            .set_type(content_type)
    }

    pub fn redirect(&self, location: &str, permanent: bool) -> &Self {
        let status = if permanent {
            HttpStatus::MOVED_PERMANENTLY
        } else {
            HttpStatus::FOUND
        };
        self.set_status(status)
            .set_header(ResponseHeader::Location.name(), location)
    }

    pub fn add_to_body(&self, chunk: impl Into<Vec<u8>>) -> &Self {
        self.state
            .lock()
            .body
            .get_or_insert_with(Vec::new)
            .push(chunk.into());
        self
    }

    pub fn is_handled(&self) -> bool {
        self.state.lock().handled
    }

    pub fn status(&self) -> Option<HttpStatus> {
        self.state.lock().status
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.state.lock().headers.get(name).cloned()
    }

    /// Renders `template` through the configured view.
    ///
    /// On success the status (default 200) and content type (default
    /// `text/html`) are set and the output resolves as the body. A view
    /// failure rejects, which the dispatcher turns into a 500.
    pub fn render(
        &self,
        template: impl Into<String>,
        context: TemplateContext,
        content_type: Option<&str>,
        status: Option<HttpStatus>,
    ) -> Deferred {
        let response = self.clone();
        let template = template.into();
        let content_type = content_type.unwrap_or("text/html").to_string();
        let status = status.unwrap_or(HttpStatus::OK);

        Box::pin(async move {
            let view = response
                .view
                .clone()
                .ok_or_else(|| HandlerError::msg(format!("no view configured to render `{template}`")))?;
            let output = view.render(&template, &context).await?;
            response.set_status(status).set_type(&content_type);
            Ok::<_, HandlerError>(Outcome::Value(output.into_bytes()))
        })
    }

    /// Produces the wire response: chunks concatenated in order, 200 when no
    /// status was set.
    pub fn finalize(&self) -> HttpResponse {
        let state = self.state.lock();
        let body = state.body.as_ref().map(|chunks| chunks.concat()).unwrap_or_default();

        let mut res = HttpResponse::new();
        res.status = state.status.unwrap_or(HttpStatus::OK);
        res.headers = state.headers.clone();
        res.set_header(ResponseHeader::ContentLength, &body.len().to_string());
        res.body = body;
        res
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
