//! Connection handling on top of the router.
//!
//! The server owns the networking side only: it accepts TCP connections,
//! reads and parses one request per connection, hands it to the
//! [`Router`], and writes the response back.
//!
//! ## Request handling flow
//!
//! 1. Accept a TCP connection and spawn a task for it
//! 2. Incrementally parse the bytes into an [`HttpRequest`]
//!    (delegated to [`Parser`])
//! 3. Validate the request once its headers are known
//!    (delegated to [`Validator`])
//! 4. Dispatch through the router and await a deferred result if any
//! 5. Compress the body when the client allows it
//! 6. Serialize and write the response
//!
//! Parse and validation errors become the matching error response. Reads
//! and writes are bounded by the configured timeouts.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use async_std::io;
use async_std::net::{TcpListener, TcpStream};
use async_std::prelude::*;
use async_std::task;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::config;
use crate::handler::{self, middleware};
use crate::http::parser::*;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::status::HttpStatus;
use crate::http::validator::{Validator, ValidatorError};
use crate::router::Router;

pub struct Server<S = ()> {
    router: Arc<Router<S>>,
}

/// Errors that interrupt reading a request. Everything except a closed or
/// broken connection is answered with an error response.
#[derive(Debug, Error)]
enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("timed out waiting for the request")]
    Timeout,

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

impl<S> Server<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(router: Arc<Router<S>>) -> Self {
        Self { router }
    }

    /// Binds to the configured address and port and serves until the
    /// listener fails to bind.
    ///
    /// Accept errors are logged and do not stop the loop.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind((config().address, config().port)).await?;
        info!(address = %config().address, port = config().port, "listening");

        let mut incoming = listener.incoming();
        while let Some(stream) = incoming.next().await {
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(%err, "failed to accept connection");
                    continue;
                }
            };

            let router = Arc::clone(&self.router);
            task::spawn(async move {
                let peer = stream.peer_addr().ok();
                if let Err(err) = Self::handle_client(router, stream, peer).await {
                    error!(?peer, %err, "failed to write response");
                }
            });
        }

        Ok(())
    }

    /// Reads and incrementally parses one request from the stream.
    ///
    /// The request is validated as soon as its headers are parsed, before any
    /// body bytes are accepted.
    async fn read_request(stream: &mut TcpStream) -> Result<HttpRequest, ReadError> {
        let mut parser = Parser::new();
        let mut req = HttpRequest::new();
        let mut buffer = vec![0; config().buffer_size];
        let mut incoming: &[u8] = &[];

        loop {
            match parser.feed(incoming, &mut req)? {
                ParserOk::Done => return Ok(req),
                ParserOk::HeadersDone => {
                    Validator::validate_request(&req)?;
                    // the body may already be buffered
                    incoming = &[];
                    continue;
                }
                ParserOk::Incomplete => {}
            }

            let n = Self::read_chunk(stream, &mut buffer).await?;
            incoming = &buffer[..n];
        }
    }

    async fn read_chunk(stream: &mut TcpStream, buffer: &mut [u8]) -> Result<usize, ReadError> {
        loop {
            match io::timeout(config().read_timeout, stream.read(buffer)).await {
                Ok(0) => return Err(ReadError::ConnectionClosed),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Err(ReadError::Timeout),
                Err(err) => return Err(ReadError::Io(err)),
            }
        }
    }

    async fn write_response(stream: &mut TcpStream, response: &HttpResponse) -> std::io::Result<()> {
        let head = response.build_headers(&config().server_name);
        io::timeout(config().write_timeout, async {
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(&response.body).await?;
            stream.flush().await
        })
        .await
    }

    /// Handles a single connection: one request, one response.
    async fn handle_client(
        router: Arc<Router<S>>,
        mut stream: TcpStream,
        peer: Option<SocketAddr>,
    ) -> std::io::Result<()> {
        let response = match Self::read_request(&mut stream).await {
            Ok(req) => {
                let req = Arc::new(req);
                let mut res = router.handle(Arc::clone(&req)).await;
                middleware::apply(&req, &mut res);
                info!(
                    method = %req.method,
                    path = %req.path,
                    status = res.status.code(),
                    bytes = res.body.len(),
                    "request handled"
                );
                res
            }
            Err(ReadError::ConnectionClosed) => {
                debug!(?peer, "connection closed before a full request");
                return Ok(());
            }
            Err(ReadError::Io(err)) => {
                error!(?peer, %err, "I/O error while reading request");
                return Ok(());
            }
            Err(ReadError::Timeout) => {
                debug!(?peer, "request read timed out");
                handler::handle_error(HttpStatus::REQUEST_TIMEOUT)
            }
            Err(ReadError::Parser(err)) => {
                debug!(?peer, %err, "rejecting unparsable request");
                handler::handle_error(err.into_http_status())
            }
            Err(ReadError::Validator(err)) => {
                debug!(?peer, %err, "rejecting invalid request");
                handler::handle_error(err.into_http_status())
            }
        };

        Self::write_response(&mut stream, &response).await
    }
}
