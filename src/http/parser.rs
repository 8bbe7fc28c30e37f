//! Incremental HTTP/1.x request parser.
//!
//! Bytes are fed as they arrive from the socket. The parser advances through
//! the request line, the header block and the body, and reports
//! [`ParserOk::HeadersDone`] once so the caller can validate the request
//! before any body bytes are accepted.

use thiserror::Error;

use crate::config::config;
use crate::http::request::*;
use crate::http::status::HttpStatus;
use crate::http::*;

/// Slack allowed on top of `max_path_size` for the method and version tokens.
const REQUEST_LINE_SLACK: usize = 32;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParserOk {
    /// More bytes are needed.
    Incomplete,
    /// Request line and headers are parsed, the body (if any) is not.
    HeadersDone,
    /// The request is complete.
    Done,
}

// To keep parser logic separate from HTTP status codes,
// statuses are not used here directly but mapped later.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ParserError {
    #[error("malformed request")]
    BadRequest,

    #[error("declared body exceeds the configured limit")]
    PayloadTooLarge,

    #[error("request target exceeds the configured limit")]
    UriTooLong,

    #[error("unsupported HTTP version")]
    HttpVersionNotSupported,
}

impl ParserError {
    pub fn into_http_status(self) -> HttpStatus {
        match self {
            ParserError::BadRequest => HttpStatus::BAD_REQUEST,
            ParserError::PayloadTooLarge => HttpStatus::PAYLOAD_TOO_LARGE,
            ParserError::UriTooLong => HttpStatus::URI_TOO_LONG,
            ParserError::HttpVersionNotSupported => HttpStatus::HTTP_VERSION_NOT_SUPPORTED,
        }
    }
}

#[derive(PartialEq, PartialOrd, Debug)]
enum ParserState {
    RequestLine,
    Headers,
    Body,
    Done,
}

pub struct Parser {
    buf: Vec<u8>,
    header_bytes: usize,
    state: ParserState,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            header_bytes: 0,
            state: ParserState::RequestLine,
        }
    }

    /// Appends `data` and parses as far as the buffered bytes allow.
    pub fn feed(&mut self, data: &[u8], req: &mut HttpRequest) -> Result<ParserOk, ParserError> {
        self.buf.extend_from_slice(data);

        // Iteratively parse request based on current state while data is available
        loop {
            match self.state {
                ParserState::RequestLine => {
                    if !self.parse_request_line(req)? {
                        return Ok(ParserOk::Incomplete);
                    }
                }
                ParserState::Headers => {
                    if !self.parse_header_line(req)? {
                        return Ok(ParserOk::Incomplete);
                    }
                    if self.state > ParserState::Headers {
                        return Ok(ParserOk::HeadersDone);
                    }
                }
                ParserState::Body => return Ok(self.parse_body(req)),
                ParserState::Done => return Ok(ParserOk::Done),
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buf.windows(2).position(|w| w == b"\r\n")?;
        let line = self.buf[..end].to_vec();
        self.buf.drain(..end + 2);
        Some(line)
    }

    fn parse_request_line(&mut self, req: &mut HttpRequest) -> Result<bool, ParserError> {
        let Some(line) = self.take_line() else {
            if self.buf.len() > config().max_path_size + REQUEST_LINE_SLACK {
                return Err(ParserError::UriTooLong);
            }
            return Ok(false);
        };

        // Request line: METHOD PATH HTTP/VERSION
        let parts: Vec<&[u8]> = line.split(|&b| b == b' ').collect();
        if parts.len() != 3 {
            return Err(ParserError::BadRequest);
        }

        if parts[0].len() > HTTP_METHOD_MAX_LEN {
            return Err(ParserError::BadRequest);
        }

        let method = std::str::from_utf8(parts[0])
            .map_err(|_| ParserError::BadRequest)?
            .to_uppercase();
        let method = match http_method_from_str(&method) {
            HttpMethod::Unknown => return Err(ParserError::BadRequest),
            m => m,
        };

        let target = std::str::from_utf8(parts[1]).map_err(|_| ParserError::BadRequest)?;
        if target.len() > config().max_path_size {
            return Err(ParserError::UriTooLong);
        }
        if target.is_empty() {
            return Err(ParserError::BadRequest);
        }

        let version = std::str::from_utf8(parts[2]).unwrap_or("");
        let (maj, min) = version
            .strip_prefix("HTTP/")
            .and_then(|v| v.split_once('.'))
            .and_then(|(maj, min)| Some((maj.parse::<u8>().ok()?, min.parse::<u8>().ok()?)))
            .ok_or(ParserError::BadRequest)?;

        if !(maj == 1 && (min == 0 || min == 1)) {
            return Err(ParserError::HttpVersionNotSupported);
        }

        req.method = method;
        req.set_target(target);
        req.http_version = (maj, min);

        self.state = ParserState::Headers;
        Ok(true)
    }

    fn parse_header_line(&mut self, req: &mut HttpRequest) -> Result<bool, ParserError> {
        let Some(line) = self.take_line() else {
            if self.header_bytes + self.buf.len() > config().max_header_size {
                return Err(ParserError::BadRequest);
            }
            return Ok(false);
        };

        self.header_bytes += line.len() + 2;
        if self.header_bytes > config().max_header_size {
            return Err(ParserError::BadRequest);
        }

        // Blank line terminates the header block
        if line.is_empty() {
            if !check_headers(req) {
                return Err(ParserError::BadRequest);
            }
            self.state = match req.header(RequestHeader::ContentLength) {
                Some(_) => ParserState::Body,
                None => ParserState::Done,
            };
            return Ok(true);
        }

        let (name, value) = match line.iter().position(|&b| b == b':') {
            Some(i) => (&line[..i], &line[i + 1..]),
            None => return Err(ParserError::BadRequest),
        };

        let name = std::str::from_utf8(name)
            .map_err(|_| ParserError::BadRequest)?
            .trim();
        let value = std::str::from_utf8(value)
            .map_err(|_| ParserError::BadRequest)?
            .trim();
        if name.is_empty() || name.contains(' ') {
            return Err(ParserError::BadRequest);
        }

        if name.eq_ignore_ascii_case(RequestHeader::ContentLength.name()) {
            let content_len = value
                .parse::<usize>()
                .map_err(|_| ParserError::BadRequest)?;
            if content_len > config().max_body_size {
                return Err(ParserError::PayloadTooLarge);
            }
        }

        req.headers.set_raw(name, value);
        Ok(true)
    }

    fn parse_body(&mut self, req: &mut HttpRequest) -> ParserOk {
        let content_length = req.content_length().unwrap_or(0);
        let to_copy = std::cmp::min(self.buf.len(), content_length - req.body.len());

        req.body.extend(self.buf.drain(..to_copy));

        if req.body.len() == content_length {
            self.state = ParserState::Done;
            return ParserOk::Done;
        }

        ParserOk::Incomplete
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn check_headers(req: &HttpRequest) -> bool {
    // Host is mandatory from HTTP/1.1 on
    req.http_version < (1, 1) || req.header(RequestHeader::Host).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_without_body() {
        let mut parser = Parser::new();
        let mut req = HttpRequest::new();

        let res = parser.feed(b"GET /static/app.css?v=1 HTTP/1.1\r\nHost: localhost\r\nAccept-Encoding: gzip\r\n\r\n", &mut req);
        assert_eq!(res, Ok(ParserOk::HeadersDone));
        assert_eq!(parser.feed(&[], &mut req), Ok(ParserOk::Done));

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/static/app.css");
        assert_eq!(req.query.as_deref(), Some("v=1"));
        assert_eq!(req.header(RequestHeader::AcceptEncoding).map(String::as_str), Some("gzip"));
    }

    #[test]
    fn body_may_arrive_in_pieces() {
        let mut parser = Parser::new();
        let mut req = HttpRequest::new();

        assert_eq!(parser.feed(b"POST /items HTTP/1.1\r\nHo", &mut req), Ok(ParserOk::Incomplete));
        assert_eq!(
            parser.feed(b"st: x\r\nContent-Length: 5\r\n\r\nhe", &mut req),
            Ok(ParserOk::HeadersDone)
        );
        assert_eq!(parser.feed(&[], &mut req), Ok(ParserOk::Incomplete));
        assert_eq!(parser.feed(b"llo", &mut req), Ok(ParserOk::Done));
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn rejects_unknown_method_and_version() {
        let mut req = HttpRequest::new();
        assert_eq!(
            Parser::new().feed(b"BREW /pot HTTP/1.1\r\n", &mut req),
            Err(ParserError::BadRequest)
        );
        assert_eq!(
            Parser::new().feed(b"GET / HTTP/2.0\r\n", &mut req),
            Err(ParserError::HttpVersionNotSupported)
        );
    }

    #[test]
    fn missing_host_on_http11_is_rejected() {
        let mut req = HttpRequest::new();
        assert_eq!(
            Parser::new().feed(b"GET / HTTP/1.1\r\n\r\n", &mut req),
            Err(ParserError::BadRequest)
        );

        let mut req = HttpRequest::new();
        assert_eq!(
            Parser::new().feed(b"GET / HTTP/1.0\r\n\r\n", &mut req),
            Ok(ParserOk::HeadersDone)
        );
    }

    #[test]
    fn oversized_body_is_rejected_from_headers() {
        let mut req = HttpRequest::new();
        let too_big = config().max_body_size + 1;
        let raw = format!("PUT /x HTTP/1.1\r\nHost: h\r\nContent-Length: {too_big}\r\n\r\n");

        assert_eq!(
            Parser::new().feed(raw.as_bytes(), &mut req),
            Err(ParserError::PayloadTooLarge)
        );
        assert_eq!(ParserError::PayloadTooLarge.into_http_status(), HttpStatus::PAYLOAD_TOO_LARGE);
    }
}
