use std::time::SystemTime;

use crate::http::headers::HttpHeaders;
use crate::http::status::HttpStatus;

pub enum ResponseHeader {
    ContentLength,
    ContentType,
    ContentEncoding,
    Connection,
    Location,
    Server,
    Date,
}

impl ResponseHeader {
    pub fn name(&self) -> &'static str {
        match self {
            ResponseHeader::ContentType => "Content-Type",
            ResponseHeader::ContentLength => "Content-Length",
            ResponseHeader::ContentEncoding => "Content-Encoding",
            ResponseHeader::Connection => "Connection",
            ResponseHeader::Location => "Location",
            ResponseHeader::Server => "Server",
            ResponseHeader::Date => "Date",
        }
    }
}

/// A finished response, ready to be serialized onto the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: HttpStatus,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: HttpStatus::OK,
            headers: HttpHeaders::new(),
            body: Vec::new(),
        }
    }

    pub fn set_header(&mut self, h: ResponseHeader, value: &str) {
        self.headers.set_raw(h.name(), value);
    }

    pub fn header(&self, h: ResponseHeader) -> Option<&String> {
        self.headers.get(h.name())
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Serializes the status line and headers, terminated by the blank line.
    ///
    /// `Content-Length` always reflects the current body, and `Server` and
    /// `Date` are added when missing.
    pub fn build_headers(&self, server_name: &str) -> String {
        let mut headers = self.headers.clone();
        headers.set_raw(
            ResponseHeader::ContentLength.name(),
            &self.body.len().to_string(),
        );
        if !headers.contains(ResponseHeader::Server.name()) {
            headers.set_raw(ResponseHeader::Server.name(), server_name);
        }
        if !headers.contains(ResponseHeader::Date.name()) {
            headers.set_raw(
                ResponseHeader::Date.name(),
                &httpdate::fmt_http_date(SystemTime::now()),
            );
        }
        headers.set_raw(ResponseHeader::Connection.name(), "close");

        // HTTP/1.1 <status> <reason>\r\n
        // <header_name>: <header_value>\r\n
        // ...
        // \r\n
        format!(
            "HTTP/1.1 {} {}\r\n{}\r\n",
            self.status.code(),
            self.status.reason(),
            headers.stringify(),
        )
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_carries_reason_phrase() {
        let mut res = HttpResponse::new();
        res.status = HttpStatus::NOT_FOUND;
        res.body = b"Resource Not Found".to_vec();

        let head = res.build_headers("rustyroute/0.1");

        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(head.contains("Content-Length: 18\r\n"));
        assert!(head.contains("Server: rustyroute/0.1\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn explicit_headers_are_kept() {
        let mut res = HttpResponse::new();
        res.set_header(ResponseHeader::ContentType, "text/css");
        res.set_header(ResponseHeader::Server, "custom");

        let head = res.build_headers("rustyroute/0.1");

        assert!(head.contains("Content-Type: text/css\r\n"));
        assert!(head.contains("Server: custom\r\n"));
        assert!(!head.contains("rustyroute/0.1"));
    }
}
