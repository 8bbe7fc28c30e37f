use indexmap::IndexMap;

use crate::http::HttpMethod;
use crate::http::headers::HttpHeaders;

/// Common HTTP request headers
/// This enum defines the set of headers the parser and validator look at by
/// name. Any other header is still stored, through [`HttpHeaders::set_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestHeader {
    Host,
    ContentLength,
    ContentType,
    AcceptEncoding,
}

impl RequestHeader {
    pub fn name(self) -> &'static str {
        match self {
            RequestHeader::ContentLength => "Content-Length",
            RequestHeader::ContentType => "Content-Type",
            RequestHeader::Host => "Host",
            RequestHeader::AcceptEncoding => "Accept-Encoding",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Request target exactly as received, query included.
    pub uri: String,
    /// Percent-decoded path component of `uri`, used for routing.
    pub path: String,
    /// Raw query component of `uri`, without the leading `?`.
    pub query: Option<String>,
    pub http_version: (u8, u8),

    // headers
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self {
            method: HttpMethod::Unknown,
            uri: String::new(),
            path: String::new(),
            query: None,
            http_version: (0, 0),
            headers: HttpHeaders::new(),
            body: Vec::new(),
        }
    }

    /// Builds a request for `method` and `target` with no headers or body.
    pub fn with_target(method: HttpMethod, target: &str) -> Self {
        let mut req = Self::new();
        req.method = method;
        req.http_version = (1, 1);
        req.set_target(target);
        req
    }

    /// Stores the request target and splits it into decoded path and query.
    ///
    /// A path that is not valid percent-encoded UTF-8 is kept as received.
    pub fn set_target(&mut self, target: &str) {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };

        self.uri = target.to_string();
        self.path = urlencoding::decode(path)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| path.to_string());
        self.query = query;
    }

    /// Sets a request header constrained to the named [`RequestHeader`] variants.
    ///
    /// No validation is performed on the header value itself.
    pub fn set_header(&mut self, h: RequestHeader, value: &str) {
        self.headers.set_raw(h.name(), value);
    }

    pub fn header(&self, h: RequestHeader) -> Option<&String> {
        self.headers.get(h.name())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header(RequestHeader::ContentLength)
            .and_then(|v| v.parse::<usize>().ok())
    }

    /// Parses the query component into decoded key/value pairs.
    ///
    /// Keys without `=` map to an empty value; `+` decodes to a space; a
    /// repeated key keeps its last value.
    pub fn query_params(&self) -> IndexMap<String, String> {
        let Some(query) = self.query.as_deref() else {
            return IndexMap::new();
        };

        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect()
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_splits_into_decoded_path_and_query() {
        let req = HttpRequest::with_target(HttpMethod::Get, "/files/a%20b.css?v=2");

        assert_eq!(req.uri, "/files/a%20b.css?v=2");
        assert_eq!(req.path, "/files/a b.css");
        assert_eq!(req.query.as_deref(), Some("v=2"));
    }

    #[test]
    fn query_params_decode_pairs() {
        let req = HttpRequest::with_target(HttpMethod::Get, "/search?q=hello+world&lang=fr%2Dbe&flag&");
        let params = req.query_params();

        assert_eq!(params.get("q").map(String::as_str), Some("hello world"));
        assert_eq!(params.get("lang").map(String::as_str), Some("fr-be"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn missing_query_yields_no_params() {
        let req = HttpRequest::with_target(HttpMethod::Post, "/submit");
        assert!(req.query_params().is_empty());
    }
}
