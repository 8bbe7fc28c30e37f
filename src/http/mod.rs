use serde::Deserialize;

pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;
pub mod validator;

/// Longest method token the parser accepts (`CONNECT`, `OPTIONS`).
pub const HTTP_METHOD_MAX_LEN: usize = 7;

/// All existing HTTP versions
/// Use to validate HTTP version from request in [`validator`]
/// The max supported version is given in the server config (see [`http_version`](crate::config::ServerConfig::http_version))
#[derive(PartialEq, PartialOrd, Debug, Clone, Deserialize)]
pub enum HttpVersion {
    V0_9,
    V1_0,
    V1_1,
    V2_0,
    V3_0,
}

impl HttpVersion {
    /// Check if a tuple (major, minor) corresponds to a valid HTTP version
    pub fn from_pair(v: (u8, u8)) -> Option<HttpVersion> {
        match v {
            (0, 9) => Some(HttpVersion::V0_9),
            (1, 0) => Some(HttpVersion::V1_0),
            (1, 1) => Some(HttpVersion::V1_1),
            (2, 0) => Some(HttpVersion::V2_0),
            (3, 0) => Some(HttpVersion::V3_0),
            _ => None,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Unknown,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn http_method_from_str(method: &str) -> HttpMethod {
    match method {
        "GET" => HttpMethod::Get,
        "HEAD" => HttpMethod::Head,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        "TRACE" => HttpMethod::Trace,
        "OPTIONS" => HttpMethod::Options,
        "CONNECT" => HttpMethod::Connect,
        _ => HttpMethod::Unknown,
    }
}
