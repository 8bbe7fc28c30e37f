/// HTTP status code.
///
/// Handlers may set any code through the response accumulator, so this is a
/// thin wrapper over the numeric value rather than a closed enum. The
/// associated constants cover the codes the server itself produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpStatus(pub u16);

impl HttpStatus {
    pub const OK: HttpStatus = HttpStatus(200);

    pub const MOVED_PERMANENTLY: HttpStatus = HttpStatus(301);
    pub const FOUND: HttpStatus = HttpStatus(302);

    pub const BAD_REQUEST: HttpStatus = HttpStatus(400);
    pub const FORBIDDEN: HttpStatus = HttpStatus(403);
    pub const NOT_FOUND: HttpStatus = HttpStatus(404);
    pub const METHOD_NOT_ALLOWED: HttpStatus = HttpStatus(405);
    pub const REQUEST_TIMEOUT: HttpStatus = HttpStatus(408);
    pub const LENGTH_REQUIRED: HttpStatus = HttpStatus(411);
    pub const PAYLOAD_TOO_LARGE: HttpStatus = HttpStatus(413);
    pub const URI_TOO_LONG: HttpStatus = HttpStatus(414);

    pub const INTERNAL_SERVER_ERROR: HttpStatus = HttpStatus(500);
    pub const HTTP_VERSION_NOT_SUPPORTED: HttpStatus = HttpStatus(505);

    pub fn code(self) -> u16 {
        self.0
    }

    /// Reason phrase written on the status line.
    pub fn reason(self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            411 => "Length Required",
            413 => "Payload Too Large",
            414 => "URI Too Long",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            503 => "Service Unavailable",
            505 => "HTTP Version Not Supported",
            _ => "",
        }
    }
}

impl From<u16> for HttpStatus {
    fn from(code: u16) -> Self {
        HttpStatus(code)
    }
}
