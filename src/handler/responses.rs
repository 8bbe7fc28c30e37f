use crate::http::response::{HttpResponse, ResponseHeader};
use crate::http::status::HttpStatus;

/// Plain-text response with `Content-Length` already set.
pub fn plain(status: HttpStatus, body: &str) -> HttpResponse {
    let mut res = HttpResponse::new();
    res.status = status;
    res.body = body.as_bytes().to_vec();

    res.set_header(ResponseHeader::ContentLength, &res.body.len().to_string());
    res.set_header(ResponseHeader::ContentType, "text/plain");
    res
}

pub fn not_found() -> HttpResponse {
    plain(HttpStatus::NOT_FOUND, "Resource Not Found")
}

pub fn internal_server_error() -> HttpResponse {
    plain(HttpStatus::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

pub fn method_not_allowed() -> HttpResponse {
    plain(HttpStatus::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Response for a request rejected before dispatch.
pub fn any_error(status: HttpStatus) -> HttpResponse {
    match status {
        HttpStatus::NOT_FOUND => not_found(),
        HttpStatus::INTERNAL_SERVER_ERROR => internal_server_error(),
        HttpStatus::METHOD_NOT_ALLOWED => method_not_allowed(),
        _ => plain(status, status.reason()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_bodies() {
        let res = not_found();
        assert_eq!(res.status, HttpStatus::NOT_FOUND);
        assert_eq!(res.body_str(), "Resource Not Found");
        assert_eq!(res.header(ResponseHeader::ContentType).map(String::as_str), Some("text/plain"));

        let res = internal_server_error();
        assert_eq!(res.status, HttpStatus::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body_str(), "Internal Server Error");
    }

    #[test]
    fn other_statuses_use_the_reason_phrase() {
        let res = any_error(HttpStatus::REQUEST_TIMEOUT);
        assert_eq!(res.status, HttpStatus::REQUEST_TIMEOUT);
        assert_eq!(res.body_str(), HttpStatus::REQUEST_TIMEOUT.reason());
        assert_eq!(
            res.header(ResponseHeader::ContentLength).map(String::as_str),
            Some(res.body.len().to_string().as_str())
        );
    }
}
