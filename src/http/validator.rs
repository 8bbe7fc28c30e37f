use thiserror::Error;

use crate::config::config;
use crate::http::HttpMethod;
use crate::http::HttpVersion;
use crate::http::request::HttpRequest;
use crate::http::status::HttpStatus;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ValidatorError {
    #[error("invalid HTTP version")]
    InvalidVersion,
    #[error("HTTP version above the configured maximum")]
    HttpVersionNotSupported,
    #[error("body exceeds the configured limit")]
    PayloadTooLarge,
    #[error("malformed header field")]
    MalformedHeaderField,
    #[error("body sent without Content-Length")]
    MissingContentLength,
    #[error("method does not allow a body")]
    BodyNotAllowed,
}

impl ValidatorError {
    pub fn into_http_status(self) -> HttpStatus {
        match self {
            ValidatorError::InvalidVersion => HttpStatus::BAD_REQUEST,
            ValidatorError::HttpVersionNotSupported => HttpStatus::HTTP_VERSION_NOT_SUPPORTED,
            ValidatorError::PayloadTooLarge => HttpStatus::PAYLOAD_TOO_LARGE,
            ValidatorError::MalformedHeaderField => HttpStatus::BAD_REQUEST,
            ValidatorError::BodyNotAllowed => HttpStatus::BAD_REQUEST,
            ValidatorError::MissingContentLength => HttpStatus::LENGTH_REQUIRED,
        }
    }
}

pub struct Validator;

impl Validator {
    fn validate_http_version(v: (u8, u8)) -> Result<(), ValidatorError> {
        match HttpVersion::from_pair(v) {
            Some(http_v) if http_v <= config().http_version => Ok(()),
            Some(_) => Err(ValidatorError::HttpVersionNotSupported),
            None => Err(ValidatorError::InvalidVersion),
        }
    }

    fn validate_http_method(
        content_length: Option<usize>,
        method: &HttpMethod,
    ) -> Result<(), ValidatorError> {
        match method {
            HttpMethod::Get | HttpMethod::Head => match content_length {
                Some(n) if n > 0 => Err(ValidatorError::BodyNotAllowed),
                _ => Ok(()),
            },

            // An empty POST/PUT is legal, but it must say so.
            HttpMethod::Post | HttpMethod::Put => match content_length {
                None => Err(ValidatorError::MissingContentLength),
                Some(_) => Ok(()),
            },
            _ => Ok(()),
        }
    }

    pub fn validate_request(req: &HttpRequest) -> Result<(), ValidatorError> {
        Self::validate_http_version(req.http_version)?;

        let content_length = req
            .headers
            .get("Content-Length")
            .map(|v| v.parse::<usize>())
            .transpose()
            .map_err(|_| ValidatorError::MalformedHeaderField)?;

        Self::validate_http_method(content_length, &req.method)?;

        if content_length.is_some_and(|len| len > config().max_body_size) {
            return Err(ValidatorError::PayloadTooLarge);
        }

        Ok(())
    }
}
