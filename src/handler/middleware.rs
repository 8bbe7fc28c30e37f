//! Response post-processing applied after dispatch.

use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder};
use std::io::Write;
use tracing::{debug, warn};

use crate::http::request::{HttpRequest, RequestHeader};
use crate::http::response::{HttpResponse, ResponseHeader};

/// Content codings the server can produce, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    Gzip,
    Deflate,
}

impl CompressionAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionAlgorithm::Gzip => "gzip",
            CompressionAlgorithm::Deflate => "deflate",
        }
    }

    /// Picks the first supported coding the client accepts.
    ///
    /// `q=0` entries are refusals; other quality values are not ranked.
    pub fn negotiate(accept_encoding: &str) -> Option<Self> {
        let accepted: Vec<&str> = accept_encoding
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';').map(str::trim);
                let coding = parts.next()?;
                let refused = parts.any(|p| matches!(p, "q=0" | "q=0.0" | "q=0.00" | "q=0.000"));
                (!coding.is_empty() && !refused).then_some(coding)
            })
            .collect();

        [CompressionAlgorithm::Gzip, CompressionAlgorithm::Deflate]
            .into_iter()
            .find(|algo| {
                accepted
                    .iter()
                    .any(|coding| *coding == "*" || coding.eq_ignore_ascii_case(algo.as_str()))
            })
    }
}

/// Compresses the body when the request allows it.
///
/// Empty bodies and responses that already carry a `Content-Encoding` are
/// left untouched. A compression failure leaves the response as it was.
pub fn apply(req: &HttpRequest, res: &mut HttpResponse) {
    if res.body.is_empty() || res.header(ResponseHeader::ContentEncoding).is_some() {
        return;
    }
    let Some(algo) = req
        .header(RequestHeader::AcceptEncoding)
        .and_then(|value| CompressionAlgorithm::negotiate(value))
    else {
        return;
    };

    match compress(&res.body, algo) {
        Ok(body) => {
            debug!(coding = algo.as_str(), from = res.body.len(), to = body.len(), "compressed response body");
            res.body = body;
            res.set_header(ResponseHeader::ContentEncoding, algo.as_str());
            res.set_header(ResponseHeader::ContentLength, &res.body.len().to_string());
        }
        Err(err) => warn!(coding = algo.as_str(), %err, "response compression failed"),
    }
}

fn compress(body: &[u8], algo: CompressionAlgorithm) -> std::io::Result<Vec<u8>> {
    match algo {
        CompressionAlgorithm::Gzip => {
            let mut e = GzEncoder::new(Vec::new(), Compression::default());
            e.write_all(body)?;
            e.finish()
        }
        CompressionAlgorithm::Deflate => {
            let mut e = DeflateEncoder::new(Vec::new(), Compression::default());
            e.write_all(body)?;
            e.finish()
        }
    }
}
