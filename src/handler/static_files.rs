use std::io::ErrorKind::*;
use std::sync::Arc;

use async_std::path::PathBuf;
use regex::Regex;
use tracing::{debug, warn};

use crate::http::status::HttpStatus;
use crate::router::{Context, HandlerError, Outcome, Params, Response, RouteError, RouteSpec};

/// File extensions the static route answers for.
pub const EXTENSIONS: &str = "css|js|jpe?g|gif|png|svg|ico|html?|json|txt|spv";

/// Static-asset collaborator, registered as a regular GET route.
///
/// Every request resolves its file anew, so a file swapped for a symlink
/// out of the root is refused as soon as it changes.
pub struct StaticFiles {
    root: PathBuf,
    prefix: String,
}

impl StaticFiles {
    pub fn new(root: &str, prefix: &str) -> Result<Self, RouteError> {
        if root.trim().is_empty() {
            return Err(RouteError::MissingStaticRoot);
        }
        Ok(Self {
            root: PathBuf::from(root.to_string()),
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    /// `^<prefix>(<path>.<ext>)$`, capturing the path below the prefix and
    /// the extension (matched case-insensitively).
    pub fn route_spec(&self) -> Result<RouteSpec, RouteError> {
        let pattern = format!(r"^{}(/.+\.((?i:{EXTENSIONS})))$", regex::escape(&self.prefix));
        Regex::new(&pattern)
            .map(RouteSpec::Regex)
            .map_err(|source| RouteError::InvalidPattern { pattern, source })
    }

    pub fn serve<S>(self: &Arc<Self>, cx: &Context<'_, S>, params: Params) -> Outcome {
        let (Some(path), Some(ext)) = (params.nth(0), params.nth(1)) else {
            return Outcome::Declined;
        };
        let (path, ext) = (path.to_string(), ext.to_ascii_lowercase());

        let files = Arc::clone(self);
        let response = cx.response.clone();
        Outcome::deferred(async move {
            let full_path = match files.resolve(&path).await {
                Ok(Some(full_path)) => full_path,
                Ok(None) => {
                    warn!(%path, "static path escapes the root directory");
                    return Ok(forbidden(&response));
                }
                Err(err) if err.kind() == NotFound => {
                    debug!(%path, "static file not found, falling through");
                    return Ok(Outcome::Declined);
                }
                Err(err) if err.kind() == PermissionDenied => return Ok(forbidden(&response)),
                Err(err) => return Err(HandlerError::Io(err)),
            };

            match async_std::fs::read(&full_path).await {
                Ok(body) => {
                    response.ok(guess_mime(&ext));
                    Ok(Outcome::Value(body))
                }
                Err(err) => match err.kind() {
                    NotFound => Ok(Outcome::Declined),
                    PermissionDenied => Ok(forbidden(&response)),
                    _ => Err(HandlerError::Io(err)),
                },
            }
        })
    }

    /// Canonical path of the file behind `path`, or `None` when it lies
    /// outside the root. The file is read through the returned path, so
    /// the containment check covers what is actually served.
    async fn resolve(&self, path: &str) -> std::io::Result<Option<PathBuf>> {
        let root = async_std::fs::canonicalize(&self.root).await?;
        let full_path = async_std::fs::canonicalize(self.root.join(sanitize_path(path))).await?;
        Ok(full_path.starts_with(&root).then_some(full_path))
    }
}

fn forbidden(response: &Response) -> Outcome {
    response.set_status(HttpStatus::FORBIDDEN).set_type("text/plain");
    Outcome::value("Forbidden")
}

fn sanitize_path(path: &str) -> &str {
    // joined below the root, never as an absolute path
    path.trim_start_matches('/')
}

fn guess_mime(ext: &str) -> &'static str {
    match ext {
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "json" => "application/json",
        "txt" => "text/plain",
        "spv" => "text/spectrum-view",
        _ => "application/octet-stream",
    }
}
