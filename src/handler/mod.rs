pub mod middleware;
pub mod responses;
pub mod static_files;

use crate::http::response::HttpResponse;
use crate::http::status::HttpStatus;

/// Response for a request that never reached the router.
pub fn handle_error(err: HttpStatus) -> HttpResponse {
    responses::any_error(err)
}
