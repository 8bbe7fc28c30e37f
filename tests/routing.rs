use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use regex::Regex;

use rustyroute::http::HttpMethod;
use rustyroute::http::request::HttpRequest;
use rustyroute::http::response::HttpResponse;
use rustyroute::http::status::HttpStatus;
use rustyroute::router::{HandlerError, Outcome, Params, RouteError, RouteSpec, Router};

fn get(path: &str) -> HttpRequest {
    HttpRequest::with_target(HttpMethod::Get, path)
}

/// Router answering every match on `spec` with the debug form of its params.
fn echo_params(spec: impl Into<RouteSpec>) -> Router {
    let mut router = Router::new();
    router
        .get(spec, |cx, params| {
            cx.ok("text/plain");
            Outcome::value(format!("{params:?}"))
        })
        .unwrap();
    router
}

async fn fetch(router: &Router, path: &str) -> HttpResponse {
    router.handle(get(path)).await
}

fn named(pairs: &[(&str, &str)]) -> String {
    let map: IndexMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    format!("{:?}", Params::Named(map))
}

fn positional(values: &[&str]) -> String {
    format!(
        "{:?}",
        Params::Positional(values.iter().map(|v| v.to_string()).collect())
    )
}

#[async_std::test]
async fn literal_routes_match_exactly() {
    let router = echo_params("/file.txt");

    assert_eq!(fetch(&router, "/file.txt").await.status, HttpStatus::OK);
    assert_eq!(fetch(&router, "/fileXtxt").await.status, HttpStatus::NOT_FOUND);
    assert_eq!(fetch(&router, "/file.txt/").await.status, HttpStatus::NOT_FOUND);
}

#[async_std::test]
async fn multiple_named_params() {
    let router = echo_params("/multiple/:named/:params");

    let res = fetch(&router, "/multiple/one/two").await;
    assert_eq!(res.body_str(), named(&[("named", "one"), ("params", "two")]));

    let res = fetch(&router, "/multiple/no.dots/blah").await;
    assert_eq!(res.status, HttpStatus::NOT_FOUND);
}

#[async_std::test]
async fn constrained_named_param() {
    let router = echo_params("/:named[a{3,4}]");

    assert_eq!(fetch(&router, "/aaa").await.body_str(), named(&[("named", "aaa")]));
    assert_eq!(fetch(&router, "/aaaa").await.body_str(), named(&[("named", "aaaa")]));
    assert_eq!(fetch(&router, "/aa").await.status, HttpStatus::NOT_FOUND);
    assert_eq!(fetch(&router, "/aaaaa").await.status, HttpStatus::NOT_FOUND);
}

#[async_std::test]
async fn positional_wildcards() {
    let router = echo_params("/*/*");

    assert_eq!(fetch(&router, "/one/two").await.body_str(), positional(&["one", "two"]));
    assert_eq!(fetch(&router, "/one/").await.status, HttpStatus::NOT_FOUND);
    assert_eq!(fetch(&router, "/one//two").await.status, HttpStatus::NOT_FOUND);
}

#[async_std::test]
async fn regex_routes_give_capture_groups() {
    let router = echo_params(Regex::new(r"^/v(\d+)/(.+)$").unwrap());

    assert_eq!(fetch(&router, "/v2/users/7").await.body_str(), positional(&["2", "users/7"]));
    assert_eq!(fetch(&router, "/vX/users").await.status, HttpStatus::NOT_FOUND);
}

#[async_std::test]
async fn predicate_routes() {
    let router = echo_params(RouteSpec::predicate(|req, path| {
        (req.method == HttpMethod::Get && path.len() > 10).then_some(Params::None)
    }));

    assert_eq!(fetch(&router, "/a/long/path").await.status, HttpStatus::OK);
    assert_eq!(fetch(&router, "/short").await.status, HttpStatus::NOT_FOUND);
}

#[test]
fn mixed_placeholders_fail_registration() {
    let mut router = Router::new();
    let err = router
        .get("/:user/*", |_, _| Outcome::Declined)
        .err()
        .unwrap();
    assert!(matches!(err, RouteError::ConflictingPlaceholderSyntax { .. }));
}

#[async_std::test]
async fn fallthrough_and_deferred_outcomes() {
    let declined = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&declined);

    let mut router = Router::new();
    router
        .get("/item/:id", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Outcome::Declined
        })
        .unwrap()
        .get("/item/:id[[0-9]+]", |cx, params| {
            let id = params.get("id").unwrap_or_default().to_string();
            cx.ok("application/json");
            Outcome::resolve(async move { Ok(Some(format!(r#"{{"id":{id}}}"#))) })
        })
        .unwrap()
        .get("/item/:id", |_, _| {
            Outcome::deferred(async { Err(HandlerError::msg("lookup failed")) })
        })
        .unwrap();

    let res = fetch(&router, "/item/42").await;
    assert_eq!(res.status, HttpStatus::OK);
    assert_eq!(res.body_str(), r#"{"id":42}"#);

    let res = fetch(&router, "/item/abc").await;
    assert_eq!(res.status, HttpStatus::INTERNAL_SERVER_ERROR);

    assert_eq!(declined.load(Ordering::SeqCst), 2);

    let res = fetch(&router, "/elsewhere").await;
    assert_eq!(res.status, HttpStatus::NOT_FOUND);
}

#[async_std::test]
async fn concurrent_requests_do_not_share_responses() {
    let mut router = Router::new();
    router
        .get("/wait/:ms[[0-9]+]", |cx, params| {
            let ms: u64 = params.get("ms").and_then(|v| v.parse().ok()).unwrap_or(0);
            let response = cx.response.clone();
            Outcome::deferred(async move {
                async_std::task::sleep(std::time::Duration::from_millis(ms)).await;
                response.ok("text/plain").add_to_body(format!("{ms}"));
                Ok(Outcome::Declined)
            })
        })
        .unwrap();
    let router = Arc::new(router);

    let slow = {
        let router = Arc::clone(&router);
        async_std::task::spawn(async move { router.handle(get("/wait/30")).await })
    };
    let fast = fetch(&router, "/wait/1").await;

    assert_eq!(fast.body_str(), "1");
    assert_eq!(slow.await.body_str(), "30");
}
