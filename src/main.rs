use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rustyroute::config::{ServerConfig, set_config};
use rustyroute::net::server::Server;
use rustyroute::router::{Outcome, Router};
use rustyroute::view::{FileView, TemplateContext};

const DEFAULT_CONFIG_PATH: &str = "rustyroute.toml";

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let loaded = ServerConfig::load(&path);
    let cfg = loaded.as_ref().cloned().unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = &loaded {
        warn!(%path, %err, "falling back to default config");
    }

    let router = build_router(&cfg)?;
    set_config(cfg);
    info!(routes = router.table().len(), "router ready");

    async_std::task::block_on(Server::new(Arc::new(router)).run())?;
    Ok(())
}

fn build_router(cfg: &ServerConfig) -> Result<Router, Box<dyn Error>> {
    let mut router = Router::new();

    if !cfg.templates_root.is_empty() {
        router
            .view(Arc::new(FileView::new(cfg.templates_root.clone())))
            .not_found_template("404.html");
    }
    if !cfg.static_files_root.is_empty() {
        router.serve_static(&cfg.static_files_root, &cfg.static_prefix)?;
    }

    let server_name = cfg.server_name.clone();
    router
        .get("/", move |cx, _| {
            cx.ok("text/html");
            Outcome::value(format!("<h1>Welcome to {server_name}!</h1>"))
        })?
        .get("/hello/:name", |cx, params| {
            cx.ok("text/plain");
            Outcome::value(format!("Hello, {}!", params.get("name").unwrap_or("stranger")))
        })?
        .post("/echo", |cx, _| {
            let content_type = cx
                .request
                .headers
                .get("Content-Type")
                .cloned()
                .unwrap_or_else(|| "application/octet-stream".to_string());
            cx.ok(&content_type);
            Outcome::value(cx.request.body.clone())
        })?
        .get("/slow/:ms[[0-9]+]", |cx, params| {
            let ms = params.get("ms").and_then(|v| v.parse().ok()).unwrap_or(0u64);
            let response = cx.response.clone();
            Outcome::deferred(async move {
                async_std::task::sleep(Duration::from_millis(ms.min(5_000))).await;
                response.ok("text/plain");
                Ok(Outcome::value(format!("waited {ms}ms")))
            })
        })?
        .get("/pages/:page", |cx, params| {
            let mut context = TemplateContext::new();
            context.insert("method".to_string(), cx.request.method.to_string());
            context.insert("path".to_string(), cx.request.path.clone());
            for (key, value) in cx.request.query_params() {
                context.insert(key, value);
            }
            let page = params.get("page").unwrap_or("index");
            Outcome::Deferred(cx.render(format!("{page}.html"), context, None, None))
        })?;

    Ok(router)
}
