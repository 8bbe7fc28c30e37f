//! View collaborator used by [`Response::render`](crate::router::response::Response::render)
//! and by the router's not-found and error pages.
//!
//! The router only relies on the [`View`] trait. [`FileView`] is the stock
//! implementation: templates are plain files where `{{ key }}` markers are
//! replaced with context values, inserted verbatim.

use std::sync::LazyLock;

use async_std::path::PathBuf;
use async_trait::async_trait;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use thiserror::Error;

pub type TemplateContext = IndexMap<String, String>;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("marker regex is valid")
});

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("failed to load template `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Substitutes every marker. Keys missing from `context` render empty.
    pub fn render(&self, context: &TemplateContext) -> String {
        MARKER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                context.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

#[async_trait]
pub trait View: Send + Sync {
    async fn load_template(&self, path: &str) -> Result<Template, ViewError>;

    async fn render(&self, path: &str, context: &TemplateContext) -> Result<String, ViewError> {
        Ok(self.load_template(path).await?.render(context))
    }
}

/// Loads templates from a directory on every render.
#[derive(Debug, Clone)]
pub struct FileView {
    root: PathBuf,
}

impl FileView {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: PathBuf::from(root.into()),
        }
    }
}

#[async_trait]
impl View for FileView {
    async fn load_template(&self, path: &str) -> Result<Template, ViewError> {
        let full_path = self.root.join(path.trim_start_matches('/'));
        match async_std::fs::read_to_string(&full_path).await {
            Ok(source) => Ok(Template::new(source)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ViewError::NotFound(path.to_string()))
            }
            Err(source) => Err(ViewError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> TemplateContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn markers_are_substituted() {
        let template = Template::new("<h1>{{title}}</h1><p>{{ user.name }} {{missing}}</p>");
        let out = template.render(&context(&[("title", "Hi"), ("user.name", "ana")]));
        assert_eq!(out, "<h1>Hi</h1><p>ana </p>");
    }

    #[async_std::test]
    async fn file_view_renders_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.html"), "Hello {{ name }}!").unwrap();

        let view = FileView::new(dir.path().to_string_lossy().into_owned());
        let out = view
            .render("hello.html", &context(&[("name", "world")]))
            .await
            .unwrap();
        assert_eq!(out, "Hello world!");

        let missing = view.render("nope.html", &TemplateContext::new()).await;
        assert!(matches!(missing, Err(ViewError::NotFound(p)) if p == "nope.html"));
    }
}
