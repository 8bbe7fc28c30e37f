//! HTTP headers abstraction for [`HttpRequest`](crate::http::request::HttpRequest) and
//! [`HttpResponse`](crate::http::response::HttpResponse)
//!
//! Headers are stored in an ordered map to preserve insertion order.
//! Names keep the casing they were first set with, but lookups and
//! replacements are case-insensitive, as HTTP requires.
//!
//! This abstraction does not enforce any HTTP semantics. Higher-level types
//! such as the router's response accumulator apply their own rules on top.

use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpHeaders {
    // lowercased name -> (original name, value)
    headers: IndexMap<String, (String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn set_raw(&mut self, name: &str, value: &str) {
        self.headers.insert(
            name.to_ascii_lowercase(),
            (name.to_string(), value.to_string()),
        );
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.headers
            .shift_remove(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in self.iter() {
            result.push_str(&format!("{}: {}\r\n", name, value));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_keeps_original_name() {
        let mut headers = HttpHeaders::new();
        headers.set_raw("Content-Type", "text/plain");
        headers.set_raw("content-type", "text/html");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("CONTENT-TYPE").map(String::as_str), Some("text/html"));
        assert_eq!(headers.stringify(), "Content-Type: text/html\r\n");
    }

    #[test]
    fn stringify_preserves_insertion_order() {
        let mut headers = HttpHeaders::new();
        headers.set_raw("Server", "rustyroute");
        headers.set_raw("Location", "/elsewhere");
        headers.remove("server");

        assert_eq!(headers.stringify(), "Location: /elsewhere\r\n");
    }
}
