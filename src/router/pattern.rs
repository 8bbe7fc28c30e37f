//! Route pattern compiler.
//!
//! A route is declared with a [`RouteSpec`] and compiled once, at
//! registration, into a [`Matcher`]. Pattern strings support two mutually
//! exclusive placeholder styles:
//!
//! - named: `/users/:id`, yielding [`Params::Named`] keyed by placeholder name
//! - positional: `/files/*`, yielding [`Params::Positional`] in order
//!
//! Either placeholder may carry a regex constraint in brackets
//! (`/:year[\d{4}]`, `/*[a{3,4}]`). Without one, a placeholder matches
//! [`DEFAULT_CONSTRAINT`]. A `*` is only a placeholder when it starts a path
//! segment; anywhere else it is literal text.
//!
//! Strings without placeholders compile to exact comparisons, never to
//! regexes, so a literal `.` only ever matches a `.`.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::http::request::HttpRequest;
use crate::router::error::RouteError;

/// Constraint applied to placeholders declared without brackets: word
/// characters and hyphens, so `/`, `.`, `*` and `+` never match.
pub const DEFAULT_CONSTRAINT: &str = r"[\w-]+";

/// Caller-supplied matching function, given the request and its path.
pub type Predicate = Arc<dyn Fn(&HttpRequest, &str) -> Option<Params> + Send + Sync>;

/// Parameters extracted from a matched path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Params {
    /// Exact routes extract nothing.
    #[default]
    None,
    /// Named placeholders, in order of appearance in the pattern.
    Named(IndexMap<String, String>),
    /// Wildcards or raw regex groups, left to right.
    Positional(Vec<String>),
}

impl Params {
    /// Value of a named placeholder.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Params::Named(map) => map.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Value of the `index`-th positional capture.
    pub fn nth(&self, index: usize) -> Option<&str> {
        match self {
            Params::Positional(values) => values.get(index).map(String::as_str),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Named(map) => map.len(),
            Params::Positional(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Declarative description of the paths a route answers.
pub enum RouteSpec {
    /// Literal path or placeholder pattern.
    Pattern(String),
    /// Raw regex, used as is. Capture groups become positional params.
    Regex(Regex),
    Predicate(Predicate),
}

impl RouteSpec {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&HttpRequest, &str) -> Option<Params> + Send + Sync + 'static,
    {
        RouteSpec::Predicate(Arc::new(f))
    }
}

impl From<&str> for RouteSpec {
    fn from(pattern: &str) -> Self {
        RouteSpec::Pattern(pattern.to_string())
    }
}

impl From<String> for RouteSpec {
    fn from(pattern: String) -> Self {
        RouteSpec::Pattern(pattern)
    }
}

impl From<Regex> for RouteSpec {
    fn from(regex: Regex) -> Self {
        RouteSpec::Regex(regex)
    }
}

/// Compiled form of a [`RouteSpec`]. Immutable once built.
#[derive(Clone)]
pub enum Matcher {
    Exact(String),
    Named { regex: Regex, names: Vec<String> },
    Positional { regex: Regex, groups: Vec<String> },
    Regex(Regex),
    Predicate(Predicate),
}

impl Matcher {
    /// Tests `path`, returning the extracted parameters on a match.
    pub fn matches(&self, request: &HttpRequest, path: &str) -> Option<Params> {
        match self {
            Matcher::Exact(expected) => (expected == path).then_some(Params::None),
            Matcher::Named { regex, names } => {
                let caps = regex.captures(path)?;
                let params = names
                    .iter()
                    .map(|name| {
                        let value = caps.name(name).map_or("", |m| m.as_str());
                        (name.clone(), value.to_string())
                    })
                    .collect();
                Some(Params::Named(params))
            }
            Matcher::Positional { regex, groups } => {
                let caps = regex.captures(path)?;
                let values = groups
                    .iter()
                    .map(|group| caps.name(group).map_or("", |m| m.as_str()).to_string())
                    .collect();
                Some(Params::Positional(values))
            }
            Matcher::Regex(regex) => {
                let caps = regex.captures(path)?;
                let values = caps
                    .iter()
                    .skip(1)
                    .map(|m| m.map_or("", |m| m.as_str()).to_string())
                    .collect();
                Some(Params::Positional(values))
            }
            Matcher::Predicate(predicate) => predicate(request, path),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Matcher::Exact(_) => "exact",
            Matcher::Named { .. } => "named",
            Matcher::Positional { .. } => "positional",
            Matcher::Regex(_) => "regex",
            Matcher::Predicate(_) => "predicate",
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(path) => f.debug_tuple("Exact").field(path).finish(),
            Matcher::Named { regex, names } => f
                .debug_struct("Named")
                .field("regex", &regex.as_str())
                .field("names", names)
                .finish(),
            Matcher::Positional { regex, groups } => f
                .debug_struct("Positional")
                .field("regex", &regex.as_str())
                .field("groups", &groups.len())
                .finish(),
            Matcher::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Compiles a route specification into its matcher.
pub fn compile(spec: RouteSpec) -> Result<Matcher, RouteError> {
    match spec {
        RouteSpec::Pattern(pattern) => compile_pattern(&pattern),
        RouteSpec::Regex(regex) => Ok(Matcher::Regex(regex)),
        RouteSpec::Predicate(predicate) => Ok(Matcher::Predicate(predicate)),
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Literal(String),
    Named { name: String, constraint: Option<String> },
    Wildcard { constraint: Option<String> },
}

fn compile_pattern(pattern: &str) -> Result<Matcher, RouteError> {
    let tokens = tokenize(pattern)?;

    let has_named = tokens.iter().any(|t| matches!(t, Token::Named { .. }));
    let has_wildcard = tokens.iter().any(|t| matches!(t, Token::Wildcard { .. }));

    match (has_named, has_wildcard) {
        (true, true) => Err(RouteError::ConflictingPlaceholderSyntax {
            pattern: pattern.to_string(),
        }),
        (false, false) => Ok(Matcher::Exact(pattern.to_string())),
        (true, false) => {
            let (regex, names) = build_regex(pattern, &tokens)?;
            Ok(Matcher::Named { regex, names })
        }
        (false, true) => {
            let (regex, groups) = build_regex(pattern, &tokens)?;
            Ok(Matcher::Positional { regex, groups })
        }
    }
}

/// Emits an anchored regex with one named group per placeholder.
///
/// Wildcards get synthetic group names (`_0`, `_1`, ...) so that capturing
/// groups inside a constraint cannot shift the extracted values.
fn build_regex(pattern: &str, tokens: &[Token]) -> Result<(Regex, Vec<String>), RouteError> {
    let mut source = String::from("^");
    let mut groups = Vec::new();

    for token in tokens {
        let (group, constraint) = match token {
            Token::Literal(text) => {
                source.push_str(&regex::escape(text));
                continue;
            }
            Token::Named { name, constraint } => (name.clone(), constraint),
            Token::Wildcard { constraint } => (format!("_{}", groups.len()), constraint),
        };
        let constraint = constraint.as_deref().unwrap_or(DEFAULT_CONSTRAINT);
        let _ = write!(source, "(?P<{group}>{constraint})");
        groups.push(group);
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|source| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok((regex, groups))
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, RouteError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let starts_segment = i == 0 || chars[i - 1] == '/';

        if c == ':' && chars.get(i + 1).is_some_and(|&n| is_ident_start(n)) {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            let (constraint, next) = read_constraint(pattern, &chars, end)?;

            flush_literal(&mut literal, &mut tokens);
            tokens.push(Token::Named { name, constraint });
            i = next;
        } else if c == '*' && starts_segment {
            let (constraint, next) = read_constraint(pattern, &chars, i + 1)?;

            flush_literal(&mut literal, &mut tokens);
            tokens.push(Token::Wildcard { constraint });
            i = next;
        } else {
            literal.push(c);
            i += 1;
        }
    }
    flush_literal(&mut literal, &mut tokens);

    Ok(tokens)
}

/// Reads an optional `[...]` constraint starting at `at`. Brackets nest and
/// `\` escapes the next character, so character classes are allowed inside.
fn read_constraint(
    pattern: &str,
    chars: &[char],
    at: usize,
) -> Result<(Option<String>, usize), RouteError> {
    if chars.get(at) != Some(&'[') {
        return Ok((None, at));
    }

    let malformed = || RouteError::MalformedConstraint {
        pattern: pattern.to_string(),
    };

    let mut depth = 1;
    let mut i = at + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    let constraint: String = chars[at + 1..i].iter().collect();
                    if constraint.is_empty() {
                        return Err(malformed());
                    }
                    return Ok((Some(constraint), i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }

    Err(malformed())
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn check(pattern: &str, path: &str) -> Option<Params> {
        let matcher = compile(pattern.into()).unwrap();
        let req = HttpRequest::with_target(HttpMethod::Get, path);
        matcher.matches(&req, path)
    }

    fn named(pairs: &[(&str, &str)]) -> Params {
        Params::Named(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn positional(values: &[&str]) -> Params {
        Params::Positional(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn root_is_exact() {
        assert_eq!(check("/", "/"), Some(Params::None));
        assert_eq!(check("/", "/blah"), None);
        assert_eq!(check("/", "//"), None);
    }

    #[test]
    fn literal_dot_is_not_a_wildcard() {
        let matcher = compile("/some/url.html".into()).unwrap();
        assert!(matches!(matcher, Matcher::Exact(_)));

        assert_eq!(check("/some/url.html", "/some/url.html"), Some(Params::None));
        for path in ["/", "/some/urlxhtml", "/some/url.htm", "/some/url.htmll", "prefix/some/url.html"] {
            assert_eq!(check("/some/url.html", path), None, "{path}");
        }
    }

    #[test]
    fn single_named_placeholder() {
        assert_eq!(check("/:named", "/hello"), Some(named(&[("named", "hello")])));
        assert_eq!(
            check("/:named", "/with-hyphens-and_underscores"),
            Some(named(&[("named", "with-hyphens-and_underscores")]))
        );
        for path in ["/", "/no.dots", "/*", "/+", "/a/b"] {
            assert_eq!(check("/:named", path), None, "{path}");
        }
    }

    #[test]
    fn named_params_keep_pattern_order() {
        let params = check("/multiple/:named/:params", "/multiple/one/two").unwrap();
        assert_eq!(params, named(&[("named", "one"), ("params", "two")]));

        let Params::Named(map) = params else { unreachable!() };
        assert_eq!(map.keys().collect::<Vec<_>>(), ["named", "params"]);

        assert_eq!(
            check("/multiple/:named/:params", "/multiple/A-Z0-9/A_Z0_9"),
            Some(named(&[("named", "A-Z0-9"), ("params", "A_Z0_9")]))
        );
        assert_eq!(check("/multiple/:named/:params", "/multiple/no.dots/blah"), None);
    }

    #[test]
    fn single_wildcard() {
        assert_eq!(check("/*", "/hello"), Some(positional(&["hello"])));
        assert_eq!(check("/*", "/h-y-p-h-e-n-s"), Some(positional(&["h-y-p-h-e-n-s"])));
        assert_eq!(check("/*", "/under_score_s"), Some(positional(&["under_score_s"])));
        for path in ["/", "//", "/+", "/hello/", "/hello/hello"] {
            assert_eq!(check("/*", path), None, "{path}");
        }
    }

    #[test]
    fn wildcards_capture_left_to_right() {
        assert_eq!(
            check("/files/*/rev/*", "/files/report/rev/3"),
            Some(positional(&["report", "3"]))
        );
    }

    #[test]
    fn star_inside_a_segment_is_literal() {
        let matcher = compile("/a*b".into()).unwrap();
        assert!(matches!(matcher, Matcher::Exact(_)));
        assert_eq!(check("/a*b", "/a*b"), Some(Params::None));
    }

    #[test]
    fn named_constraint() {
        assert_eq!(check("/:named[a{3,4}]", "/aaa"), Some(named(&[("named", "aaa")])));
        assert_eq!(check("/:named[a{3,4}]", "/aaaa"), Some(named(&[("named", "aaaa")])));
        for path in ["/", "/aa", "/aaaaa"] {
            assert_eq!(check("/:named[a{3,4}]", path), None, "{path}");
        }
    }

    #[test]
    fn wildcard_constraint() {
        assert_eq!(check("/*[a{3,4}]", "/aaa"), Some(positional(&["aaa"])));
        assert_eq!(check("/*[a{3,4}]", "/aaaa"), Some(positional(&["aaaa"])));
        for path in ["/", "/aa", "/aaaaa"] {
            assert_eq!(check("/*[a{3,4}]", path), None, "{path}");
        }
    }

    #[test]
    fn constraint_may_hold_a_character_class() {
        assert_eq!(check("/posts/:id[[0-9]+]", "/posts/42"), Some(named(&[("id", "42")])));
        assert_eq!(check("/posts/:id[[0-9]+]", "/posts/x1"), None);
    }

    #[test]
    fn groups_inside_constraints_do_not_shift_values() {
        assert_eq!(
            check("/*[(ab)+]/*", "/abab/tail"),
            Some(positional(&["abab", "tail"]))
        );
    }

    #[test]
    fn mixing_placeholder_styles_is_rejected() {
        let err = compile("/:name/*".into()).unwrap_err();
        assert!(matches!(err, RouteError::ConflictingPlaceholderSyntax { .. }));
    }

    #[test]
    fn malformed_constraints_are_rejected() {
        assert!(matches!(
            compile("/:id[abc".into()),
            Err(RouteError::MalformedConstraint { .. })
        ));
        assert!(matches!(
            compile("/:id[]".into()),
            Err(RouteError::MalformedConstraint { .. })
        ));
        assert!(matches!(
            compile("/:id[(]".into()),
            Err(RouteError::InvalidPattern { .. })
        ));
        assert!(matches!(
            compile("/:id/:id".into()),
            Err(RouteError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn raw_regex_groups_are_positional() {
        let regex = Regex::new(r"^/static(.+\.(css|js))$").unwrap();
        let matcher = compile(regex.into()).unwrap();
        let req = HttpRequest::with_target(HttpMethod::Get, "/static/app/main.css");

        assert_eq!(
            matcher.matches(&req, &req.path),
            Some(positional(&["/app/main.css", "css"]))
        );
        assert_eq!(matcher.matches(&req, "/static/app/main.rs"), None);
    }

    #[test]
    fn predicate_sees_request_and_path() {
        let matcher = compile(RouteSpec::predicate(|req, path| {
            (req.query.is_some() && path.starts_with("/api/"))
                .then(|| Params::Positional(vec![path["/api/".len()..].to_string()]))
        }))
        .unwrap();

        let with_query = HttpRequest::with_target(HttpMethod::Get, "/api/users?page=2");
        let without_query = HttpRequest::with_target(HttpMethod::Get, "/api/users");

        assert_eq!(
            matcher.matches(&with_query, &with_query.path),
            Some(positional(&["users"]))
        );
        assert_eq!(matcher.matches(&without_query, &without_query.path), None);
        assert_eq!(matcher.kind(), "predicate");
    }

    #[test]
    fn colon_without_identifier_is_literal() {
        assert_eq!(check("/time/12:30", "/time/12:30"), Some(Params::None));
    }
}
