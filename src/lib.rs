//! A small HTTP routing and dispatch layer on async-std.
//!
//! Routes are declared with path patterns (`/users/:id`, `/files/*/*`,
//! `/posts/:id[[0-9]+]`), raw regular expressions or predicates, and are
//! tried in registration order. Handlers may answer synchronously or return
//! a deferred result; a handler that declines passes the request on to the
//! next matching route.

pub mod config;
pub mod handler;
pub mod http;
pub mod net;
pub mod router;
pub mod view;

pub use router::{Context, Outcome, Params, Router};
