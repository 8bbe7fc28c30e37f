use std::sync::Arc;

use crate::http::HttpMethod;
use crate::router::handler::BoxedHandler;
use crate::router::pattern::Matcher;

/// One registered route: matcher, handler and the context it runs with.
pub struct Route<S> {
    matcher: Matcher,
    pub(crate) handler: BoxedHandler<S>,
    pub(crate) state: Arc<S>,
}

impl<S> Route<S> {
    pub fn new(matcher: Matcher, handler: BoxedHandler<S>, state: Arc<S>) -> Self {
        Self {
            matcher,
            handler,
            state,
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

/// Append-only route lists, one per supported method.
/// Position in a list is match priority.
pub struct RouteTable<S> {
    get: Vec<Route<S>>,
    post: Vec<Route<S>>,
    put: Vec<Route<S>>,
    delete: Vec<Route<S>>,
}

impl<S> RouteTable<S> {
    pub fn new() -> Self {
        Self {
            get: Vec::new(),
            post: Vec::new(),
            put: Vec::new(),
            delete: Vec::new(),
        }
    }

    /// Routes for `method`, or `None` if the method has no table.
    pub fn routes(&self, method: HttpMethod) -> Option<&[Route<S>]> {
        match method {
            HttpMethod::Get => Some(&self.get),
            HttpMethod::Post => Some(&self.post),
            HttpMethod::Put => Some(&self.put),
            HttpMethod::Delete => Some(&self.delete),
            _ => None,
        }
    }

    /// Appends `route` to the table for `method`. Gives the route back if
    /// the method has no table.
    pub fn push(&mut self, method: HttpMethod, route: Route<S>) -> Result<(), Route<S>> {
        let routes = match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            _ => return Err(route),
        };
        routes.push(route);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.get.len() + self.post.len() + self.put.len() + self.delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for RouteTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::handler::{Context, Outcome};
    use crate::router::pattern::{Params, compile};

    fn decline(_: &Context<'_, ()>, _: Params) -> Outcome {
        Outcome::Declined
    }

    fn route(pattern: &str) -> Route<()> {
        Route::new(compile(pattern.into()).unwrap(), Arc::new(decline), Arc::new(()))
    }

    #[test]
    fn routes_keep_registration_order_per_method() {
        let mut table = RouteTable::new();
        table.push(HttpMethod::Get, route("/a")).ok().unwrap();
        table.push(HttpMethod::Get, route("/:b")).ok().unwrap();
        table.push(HttpMethod::Post, route("/*")).ok().unwrap();

        let kinds: Vec<_> = table
            .routes(HttpMethod::Get)
            .unwrap()
            .iter()
            .map(|r| r.matcher().kind())
            .collect();
        assert_eq!(kinds, ["exact", "named"]);
        assert_eq!(table.routes(HttpMethod::Post).unwrap()[0].matcher().kind(), "positional");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn methods_without_a_table_give_the_route_back() {
        let mut table = RouteTable::new();
        assert!(table.routes(HttpMethod::Options).is_none());
        assert!(table.push(HttpMethod::Head, route("/")).is_err());
        assert!(table.is_empty());
    }
}
