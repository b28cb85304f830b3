//! Radix-tree route table.
//!
//! One tree per HTTP method, O(path-length) lookup. Each tree maps a pattern
//! to a slot in a shared endpoint list, so re-registering a `(method,
//! pattern)` pair swaps the handler in place instead of fighting the tree.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::method::Method;
use crate::middleware::Next;

struct Endpoint {
    pattern: Arc<str>,
    handler: Next,
}

/// Outcome of resolving a request against the table.
pub(crate) enum Lookup {
    Found {
        handler: Next,
        pattern: Arc<str>,
        params: HashMap<String, String>,
        /// Parameters that are not valid percent-encoded UTF-8. They keep
        /// their raw text in `params`.
        malformed: Vec<String>,
    },
    /// The path exists under other methods, listed in `Method` order.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// The route table owned by one [`Mux`](crate::Mux).
#[derive(Default)]
pub(crate) struct RouteTable {
    trees: HashMap<Method, MatchitRouter<usize>>,
    endpoints: Vec<Endpoint>,
    index: HashMap<(Method, String), usize>,
}

impl RouteTable {
    /// Registers `handler` under `(method, pattern)`. A second registration of
    /// the same pair replaces the first.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not valid matchit syntax or conflicts with an
    /// already registered pattern for the same method.
    pub(crate) fn insert(&mut self, method: Method, pattern: &str, handler: Next) {
        if let Some(&slot) = self.index.get(&(method, pattern.to_owned())) {
            debug!(%method, pattern, "replacing route handler");
            self.endpoints[slot].handler = handler;
            return;
        }

        let slot = self.endpoints.len();
        self.trees
            .entry(method)
            .or_default()
            .insert(pattern, slot)
            .unwrap_or_else(|e| panic!("invalid route `{method} {pattern}`: {e}"));

        debug!(%method, pattern, "route registered");
        self.endpoints.push(Endpoint { pattern: Arc::from(pattern), handler });
        self.index.insert((method, pattern.to_owned()), slot);
    }

    pub(crate) fn lookup(&self, method: &http::Method, path: &str) -> Lookup {
        if let Some(method) = Method::from_http(method) {
            if let Some(found) = self.find(method, path) {
                return found;
            }
            // HEAD falls back to GET; hyper drops the body on the way out.
            if method == Method::Head {
                if let Some(found) = self.find(Method::Get, path) {
                    return found;
                }
            }
        }

        let mut allowed: Vec<Method> = self
            .trees
            .iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| *method)
            .collect();
        allowed.sort();

        if allowed.is_empty() && Method::from_http(method).is_some() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed)
        }
    }

    /// Registered `(method, pattern)` pairs, sorted.
    pub(crate) fn routes(&self) -> Vec<(Method, String)> {
        let mut routes: Vec<_> = self.index.keys().cloned().collect();
        routes.sort();
        routes
    }

    fn find(&self, method: Method, path: &str) -> Option<Lookup> {
        let matched = self.trees.get(&method)?.at(path).ok()?;
        let endpoint = &self.endpoints[*matched.value];
        let mut params = HashMap::new();
        let mut malformed = Vec::new();
        for (key, raw) in matched.params.iter() {
            let value = match urlencoding::decode(raw) {
                Ok(value) => value.into_owned(),
                Err(e) => {
                    debug!(key, raw, error = %e, "path parameter is not valid UTF-8 once decoded");
                    malformed.push(key.to_owned());
                    raw.to_owned()
                }
            };
            params.insert(key.to_owned(), value);
        }
        Some(Lookup::Found {
            handler: endpoint.handler.clone(),
            pattern: Arc::clone(&endpoint.pattern),
            params,
            malformed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    fn handler(body: &'static str) -> Next {
        Next::new(move |_req| async move { Response::text(body) })
    }

    #[test]
    fn decodes_params() {
        let mut table = RouteTable::default();
        table.insert(Method::Get, "/files/{name}", handler("file"));

        match table.lookup(&http::Method::GET, "/files/Jos%C3%A9%20Luis") {
            Lookup::Found { params, malformed, .. } => {
                assert_eq!(params["name"], "José Luis");
                assert!(malformed.is_empty());
            }
            _ => panic!("expected a match"),
        }

        match table.lookup(&http::Method::GET, "/files/%FF") {
            Lookup::Found { params, malformed, .. } => {
                assert_eq!(params["name"], "%FF");
                assert_eq!(malformed, ["name"]);
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn captures_params_and_pattern() {
        let mut table = RouteTable::default();
        table.insert(Method::Get, "/users/{id}", handler("user"));

        match table.lookup(&http::Method::GET, "/users/42") {
            Lookup::Found { pattern, params, .. } => {
                assert_eq!(&*pattern, "/users/{id}");
                assert_eq!(params.get("id").map(String::as_str), Some("42"));
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn other_methods_produce_405_then_404() {
        let mut table = RouteTable::default();
        table.insert(Method::Post, "/users", handler("create"));
        table.insert(Method::Delete, "/users", handler("purge"));

        match table.lookup(&http::Method::PUT, "/users") {
            Lookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::Delete, Method::Post]);
            }
            _ => panic!("expected 405"),
        }
        assert!(matches!(table.lookup(&http::Method::PUT, "/nope"), Lookup::NotFound));
    }

    #[test]
    fn extension_methods_are_not_allowed() {
        let table = RouteTable::default();
        let purge = http::Method::from_bytes(b"PURGE").unwrap();
        assert!(matches!(table.lookup(&purge, "/"), Lookup::MethodNotAllowed(a) if a.is_empty()));
    }

    #[test]
    fn head_falls_back_to_get() {
        let mut table = RouteTable::default();
        table.insert(Method::Get, "/", handler("index"));
        assert!(matches!(table.lookup(&http::Method::HEAD, "/"), Lookup::Found { .. }));
    }

    #[test]
    fn reregistration_keeps_one_route() {
        let mut table = RouteTable::default();
        table.insert(Method::Get, "/a", handler("first"));
        table.insert(Method::Get, "/a", handler("second"));
        assert_eq!(table.routes(), vec![(Method::Get, "/a".to_owned())]);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_patterns_panic() {
        let mut table = RouteTable::default();
        table.insert(Method::Get, "/{a}", handler("a"));
        table.insert(Method::Get, "/{b}", handler("b"));
    }
}
