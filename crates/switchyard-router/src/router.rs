//! Router facade: registration, resolution and dispatch.
//!
//! Routes are usually registered up front on a [`RouterBuilder`], which owns
//! the route table mutably. [`RouterBuilder::build`] turns it into a
//! [`Router`] that serves lookups from an immutable snapshot. Routes added to
//! a serving router (deferred plugin loading, for instance) are applied to a
//! copy of the current table which is then published atomically: readers
//! never block and never observe a half-applied registration.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::config::RouterConfig;
use crate::constraint::Constraints;
use crate::error::RouterError;
use crate::trie::{Params, Resolved, RouteInfo, RouteTable};

/// Something a matched route can be dispatched to.
///
/// Implemented for every `Fn(Req, Res, &Params) -> O`. The request and
/// response carriers are opaque to the router.
pub trait Handler<Req, Res>: Send + Sync + 'static {
    type Output;

    fn call(&self, request: Req, response: Res, params: &Params) -> Self::Output;
}

impl<F, Req, Res, O> Handler<Req, Res> for F
where
    F: Fn(Req, Res, &Params) -> O + Send + Sync + 'static,
{
    type Output = O;

    fn call(&self, request: Req, response: Res, params: &Params) -> O {
        self(request, response, params)
    }
}

/// One method or several.
pub trait IntoMethods {
    fn into_methods(self) -> Vec<String>;
}

impl IntoMethods for &str {
    fn into_methods(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoMethods for String {
    fn into_methods(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoMethods for &[&str] {
    fn into_methods(self) -> Vec<String> {
        self.iter().map(|m| m.to_string()).collect()
    }
}

impl<const N: usize> IntoMethods for [&str; N] {
    fn into_methods(self) -> Vec<String> {
        self.iter().map(|m| m.to_string()).collect()
    }
}

impl IntoMethods for Vec<String> {
    fn into_methods(self) -> Vec<String> {
        self
    }
}

/// Per-registration options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    pub constraints: Constraints,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint this route requires.
    pub fn with_constraint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.insert(key, value);
        self
    }
}

impl From<Constraints> for RouteOptions {
    fn from(constraints: Constraints) -> Self {
        Self { constraints }
    }
}

/// Collects routes before serving starts.
pub struct RouterBuilder<H> {
    table: RouteTable<H>,
    default_route: Option<Arc<H>>,
}

impl<H> RouterBuilder<H> {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            table: RouteTable::new(config),
            default_route: None,
        }
    }

    /// Handler invoked by [`Router::dispatch`] when nothing matches. It is
    /// called with empty params.
    pub fn default_route(mut self, handler: H) -> Self {
        self.default_route = Some(Arc::new(handler));
        self
    }

    /// Register a handler for one or more methods at a path pattern.
    pub fn register(
        &mut self,
        methods: impl IntoMethods,
        pattern: &str,
        options: impl Into<RouteOptions>,
        handler: H,
    ) -> Result<&mut Self, RouterError> {
        self.table.register(methods, pattern, options, handler)?;
        Ok(self)
    }

    /// The table built so far.
    pub fn table(&self) -> &RouteTable<H> {
        &self.table
    }

    /// Finish building and start serving.
    pub fn build(self) -> Router<H> {
        tracing::debug!(routes = self.table.len(), "route table published");
        Router {
            table: ArcSwap::from_pointee(self.table),
            writer: Mutex::new(()),
            default_route: self.default_route,
        }
    }
}

/// A serving router.
///
/// `Router` is `Send + Sync` whenever `H` is, and is meant to be shared
/// behind an `Arc`. Lookups read the current snapshot without locking;
/// registrations are serialized and publish a new snapshot.
pub struct Router<H> {
    table: ArcSwap<RouteTable<H>>,
    /// Serializes writers so no registration is lost between load and store.
    writer: Mutex<()>,
    default_route: Option<Arc<H>>,
}

impl<H> Router<H> {
    /// Start building a router.
    pub fn builder(config: RouterConfig) -> RouterBuilder<H> {
        RouterBuilder::new(config)
    }

    /// An empty serving router.
    pub fn new(config: RouterConfig) -> Self {
        RouterBuilder::new(config).build()
    }

    /// Register a route on a serving router.
    ///
    /// Copies the current table, so registering many routes this way costs
    /// one copy each; use [`Router::update`] to batch them.
    pub fn register(
        &self,
        methods: impl IntoMethods,
        pattern: &str,
        options: impl Into<RouteOptions>,
        handler: H,
    ) -> Result<(), RouterError> {
        self.update(|table| table.register(methods, pattern, options, handler))
    }

    /// Apply several registrations to a copy of the current table and
    /// publish it in one step. If `apply` fails nothing is published.
    pub fn update<F>(&self, apply: F) -> Result<(), RouterError>
    where
        F: FnOnce(&mut RouteTable<H>) -> Result<(), RouterError>,
    {
        let _writer = self.writer.lock();
        let mut next = RouteTable::clone(&self.table.load());
        apply(&mut next)?;
        tracing::debug!(routes = next.len(), "route table published");
        self.table.store(Arc::new(next));
        Ok(())
    }

    /// Look up a handler. An empty context only matches unconstrained
    /// routes; a non-empty one only matches constrained routes.
    pub fn resolve(&self, method: &str, path: &str, context: &Constraints) -> Option<Resolved<H>> {
        self.table.load().resolve(method, path, context)
    }

    /// Look up a handler without constraints.
    pub fn find(&self, method: &str, path: &str) -> Option<Resolved<H>> {
        self.resolve(method, path, &Constraints::new())
    }

    /// Resolve and invoke the winning handler, or the default route.
    ///
    /// Returns `None` when nothing matched and no default route is
    /// configured; mapping that to a response is up to the caller.
    pub fn dispatch<Req, Res>(
        &self,
        method: &str,
        path: &str,
        request: Req,
        response: Res,
        context: &Constraints,
    ) -> Option<H::Output>
    where
        H: Handler<Req, Res>,
    {
        if let Some(resolved) = self.resolve(method, path, context) {
            return Some(resolved.handler.call(request, response, &resolved.params));
        }

        match &self.default_route {
            Some(fallback) => {
                tracing::debug!(method = %method, path = %path, "dispatching to default route");
                Some(fallback.call(request, response, &Params::default()))
            }
            None => {
                tracing::debug!(method = %method, path = %path, "unhandled request");
                None
            }
        }
    }

    /// Methods that would resolve at `path` with `context`, sorted.
    pub fn allowed_methods(&self, path: &str, context: &Constraints) -> Vec<String> {
        self.table.load().allowed_methods(path, context)
    }

    /// Whether an identical registration exists.
    pub fn has_route(&self, method: &str, pattern: &str, constraints: &Constraints) -> bool {
        self.table.load().has_route(method, pattern, constraints)
    }

    /// Every registration in registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.table.load().routes().to_vec()
    }

    /// The current route table. Later registrations do not affect a
    /// snapshot already taken.
    pub fn snapshot(&self) -> Arc<RouteTable<H>> {
        self.table.load_full()
    }

    pub fn has_default_route(&self) -> bool {
        self.default_route.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Handle = fn(&mut Vec<String>, (), &Params) -> &'static str;

    fn users(log: &mut Vec<String>, _: (), params: &Params) -> &'static str {
        log.push(format!("users {}", params.get("id").unwrap_or("-")));
        "users"
    }

    fn not_found(log: &mut Vec<String>, _: (), _: &Params) -> &'static str {
        log.push("fallback".to_string());
        "not-found"
    }

    #[test]
    fn builder_then_resolve() {
        let mut builder = Router::builder(RouterConfig::default());
        builder
            .register("GET", "/users/:id", Constraints::new(), "show")
            .unwrap()
            .register("POST", "/users", Constraints::new(), "create")
            .unwrap();
        let router = builder.build();

        let hit = router.find("GET", "/users/3").unwrap();
        assert_eq!(*hit.handler, "show");
        assert_eq!(hit.params.get("id"), Some("3"));
        assert_eq!(&*hit.pattern, "/users/:id");
        assert!(router.find("GET", "/users").is_none());
    }

    #[test]
    fn dispatch_invokes_handler_with_params() {
        let mut builder = Router::<Handle>::builder(RouterConfig::default());
        builder
            .register("GET", "/users/:id", Constraints::new(), users)
            .unwrap();
        let router = builder.build();

        let mut log = Vec::new();
        let out = router.dispatch("GET", "/users/9", &mut log, (), &Constraints::new());
        assert_eq!(out, Some("users"));
        assert_eq!(log, vec!["users 9"]);
    }

    #[test]
    fn dispatch_falls_back_to_default_route() {
        let router = Router::<Handle>::builder(RouterConfig::default())
            .default_route(not_found)
            .build();

        let mut log = Vec::new();
        let out = router.dispatch("GET", "/missing", &mut log, (), &Constraints::new());
        assert_eq!(out, Some("not-found"));
        assert_eq!(log, vec!["fallback"]);
        assert!(router.has_default_route());
    }

    #[test]
    fn dispatch_without_default_is_unhandled() {
        let router = Router::<Handle>::new(RouterConfig::default());

        let mut log = Vec::new();
        let out = router.dispatch("GET", "/missing", &mut log, (), &Constraints::new());
        assert_eq!(out, None);
        assert!(log.is_empty());
    }

    #[test]
    fn dispatch_closure_handlers() {
        let router = Router::new(RouterConfig::default());
        router
            .register(
                "GET",
                "/sum/:a/:b",
                Constraints::new(),
                |_: (), _: (), params: &Params| -> Option<u32> {
                    let a: u32 = params.get("a")?.parse().ok()?;
                    let b: u32 = params.get("b")?.parse().ok()?;
                    Some(a + b)
                },
            )
            .unwrap();

        let out = router.dispatch("GET", "/sum/2/40", (), (), &Constraints::new());
        assert_eq!(out, Some(Some(42)));
    }

    #[test]
    fn late_registration_publishes_new_snapshot() {
        let router = Router::new(RouterConfig::default());
        router.register("GET", "/a", Constraints::new(), 1).unwrap();
        let before = router.snapshot();

        router.register("GET", "/b", Constraints::new(), 2).unwrap();

        assert!(before.resolve("GET", "/b", &Constraints::new()).is_none());
        assert_eq!(router.find("GET", "/b").map(|r| *r.handler), Some(2));
        assert_eq!(router.routes().len(), 2);
    }

    #[test]
    fn failed_update_publishes_nothing() {
        let router = Router::new(RouterConfig::default());
        router.register("GET", "/a", Constraints::new(), 1).unwrap();

        let result = router.update(|table| {
            table.register("GET", "/b", Constraints::new(), 2)?;
            table.register("GET", "/a", Constraints::new(), 3)
        });

        assert!(matches!(result, Err(RouterError::RouteConflict { .. })));
        assert!(router.find("GET", "/b").is_none());
        assert_eq!(router.routes().len(), 1);
    }

    #[test]
    fn route_options_builder() {
        let mut builder = Router::builder(RouterConfig::default());
        builder
            .register(
                "GET",
                "/",
                RouteOptions::new().with_constraint("version", "1.0.0"),
                "v1",
            )
            .unwrap();
        let router = builder.build();

        assert!(router.has_route("GET", "/", &Constraints::new().with("version", "1.0.0")));
        assert!(router.find("GET", "/").is_none());
    }
}
