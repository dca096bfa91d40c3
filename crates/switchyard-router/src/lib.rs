//! Prefix-trie HTTP request router.
//!
//! Registers method + path patterns into a prefix trie with static, param,
//! optional-param and wildcard segments, then resolves concrete requests to a
//! single handler. Several variants may share a method and path when they
//! declare different constraints (for example an API `version`); the winner
//! is picked by the constraint matchers.
//!
//! ```
//! use switchyard_router::{Constraints, Router, RouterConfig};
//!
//! let mut builder = Router::builder(RouterConfig::default());
//! builder.register("GET", "/users/:id", Constraints::new(), "users.show").unwrap();
//! builder
//!     .register("GET", "/users/:id", Constraints::new().with("version", "2.0.0"), "users.v2")
//!     .unwrap();
//! let router = builder.build();
//!
//! let hit = router.find("GET", "/users/42").unwrap();
//! assert_eq!(*hit.handler, "users.show");
//! assert_eq!(hit.params.get("id"), Some("42"));
//!
//! let hit = router
//!     .resolve("GET", "/users/42", &Constraints::new().with("version", "2.x"))
//!     .unwrap();
//! assert_eq!(*hit.handler, "users.v2");
//! ```

pub mod config;
pub mod constraint;
pub mod error;
pub mod router;
pub mod segment;
pub mod trie;
mod variant;

pub use config::RouterConfig;
pub use constraint::{ConstraintMatcher, ConstraintRegistry, Constraints};
pub use error::{ConstraintError, PatternError, RouterError};
pub use router::{Handler, IntoMethods, RouteOptions, Router, RouterBuilder};
pub use segment::{PathPattern, Segment};
pub use trie::{Params, Resolved, RouteInfo, RouteTable};
