//! Route manifest (`routes.yaml`) parser.
//!
//! A manifest declares router options, the routes to register and an
//! optional default target:
//!
//! ```yaml
//! router:
//!   strict: false
//!   constraints:
//!     api-version: version
//! routes:
//!   - method: GET
//!     path: /users/:id
//!     target: users.show
//!   - method: [GET, HEAD]
//!     path: /users/:id
//!     constraints:
//!       version: 2.0.0
//!     target: users.v2
//! default: not-found
//! ```

use std::path::Path;

use serde::Deserialize;
use switchyard_router::{Constraints, RouteTable, Router, RouterConfig, RouterError};
use thiserror::Error;

use crate::target::Target;

/// Errors produced while loading a manifest or registering its routes.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A route was rejected by the router. `index` is 1-based.
    #[error("route #{index} ({target}): {source}")]
    Route {
        index: usize,
        target: String,
        #[source]
        source: RouterError,
    },
}

/// A route manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteManifest {
    /// Router options.
    #[serde(default)]
    pub router: RouterConfig,

    /// Routes, registered in order.
    #[serde(default)]
    pub routes: Vec<RouteSpec>,

    /// Target served when no route matches.
    #[serde(default)]
    pub default: Option<String>,
}

/// One route declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    pub method: MethodSpec,
    pub path: String,
    #[serde(default)]
    pub constraints: Constraints,
    pub target: String,
}

/// A single method or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MethodSpec {
    One(String),
    Many(Vec<String>),
}

impl MethodSpec {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            MethodSpec::One(method) => vec![method.clone()],
            MethodSpec::Many(methods) => methods.clone(),
        }
    }
}

/// Result of registering every route of a manifest.
#[derive(Debug)]
pub struct CheckOutcome {
    /// Number of routes that registered.
    pub registered: usize,
    pub errors: Vec<ManifestError>,
}

impl CheckOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl RouteManifest {
    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&content, &path.display().to_string())
    }

    /// Parse a manifest from YAML content. `origin` names the source in errors.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ManifestError> {
        serde_yaml::from_str(content).map_err(|source| ManifestError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Register every route and build a serving router.
    ///
    /// Stops at the first route the router rejects.
    pub fn build_router(&self) -> Result<Router<Target>, ManifestError> {
        let mut builder = Router::builder(self.router.clone());
        if let Some(default) = &self.default {
            builder = builder.default_route(Target::fallback(default));
        }

        for (i, route) in self.routes.iter().enumerate() {
            builder
                .register(
                    route.method.to_vec(),
                    &route.path,
                    route.constraints.clone(),
                    Target::route(&route.target, &route.path),
                )
                .map_err(|source| ManifestError::Route {
                    index: i + 1,
                    target: route.target.clone(),
                    source,
                })?;
        }

        Ok(builder.build())
    }

    /// Register every route, collecting all rejections instead of stopping
    /// at the first one.
    pub fn check(&self) -> CheckOutcome {
        let mut table = RouteTable::new(self.router.clone());
        let mut registered = 0;
        let mut errors = Vec::new();

        for (i, route) in self.routes.iter().enumerate() {
            let result = table.register(
                route.method.to_vec(),
                &route.path,
                route.constraints.clone(),
                Target::route(&route.target, &route.path),
            );
            match result {
                Ok(()) => registered += 1,
                Err(source) => {
                    switchyard_telemetry::log_registration_failed!(
                        index = i + 1,
                        target = %route.target,
                        error = %source,
                        "route rejected"
                    );
                    errors.push(ManifestError::Route {
                        index: i + 1,
                        target: route.target.clone(),
                        source,
                    });
                }
            }
        }

        CheckOutcome { registered, errors }
    }
}
