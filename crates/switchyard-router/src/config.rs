//! Router configuration.

use serde::Deserialize;

use crate::constraint::{ConstraintMatcher, ConstraintRegistry};

/// Default upper bound on a captured parameter value, in bytes.
pub const DEFAULT_MAX_PARAM_LENGTH: usize = 100;

/// Router configuration.
///
/// Can be built in code with the `with_*` methods or deserialized, e.g. from
/// the `router:` section of a route manifest. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Treat `/users` and `/users/` as distinct routes (default: false).
    pub strict: bool,

    /// Compare static segments case-sensitively (default: true).
    /// Parameter values always keep their original case.
    pub case_sensitive: bool,

    /// Collapse repeated slashes in patterns and paths (default: false).
    pub ignore_duplicate_slashes: bool,

    /// Longest parameter value a param segment will capture (default: 100).
    pub max_param_length: usize,

    /// Constraint key to matcher bindings. `version` and `host` are
    /// always present unless overridden.
    pub constraints: ConstraintRegistry,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strict: false,
            case_sensitive: true,
            ignore_duplicate_slashes: false,
            max_param_length: DEFAULT_MAX_PARAM_LENGTH,
            constraints: ConstraintRegistry::default(),
        }
    }
}

impl RouterConfig {
    /// Create a router config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set trailing-slash sensitivity.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set case sensitivity of static segments.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Collapse `//` into `/` before matching.
    pub fn with_ignore_duplicate_slashes(mut self, ignore: bool) -> Self {
        self.ignore_duplicate_slashes = ignore;
        self
    }

    /// Set the maximum captured parameter length. Zero is raised to one.
    pub fn with_max_param_length(mut self, max: usize) -> Self {
        self.max_param_length = max.max(1);
        self
    }

    /// Bind an additional constraint key to a matcher.
    pub fn with_constraint(mut self, key: impl Into<String>, matcher: ConstraintMatcher) -> Self {
        self.constraints = self.constraints.with_matcher(key, matcher);
        self
    }
}
