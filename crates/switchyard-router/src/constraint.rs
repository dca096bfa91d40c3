//! Route constraints and the matchers that evaluate them.
//!
//! A route variant may declare constraints such as `version: 1.2.3`. At
//! request time the caller supplies a constraint context (for example
//! `version: 1.x`) and each declared constraint is checked by the matcher
//! bound to its key. Built-in matchers:
//! - `version` - semantic versions; routes declare `MAJOR.MINOR.PATCH`,
//!   requests may use `1.2.3`, `1.x`, `1.2.x` or `*`
//! - `host` - case-insensitive exact host name

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;

/// Constraint key/value pairs, ordered by key.
///
/// Used both for the constraints a route declares and for the context a
/// request is resolved with. Key order makes the JSON rendering stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constraints(BTreeMap<String, String>);

impl Constraints {
    /// Create an empty constraint set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace a constraint.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Compact JSON object, keys sorted (`{}` when empty).
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Constraints {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Constraints {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// A constraint matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintMatcher {
    /// Semantic version, highest satisfying version wins.
    Version,
    /// Host name, case-insensitive exact match.
    Host,
}

impl ConstraintMatcher {
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintMatcher::Version => "version",
            ConstraintMatcher::Host => "host",
        }
    }

    /// Whether a requested value accepts a registered value.
    ///
    /// Unparseable input on either side is simply not satisfied.
    pub fn satisfies(&self, requested: &str, registered: &str) -> bool {
        self.compile("", registered)
            .map(|value| value.accepts(requested))
            .unwrap_or(false)
    }

    /// Ordering between two registered values; the greater one wins when
    /// both satisfy a request. Unparseable values rank lowest.
    pub fn rank(&self, a: &str, b: &str) -> Ordering {
        match (self.compile("", a), self.compile("", b)) {
            (Ok(a), Ok(b)) => a.rank(&b),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => Ordering::Equal,
        }
    }

    /// Parse a registered value once, at registration time.
    pub(crate) fn compile(
        &self,
        key: &str,
        value: &str,
    ) -> Result<ConstraintValue, ConstraintError> {
        let invalid = |reason: String| ConstraintError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        };

        match self {
            ConstraintMatcher::Version => {
                let version = Version::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
                if !version.pre.is_empty() || !version.build.is_empty() {
                    return Err(invalid(
                        "pre-release and build metadata are not allowed".to_string(),
                    ));
                }
                Ok(ConstraintValue::Version(version))
            }
            ConstraintMatcher::Host => {
                let host = value.trim();
                if host.is_empty() {
                    Err(invalid("host cannot be empty".to_string()))
                } else {
                    Ok(ConstraintValue::Host(host.to_ascii_lowercase()))
                }
            }
        }
    }
}

/// A registered constraint value, already parsed by its matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConstraintValue {
    Version(Version),
    Host(String),
}

impl ConstraintValue {
    /// Whether the requested value accepts this registered value.
    pub(crate) fn accepts(&self, requested: &str) -> bool {
        match self {
            ConstraintValue::Version(registered) => version_accepts(requested.trim(), registered),
            ConstraintValue::Host(registered) => requested.trim().eq_ignore_ascii_case(registered),
        }
    }

    pub(crate) fn rank(&self, other: &ConstraintValue) -> Ordering {
        match (self, other) {
            (ConstraintValue::Version(a), ConstraintValue::Version(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Request grammar: `M.m.p` (exact), `M.m.x`, `M.x` or `*`. `X` and `*`
/// also work as wildcards. Wildcards may only trail; anything else is not
/// satisfied.
fn version_accepts(requested: &str, registered: &Version) -> bool {
    let is_wildcard = |part: &str| matches!(part, "x" | "X" | "*");
    let parts: Vec<&str> = requested.split('.').collect();
    if parts.len() == 1 {
        return is_wildcard(parts[0]);
    }
    if parts.len() > 3 {
        return false;
    }

    let actual = [registered.major, registered.minor, registered.patch];
    let mut wild = false;
    for (&part, actual) in parts.iter().zip(actual) {
        if is_wildcard(part) {
            wild = true;
            continue;
        }
        if wild || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if part.parse::<u64>().ok() != Some(actual) {
            return false;
        }
    }
    // `1.2` is neither exact nor a wildcard.
    wild || parts.len() == 3
}

/// Maps constraint keys to matchers.
///
/// The default registry binds `version` and `host`. Extra keys can reuse a
/// built-in strategy, e.g. `api-version` as a version matcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "HashMap<String, ConstraintMatcher>")]
pub struct ConstraintRegistry {
    matchers: HashMap<String, ConstraintMatcher>,
}

impl Default for ConstraintRegistry {
    fn default() -> Self {
        let mut matchers = HashMap::new();
        matchers.insert("version".to_string(), ConstraintMatcher::Version);
        matchers.insert("host".to_string(), ConstraintMatcher::Host);
        Self { matchers }
    }
}

impl From<HashMap<String, ConstraintMatcher>> for ConstraintRegistry {
    fn from(extra: HashMap<String, ConstraintMatcher>) -> Self {
        let mut registry = Self::default();
        registry.matchers.extend(extra);
        registry
    }
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to a matcher, replacing any previous binding.
    pub fn with_matcher(mut self, key: impl Into<String>, matcher: ConstraintMatcher) -> Self {
        self.matchers.insert(key.into(), matcher);
        self
    }

    pub fn get(&self, key: &str) -> Option<ConstraintMatcher> {
        self.matchers.get(key).copied()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.matchers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Parse every declared constraint with the matcher bound to its key.
    pub(crate) fn compile(
        &self,
        constraints: &Constraints,
    ) -> Result<Vec<CompiledConstraint>, ConstraintError> {
        constraints
            .iter()
            .map(|(key, value)| {
                let matcher = self
                    .get(key)
                    .ok_or_else(|| ConstraintError::UnknownKey(key.to_string()))?;
                Ok(CompiledConstraint {
                    key: key.to_string(),
                    value: matcher.compile(key, value)?,
                })
            })
            .collect()
    }
}

/// One declared constraint after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompiledConstraint {
    pub(crate) key: String,
    pub(crate) value: ConstraintValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exact() {
        let m = ConstraintMatcher::Version;
        assert!(m.satisfies("1.2.3", "1.2.3"));
        assert!(!m.satisfies("1.2.3", "1.2.4"));
        assert!(!m.satisfies("3.2.1", "3.2.0"));
    }

    #[test]
    fn version_major_wildcard() {
        let m = ConstraintMatcher::Version;
        assert!(m.satisfies("1.x", "1.2.3"));
        assert!(m.satisfies("1.x", "1.0.0"));
        assert!(!m.satisfies("1.x", "2.0.0"));
        assert!(!m.satisfies("2.x", "3.2.0"));
    }

    #[test]
    fn version_minor_wildcard() {
        let m = ConstraintMatcher::Version;
        assert!(m.satisfies("4.3.x", "4.3.2"));
        assert!(!m.satisfies("4.3.x", "4.4.0"));
    }

    #[test]
    fn version_star_matches_everything() {
        let m = ConstraintMatcher::Version;
        assert!(m.satisfies("*", "0.0.1"));
        assert!(m.satisfies("*", "12.4.9"));
    }

    #[test]
    fn version_uppercase_and_star_wildcards() {
        let m = ConstraintMatcher::Version;
        assert!(m.satisfies("1.X", "1.9.0"));
        assert!(m.satisfies("1.2.*", "1.2.7"));
        assert!(m.satisfies("1.x.x", "1.4.0"));
    }

    #[test]
    fn version_outside_request_grammar_not_satisfied() {
        let m = ConstraintMatcher::Version;
        assert!(!m.satisfies("1.2", "1.9.0"));
        assert!(!m.satisfies("1.2", "1.2.0"));
        assert!(!m.satisfies(">=1", "1.9.0"));
        assert!(!m.satisfies("^1.2", "1.9.0"));
        assert!(!m.satisfies("~1.2.0", "1.2.3"));
        assert!(!m.satisfies("1", "1.0.0"));
        assert!(!m.satisfies("x.2.3", "1.2.3"));
        assert!(!m.satisfies("1.x.3", "1.2.3"));
        assert!(!m.satisfies("1.2.3.4", "1.2.3"));
        assert!(!m.satisfies("+1.2.3", "1.2.3"));
    }

    #[test]
    fn version_malformed_request_not_satisfied() {
        let m = ConstraintMatcher::Version;
        assert!(!m.satisfies("banana", "1.2.3"));
        assert!(!m.satisfies("", "1.2.3"));
        assert!(!m.satisfies("1.x", "not-a-version"));
    }

    #[test]
    fn version_rank_is_numeric() {
        let m = ConstraintMatcher::Version;
        assert_eq!(m.rank("2.4.0", "2.3.0"), Ordering::Greater);
        assert_eq!(m.rank("3.2.2", "3.3.0"), Ordering::Less);
        assert_eq!(m.rank("10.0.0", "9.9.9"), Ordering::Greater);
        assert_eq!(m.rank("1.2.3", "1.2.3"), Ordering::Equal);
        assert_eq!(m.rank("1.0.0", "junk"), Ordering::Greater);
    }

    #[test]
    fn host_is_case_insensitive() {
        let m = ConstraintMatcher::Host;
        assert!(m.satisfies("API.Example.com", "api.example.com"));
        assert!(!m.satisfies("www.example.com", "api.example.com"));
        assert_eq!(m.rank("a.example.com", "b.example.com"), Ordering::Equal);
    }

    #[test]
    fn registry_defaults() {
        let registry = ConstraintRegistry::default();
        assert_eq!(registry.keys(), vec!["host", "version"]);
        assert_eq!(registry.get("version"), Some(ConstraintMatcher::Version));
        assert_eq!(registry.get("accept"), None);
    }

    #[test]
    fn registry_custom_key() {
        let registry =
            ConstraintRegistry::new().with_matcher("api-version", ConstraintMatcher::Version);
        let compiled = registry
            .compile(&Constraints::new().with("api-version", "2.0.0"))
            .unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].key, "api-version");
    }

    #[test]
    fn registry_rejects_unknown_key() {
        let err = ConstraintRegistry::default()
            .compile(&Constraints::new().with("accept", "json"))
            .unwrap_err();
        assert_eq!(err, ConstraintError::UnknownKey("accept".to_string()));
    }

    #[test]
    fn registry_rejects_bad_version() {
        let err = ConstraintRegistry::default()
            .compile(&Constraints::new().with("version", "1.x"))
            .unwrap_err();
        assert!(matches!(err, ConstraintError::InvalidValue { ref key, .. } if key == "version"));
    }

    #[test]
    fn registry_rejects_pre_release_and_build_metadata() {
        for value in ["1.2.3-beta", "1.2.3+build.5"] {
            let err = ConstraintRegistry::default()
                .compile(&Constraints::new().with("version", value))
                .unwrap_err();
            assert!(
                matches!(err, ConstraintError::InvalidValue { value: ref v, .. } if v == value),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn registry_deserializes_extra_keys() {
        let registry: ConstraintRegistry =
            serde_json::from_str(r#"{"api-version":"version"}"#).unwrap();
        assert_eq!(registry.get("api-version"), Some(ConstraintMatcher::Version));
        assert_eq!(registry.get("host"), Some(ConstraintMatcher::Host));
    }

    #[test]
    fn constraints_json_is_sorted() {
        let constraints = Constraints::from([("version", "1.2.3"), ("host", "a.example.com")]);
        assert_eq!(
            constraints.to_json(),
            r#"{"host":"a.example.com","version":"1.2.3"}"#
        );
        assert_eq!(Constraints::new().to_json(), "{}");
    }
}
