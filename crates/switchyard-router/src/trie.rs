use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::RouterConfig;
use crate::constraint::{CompiledConstraint, Constraints};
use crate::error::RouterError;
use crate::router::{IntoMethods, RouteOptions};
use crate::segment::{
    normalize_path, path_tokens, percent_decode, strip_query, PathPattern, Segment,
};
use crate::variant::{choose, Variant};

/// The routing trie. Maps HTTP paths + methods + constraints to handlers.
///
/// A table is mutated through `&mut self` while routes are being set up and
/// is read through `&self` afterwards. Sharing a table between threads while
/// it is still being mutated is ruled out by the borrow rules; the `Router`
/// facade publishes finished tables as immutable snapshots instead.
pub struct RouteTable<H> {
    config: Arc<RouterConfig>,
    root: Node<H>,
    /// Every registration, in registration order.
    routes: Vec<RouteInfo>,
    /// Every method that has at least one registration.
    methods: BTreeSet<String>,
}

/// A single node in the prefix trie.
struct Node<H> {
    /// Static children keyed by segment literal.
    static_children: HashMap<String, Node<H>>,
    /// Parameter child (at most one per node). Capture names are kept on the
    /// variants, so `/:id` and `/:name` share this node.
    param_child: Option<Box<Node<H>>>,
    /// Wildcard child, always a leaf position in a pattern.
    wildcard_child: Option<Box<Node<H>>>,
    /// Method to variants registered at this node, in registration order.
    methods: HashMap<String, Vec<Variant<H>>>,
}

impl<H> Default for Node<H> {
    fn default() -> Self {
        Self {
            static_children: HashMap::new(),
            param_child: None,
            wildcard_child: None,
            methods: HashMap::new(),
        }
    }
}

impl<H> Clone for Node<H> {
    fn clone(&self) -> Self {
        Self {
            static_children: self.static_children.clone(),
            param_child: self.param_child.clone(),
            wildcard_child: self.wildcard_child.clone(),
            methods: self.methods.clone(),
        }
    }
}

impl<H> Clone for RouteTable<H> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            root: self.root.clone(),
            routes: self.routes.clone(),
            methods: self.methods.clone(),
        }
    }
}

/// Captured path parameters, in path order.
///
/// Optional parameters missing from the request path are absent. A
/// wildcard capture is reported under the name `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.0
    }
}

/// A successful lookup.
pub struct Resolved<H> {
    pub handler: Arc<H>,
    pub params: Params,
    /// Normalized pattern of the winning registration.
    pub pattern: Arc<str>,
    /// Constraints declared by the winning registration.
    pub constraints: Constraints,
}

impl<H> fmt::Debug for Resolved<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}

/// One registration, as listed by [`RouteTable::routes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub pattern: String,
    pub constraints: Constraints,
}

/// Where the next capture comes from when a frame is visited.
#[derive(Clone, Copy)]
enum Capture {
    /// The request segment at this index.
    Segment(usize),
    /// All request segments from this index on, joined by `/`.
    Rest(usize),
}

/// A pending branch in the depth-first search.
struct Frame<'t, H> {
    node: &'t Node<H>,
    /// Number of request segments consumed on arrival.
    depth: usize,
    /// Length of the capture stack when this branch was pushed.
    base: usize,
    capture: Option<Capture>,
}

impl<H> RouteTable<H> {
    /// Create an empty route table.
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config: Arc::new(config),
            root: Node::default(),
            routes: Vec::new(),
            methods: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register a handler for one or more methods at a path pattern.
    ///
    /// The whole call is validated before anything is inserted, so a failed
    /// call leaves the table unchanged.
    pub fn register(
        &mut self,
        methods: impl IntoMethods,
        pattern: &str,
        options: impl Into<RouteOptions>,
        handler: H,
    ) -> Result<(), RouterError> {
        let options = options.into();
        let methods = normalize_methods(methods.into_methods(), pattern)?;
        let parsed = PathPattern::parse(pattern, &self.config).map_err(|source| {
            RouterError::Pattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        let compiled = self
            .config
            .constraints
            .compile(&options.constraints)
            .map_err(|source| RouterError::Constraint {
                pattern: parsed.as_str().to_string(),
                source,
            })?;

        let prefixes = parsed.reachable_prefixes();
        for method in &methods {
            for prefix in &prefixes {
                if let Some(declared) = self.declared(prefix, method, &compiled) {
                    let constraints = declared.to_json();
                    tracing::warn!(
                        method = %method,
                        path = %parsed,
                        constraints = %constraints,
                        "route conflict"
                    );
                    return Err(RouterError::RouteConflict {
                        method: method.clone(),
                        path: parsed.as_str().to_string(),
                        constraints,
                    });
                }
            }
        }

        let pattern_text: Arc<str> = Arc::from(parsed.as_str());
        let all_names = parsed.param_names();
        let compiled: Arc<[_]> = Arc::from(compiled);
        let handler = Arc::new(handler);

        for prefix in &prefixes {
            let captures = prefix.iter().filter(|s| s.param_name().is_some()).count();
            let param_names: Arc<[String]> = Arc::from(&all_names[..captures]);
            let node = self.traverse_or_create(prefix);
            for method in &methods {
                node.methods.entry(method.clone()).or_default().push(Variant::new(
                    Arc::clone(&pattern_text),
                    Arc::clone(&param_names),
                    options.constraints.clone(),
                    Arc::clone(&compiled),
                    Arc::clone(&handler),
                ));
            }
        }

        for method in methods {
            tracing::debug!(
                method = %method,
                path = %parsed,
                constraints = %options.constraints.to_json(),
                "route registered"
            );
            self.routes.push(RouteInfo {
                method: method.clone(),
                pattern: parsed.as_str().to_string(),
                constraints: options.constraints.clone(),
            });
            self.methods.insert(method);
        }

        Ok(())
    }

    /// Look up a request path and method with a constraint context.
    ///
    /// Path should be an actual request path (not a pattern); a query
    /// string or fragment is ignored.
    pub fn resolve(&self, method: &str, path: &str, context: &Constraints) -> Option<Resolved<H>> {
        let method = method.to_ascii_uppercase();
        let normalized = normalize_path(strip_query(path), &self.config);
        let segments: Vec<Cow<'_, str>> = path_tokens(&normalized).map(percent_decode).collect();

        let found = self.search(&method, &segments, context);
        match &found {
            Some(resolved) => tracing::trace!(
                method = %method,
                path = %path,
                pattern = %resolved.pattern,
                "route resolved"
            ),
            None => tracing::trace!(method = %method, path = %path, "no route matched"),
        }
        found
    }

    /// Methods that would resolve at `path` with the given context, sorted.
    ///
    /// Useful for building an `Allow` header when a path exists but the
    /// requested method does not.
    pub fn allowed_methods(&self, path: &str, context: &Constraints) -> Vec<String> {
        let normalized = normalize_path(strip_query(path), &self.config);
        let segments: Vec<Cow<'_, str>> = path_tokens(&normalized).map(percent_decode).collect();

        self.methods
            .iter()
            .filter(|method| self.search(method, &segments, context).is_some())
            .cloned()
            .collect()
    }

    /// Whether an identical registration (method, pattern structure and
    /// constraints) already exists.
    pub fn has_route(&self, method: &str, pattern: &str, constraints: &Constraints) -> bool {
        let (Ok(parsed), Ok(compiled)) = (
            PathPattern::parse(pattern, &self.config),
            self.config.constraints.compile(constraints),
        ) else {
            return false;
        };
        self.declared(parsed.segments(), &method.to_ascii_uppercase(), &compiled).is_some()
    }

    /// Every registration in registration order.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Follow an exact pattern through the trie without creating nodes.
    fn find_node(&self, segments: &[Segment]) -> Option<&Node<H>> {
        let mut current = &self.root;
        for segment in segments {
            current = match segment {
                Segment::Static(literal) => current.static_children.get(literal)?,
                Segment::Param(_) | Segment::OptionalParam(_) => current.param_child.as_deref()?,
                Segment::Wildcard => current.wildcard_child.as_deref()?,
            };
        }
        Some(current)
    }

    /// Constraints of an existing variant whose parsed constraints equal
    /// `compiled`, so `host: API.example.com` collides with
    /// `host: api.example.com`.
    fn declared(
        &self,
        segments: &[Segment],
        method: &str,
        compiled: &[CompiledConstraint],
    ) -> Option<&Constraints> {
        self.find_node(segments)?
            .methods
            .get(method)?
            .iter()
            .find(|v| v.declares(compiled))
            .map(|v| &v.constraints)
    }

    /// Traverse or create nodes for a pattern.
    fn traverse_or_create(&mut self, segments: &[Segment]) -> &mut Node<H> {
        let mut current = &mut self.root;

        for segment in segments {
            current = match segment {
                Segment::Static(literal) => {
                    current.static_children.entry(literal.clone()).or_default()
                }
                Segment::Param(_) | Segment::OptionalParam(_) => {
                    &mut **current.param_child.get_or_insert_with(Box::default)
                }
                Segment::Wildcard => &mut **current.wildcard_child.get_or_insert_with(Box::default),
            };
        }

        current
    }

    /// Depth-first search over the trie with an explicit stack.
    ///
    /// At each depth the branches are tried static, then param, then
    /// wildcard. When the request is exhausted the node itself is tried
    /// before an empty wildcard capture; in strict mode that capture is only
    /// taken at the root, since `/files` and `/files/` are distinct there. A
    /// node only ends the search if its variants for `method` yield a winner
    /// for `context`; otherwise the search backtracks to the next pending
    /// branch.
    fn search(
        &self,
        method: &str,
        segments: &[Cow<'_, str>],
        context: &Constraints,
    ) -> Option<Resolved<H>> {
        let lowered: Option<Vec<String>> = if self.config.case_sensitive {
            None
        } else {
            Some(segments.iter().map(|s| s.to_lowercase()).collect())
        };

        let mut captures: Vec<String> = Vec::new();
        let mut stack = vec![Frame {
            node: &self.root,
            depth: 0,
            base: 0,
            capture: None,
        }];

        while let Some(frame) = stack.pop() {
            captures.truncate(frame.base);
            match frame.capture {
                Some(Capture::Segment(i)) => captures.push(segments[i].to_string()),
                Some(Capture::Rest(i)) => captures.push(segments[i..].join("/")),
                None => {}
            }

            let node = frame.node;
            let base = captures.len();

            if frame.depth == segments.len() {
                let winner = node
                    .methods
                    .get(method)
                    .and_then(|variants| choose(variants, context));
                if let Some(variant) = winner {
                    return Some(resolved(variant, captures));
                }
                let empty_rest = !self.config.strict || frame.depth == 0;
                if let Some(wildcard) = node.wildcard_child.as_deref().filter(|_| empty_rest) {
                    stack.push(Frame {
                        node: wildcard,
                        depth: frame.depth,
                        base,
                        capture: Some(Capture::Rest(frame.depth)),
                    });
                }
                continue;
            }

            // Pushed lowest priority first so static is popped first.
            if let Some(wildcard) = node.wildcard_child.as_deref() {
                stack.push(Frame {
                    node: wildcard,
                    depth: segments.len(),
                    base,
                    capture: Some(Capture::Rest(frame.depth)),
                });
            }

            let segment = &segments[frame.depth];
            if let Some(param) = node.param_child.as_deref() {
                if !segment.is_empty() && segment.len() <= self.config.max_param_length {
                    stack.push(Frame {
                        node: param,
                        depth: frame.depth + 1,
                        base,
                        capture: Some(Capture::Segment(frame.depth)),
                    });
                }
            }

            let key: &str = match &lowered {
                Some(keys) => keys[frame.depth].as_str(),
                None => &*segments[frame.depth],
            };
            if let Some(child) = node.static_children.get(key) {
                stack.push(Frame {
                    node: child,
                    depth: frame.depth + 1,
                    base,
                    capture: None,
                });
            }
        }

        None
    }
}

fn resolved<H>(variant: &Variant<H>, captures: Vec<String>) -> Resolved<H> {
    let params = variant
        .param_names
        .iter()
        .cloned()
        .zip(captures)
        .collect();
    Resolved {
        handler: Arc::clone(&variant.handler),
        params: Params(params),
        pattern: Arc::clone(&variant.pattern),
        constraints: variant.constraints.clone(),
    }
}

/// Uppercase, validate and deduplicate methods, keeping first-seen order.
fn normalize_methods(methods: Vec<String>, pattern: &str) -> Result<Vec<String>, RouterError> {
    if methods.is_empty() {
        return Err(RouterError::NoMethods(pattern.to_string()));
    }

    let mut normalized: Vec<String> = Vec::with_capacity(methods.len());
    for method in methods {
        let is_token = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c));
        if !is_token {
            return Err(RouterError::InvalidMethod(method));
        }
        let upper = method.to_ascii_uppercase();
        if !normalized.contains(&upper) {
            normalized.push(upper);
        }
    }
    Ok(normalized)
}

impl<H> fmt::Display for RouteTable<H> {
    /// Render the trie, one node per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        write_methods(f, &self.root)?;
        writeln!(f)?;
        write_children(f, &self.root, "")
    }
}

fn write_children<H>(f: &mut fmt::Formatter<'_>, node: &Node<H>, indent: &str) -> fmt::Result {
    let mut literals: Vec<&String> = node.static_children.keys().collect();
    literals.sort();

    let mut children: Vec<(Cow<'_, str>, &Node<H>)> = literals
        .into_iter()
        .map(|literal| (Cow::Borrowed(literal.as_str()), &node.static_children[literal]))
        .collect();
    if let Some(param) = node.param_child.as_deref() {
        children.push((Cow::Borrowed(":"), param));
    }
    if let Some(wildcard) = node.wildcard_child.as_deref() {
        children.push((Cow::Borrowed("*"), wildcard));
    }

    let count = children.len();
    for (i, (label, child)) in children.into_iter().enumerate() {
        let last = i + 1 == count;
        write!(f, "{}{}{}", indent, if last { "└── " } else { "├── " }, label)?;
        write_methods(f, child)?;
        writeln!(f)?;
        let nested = format!("{}{}", indent, if last { "    " } else { "│   " });
        write_children(f, child, &nested)?;
    }
    Ok(())
}

fn write_methods<H>(f: &mut fmt::Formatter<'_>, node: &Node<H>) -> fmt::Result {
    let mut methods: Vec<&String> = node.methods.keys().collect();
    methods.sort();
    for method in methods {
        for variant in &node.methods[method] {
            if variant.is_unconstrained() {
                write!(f, " [{}]", method)?;
            } else {
                write!(f, " [{} {}]", method, variant.constraints.to_json())?;
            }
        }
    }
    Ok(())
}
