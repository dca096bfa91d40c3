//! Path pattern parsing and request path normalization.
//!
//! Pattern grammar:
//! - `/literal` - static segment
//! - `/:name` - required parameter, captures one non-empty segment
//! - `/:name?` - optional parameter, only in trailing position
//! - `/*` - wildcard, captures the rest of the path, must be last

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use crate::config::RouterConfig;
use crate::error::PatternError;

/// Name under which a wildcard capture is reported.
pub const WILDCARD_PARAM: &str = "*";

/// A parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Static(String),
    Param(String),
    OptionalParam(String),
    /// Matches all remaining segments joined by `/`. Must be the last segment.
    Wildcard,
}

impl Segment {
    fn parse(token: &str, position: usize, config: &RouterConfig) -> Result<Self, PatternError> {
        if token == "*" {
            return Ok(Segment::Wildcard);
        }

        if let Some(name) = token.strip_prefix(':') {
            let (name, optional) = match name.strip_suffix('?') {
                Some(name) => (name, true),
                None => (name, false),
            };
            if name.is_empty() {
                return Err(PatternError::EmptyParamName(position));
            }
            return Ok(if optional {
                Segment::OptionalParam(name.to_string())
            } else {
                Segment::Param(name.to_string())
            });
        }

        // Request segments are decoded before lookup, so literals are too.
        let literal = percent_decode(token);
        if config.case_sensitive {
            Ok(Segment::Static(literal.into_owned()))
        } else {
            Ok(Segment::Static(literal.to_lowercase()))
        }
    }

    /// The name this segment captures under, if it captures.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Segment::Static(_) => None,
            Segment::Param(name) | Segment::OptionalParam(name) => Some(name),
            Segment::Wildcard => Some(WILDCARD_PARAM),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(literal) => f.write_str(literal),
            Segment::Param(name) => write!(f, ":{}", name),
            Segment::OptionalParam(name) => write!(f, ":{}?", name),
            Segment::Wildcard => f.write_str("*"),
        }
    }
}

/// A validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    /// The normalized pattern text.
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse and validate a route pattern under the given configuration.
    pub fn parse(pattern: &str, config: &RouterConfig) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let raw = normalize_path(pattern, config).into_owned();
        let segments = path_tokens(&raw)
            .enumerate()
            .map(|(position, token)| Segment::parse(token, position, config))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen_names = HashSet::new();
        let mut after_optional = false;
        for (i, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Wildcard if i + 1 != segments.len() => {
                    return Err(PatternError::WildcardNotLast);
                }
                Segment::OptionalParam(_) => after_optional = true,
                other if after_optional => {
                    return Err(PatternError::SegmentAfterOptional(other.to_string()));
                }
                _ => {}
            }
            if let Some(name) = segment.param_name() {
                if !seen_names.insert(name) {
                    return Err(PatternError::DuplicateParam(name.to_string()));
                }
            }
        }

        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Capture names in path order.
    pub fn param_names(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(Segment::param_name)
            .map(str::to_string)
            .collect()
    }

    /// Segment prefixes a request can end at and still reach this route.
    ///
    /// The full pattern always comes last. Each trailing optional parameter
    /// adds the prefix that stops just before it, so `/a/:b?/:c?` is
    /// reachable at `/a`, `/a/:b` and `/a/:b/:c`.
    pub fn reachable_prefixes(&self) -> Vec<&[Segment]> {
        let first_optional = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::OptionalParam(_)))
            .unwrap_or(self.segments.len());

        (first_optional..=self.segments.len())
            .map(|end| &self.segments[..end])
            .collect()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Normalize a path according to the router configuration.
///
/// Collapses repeated slashes when `ignore_duplicate_slashes` is set and
/// strips one trailing slash unless `strict`. The root path stays `/`.
pub fn normalize_path<'a>(path: &'a str, config: &RouterConfig) -> Cow<'a, str> {
    let mut normalized = Cow::Borrowed(path);

    if config.ignore_duplicate_slashes && path.contains("//") {
        let mut collapsed = String::with_capacity(path.len());
        let mut prev_slash = false;
        for ch in path.chars() {
            if ch == '/' {
                if !prev_slash {
                    collapsed.push('/');
                }
                prev_slash = true;
            } else {
                collapsed.push(ch);
                prev_slash = false;
            }
        }
        normalized = Cow::Owned(collapsed);
    }

    if !config.strict && normalized.len() > 1 && normalized.ends_with('/') {
        let trimmed_len = normalized.len() - 1;
        normalized = match normalized {
            Cow::Borrowed(s) => Cow::Borrowed(&s[..trimmed_len]),
            Cow::Owned(mut s) => {
                s.truncate(trimmed_len);
                Cow::Owned(s)
            }
        };
    }

    if normalized.is_empty() {
        Cow::Borrowed("/")
    } else {
        normalized
    }
}

/// Drop the query string and fragment from a request target.
pub fn strip_query(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(end) => &path[..end],
        None => path,
    }
}

/// Split a normalized path into segments. The root path has none.
pub(crate) fn path_tokens(path: &str) -> impl Iterator<Item = &str> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    let mut tokens = rest.split('/');
    if rest.is_empty() {
        // Exhaust the single empty token `split` yields for "".
        tokens.next();
    }
    tokens
}

/// Decode `%XX` escapes. Malformed escapes and escapes that do not form
/// valid UTF-8 leave the input unchanged.
pub fn percent_decode(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    match String::from_utf8(decoded) {
        Ok(s) => Cow::Owned(s),
        Err(_) => Cow::Borrowed(input),
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
