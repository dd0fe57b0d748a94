//! URI patterns with named placeholder segments.
//!
//! A pattern looks like `repos://{owner}/{repo}/info`: a scheme, the `://`
//! separator, then `/`-separated segments. A segment is either a literal or a
//! whole-segment placeholder `{name}`. Matching is case-sensitive and requires
//! the exact segment count; placeholders never span a `/` and never match an
//! empty segment.

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ResourceError, ResourceResult};

const SCHEME_SEPARATOR: &str = "://";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Parsed URI pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    scheme: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    /// Parses a URI pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPattern`] if the scheme separator is
    /// missing, a segment has stray or unbalanced braces, a placeholder name is
    /// empty or not an identifier, a name repeats, or the pattern declares no
    /// placeholder at all.
    pub fn parse(pattern: &str) -> ResourceResult<Self> {
        let (scheme, path) = pattern.split_once(SCHEME_SEPARATOR).ok_or_else(|| {
            ResourceError::invalid_pattern(pattern, "missing `://` scheme separator")
        })?;

        if scheme.is_empty() || has_braces(scheme) {
            return Err(ResourceError::invalid_pattern(
                pattern,
                "scheme must be non-empty and cannot contain placeholders",
            ));
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for raw in path.split('/') {
            let segment = parse_segment(pattern, raw)?;
            if let Segment::Placeholder(name) = &segment {
                if !seen.insert(name.clone()) {
                    return Err(ResourceError::invalid_pattern(
                        pattern,
                        format!("placeholder `{name}` appears more than once"),
                    ));
                }
            }
            segments.push(segment);
        }

        if seen.is_empty() {
            return Err(ResourceError::invalid_pattern(
                pattern,
                "template must contain at least one `{name}` placeholder",
            ));
        }

        Ok(Self {
            raw: pattern.to_owned(),
            scheme: scheme.to_owned(),
            segments,
        })
    }

    /// Returns the pattern text as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in declaration order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Matches a concrete URI, returning the extracted placeholder values in
    /// declaration order.
    #[must_use]
    pub fn matches(&self, uri: &str) -> Option<TemplateParams> {
        if has_braces(uri) {
            return None;
        }

        let (scheme, path) = uri.split_once(SCHEME_SEPARATOR)?;
        if scheme != self.scheme {
            return None;
        }

        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = TemplateParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Placeholder(name) if !part.is_empty() => {
                    params.push(name.clone(), part.to_owned());
                }
                _ => return None,
            }
        }

        Some(params)
    }

    /// Substitutes named parameters into the pattern, producing a concrete URI.
    ///
    /// String values are inserted verbatim; numbers and booleans use their JSON
    /// text.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MissingParameter`] when a placeholder has no
    /// scalar value in `params`.
    pub fn expand(&self, params: &Map<String, Value>) -> ResourceResult<String> {
        let mut parts = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => parts.push(literal.clone()),
                Segment::Placeholder(name) => {
                    let value = match params.get(name) {
                        Some(Value::String(text)) => text.clone(),
                        Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
                        _ => {
                            return Err(ResourceError::MissingParameter { name: name.clone() });
                        }
                    };
                    parts.push(value);
                }
            }
        }

        Ok(format!("{}{SCHEME_SEPARATOR}{}", self.scheme, parts.join("/")))
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub(crate) fn has_braces(text: &str) -> bool {
    text.contains(['{', '}'])
}

fn parse_segment(pattern: &str, raw: &str) -> ResourceResult<Segment> {
    if !has_braces(raw) {
        return Ok(Segment::Literal(raw.to_owned()));
    }

    let name = raw
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| {
            ResourceError::invalid_pattern(
                pattern,
                format!("segment `{raw}` must be a whole `{{name}}` placeholder"),
            )
        })?;

    if name.is_empty() {
        return Err(ResourceError::invalid_pattern(
            pattern,
            "placeholder name cannot be empty",
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ResourceError::invalid_pattern(
            pattern,
            format!("placeholder `{name}` must contain ascii alphanumeric or underscore"),
        ));
    }

    Ok(Segment::Placeholder(name.to_owned()))
}

/// Placeholder values extracted from a concrete URI, kept in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateParams {
    values: Vec<(String, String)>,
}

impl TemplateParams {
    fn push(&mut self, name: String, value: String) {
        self.values.push((name, value));
    }

    /// Returns the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value bound to `name` or a
    /// [`ResourceError::MissingParameter`].
    ///
    /// # Errors
    ///
    /// Fails when `name` was not extracted.
    pub fn require(&self, name: &str) -> ResourceResult<&str> {
        self.get(name).ok_or_else(|| ResourceError::MissingParameter {
            name: name.to_owned(),
        })
    }

    /// Iterates `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of bound parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameters are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
