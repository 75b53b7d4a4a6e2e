//! Pattern matching for the two rule syntaxes.
//!
//! Rule-syntax patterns are `/`-delimited templates:
//! - Literal segments: `news` (compared case-insensitively)
//! - Dynamic segments: `:id`
//! - Numeric dynamic segments: `:id\d`
//! - Dynamic segments with an exclusion list: `:status^draft|hidden`
//! - A trailing `$` requires the path to have exactly as many segments
//!
//! Regex patterns are delimited like `/^new\/(\d+)$/i` and are matched
//! against the whole path with positional capture groups.

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

use crate::error::RoutingError;

/// Captured dynamic variables in pattern order.
pub type Captures = IndexMap<String, String>;

#[derive(Clone, Debug, PartialEq)]
enum Constraint {
    Any,
    Numeric,
    Exclude(Vec<String>),
}

impl Constraint {
    fn allows(&self, value: &str) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Numeric => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Constraint::Exclude(values) => !values.iter().any(|v| v == value),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Dynamic { name: String, constraint: Constraint },
}

impl Segment {
    fn parse(segment: &str) -> Self {
        let Some(spec) = segment.strip_prefix(':') else {
            return Segment::Literal(segment.to_string());
        };

        // A backslash introduces a type suffix; only `\d` constrains the value.
        if let Some((name, kind)) = spec.rsplit_once('\\') {
            let constraint = match kind {
                "d" => Constraint::Numeric,
                _ => Constraint::Any,
            };
            return Segment::Dynamic {
                name: name.to_string(),
                constraint,
            };
        }

        if let Some((name, excluded)) = spec.split_once('^') {
            return Segment::Dynamic {
                name: name.to_string(),
                constraint: Constraint::Exclude(excluded.split('|').map(str::to_string).collect()),
            };
        }

        Segment::Dynamic {
            name: spec.to_string(),
            constraint: Constraint::Any,
        }
    }
}

/// Result of matching a rule-syntax pattern.
#[derive(Debug, PartialEq)]
pub struct RuleMatch {
    pub captures: Captures,
    /// Path segments past the end of the pattern, joined with `/`.
    pub residual: String,
}

#[derive(Clone, Debug)]
pub struct RulePattern {
    source: String,
    segments: Vec<Segment>,
    exact: bool,
}

impl RulePattern {
    pub fn parse(pattern: &str) -> Self {
        let source = pattern.to_string();
        let (pattern, exact) = match pattern.strip_suffix('$') {
            Some(stripped) => (stripped, true),
            None => (pattern, false),
        };
        let segments = pattern
            .trim_end_matches('/')
            .split('/')
            .map(Segment::parse)
            .collect();

        RulePattern {
            source,
            segments,
            exact,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Matches a normalized request path against this pattern.
    /// Returns None when the path has fewer segments than the pattern, when
    /// an exact pattern sees extra segments, or when any segment disagrees.
    pub fn matches(&self, path: &str) -> Option<RuleMatch> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() < self.segments.len() {
            return None;
        }
        if self.exact && parts.len() != self.segments.len() {
            return None;
        }

        let mut captures = Captures::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(literal) => {
                    if !literal.eq_ignore_ascii_case(part) {
                        return None;
                    }
                }
                Segment::Dynamic { name, constraint } => {
                    if !constraint.allows(part) {
                        return None;
                    }
                    captures.insert(name.clone(), part.to_string());
                }
            }
        }

        Some(RuleMatch {
            captures,
            residual: parts[self.segments.len()..].join("/"),
        })
    }
}

/// Result of matching a regex pattern.
#[derive(Debug, PartialEq)]
pub struct RegexMatch {
    /// Capture groups; index 0 is the whole match. Non-participating
    /// groups are None.
    pub groups: Vec<Option<String>>,
}

impl RegexMatch {
    /// Length in bytes of the whole match.
    pub fn matched_len(&self) -> usize {
        self.groups
            .first()
            .and_then(|whole| whole.as_ref())
            .map_or(0, String::len)
    }
}

#[derive(Clone, Debug)]
pub struct RegexPattern {
    source: String,
    regex: Regex,
}

impl RegexPattern {
    /// A pattern is a regex when it opens with the `/` delimiter and closes
    /// with a second one.
    pub fn is_delimited(pattern: &str) -> bool {
        pattern.starts_with('/') && pattern.rfind('/').is_some_and(|end| end > 0)
    }

    pub fn parse(pattern: &str) -> Result<Self, RoutingError> {
        let end = pattern
            .rfind('/')
            .filter(|end| *end > 0 && pattern.starts_with('/'))
            .ok_or_else(|| RoutingError::InvalidRegexFlag {
                pattern: pattern.to_string(),
                flag: '/',
            })?;
        let body = pattern[1..end].replace("\\/", "/");

        let mut builder = RegexBuilder::new(&body);
        for flag in pattern[end + 1..].chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                'U' => builder.swap_greed(true),
                'u' => builder.unicode(true),
                _ => {
                    return Err(RoutingError::InvalidRegexFlag {
                        pattern: pattern.to_string(),
                        flag,
                    });
                }
            };
        }

        let regex = builder.build().map_err(|source| RoutingError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(RegexPattern {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> Option<RegexMatch> {
        let caps = self.regex.captures(path)?;
        let groups = caps
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect();
        Some(RegexMatch { groups })
    }
}
