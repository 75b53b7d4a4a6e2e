//! Rule definitions and the per-method rule table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;

use crate::error::RoutingError;
use crate::pattern::{RegexPattern, RulePattern};
use crate::request::RouteRequest;
use crate::target::{RouteSpec, Target};

pub type Predicate = Arc<dyn Fn(&RouteRequest) -> bool + Send + Sync>;

/// Constraints attached to a rule or group. All present constraints must
/// hold for the rule to be considered.
#[derive(Clone, Default)]
pub struct RuleOption {
    pub method: Option<Method>,
    pub extension: Option<String>,
    pub https: bool,
    pub predicate: Option<Predicate>,
}

impl RuleOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RouteRequest) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub(crate) fn allows(&self, request: &RouteRequest) -> bool {
        if let Some(method) = &self.method
            && *method != request.method
        {
            return false;
        }
        if let Some(extension) = &self.extension
            && request.extension.as_deref() != Some(extension.as_str())
        {
            return false;
        }
        if self.https && !request.https {
            return false;
        }
        match &self.predicate {
            Some(predicate) => predicate(request),
            None => true,
        }
    }
}

impl fmt::Debug for RuleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleOption")
            .field("method", &self.method)
            .field("extension", &self.extension)
            .field("https", &self.https)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Which request methods a rule is registered under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MethodFilter {
    Any,
    Only(Method),
}

impl MethodFilter {
    /// Parses `*` or a `|`-separated list such as `GET|POST`.
    pub fn parse_list(methods: &str) -> Result<Vec<MethodFilter>, RoutingError> {
        methods
            .split('|')
            .map(|method| match method.trim() {
                "*" => Ok(MethodFilter::Any),
                "" => Err(RoutingError::InvalidMethod(methods.to_string())),
                method => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .map(MethodFilter::Only)
                    .map_err(|_| RoutingError::InvalidMethod(methods.to_string())),
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Matcher {
    Rule(RulePattern),
    Regex(RegexPattern),
}

impl Matcher {
    pub(crate) fn source(&self) -> &str {
        match self {
            Matcher::Rule(pattern) => pattern.source(),
            Matcher::Regex(pattern) => pattern.source(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Rule {
    pub matcher: Matcher,
    pub target: Target,
    pub option: RuleOption,
}

impl Rule {
    pub(crate) fn compile(
        pattern: &str,
        spec: RouteSpec,
        option: RuleOption,
    ) -> Result<Self, RoutingError> {
        if pattern.is_empty() {
            return Err(RoutingError::EmptyPattern);
        }
        let matcher = if RegexPattern::is_delimited(pattern) {
            Matcher::Regex(RegexPattern::parse(pattern)?)
        } else {
            Matcher::Rule(RulePattern::parse(pattern))
        };
        Ok(Rule {
            matcher,
            target: Target::compile(pattern, spec)?,
            option,
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RuleGroup {
    pub prefix: String,
    pub children: Vec<Rule>,
    pub option: RuleOption,
}

impl RuleGroup {
    pub(crate) fn compile(
        prefix: &str,
        children: Vec<(String, RouteSpec)>,
        option: RuleOption,
    ) -> Result<Self, RoutingError> {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            return Err(RoutingError::EmptyPattern);
        }
        let children = children
            .into_iter()
            .map(|(pattern, spec)| Rule::compile(&pattern, spec, RuleOption::default()))
            .collect::<Result<_, _>>()?;
        Ok(RuleGroup {
            prefix: prefix.to_string(),
            children,
            option,
        })
    }

    /// Returns the rest of `path` after the prefix. The prefix has to end on
    /// a segment boundary: `user` does not apply to `users/1`.
    pub(crate) fn strip_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Entry {
    Rule(Rule),
    Group(RuleGroup),
}

impl Entry {
    pub(crate) fn option(&self) -> &RuleOption {
        match self {
            Entry::Rule(rule) => &rule.option,
            Entry::Group(group) => &group.option,
        }
    }
}

type Rules = IndexMap<String, Entry>;

/// Rules per request method, in registration order, plus the rules
/// registered for any method.
#[derive(Clone, Debug, Default)]
pub(crate) struct RuleTable {
    by_method: HashMap<Method, Rules>,
    any: Rules,
}

impl RuleTable {
    /// Re-registering an existing key replaces the entry in place.
    pub(crate) fn insert(&mut self, filter: &MethodFilter, key: String, entry: Entry) {
        let rules = match filter {
            MethodFilter::Any => &mut self.any,
            MethodFilter::Only(method) => self.by_method.entry(method.clone()).or_default(),
        };
        rules.insert(key, entry);
    }

    /// Method-specific rules followed by the any-method rules. An any-method
    /// rule is shadowed when the same key is registered for the method.
    pub(crate) fn candidates<'a>(&'a self, method: &Method) -> impl Iterator<Item = &'a Entry> {
        let specific = self.by_method.get(method);
        let shadowed = move |key: &str| specific.is_some_and(|rules| rules.contains_key(key));

        specific
            .into_iter()
            .flat_map(|rules| rules.values())
            .chain(
                self.any
                    .iter()
                    .filter(move |(key, _)| !shadowed(key.as_str()))
                    .map(|(_, entry)| entry),
            )
    }

    pub(crate) fn len(&self) -> usize {
        self.any.len() + self.by_method.values().map(IndexMap::len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(pattern: &str) -> Entry {
        let rule = Rule::compile(pattern, RouteSpec::from("Index/index"), RuleOption::new());
        Entry::Rule(rule.unwrap())
    }

    fn sources<'a>(table: &'a RuleTable, method: &Method) -> Vec<&'a str> {
        table
            .candidates(method)
            .map(|entry| match entry {
                Entry::Rule(rule) => rule.matcher.source(),
                Entry::Group(group) => group.prefix.as_str(),
            })
            .collect()
    }

    #[test]
    fn test_method_filter_parsing() {
        assert_eq!(MethodFilter::parse_list("*").unwrap(), vec![MethodFilter::Any]);
        assert_eq!(
            MethodFilter::parse_list("get|POST").unwrap(),
            vec![
                MethodFilter::Only(Method::GET),
                MethodFilter::Only(Method::POST)
            ]
        );
        assert!(MethodFilter::parse_list("GET||POST").is_err());
        assert!(MethodFilter::parse_list("GE T").is_err());
    }

    #[test]
    fn test_candidates_order() {
        let mut table = RuleTable::default();
        table.insert(&MethodFilter::Any, "any/a".into(), leaf("any/a"));
        table.insert(&MethodFilter::Only(Method::GET), "get/a".into(), leaf("get/a"));
        table.insert(&MethodFilter::Only(Method::GET), "get/b".into(), leaf("get/b"));
        table.insert(&MethodFilter::Any, "any/b".into(), leaf("any/b"));

        assert_eq!(
            sources(&table, &Method::GET),
            vec!["get/a", "get/b", "any/a", "any/b"]
        );
        assert_eq!(sources(&table, &Method::POST), vec!["any/a", "any/b"]);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_reregistering_keeps_position() {
        let mut table = RuleTable::default();
        table.insert(&MethodFilter::Any, "a".into(), leaf("a"));
        table.insert(&MethodFilter::Any, "b".into(), leaf("b"));
        table.insert(&MethodFilter::Any, "a".into(), leaf("a/:id"));
        assert_eq!(sources(&table, &Method::GET), vec!["a/:id", "b"]);
    }

    #[test]
    fn test_any_rule_shadowed_by_method_rule() {
        let mut table = RuleTable::default();
        table.insert(&MethodFilter::Any, "a".into(), leaf("a"));
        table.insert(&MethodFilter::Only(Method::GET), "a".into(), leaf("a$"));
        assert_eq!(sources(&table, &Method::GET), vec!["a$"]);
        assert_eq!(sources(&table, &Method::DELETE), vec!["a"]);
    }

    #[test]
    fn test_group_prefix_boundary() {
        let group = RuleGroup::compile(
            "user",
            vec![(":id".to_string(), RouteSpec::from("User/read"))],
            RuleOption::new(),
        )
        .unwrap();
        assert_eq!(group.strip_prefix("user/1"), Some("1"));
        assert_eq!(group.strip_prefix("user"), Some(""));
        assert_eq!(group.strip_prefix("users/1"), None);
        assert_eq!(group.strip_prefix("blog/1"), None);
    }

    #[test]
    fn test_option_filters() {
        let request = RouteRequest::new(Method::GET, "a").with_extension("html");

        assert!(RuleOption::new().allows(&request));
        assert!(RuleOption::new().method(Method::GET).allows(&request));
        assert!(!RuleOption::new().method(Method::POST).allows(&request));
        assert!(RuleOption::new().extension("html").allows(&request));
        assert!(!RuleOption::new().extension("xml").allows(&request));
        assert!(!RuleOption::new().https(true).allows(&request));
        assert!(RuleOption::new().https(true).allows(&request.clone().with_https(true)));
        assert!(!RuleOption::new().predicate(|_| false).allows(&request));
        assert!(
            RuleOption::new()
                .predicate(|req| req.extension.is_some())
                .allows(&request)
        );
    }
}
