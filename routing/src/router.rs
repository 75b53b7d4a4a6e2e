//! Rule registration and request dispatch.
//!
//! A `RouterBuilder` collects the URL map, domain rules and path rules
//! during startup. `build()` freezes them into an immutable `Router` that
//! is shared across request handlers; `RouterHandle` publishes a new
//! snapshot atomically when the rules are reloaded.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::domain::{DomainTable, DomainTarget};
use crate::error::{DispatchError, RoutingError};
use crate::handler::HandlerOutcome;
use crate::query::Query;
use crate::request::{MatchResult, ResolvedRoute, RouteRequest};
use crate::resolve::{DispatchState, decompose, resolve_regex, resolve_rule};
use crate::rules::{Entry, Matcher, MethodFilter, Rule, RuleGroup, RuleOption, RuleTable};
use crate::target::RouteSpec;

/// Collects rule definitions before the router is built.
#[derive(Debug)]
pub struct RouterBuilder {
    separator: char,
    url_map: HashMap<String, String>,
    domains: DomainTable,
    rules: RuleTable,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self {
            separator: '/',
            url_map: HashMap::new(),
            domains: DomainTable::default(),
            rules: RuleTable::default(),
        }
    }
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Separator used by incoming paths; it is replaced with `/` before
    /// matching.
    pub fn separator(&mut self, separator: char) -> &mut Self {
        self.separator = separator;
        self
    }

    /// Maps a full path directly to a `module/controller/action/key/value`
    /// address, bypassing rule matching. An optional `?query` part supplies
    /// extra parameters.
    pub fn map(&mut self, path: &str, route: &str) -> &mut Self {
        let path = normalize(path, self.separator);
        self.url_map.insert(path, route.to_string());
        self
    }

    pub fn domain(&mut self, pattern: &str, target: DomainTarget) -> &mut Self {
        self.domains.insert(pattern.to_string(), target);
        self
    }

    /// Registers a rule under each method in `methods` (`*` or `GET|POST`).
    /// A pattern wrapped in brackets, like `[blog]`, registers a group whose
    /// children come from a `RouteSpec::Group`.
    pub fn register(
        &mut self,
        pattern: &str,
        spec: impl Into<RouteSpec>,
        methods: &str,
        option: RuleOption,
    ) -> Result<&mut Self, RoutingError> {
        let filters = MethodFilter::parse_list(methods)?;
        let group_prefix = pattern.strip_prefix('[').and_then(|p| p.strip_suffix(']'));

        let (key, entry) = match (group_prefix, spec.into()) {
            (Some(prefix), RouteSpec::Group(children)) => (
                prefix.to_string(),
                Entry::Group(RuleGroup::compile(prefix, children, option)?),
            ),
            (Some(prefix), _) => return Err(RoutingError::ExpectedGroup(prefix.to_string())),
            (None, spec) => (
                pattern.to_string(),
                Entry::Rule(Rule::compile(pattern, spec, option)?),
            ),
        };

        for filter in &filters {
            self.rules.insert(filter, key.clone(), entry.clone());
        }
        Ok(self)
    }

    pub fn group<P, S>(
        &mut self,
        prefix: &str,
        children: impl IntoIterator<Item = (P, S)>,
        methods: &str,
        option: RuleOption,
    ) -> Result<&mut Self, RoutingError>
    where
        P: Into<String>,
        S: Into<RouteSpec>,
    {
        let children = children
            .into_iter()
            .map(|(pattern, spec)| (pattern.into(), spec.into()))
            .collect();
        self.register(&format!("[{prefix}]"), RouteSpec::Group(children), methods, option)
    }

    pub fn any(
        &mut self,
        pattern: &str,
        spec: impl Into<RouteSpec>,
    ) -> Result<&mut Self, RoutingError> {
        self.register(pattern, spec, "*", RuleOption::default())
    }

    pub fn get(
        &mut self,
        pattern: &str,
        spec: impl Into<RouteSpec>,
    ) -> Result<&mut Self, RoutingError> {
        self.register(pattern, spec, "GET", RuleOption::default())
    }

    pub fn post(
        &mut self,
        pattern: &str,
        spec: impl Into<RouteSpec>,
    ) -> Result<&mut Self, RoutingError> {
        self.register(pattern, spec, "POST", RuleOption::default())
    }

    pub fn put(
        &mut self,
        pattern: &str,
        spec: impl Into<RouteSpec>,
    ) -> Result<&mut Self, RoutingError> {
        self.register(pattern, spec, "PUT", RuleOption::default())
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        spec: impl Into<RouteSpec>,
    ) -> Result<&mut Self, RoutingError> {
        self.register(pattern, spec, "DELETE", RuleOption::default())
    }

    pub fn build(self) -> Router {
        tracing::debug!(
            rules = self.rules.len(),
            domains = self.domains.len(),
            url_map = self.url_map.len(),
            "Built router"
        );
        Router {
            separator: self.separator,
            url_map: self.url_map,
            domains: self.domains,
            rules: self.rules,
        }
    }
}

/// Immutable rule tables. Dispatch never mutates the router, so one
/// instance can serve any number of concurrent requests.
#[derive(Debug)]
pub struct Router {
    separator: char,
    url_map: HashMap<String, String>,
    domains: DomainTable,
    rules: RuleTable,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Normalizes a request path the same way `dispatch` does.
    pub fn normalize(&self, path: &str) -> String {
        normalize(path, self.separator)
    }

    /// Resolves a request: domain rules first, then the URL map, then the
    /// rule walk. The first rule whose options pass and whose pattern matches
    /// wins, unless its handler asks to continue.
    pub fn dispatch(&self, request: &RouteRequest) -> Result<MatchResult, DispatchError> {
        let mut state = DispatchState {
            query: request.query.clone(),
            bound_module: None,
        };

        if let Some(result) = self.check_domain(request, &mut state) {
            return Ok(result);
        }

        let path = self.normalize(&request.path);

        if let Some(address) = self.url_map.get(&path) {
            tracing::debug!(path = %path, address = %address, "Matched URL map");
            return Ok(MatchResult::Resolved(resolve_mapped(address, &state)));
        }

        for entry in self.rules.candidates(&request.method) {
            if request.deadline_passed() {
                return Err(DispatchError::DeadlineExceeded);
            }
            if !entry.option().allows(request) {
                continue;
            }

            let result = match entry {
                Entry::Rule(rule) => try_rule(rule, &path, request, &state),
                Entry::Group(group) => match group.strip_prefix(&path) {
                    Some(rest) => walk_group(group, rest, request, &state)?,
                    None => None,
                },
            };
            if let Some(result) = result {
                return Ok(result);
            }
        }

        Ok(MatchResult::NoMatch {
            bound_module: state.bound_module,
            query: state.query,
        })
    }

    /// Applies the domain rule for the request host, if any. Returns a
    /// result when a domain handler finished the request.
    fn check_domain(
        &self,
        request: &RouteRequest,
        state: &mut DispatchState,
    ) -> Option<MatchResult> {
        let host = request.host.as_deref()?;
        let domain = self.domains.resolve(host)?;
        tracing::debug!(host, wildcard = ?domain.wildcard, "Matched domain rule");

        match domain.target {
            DomainTarget::Module(module) => {
                state.bound_module = Some(module.clone());
                None
            }
            DomainTarget::ModuleWithQuery(module, query) => {
                state.bound_module = Some(module.clone());
                let mut params = Query::parse(query);
                if let Some(wildcard) = domain.wildcard {
                    params.replace_first_value("*", wildcard);
                }
                state.query.merge(params);
                None
            }
            DomainTarget::Handler(handler) => match handler.call() {
                HandlerOutcome::Continue => None,
                HandlerOutcome::Handled(body) => Some(MatchResult::Handled(body)),
                HandlerOutcome::Redirect(redirect) => Some(MatchResult::Redirect(redirect)),
                HandlerOutcome::Matched(route) => Some(MatchResult::Resolved(ResolvedRoute {
                    route,
                    query: state.query.clone(),
                })),
            },
        }
    }
}

/// Decomposes a URL map address left to right. The bound module takes the
/// place of the first segment; request parameters win over the address's.
fn resolve_mapped(address: &str, state: &DispatchState) -> ResolvedRoute {
    let (path, mut params) = match address.split_once('?') {
        Some((path, query)) => (path, Query::parse(query)),
        None => (address, Query::new()),
    };
    params.merge(state.query.clone());
    decompose(path, state.bound_module.as_deref(), &params)
}

fn walk_group(
    group: &RuleGroup,
    rest: &str,
    request: &RouteRequest,
    state: &DispatchState,
) -> Result<Option<MatchResult>, DispatchError> {
    for child in &group.children {
        if request.deadline_passed() {
            return Err(DispatchError::DeadlineExceeded);
        }
        if !child.option.allows(request) {
            continue;
        }
        if let Some(result) = try_rule(child, rest, request, state) {
            return Ok(Some(result));
        }
    }
    Ok(None)
}

fn try_rule(
    rule: &Rule,
    path: &str,
    request: &RouteRequest,
    state: &DispatchState,
) -> Option<MatchResult> {
    let result = match &rule.matcher {
        Matcher::Regex(pattern) => {
            let regex_match = pattern.matches(path)?;
            resolve_regex(regex_match, path, &rule.target, request, state)
        }
        Matcher::Rule(pattern) => {
            let rule_match = pattern.matches(path)?;
            resolve_rule(rule_match, &rule.target, request, state)
        }
    };

    match &result {
        Some(_) => tracing::debug!(rule = rule.matcher.source(), path, "Matched rule"),
        None => tracing::debug!(rule = rule.matcher.source(), path, "Handler continued walk"),
    }
    result
}

/// Replaces the separator with `/` and trims surrounding slashes. An empty
/// path becomes `/`.
fn normalize(path: &str, separator: char) -> String {
    let path = if separator == '/' {
        path.to_string()
    } else {
        path.replace(separator, "/")
    };
    match path.trim_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Shared, atomically replaceable router snapshot. Readers always see a
/// complete rule table; reloads build a new router and swap it in.
pub struct RouterHandle {
    current: ArcSwap<Router>,
}

impl RouterHandle {
    pub fn new(router: Router) -> Self {
        Self {
            current: ArcSwap::from_pointee(router),
        }
    }

    pub fn load(&self) -> Arc<Router> {
        self.current.load_full()
    }

    pub fn store(&self, router: Router) {
        self.current.store(Arc::new(router));
    }
}
