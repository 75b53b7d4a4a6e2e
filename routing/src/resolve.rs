//! Turns a successful pattern match into a final outcome.
//!
//! Parameters are merged with later sources winning: captured variables,
//! the target's declared query, `key/value` pairs from the unconsumed path
//! tail, the target's extra query string. Parameters already present on the
//! request win over all of them.

use crate::handler::HandlerOutcome;
use crate::pattern::{RegexMatch, RuleMatch};
use crate::query::Query;
use crate::request::{MatchResult, ResolvedRoute, RouteRequest};
use crate::target::{Redirect, Route, Target, parse_route, substitute};

/// Per-request state carried through the rule walk.
#[derive(Debug, Default)]
pub(crate) struct DispatchState {
    /// Request query after domain parameters were merged in.
    pub query: Query,
    pub bound_module: Option<String>,
}

impl DispatchState {
    pub(crate) fn resolved(&self, route: Route, params: Query) -> MatchResult {
        MatchResult::Resolved(ResolvedRoute {
            route: route.with_bound_module(self.bound_module.as_deref()),
            query: params.under(&self.query),
        })
    }
}

/// Resolves a rule-syntax match. Returns None when a handler asked to
/// continue the walk.
pub(crate) fn resolve_rule(
    rule_match: RuleMatch,
    target: &Target,
    request: &RouteRequest,
    state: &DispatchState,
) -> Option<MatchResult> {
    let RuleMatch { captures, residual } = rule_match;
    let values: Vec<&str> = captures.values().map(String::as_str).collect();
    let lookup = |index: usize| index.checked_sub(1).and_then(|i| values.get(i)).copied();

    match target {
        Target::Handler(handler) => {
            let outcome = handler.call_named(&captures);
            from_outcome(outcome, captures.clone().into_iter().collect(), state)
        }
        Target::Redirect { address, status } => Some(MatchResult::Redirect(Redirect {
            location: substitute(address, lookup),
            status: *status,
        })),
        Target::Route { route, extra } => {
            let (route, declared) = parse_route(route, &request.method);
            let declared: Query = declared
                .into_iter()
                .map(|(key, value)| match back_reference(&value) {
                    Some(index) => (key, lookup(index).unwrap_or_default().to_string()),
                    None => (key, value),
                })
                .collect();

            let mut params: Query = captures.clone().into_iter().collect();
            params.merge(declared);
            params.merge(Query::from_path_pairs(&residual));
            if let Some(extra) = extra {
                params.merge(extra.clone());
            }
            Some(state.resolved(route, params))
        }
    }
}

/// Resolves a regex match against the full `path`. Returns None when a
/// handler asked to continue the walk.
pub(crate) fn resolve_regex(
    regex_match: RegexMatch,
    path: &str,
    target: &Target,
    request: &RouteRequest,
    state: &DispatchState,
) -> Option<MatchResult> {
    let lookup = |index: usize| {
        regex_match
            .groups
            .get(index)
            .and_then(|group| group.as_deref())
    };

    match target {
        Target::Handler(handler) => {
            let outcome = handler.call_positional(&regex_match.groups);
            from_outcome(outcome, Query::new(), state)
        }
        Target::Redirect { address, status } => Some(MatchResult::Redirect(Redirect {
            location: substitute(address, lookup),
            status: *status,
        })),
        Target::Route { route, extra } => {
            let address = substitute(route, lookup);
            let (route, mut params) = parse_route(&address, &request.method);

            let residual = path.get(regex_match.matched_len()..).unwrap_or_default();
            params.merge(Query::from_path_pairs(residual));
            if let Some(extra) = extra {
                params.merge(extra.clone());
            }
            Some(state.resolved(route, params))
        }
    }
}

fn from_outcome(
    outcome: HandlerOutcome,
    params: Query,
    state: &DispatchState,
) -> Option<MatchResult> {
    match outcome {
        HandlerOutcome::Continue => None,
        HandlerOutcome::Handled(body) => Some(MatchResult::Handled(body)),
        HandlerOutcome::Redirect(redirect) => Some(MatchResult::Redirect(redirect)),
        HandlerOutcome::Matched(route) => Some(state.resolved(route, params)),
    }
}

/// `:N` as a whole query value refers to the N-th captured variable.
fn back_reference(value: &str) -> Option<usize> {
    value.strip_prefix(':')?.parse().ok().filter(|index| *index > 0)
}

/// Positional decomposition of a normalized path:
/// `module/controller/action/key/value/...`. When a module is bound the
/// first segment is the controller instead.
pub fn decompose(path: &str, bound_module: Option<&str>, query: &Query) -> ResolvedRoute {
    let mut parts = path.split('/').filter(|part| !part.is_empty());
    let mut next = || parts.next().map(str::to_string);

    let module = match bound_module {
        Some(module) => Some(module.to_string()),
        None => next(),
    };
    let controller = next();
    let action = next();

    let rest: Vec<&str> = parts.collect();
    ResolvedRoute {
        route: Route {
            module,
            controller,
            action,
        },
        query: Query::from_path_pairs(&rest.join("/")).under(query),
    }
}
