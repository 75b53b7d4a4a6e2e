//! Route targets: what a rule resolves to once its pattern matched.

use http::Method;
use once_cell::sync::Lazy;
use regex::{Captures as RegexCaptures, Regex};

use crate::error::RoutingError;
use crate::handler::Handler;
use crate::query::Query;

/// Action marker replaced with the request method name, e.g. `PUT`.
pub const REST_ACTION: &str = "[rest]";

pub const DEFAULT_REDIRECT_STATUS: u16 = 301;

/// Positional back-reference tokens `:1`, `:2`, ...
static BACK_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\d+)").unwrap());

/// A `[module/]controller/action` triple. Any part may be absent, e.g. when a
/// target only declares query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    pub module: Option<String>,
    pub controller: Option<String>,
    pub action: Option<String>,
}

impl Route {
    pub fn new(module: Option<&str>, controller: Option<&str>, action: Option<&str>) -> Self {
        Self {
            module: module.map(str::to_string),
            controller: controller.map(str::to_string),
            action: action.map(str::to_string),
        }
    }

    /// Fills in the module bound by domain dispatch when the route has none.
    pub(crate) fn with_bound_module(mut self, bound_module: Option<&str>) -> Self {
        if self.module.is_none() {
            self.module = bound_module.map(str::to_string);
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: u16,
}

/// Rule target as given at registration time.
#[derive(Clone, Debug)]
pub enum RouteSpec {
    /// `[module/]controller/action?query`, `key=value&...`, or an external
    /// address starting with `/` or `http`.
    Address(String),
    /// An address plus a second component: an extra query string for route
    /// targets, or the status code for redirects.
    WithExtra(String, String),
    Handler(Handler),
    /// Child rules of a group, keyed by pattern.
    Group(Vec<(String, RouteSpec)>),
}

impl From<&str> for RouteSpec {
    fn from(address: &str) -> Self {
        RouteSpec::Address(address.to_string())
    }
}

impl From<String> for RouteSpec {
    fn from(address: String) -> Self {
        RouteSpec::Address(address)
    }
}

impl From<(&str, &str)> for RouteSpec {
    fn from((address, extra): (&str, &str)) -> Self {
        RouteSpec::WithExtra(address.to_string(), extra.to_string())
    }
}

impl From<(&str, u16)> for RouteSpec {
    fn from((address, status): (&str, u16)) -> Self {
        RouteSpec::WithExtra(address.to_string(), status.to_string())
    }
}

impl From<Handler> for RouteSpec {
    fn from(handler: Handler) -> Self {
        RouteSpec::Handler(handler)
    }
}

/// Compiled target of a leaf rule.
#[derive(Clone, Debug)]
pub(crate) enum Target {
    Redirect { address: String, status: u16 },
    Route { route: String, extra: Option<Query> },
    Handler(Handler),
}

impl Target {
    pub(crate) fn compile(pattern: &str, spec: RouteSpec) -> Result<Self, RoutingError> {
        match spec {
            RouteSpec::Address(address) if is_external(&address) => Ok(Target::Redirect {
                address,
                status: DEFAULT_REDIRECT_STATUS,
            }),
            RouteSpec::Address(route) => Ok(Target::Route { route, extra: None }),
            RouteSpec::WithExtra(address, status) if is_external(&address) => {
                let status = match status.trim().parse::<u16>() {
                    Ok(code) if (300..400).contains(&code) => code,
                    _ => return Err(RoutingError::InvalidStatus { address, status }),
                };
                Ok(Target::Redirect { address, status })
            }
            RouteSpec::WithExtra(route, extra) => Ok(Target::Route {
                route,
                extra: Some(Query::parse(&extra)),
            }),
            RouteSpec::Handler(handler) => Ok(Target::Handler(handler)),
            RouteSpec::Group(_) => Err(RoutingError::UnexpectedGroup(pattern.to_string())),
        }
    }
}

fn is_external(address: &str) -> bool {
    address.starts_with('/') || address.starts_with("http")
}

/// Replaces every `:N` token with the N-th value from `lookup`. Tokens
/// without a value, including `:0`, become empty.
pub(crate) fn substitute<'v, F>(template: &str, lookup: F) -> String
where
    F: Fn(usize) -> Option<&'v str>,
{
    BACK_REFERENCE
        .replace_all(template, |caps: &RegexCaptures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .filter(|index| *index > 0)
                .and_then(&lookup)
                .unwrap_or_default()
                .to_string()
        })
        .into_owned()
}

/// Splits a route address into its triple and declared query parameters.
///
/// - `[module/]controller/action?k=v` yields both
/// - `controller/action` yields only the triple
/// - `k=v&...` yields only parameters
pub(crate) fn parse_route(address: &str, method: &Method) -> (Route, Query) {
    let (path, query) = match address.split_once('?') {
        Some((path, query)) => (Some(path), Query::parse(query)),
        None if address.find('/').is_some_and(|pos| pos > 0) => (Some(address), Query::new()),
        None => (None, Query::parse(address)),
    };

    let Some(path) = path else {
        return (Route::default(), query);
    };

    let mut parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    let action = parts.pop().map(|action| match action {
        REST_ACTION => method.as_str().to_string(),
        action => action.to_string(),
    });
    let controller = parts.pop().map(str::to_string);
    let module = parts.pop().map(str::to_string);

    (
        Route {
            module,
            controller,
            action,
        },
        query,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute() {
        let values = ["5", "9"];
        let lookup = |index: usize| values.get(index - 1).copied();
        assert_eq!(substitute("/new.php?id=:1", lookup), "/new.php?id=5");
        assert_eq!(substitute("a=:2&b=:1&c=:3&d=:0", lookup), "a=9&b=5&c=&d=");
        assert_eq!(substitute("plain", lookup), "plain");
    }

    #[test]
    fn test_parse_route_with_query() {
        let (route, query) = parse_route("blog/News/read?cate=1&id=:1", &Method::GET);
        assert_eq!(route, Route::new(Some("blog"), Some("News"), Some("read")));
        assert_eq!(query.get("cate"), Some("1"));
        assert_eq!(query.get("id"), Some(":1"));
    }

    #[test]
    fn test_parse_route_without_query() {
        let (route, query) = parse_route("News/read", &Method::GET);
        assert_eq!(route, Route::new(None, Some("News"), Some("read")));
        assert!(query.is_empty());
    }

    #[test]
    fn test_parse_route_params_only() {
        let (route, query) = parse_route("cate=1&status=2", &Method::GET);
        assert_eq!(route, Route::default());
        assert_eq!(query.get("status"), Some("2"));
    }

    #[test]
    fn test_parse_route_rest_marker() {
        let (route, _) = parse_route("Blog/[rest]", &Method::PUT);
        assert_eq!(route.action.as_deref(), Some("PUT"));
    }

    #[test]
    fn test_compile_targets() {
        assert!(matches!(
            Target::compile("old/:id", RouteSpec::from("/new.php?id=:1")),
            Ok(Target::Redirect { status: 301, .. })
        ));
        assert!(matches!(
            Target::compile("old/:id", RouteSpec::from(("http://example.com/", 302))),
            Ok(Target::Redirect { status: 302, .. })
        ));
        assert!(matches!(
            Target::compile("old/:id", RouteSpec::from(("/new.php", "oops"))),
            Err(RoutingError::InvalidStatus { .. })
        ));
        assert!(matches!(
            Target::compile("news/:id", RouteSpec::from(("News/read", "status=1"))),
            Ok(Target::Route { extra: Some(_), .. })
        ));
        assert!(matches!(
            Target::compile("news/:id", RouteSpec::Group(vec![])),
            Err(RoutingError::UnexpectedGroup(_))
        ));
    }
}
