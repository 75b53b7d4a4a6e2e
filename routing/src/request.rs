use std::time::Instant;

use http::Method;

use crate::query::Query;
use crate::target::{Redirect, Route};

/// The parts of an incoming request the router looks at.
#[derive(Clone, Debug)]
pub struct RouteRequest {
    pub method: Method,
    /// Host without port.
    pub host: Option<String>,
    /// Path info, using the configured separator.
    pub path: String,
    /// Query parameters already present on the request.
    pub query: Query,
    pub https: bool,
    /// Pseudo-static suffix split off the last path segment, e.g. `html`.
    pub extension: Option<String>,
    /// The rule walk aborts once this instant has passed.
    pub deadline: Option<Instant>,
}

impl RouteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            host: None,
            path: path.into(),
            query: Query::new(),
            https: false,
            extension: None,
            deadline: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub(crate) fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// A route together with the merged query parameters to install on the
/// request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub route: Route,
    pub query: Query,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchResult {
    Resolved(ResolvedRoute),
    Redirect(Redirect),
    /// An inline handler already produced the response body.
    Handled(String),
    /// Nothing matched. The caller is expected to fall back to positional
    /// decomposition of the path, see [`crate::decompose`].
    NoMatch {
        bound_module: Option<String>,
        query: Query,
    },
}
