//! Request routing: decides which handler processes a request from its
//! method, host and path.
//!
//! # Dispatch order
//!
//! ```text
//! RouteRequest (method, host, path, query)
//!     → domain rules (may bind a module, add query params, or finish the request)
//!     → path normalization (separator → `/`)
//!     → URL map (exact path → route)
//!     → rule walk (method rules, then any-method rules; groups by prefix)
//!         → rule-syntax pattern → rule resolver
//!         → regex pattern       → regex resolver
//!     → MatchResult: Resolved | Redirect | Handled | NoMatch
//! ```
//!
//! Rule tables are built once at startup and are read-only afterwards.

mod domain;
mod error;
mod handler;
mod pattern;
mod query;
mod request;
mod resolve;
mod router;
mod rules;
mod target;

pub use domain::DomainTarget;
pub use error::{DispatchError, RoutingError};
pub use handler::{Handler, HandlerOutcome};
pub use pattern::{Captures, RegexMatch, RegexPattern, RuleMatch, RulePattern};
pub use query::Query;
pub use request::{MatchResult, ResolvedRoute, RouteRequest};
pub use resolve::decompose;
pub use router::{Router, RouterBuilder, RouterHandle};
pub use rules::{MethodFilter, Predicate, RuleOption};
pub use target::{DEFAULT_REDIRECT_STATUS, REST_ACTION, Redirect, Route, RouteSpec};
