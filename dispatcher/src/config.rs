use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Rule needs either a pattern or a group, not both")]
    AmbiguousRule,

    #[error("Empty rule pattern")]
    EmptyPattern,

    #[error("Rule {0} has no route")]
    MissingRoute(String),

    #[error("Group {0} has no routes")]
    MissingRoutes(String),

    #[error("Rule {0} cannot carry both extra parameters and a redirect status")]
    ExtraWithStatus(String),

    #[error("Empty domain pattern")]
    EmptyDomain,

    #[error("Empty url map path")]
    EmptyMapPath,
}

/// HTTP methods a rule option can require
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

/// Dispatcher configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming requests
    pub listener: Listener,
    /// Admin listener for health and readiness checks
    pub admin_listener: Listener,
    /// Separator used in request paths, e.g. `-` for `news-5-page-2`
    #[serde(default = "default_separator")]
    pub path_separator: char,
    /// Per-request budget for the rule walk, in milliseconds
    #[serde(default)]
    pub dispatch_timeout_ms: Option<u64>,
    /// Full paths mapped straight to a `module/controller/action/key/value`
    /// address
    #[serde(default)]
    pub url_map: HashMap<String, String>,
    /// Host based module binding
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
    /// Routing rules, in priority order
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

fn default_separator() -> char {
    '/'
}

fn default_methods() -> String {
    "*".to_string()
}

impl Config {
    /// Validates the dispatcher configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.url_map.keys().any(|path| path.is_empty()) {
            return Err(ValidationError::EmptyMapPath);
        }
        for domain in &self.domains {
            if domain.pattern.is_empty() {
                return Err(ValidationError::EmptyDomain);
            }
        }
        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }

    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout_ms.map(Duration::from_millis)
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Binds requests for a host to a module.
///
/// `pattern` is a full host, a subdomain (`blog`, `a.b`), `*.<label>` or
/// `*`. A `*` value in `query` is replaced with the matched subdomain label.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DomainConfig {
    pub pattern: String,
    pub module: String,
    pub query: Option<String>,
}

/// A routing rule or a group of rules sharing a path prefix
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RuleConfig {
    /// `*` or a `|`-separated list such as `GET|POST`
    #[serde(default = "default_methods")]
    pub methods: String,
    pub pattern: Option<String>,
    /// Path prefix of a group; its rules are listed in `routes`
    pub group: Option<String>,
    #[serde(flatten)]
    pub target: TargetConfig,
    #[serde(default)]
    pub option: OptionConfig,
    #[serde(default)]
    pub routes: Vec<GroupRouteConfig>,
}

impl RuleConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match (&self.pattern, &self.group) {
            (Some(pattern), None) => {
                if pattern.is_empty() {
                    return Err(ValidationError::EmptyPattern);
                }
                self.target.validate(pattern)
            }
            (None, Some(group)) => {
                if group.is_empty() {
                    return Err(ValidationError::EmptyPattern);
                }
                if self.routes.is_empty() {
                    return Err(ValidationError::MissingRoutes(group.clone()));
                }
                for route in &self.routes {
                    if route.pattern.is_empty() {
                        return Err(ValidationError::EmptyPattern);
                    }
                    route.target.validate(&route.pattern)?;
                }
                Ok(())
            }
            _ => Err(ValidationError::AmbiguousRule),
        }
    }
}

/// A rule inside a group; its pattern is relative to the group prefix
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GroupRouteConfig {
    pub pattern: String,
    #[serde(flatten)]
    pub target: TargetConfig,
}

/// What a rule resolves to
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// `[module/]controller/action?query`, `key=value&...`, or a redirect
    /// address starting with `/` or `http`
    pub route: Option<String>,
    /// Extra query string merged into the route parameters
    pub extra: Option<String>,
    /// Redirect status code
    pub status: Option<u16>,
}

impl TargetConfig {
    fn validate(&self, pattern: &str) -> Result<(), ValidationError> {
        if self.route.as_deref().is_none_or(str::is_empty) {
            return Err(ValidationError::MissingRoute(pattern.to_string()));
        }
        if self.extra.is_some() && self.status.is_some() {
            return Err(ValidationError::ExtraWithStatus(pattern.to_string()));
        }
        Ok(())
    }
}

/// Request conditions a rule applies under
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct OptionConfig {
    pub method: Option<HttpMethod>,
    /// Required pseudo-static extension, e.g. `html`
    pub ext: Option<String>,
    #[serde(default)]
    pub https: bool,
}
