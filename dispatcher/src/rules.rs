//! Builds a `Router` from the dispatcher config.

use routing::{DomainTarget, Router, RouteSpec, RoutingError, RuleOption};

use crate::config::{Config, OptionConfig, TargetConfig};

pub fn build_router(config: &Config) -> Result<Router, RoutingError> {
    let mut builder = Router::builder();
    builder.separator(config.path_separator);

    for (path, route) in &config.url_map {
        builder.map(path, route);
    }

    for domain in &config.domains {
        let target = match &domain.query {
            Some(query) => DomainTarget::ModuleWithQuery(domain.module.clone(), query.clone()),
            None => DomainTarget::Module(domain.module.clone()),
        };
        builder.domain(&domain.pattern, target);
    }

    for rule in &config.rules {
        let option = rule_option(&rule.option);
        match (&rule.pattern, &rule.group) {
            (_, Some(prefix)) => {
                let children = rule
                    .routes
                    .iter()
                    .map(|route| (route.pattern.clone(), route_spec(&route.target)));
                builder.group(prefix, children, &rule.methods, option)?;
            }
            (Some(pattern), None) => {
                builder.register(pattern, route_spec(&rule.target), &rule.methods, option)?;
            }
            (None, None) => return Err(RoutingError::EmptyPattern),
        }
    }

    Ok(builder.build())
}

fn route_spec(target: &TargetConfig) -> RouteSpec {
    let route = target.route.clone().unwrap_or_default();
    match (&target.extra, target.status) {
        (_, Some(status)) => RouteSpec::WithExtra(route, status.to_string()),
        (Some(extra), None) => RouteSpec::WithExtra(route, extra.clone()),
        (None, None) => RouteSpec::Address(route),
    }
}

fn rule_option(option: &OptionConfig) -> RuleOption {
    let mut rule_option = RuleOption::new().https(option.https);
    if let Some(method) = option.method {
        rule_option = rule_option.method(method.into());
    }
    if let Some(ext) = &option.ext {
        rule_option = rule_option.extension(ext.to_ascii_lowercase());
    }
    rule_option
}
