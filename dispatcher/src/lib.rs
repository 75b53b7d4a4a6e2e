pub mod config;
pub mod errors;
pub mod metrics_defs;
mod rules;
mod service;

use crate::errors::DispatcherError;
use crate::metrics_defs::ROUTER_RELOADS;
use routing::RouterHandle;
use service::DispatcherService;
use shared::admin_service::AdminService;
use shared::counter;
use shared::http::run_http_service;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};

pub use rules::build_router;

/// Serves requests until a listener fails. `reload` is called on `SIGHUP`
/// to fetch a fresh config; its rules replace the current ones only when
/// the whole rule set builds.
pub async fn run<L>(config: config::Config, reload: L) -> Result<(), DispatcherError>
where
    L: Fn() -> Result<config::Config, DispatcherError> + Send + 'static,
{
    let router = build_router(&config)?;
    let handle = Arc::new(RouterHandle::new(router));
    tracing::info!(rules = config.rules.len(), "Routing rules loaded");

    let dispatcher_service = DispatcherService::new(handle.clone(), config.dispatch_timeout());
    let dispatcher_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        dispatcher_service,
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, DispatcherError>::new(|| true),
    );
    let reload_task = watch_reloads(handle, reload);

    tokio::try_join!(dispatcher_task, admin_task, reload_task)?;
    Ok(())
}

async fn watch_reloads<L>(handle: Arc<RouterHandle>, reload: L) -> Result<(), DispatcherError>
where
    L: Fn() -> Result<config::Config, DispatcherError>,
{
    let mut hangup = signal(SignalKind::hangup())?;
    while hangup.recv().await.is_some() {
        match reload_router(&handle, &reload) {
            Ok(()) => {
                counter!(ROUTER_RELOADS, "result" => "ok").increment(1);
                tracing::info!("Routing rules reloaded");
            }
            Err(e) => {
                counter!(ROUTER_RELOADS, "result" => "error").increment(1);
                tracing::error!(error = %e, "Reload failed, keeping current routing rules");
            }
        }
    }
    Ok(())
}

/// Listener changes in the new config take effect only on restart.
fn reload_router<L>(handle: &RouterHandle, reload: &L) -> Result<(), DispatcherError>
where
    L: Fn() -> Result<config::Config, DispatcherError>,
{
    let config = reload()?;
    config.validate()?;
    handle.store(build_router(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use routing::{MatchResult, Router, RouteRequest};

    fn config(rules: &str) -> config::Config {
        let yaml = format!(
            r#"
listener:
    host: "0.0.0.0"
    port: 3000
admin_listener:
    host: "127.0.0.1"
    port: 3001
rules:
{rules}
"#
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    fn resolves(handle: &RouterHandle, path: &str) -> bool {
        let request = RouteRequest::new(Method::GET, path);
        matches!(
            handle.load().dispatch(&request),
            Ok(MatchResult::Resolved(_))
        )
    }

    #[test]
    fn test_reload_swaps_rules() {
        let handle = RouterHandle::new(Router::builder().build());
        assert!(!resolves(&handle, "news/1"));

        let reload = || {
            Ok(config(
                r#"
    - pattern: "news/:id"
      route: News/read
"#,
            ))
        };
        reload_router(&handle, &reload).unwrap();
        assert!(resolves(&handle, "news/1"));
    }

    #[test]
    fn test_failed_reload_keeps_rules() {
        let initial = config(
            r#"
    - pattern: "news/:id"
      route: News/read
"#,
        );
        let handle = RouterHandle::new(build_router(&initial).unwrap());

        let invalid_regex = || {
            Ok(config(
                r#"
    - pattern: "/^news(/"
      route: News/read
"#,
            ))
        };
        assert!(matches!(
            reload_router(&handle, &invalid_regex),
            Err(DispatcherError::Routing(_))
        ));

        let unreadable = || Err(DispatcherError::ConfigLoad("missing file".to_string()));
        assert!(reload_router(&handle, &unreadable).is_err());

        let invalid_config = || {
            let mut config = initial.clone();
            config.listener.port = 0;
            Ok(config)
        };
        assert!(matches!(
            reload_router(&handle, &invalid_config),
            Err(DispatcherError::Validation(_))
        ));

        assert!(resolves(&handle, "news/1"));
    }
}
