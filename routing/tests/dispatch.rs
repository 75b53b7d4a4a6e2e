use std::time::{Duration, Instant};

use http::Method;
use routing::{
    DispatchError, DomainTarget, Handler, HandlerOutcome, MatchResult, Query, Redirect,
    ResolvedRoute, Route, RouteRequest, Router, RouteSpec, RuleOption, decompose,
};

fn resolved(result: Result<MatchResult, DispatchError>) -> ResolvedRoute {
    match result {
        Ok(MatchResult::Resolved(resolved)) => resolved,
        other => panic!("expected a resolved route, got {other:?}"),
    }
}

fn news_router() -> Router {
    let mut builder = Router::builder();
    builder
        .get("news/:month/:day/:id$", "News/read?cate=1")
        .unwrap()
        .any(r"/^new\/(\d+)\/(\d+)$/", "News/read?id=:1&page=:2")
        .unwrap()
        .any("old/:id", ("/new.php?id=:1", 301))
        .unwrap();
    builder.build()
}

#[test]
fn test_rule_with_exact_suffix() {
    let router = news_router();
    let request = RouteRequest::new(Method::GET, "/news/10/05/99");
    let resolved = resolved(router.dispatch(&request));

    assert_eq!(resolved.route, Route::new(None, Some("News"), Some("read")));
    assert_eq!(resolved.query.get("month"), Some("10"));
    assert_eq!(resolved.query.get("day"), Some("05"));
    assert_eq!(resolved.query.get("id"), Some("99"));
    assert_eq!(resolved.query.get("cate"), Some("1"));

    // one segment too many for the exact pattern
    let request = RouteRequest::new(Method::GET, "news/10/05/99/extra");
    assert!(matches!(
        router.dispatch(&request),
        Ok(MatchResult::NoMatch { .. })
    ));
}

#[test]
fn test_method_specific_rule_ignored_for_other_methods() {
    let router = news_router();
    let request = RouteRequest::new(Method::POST, "news/10/05/99");
    assert!(matches!(
        router.dispatch(&request),
        Ok(MatchResult::NoMatch { .. })
    ));
}

#[test]
fn test_regex_rule() {
    let router = news_router();
    let request = RouteRequest::new(Method::GET, "new/12/3");
    let resolved = resolved(router.dispatch(&request));

    assert_eq!(resolved.route, Route::new(None, Some("News"), Some("read")));
    assert_eq!(resolved.query.get("id"), Some("12"));
    assert_eq!(resolved.query.get("page"), Some("3"));
}

#[test]
fn test_redirect_rule() {
    let router = news_router();
    let request = RouteRequest::new(Method::GET, "old/42");
    assert_eq!(
        router.dispatch(&request),
        Ok(MatchResult::Redirect(Redirect {
            location: "/new.php?id=42".to_string(),
            status: 301,
        }))
    );
}

#[test]
fn test_no_match_falls_back_to_decompose() {
    let router = news_router();
    let request =
        RouteRequest::new(Method::DELETE, "/unknown/path/here/k/v").with_query(Query::parse("a=1"));

    let Ok(MatchResult::NoMatch {
        bound_module,
        query,
    }) = router.dispatch(&request)
    else {
        panic!("expected no match");
    };
    assert_eq!(bound_module, None);

    let path = router.normalize(&request.path);
    let resolved = decompose(&path, bound_module.as_deref(), &query);
    assert_eq!(
        resolved.route,
        Route::new(Some("unknown"), Some("path"), Some("here"))
    );
    assert_eq!(resolved.query.get("k"), Some("v"));
    assert_eq!(resolved.query.get("a"), Some("1"));
}

#[test]
fn test_dispatch_is_idempotent() {
    let router = news_router();
    let request = RouteRequest::new(Method::GET, "news/10/05/99").with_query(Query::parse("x=1"));
    let first = router.dispatch(&request);
    let second = router.dispatch(&request);
    assert_eq!(first, second);
}

#[test]
fn test_first_registered_rule_wins() {
    let mut builder = Router::builder();
    builder
        .any("blog/:id\\d", "Blog/read")
        .unwrap()
        .any("blog/:name", "Blog/category")
        .unwrap();
    let router = builder.build();

    let resolved_id = resolved(router.dispatch(&RouteRequest::new(Method::GET, "blog/5")));
    assert_eq!(resolved_id.route.action.as_deref(), Some("read"));

    let resolved_name = resolved(router.dispatch(&RouteRequest::new(Method::GET, "blog/rust")));
    assert_eq!(resolved_name.route.action.as_deref(), Some("category"));
}

#[test]
fn test_request_query_wins_over_route_params() {
    let router = news_router();
    let request = RouteRequest::new(Method::GET, "news/10/05/99").with_query(Query::parse("cate=7"));
    let resolved = resolved(router.dispatch(&request));
    assert_eq!(resolved.query.get("cate"), Some("7"));
}

#[test]
fn test_url_map_precedes_rules() {
    let mut builder = Router::builder();
    builder.map("news/1/2/3", "index/news/special?from=map");
    builder.any("news/:a/:b/:c", "News/read").unwrap();
    let router = builder.build();

    let resolved = resolved(router.dispatch(&RouteRequest::new(Method::GET, "/news/1/2/3/")));
    assert_eq!(
        resolved.route,
        Route::new(Some("index"), Some("news"), Some("special"))
    );
    assert_eq!(resolved.query.get("from"), Some("map"));
}

#[test]
fn test_url_map_address_with_trailing_pairs() {
    let mut builder = Router::builder();
    builder.separator('-');
    builder.map("post-5", "blog/post/view/id/5");
    let router = builder.build();

    let resolved = resolved(router.dispatch(&RouteRequest::new(Method::GET, "post-5")));
    assert_eq!(
        resolved.route,
        Route::new(Some("blog"), Some("post"), Some("view"))
    );
    assert_eq!(resolved.query.get("id"), Some("5"));

    let request = RouteRequest::new(Method::GET, "post-5").with_query(Query::parse("id=7"));
    assert_eq!(crate::resolved(router.dispatch(&request)).query.get("id"), Some("7"));
}

#[test]
fn test_url_map_uses_bound_module() {
    let mut builder = Router::builder();
    builder
        .domain("admin", DomainTarget::Module("admin".to_string()))
        .map("users", "user/index/page/2");
    let router = builder.build();

    let request = RouteRequest::new(Method::GET, "users").with_host("admin.example.com");
    let resolved = resolved(router.dispatch(&request));
    assert_eq!(
        resolved.route,
        Route::new(Some("admin"), Some("user"), Some("index"))
    );
    assert_eq!(resolved.query.get("page"), Some("2"));
}

#[test]
fn test_custom_separator() {
    let mut builder = Router::builder();
    builder.separator('-');
    builder.any("item/:id", "Item/show").unwrap();
    let router = builder.build();

    let resolved = resolved(router.dispatch(&RouteRequest::new(Method::GET, "item-8-sort-asc")));
    assert_eq!(resolved.query.get("id"), Some("8"));
    assert_eq!(resolved.query.get("sort"), Some("asc"));
}

#[test]
fn test_group_dispatch() {
    let mut builder = Router::builder();
    builder
        .group(
            "blog",
            [(":id\\d", "Blog/read"), (":name", "Blog/category")],
            "*",
            RuleOption::new(),
        )
        .unwrap();
    let router = builder.build();

    let resolved_id = resolved(router.dispatch(&RouteRequest::new(Method::GET, "blog/5")));
    assert_eq!(resolved_id.route.action.as_deref(), Some("read"));
    assert_eq!(resolved_id.query.get("id"), Some("5"));

    let resolved_name = resolved(router.dispatch(&RouteRequest::new(Method::GET, "blog/rust")));
    assert_eq!(resolved_name.route.action.as_deref(), Some("category"));

    assert!(matches!(
        router.dispatch(&RouteRequest::new(Method::GET, "blogs/5")),
        Ok(MatchResult::NoMatch { .. })
    ));
}

#[test]
fn test_group_with_regex_child() {
    let mut builder = Router::builder();
    builder
        .group(
            "blog",
            [(r"/^(\d+)/", "Blog/read?id=:1"), (":name$", "Blog/category")],
            "*",
            RuleOption::new(),
        )
        .unwrap();
    let router = builder.build();

    let resolved_id = resolved(router.dispatch(&RouteRequest::new(Method::GET, "blog/12/page/3")));
    assert_eq!(resolved_id.route, Route::new(None, Some("Blog"), Some("read")));
    assert_eq!(resolved_id.query.get("id"), Some("12"));
    assert_eq!(resolved_id.query.get("page"), Some("3"));

    let resolved_name = resolved(router.dispatch(&RouteRequest::new(Method::GET, "blog/rust")));
    assert_eq!(resolved_name.route.action.as_deref(), Some("category"));
}

#[test]
fn test_handler_continue_goes_on_to_next_rule() {
    let skip = Handler::new(&["id"], |_| HandlerOutcome::Continue);
    let handled = Handler::new(&["id"], |args| {
        HandlerOutcome::Handled(format!("item {}", args[0].unwrap_or_default()))
    });

    let mut builder = Router::builder();
    builder
        .any("item/:id", skip)
        .unwrap()
        .any("item/:id$", handled)
        .unwrap();
    let router = builder.build();

    assert_eq!(
        router.dispatch(&RouteRequest::new(Method::GET, "item/3")),
        Ok(MatchResult::Handled("item 3".to_string()))
    );
}

#[test]
fn test_option_filters() {
    let mut builder = Router::builder();
    builder
        .register(
            "page/:name",
            "Page/html",
            "*",
            RuleOption::new().extension("html"),
        )
        .unwrap()
        .register(
            "page/:name",
            RouteSpec::from("Page/secure"),
            "GET",
            RuleOption::new().https(true),
        )
        .unwrap()
        .register("page/:name$", "Page/plain", "*", RuleOption::new())
        .unwrap();
    let router = builder.build();

    // The GET rule shadows the any-method rule with the same key.
    let request = RouteRequest::new(Method::GET, "page/about").with_https(true);
    assert_eq!(
        resolved(router.dispatch(&request)).route.action.as_deref(),
        Some("secure")
    );

    let request = RouteRequest::new(Method::POST, "page/about").with_extension("html");
    assert_eq!(
        resolved(router.dispatch(&request)).route.action.as_deref(),
        Some("html")
    );

    let request = RouteRequest::new(Method::GET, "page/about");
    assert_eq!(
        resolved(router.dispatch(&request)).route.action.as_deref(),
        Some("plain")
    );
}

#[test]
fn test_rest_action() {
    let mut builder = Router::builder();
    builder.any("user/:id", "User/[rest]").unwrap();
    let router = builder.build();

    let resolved = resolved(router.dispatch(&RouteRequest::new(Method::PUT, "user/1")));
    assert_eq!(resolved.route.action.as_deref(), Some("PUT"));
}

#[test]
fn test_domain_binds_module() {
    let mut builder = Router::builder();
    builder
        .domain("admin", DomainTarget::Module("admin".to_string()))
        .domain(
            "*",
            DomainTarget::ModuleWithQuery("user".to_string(), "name=*&tab=home".to_string()),
        );
    builder.any("news/:id", "News/read").unwrap();
    let router = builder.build();

    let request = RouteRequest::new(Method::GET, "news/5").with_host("admin.example.com");
    let resolved_admin = resolved(router.dispatch(&request));
    assert_eq!(resolved_admin.route.module.as_deref(), Some("admin"));

    let request = RouteRequest::new(Method::GET, "news/5").with_host("alice.example.com");
    let resolved_user = resolved(router.dispatch(&request));
    assert_eq!(resolved_user.route.module.as_deref(), Some("user"));
    assert_eq!(resolved_user.query.get("name"), Some("alice"));
    assert_eq!(resolved_user.query.get("tab"), Some("home"));

    let request = RouteRequest::new(Method::GET, "post/view").with_host("bob.example.com");
    let Ok(MatchResult::NoMatch { bound_module, .. }) = router.dispatch(&request) else {
        panic!("expected no match");
    };
    assert_eq!(bound_module.as_deref(), Some("user"));
}

#[test]
fn test_domain_query_overrides_request_query() {
    let mut builder = Router::builder();
    builder.domain(
        "*",
        DomainTarget::ModuleWithQuery("user".to_string(), "name=*&lang=en".to_string()),
    );
    builder.any("profile/:tab", "Profile/show?lang=fr").unwrap();
    let router = builder.build();

    let request = RouteRequest::new(Method::GET, "profile/posts")
        .with_host("alice.example.com")
        .with_query(Query::parse("name=mallory&lang=de&page=2"));
    let resolved = resolved(router.dispatch(&request));

    assert_eq!(resolved.route.module.as_deref(), Some("user"));
    assert_eq!(resolved.query.get("name"), Some("alice"));
    assert_eq!(resolved.query.get("lang"), Some("en"));
    assert_eq!(resolved.query.get("page"), Some("2"));
    assert_eq!(resolved.query.get("tab"), Some("posts"));
}

#[test]
fn test_exact_host_beats_wildcards() {
    let mut builder = Router::builder();
    builder
        .domain("api.example.com", DomainTarget::Module("api".to_string()))
        .domain("*", DomainTarget::Module("fallback".to_string()));
    builder.any("ping", "Index/ping").unwrap();
    let router = builder.build();

    let request = RouteRequest::new(Method::GET, "ping").with_host("api.example.com");
    assert_eq!(
        resolved(router.dispatch(&request)).route.module.as_deref(),
        Some("api")
    );

    let request = RouteRequest::new(Method::GET, "ping").with_host("www.example.com");
    assert_eq!(resolved(router.dispatch(&request)).route.module, None);
}

#[test]
fn test_domain_handler() {
    let mut builder = Router::builder();
    builder
        .domain(
            "status",
            DomainTarget::Handler(Handler::new(&[], |_| HandlerOutcome::Handled("ok".into()))),
        )
        .domain(
            "passthrough",
            DomainTarget::Handler(Handler::new(&[], |_| HandlerOutcome::Continue)),
        );
    builder.any("ping", "Index/ping").unwrap();
    let router = builder.build();

    let request = RouteRequest::new(Method::GET, "ping").with_host("status.example.com");
    assert_eq!(
        router.dispatch(&request),
        Ok(MatchResult::Handled("ok".to_string()))
    );

    let request = RouteRequest::new(Method::GET, "ping").with_host("passthrough.example.com");
    assert_eq!(
        resolved(router.dispatch(&request)).route.action.as_deref(),
        Some("ping")
    );
}

#[test]
fn test_deadline_aborts_walk() {
    let mut builder = Router::builder();
    builder.any("never/:id", "Index/never").unwrap();
    let router = builder.build();

    let past = Instant::now() - Duration::from_millis(1);
    let request = RouteRequest::new(Method::GET, "news/1").with_deadline(past);
    assert_eq!(
        router.dispatch(&request),
        Err(DispatchError::DeadlineExceeded)
    );

    let future = Instant::now() + Duration::from_secs(60);
    let request = RouteRequest::new(Method::GET, "never/1").with_deadline(future);
    assert!(router.dispatch(&request).is_ok());
}
