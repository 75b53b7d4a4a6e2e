use crate::errors::DispatcherError;
use crate::metrics_defs::{
    DISPATCH_DURATION, DISPATCH_HANDLED, DISPATCH_NO_MATCH, DISPATCH_REDIRECT, DISPATCH_RESOLVED,
};
use http::uri::Authority;
use http::{HeaderValue, header};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use routing::{
    DispatchError, MatchResult, Query, Redirect, ResolvedRoute, RouteRequest, RouterHandle,
    decompose,
};
use serde::{Serialize, Serializer};
use shared::http::{full_body, make_error_response};
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

type DispatchResponse = Response<BoxBody<Bytes, DispatcherError>>;

/// Resolves every request against the current router snapshot and reports
/// the outcome.
pub struct DispatcherService {
    router: Arc<RouterHandle>,
    timeout: Option<Duration>,
}

impl DispatcherService {
    pub fn new(router: Arc<RouterHandle>, timeout: Option<Duration>) -> Self {
        Self { router, timeout }
    }

    fn respond<B>(&self, req: &Request<B>) -> DispatchResponse {
        let started = Instant::now();
        let request = route_request(req, self.timeout.map(|timeout| started + timeout));
        let router = self.router.load();

        let (outcome, response) = match router.dispatch(&request) {
            Ok(MatchResult::Resolved(resolved)) => {
                counter!(DISPATCH_RESOLVED, "source" => "rule").increment(1);
                ("resolved", route_response(&resolved))
            }
            Ok(MatchResult::Redirect(redirect)) => {
                counter!(DISPATCH_REDIRECT, "status" => redirect.status.to_string()).increment(1);
                ("redirect", redirect_response(&redirect))
            }
            Ok(MatchResult::Handled(body)) => {
                counter!(DISPATCH_HANDLED).increment(1);
                ("handled", text_response(body))
            }
            Ok(MatchResult::NoMatch {
                bound_module,
                query,
            }) => {
                let path = router.normalize(&request.path);
                tracing::warn!(
                    method = %request.method,
                    path = %path,
                    "No rule matched, using default decomposition"
                );
                counter!(DISPATCH_NO_MATCH).increment(1);
                counter!(DISPATCH_RESOLVED, "source" => "default").increment(1);
                let resolved = decompose(&path, bound_module.as_deref(), &query);
                ("no_match", route_response(&resolved))
            }
            Err(DispatchError::DeadlineExceeded) => {
                tracing::warn!(path = %request.path, "Dispatch deadline exceeded");
                (
                    "deadline_exceeded",
                    make_error_response(StatusCode::SERVICE_UNAVAILABLE),
                )
            }
        };

        histogram!(DISPATCH_DURATION, "outcome" => outcome).record(started.elapsed().as_secs_f64());
        response
    }
}

impl Service<Request<Incoming>> for DispatcherService {
    type Response = DispatchResponse;
    type Error = DispatcherError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        // Dispatch never blocks, so it runs before the future is created.
        let response = self.respond(&req);
        Box::pin(async move { Ok(response) })
    }
}

/// Extracts the routing view of an HTTP request.
fn route_request<B>(req: &Request<B>, deadline: Option<Instant>) -> RouteRequest {
    let uri = req.uri();
    let (path, extension) = split_extension(uri.path());

    let mut request = RouteRequest::new(req.method().clone(), path)
        .with_query(uri.query().map(Query::parse).unwrap_or_default())
        .with_https(is_https(req));

    if let Some(host) = request_host(req) {
        request = request.with_host(host);
    }
    if let Some(extension) = extension {
        request = request.with_extension(extension);
    }
    if let Some(deadline) = deadline {
        request = request.with_deadline(deadline);
    }
    request
}

/// Host from the `Host` header or the URI authority, without the port.
fn request_host<B>(req: &Request<B>) -> Option<String> {
    let authority = match req.headers().get(header::HOST) {
        Some(host) => host.to_str().ok()?.parse::<Authority>().ok()?,
        None => req.uri().authority()?.clone(),
    };
    Some(authority.host().to_ascii_lowercase())
}

fn is_https<B>(req: &Request<B>) -> bool {
    match req.headers().get("x-forwarded-proto") {
        Some(proto) => proto.as_bytes().eq_ignore_ascii_case(b"https"),
        None => req.uri().scheme_str() == Some("https"),
    }
}

/// Splits a pseudo-static suffix off the last path segment:
/// `news/read.html` becomes `news/read` and `html`.
fn split_extension(path: &str) -> (&str, Option<String>) {
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            let cut = path.len() - extension.len() - 1;
            (&path[..cut], Some(extension.to_ascii_lowercase()))
        }
        _ => (path, None),
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    code: u16,
    msg: &'a str,
    data: RouteData<'a>,
}

#[derive(Serialize)]
struct RouteData<'a> {
    module: Option<&'a str>,
    controller: Option<&'a str>,
    action: Option<&'a str>,
    #[serde(serialize_with = "serialize_query")]
    query: &'a Query,
}

/// Keeps the parameter order of the query in the JSON object.
fn serialize_query<S: Serializer>(query: &&Query, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(query.iter())
}

fn route_response(resolved: &ResolvedRoute) -> DispatchResponse {
    let envelope = Envelope {
        code: 0,
        msg: "ok",
        data: RouteData {
            module: resolved.route.module.as_deref(),
            controller: resolved.route.controller.as_deref(),
            action: resolved.route.action.as_deref(),
            query: &resolved.query,
        },
    };

    match serde_json::to_vec(&envelope) {
        Ok(body) => {
            let mut response = Response::new(full_body(body));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize route");
            make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn redirect_response(redirect: &Redirect) -> DispatchResponse {
    let response = Response::builder()
        .status(redirect.status)
        .header(header::LOCATION, redirect.location.as_str())
        .body(full_body(Bytes::new()));

    match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(location = %redirect.location, error = %e, "Invalid redirect");
            make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn text_response(body: String) -> DispatchResponse {
    let mut response = Response::new(full_body(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
