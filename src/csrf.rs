use axum::{
    http::{
        header::{HOST, ORIGIN},
        Method, Request, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::errors::RequestError;

/// Rejects state-changing requests whose `Origin` names another site.
/// Requests without an `Origin` header pass; the `SameSite=Lax` session
/// cookie already keeps cross-site form posts anonymous.
pub async fn csrf_guard<B>(req: Request<B>, next: Next<B>) -> Response {
    if is_safe_method(req.method()) {
        return next.run(req).await;
    }

    let origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok());
    let host = req.headers().get(HOST).and_then(|value| value.to_str().ok());

    if let Some(origin) = origin {
        if !same_origin(origin, host) {
            warn!(origin, host, path = %req.uri().path(), "Cross-origin form submission rejected");
            return RequestError::Forbidden.into_response();
        }
    }

    next.run(req).await
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn same_origin(origin: &str, host: Option<&str>) -> bool {
    let host = match host {
        Some(host) => host,
        None => return false,
    };
    match origin.parse::<Uri>() {
        Ok(uri) => uri
            .authority()
            .map_or(false, |authority| authority.as_str().eq_ignore_ascii_case(host)),
        Err(_) => false,
    }
}
