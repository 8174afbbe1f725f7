use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::Instrument;

use crate::context::RequestId;
use crate::i18n::Localizer;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Default, Deserialize)]
struct LngQuery {
    lng: Option<String>,
}

/// Negotiate the request locale and attach it as an extension.
pub async fn locale_middleware(
    State(localizer): State<Arc<Localizer>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let lng = Query::<LngQuery>::try_from_uri(req.uri())
        .map(|Query(q)| q.lng)
        .unwrap_or_default();
    let accept = req
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());

    let locale = localizer.negotiate(lng.as_deref(), accept);
    req.extensions_mut().insert(locale);

    next.run(req).await
}

/// Tag every request with an id, run it inside a span carrying that id and
/// echo the id back in the response headers.
///
/// A well-formed incoming `x-request-id` is reused.
pub async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::parse)
        .unwrap_or_else(RequestId::new);
    req.extensions_mut().insert(request_id);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut res = async move {
        let res = next.run(req).await;
        tracing::info!(status = res.status().as_u16(), "request completed");
        res
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}
