use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Recomputed by the upstream client for every hop, never copied from the caller.
pub(crate) const HOP_BY_HOP_REQUEST_HEADERS: [HeaderName; 3] =
    [header::HOST, header::CONNECTION, header::CONTENT_LENGTH];

pub(crate) const CORS_ALLOW_ORIGIN: &str = "*";
pub(crate) const CORS_ALLOW_CREDENTIALS: &str = "true";

/// Copies the caller's headers minus the hop-by-hop ones. `HeaderMap` keys are
/// lowercase, so removal is case-insensitive.
pub(crate) fn forwardable(client_headers: &HeaderMap) -> HeaderMap {
    let mut headers = client_headers.clone();
    for name in HOP_BY_HOP_REQUEST_HEADERS {
        headers.remove(name);
    }
    headers
}

/// Overwrites whatever CORS values the upstream sent.
pub(crate) fn insert_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static(CORS_ALLOW_CREDENTIALS),
    );
}
