use crate::metrics::consts::*;
use std::time::Instant;

use axum::{body::HttpBody, extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};

pub(crate) async fn metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();

    // The request body hasn't been read yet; its size is only known when the
    // client sent a Content-Length.
    if let Some(request_size) = request.body().size_hint().exact() {
        histogram!(HTTP_REQUEST_SIZE_BYTES).record(request_size as f64);
    }

    let response = next.run(request).await;

    if let Some(response_size) = response.body().size_hint().exact() {
        histogram!(HTTP_RESPONSE_SIZE_BYTES).record(response_size as f64);
    }

    // This could be the upstream or the proxy itself.
    if response.status().is_server_error() {
        counter!(PROXY_HTTP_SERVER_ERROR).increment(1)
    }

    if response.status().is_success() {
        counter!(HTTP_RESPONSE_SUCCESS).increment(1)
    } else {
        counter!(HTTP_RESPONSE_FAILURE).increment(1)
    }

    histogram!(HTTP_REQUEST_DURATION_SECS).record(start.elapsed().as_secs_f64());

    response
}
