use super::errors::ProxyError;
use super::forward::{self, InboundRequest};
use super::state::ProxyState;
use crate::metrics::consts as crate_metrics;

use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
};
use tracing::instrument;

fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[instrument(skip_all, err, level = tracing::Level::DEBUG, fields(request_id=uuid()))]
pub async fn proxy(
    State(state): State<ProxyState>,
    client_request: Request<Body>,
) -> Result<Response, ProxyError> {
    tracing::debug!(?client_request);

    let (client_request_parts, client_request_body) = client_request.into_parts();
    let Some((route, relative_path)) = state.route(client_request_parts.uri.path()) else {
        metrics::counter!(crate_metrics::PROXY_ROUTE_NOT_FOUND).increment(1);
        return Err(ProxyError::RouteNotFound(
            client_request_parts.uri.path().to_string(),
        ));
    };

    if forward::has_dot_segment(relative_path) {
        return Err(ProxyError::InvalidPath(
            client_request_parts.uri.path().to_string(),
        ));
    }

    let client_request_body_bytes =
        axum::body::to_bytes(client_request_body, state.max_body_bytes)
            .await
            .map_err(ProxyError::RequestBody)?;

    let inbound_request = InboundRequest {
        method: client_request_parts.method,
        uri: client_request_parts.uri.clone(),
        headers: client_request_parts.headers,
        body: client_request_body_bytes,
    };

    Ok(forward::handle(&state.http_client, route, relative_path, inbound_request).await)
}
