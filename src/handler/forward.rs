use super::errors::ProxyError;
use super::headers;
use crate::config::ProxyConfig;
use crate::metrics::consts as crate_metrics;

use axum::{
    body::{Body, Bytes},
    http::{self, HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::instrument;
use url::form_urlencoded;

/// The caller's request with its body already buffered.
#[derive(Debug)]
pub(crate) struct InboundRequest {
    pub(crate) method: http::Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

#[derive(Debug)]
pub(crate) struct UpstreamRequest {
    pub(crate) method: http::Method,
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Bytes>,
}

impl UpstreamRequest {
    pub(crate) fn new(
        config: &ProxyConfig,
        relative_path: &str,
        request: InboundRequest,
    ) -> Self {
        let mut url = format!("{}/{relative_path}", config.upstream_base_url);
        if let Some(query) = merge_query(request.uri.query(), &config.injected_query_params) {
            url.push('?');
            url.push_str(&query);
        }

        let body = match request.method {
            http::Method::GET | http::Method::HEAD => None,
            _ => Some(request.body),
        };

        UpstreamRequest {
            method: request.method,
            url,
            headers: headers::forwardable(&request.headers),
            body,
        }
    }
}

/// True when a `/` or `\` separated segment is `.` or `..`, raw or
/// percent-encoded. reqwest's URL parsing would resolve it against the
/// upstream base path.
pub(crate) fn has_dot_segment(relative_path: &str) -> bool {
    relative_path.split(['/', '\\']).any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    })
}

/// Keeps the caller's query byte-for-byte and appends each injected pair whose
/// key the caller didn't send.
pub(crate) fn merge_query(query: Option<&str>, injected: &[(String, String)]) -> Option<String> {
    let mut merged = query.filter(|query| !query.is_empty()).map(str::to_string);
    for (key, value) in injected {
        let present = merged.as_deref().is_some_and(|query| {
            form_urlencoded::parse(query.as_bytes()).any(|(name, _)| name == key.as_str())
        });
        if present {
            continue;
        }
        let pair = form_urlencoded::Serializer::new(String::new())
            .append_pair(key, value)
            .finish();
        merged = Some(match merged {
            Some(query) => format!("{query}&{pair}"),
            None => pair,
        });
    }
    merged
}

/// Forwards one request to the route's upstream and relays the answer.
/// Every failure comes back as a response.
pub(crate) async fn handle(
    http_client: &reqwest::Client,
    config: &ProxyConfig,
    relative_path: &str,
    request: InboundRequest,
) -> Response {
    forward(http_client, config, relative_path, request)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

#[instrument(skip_all, err, level = tracing::Level::DEBUG, fields(route = config.name))]
async fn forward(
    http_client: &reqwest::Client,
    config: &ProxyConfig,
    relative_path: &str,
    request: InboundRequest,
) -> Result<Response, ProxyError> {
    let client_method = request.method.clone();
    let client_path_and_query = request
        .uri
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_default();

    let UpstreamRequest {
        method,
        url,
        headers: upstream_request_headers,
        body,
    } = UpstreamRequest::new(config, relative_path, request);

    tracing::debug!(?upstream_request_headers);

    let mut upstream_request = http_client
        .request(method, url)
        .headers(upstream_request_headers);
    if let Some(body) = body {
        upstream_request = upstream_request.body(body);
    }

    let reqwest_start = Instant::now();
    let upstream_response = upstream_request
        .send()
        .await
        .inspect_err(|_| transport_error(config))?;
    let upstream_response_status = upstream_response.status();
    let mut upstream_response_headers = upstream_response.headers().clone();
    let upstream_response_body = upstream_response
        .bytes()
        .await
        .inspect_err(|_| transport_error(config))?;

    metrics::histogram!(
        crate_metrics::UPSTREAM_REQUEST_DURATION_SECS,
        crate_metrics::ROUTE_LABEL => config.name
    )
    .record(reqwest_start.elapsed().as_secs_f64());

    tracing::info!(
        route = config.name,
        %upstream_response_status,
        %client_method,
        client_path_and_query,
    );

    headers::insert_cors(&mut upstream_response_headers);

    let mut response = Response::new(Body::from(upstream_response_body));
    *response.status_mut() = upstream_response_status;
    *response.headers_mut() = upstream_response_headers;
    Ok(response)
}

fn transport_error(config: &ProxyConfig) {
    metrics::counter!(
        crate_metrics::UPSTREAM_TRANSPORT_ERROR,
        crate_metrics::ROUTE_LABEL => config.name
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::http::{header, HeaderValue};

    fn serpapi() -> ProxyConfig {
        ProxyConfig {
            name: "serpapi",
            route_prefix: "/serpapi/",
            upstream_base_url: "https://serpapi.com".to_string(),
            injected_query_params: vec![("api_key".to_string(), "secret123".to_string())],
        }
    }

    fn api() -> ProxyConfig {
        ProxyConfig {
            name: "api",
            route_prefix: "/api/",
            upstream_base_url: "https://gateway.example".to_string(),
            injected_query_params: vec![],
        }
    }

    fn inbound(method: http::Method, uri: &str, body: &'static [u8]) -> Result<InboundRequest> {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("trip.example"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("21"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer T"));
        Ok(InboundRequest {
            method,
            uri: uri.parse()?,
            headers,
            body: Bytes::from_static(body),
        })
    }

    #[test]
    fn injects_key_when_absent() {
        assert_eq!(
            merge_query(Some("q=test"), &serpapi().injected_query_params).as_deref(),
            Some("q=test&api_key=secret123")
        );
        assert_eq!(
            merge_query(None, &serpapi().injected_query_params).as_deref(),
            Some("api_key=secret123")
        );
        assert_eq!(
            merge_query(Some(""), &serpapi().injected_query_params).as_deref(),
            Some("api_key=secret123")
        );
    }

    #[test]
    fn never_overwrites_caller_key() {
        assert_eq!(
            merge_query(Some("api_key=mine&q=test"), &serpapi().injected_query_params).as_deref(),
            Some("api_key=mine&q=test")
        );
        assert_eq!(
            merge_query(Some("q=test&api_key="), &serpapi().injected_query_params).as_deref(),
            Some("q=test&api_key=")
        );
    }

    #[test]
    fn keeps_original_query_verbatim() {
        let query = "text=caf%C3%A9+paris&tags=a&tags=b&flag";
        assert_eq!(merge_query(Some(query), &[]).as_deref(), Some(query));
        assert_eq!(
            merge_query(Some(query), &serpapi().injected_query_params).as_deref(),
            Some("text=caf%C3%A9+paris&tags=a&tags=b&flag&api_key=secret123")
        );
        assert_eq!(merge_query(None, &[]), None);
    }

    #[test]
    fn injected_values_are_form_encoded() {
        let injected = vec![("api_key".to_string(), "a b&c".to_string())];
        assert_eq!(
            merge_query(None, &injected).as_deref(),
            Some("api_key=a+b%26c")
        );
    }

    #[test]
    fn detects_dot_segments() {
        for path in [
            "..",
            "../admin",
            "a/../b",
            "a/./b",
            "a/..",
            "%2e%2e/admin",
            "%2E./x",
            ".%2e",
            "a\\..\\b",
        ] {
            assert!(has_dot_segment(path), "{path}");
        }
        for path in ["", "prod/trip/init", "a..b/c", "...", ".well-known/x", "file.json"] {
            assert!(!has_dot_segment(path), "{path}");
        }
    }

    #[test]
    fn builds_upstream_url_from_relative_path() -> Result<()> {
        let request = UpstreamRequest::new(
            &api(),
            "prod/trip/init",
            inbound(http::Method::POST, "/api/prod/trip/init?draft=1", b"{\"startLocation\":\"X\"}")?,
        );

        assert_eq!(request.method, http::Method::POST);
        assert_eq!(request.url, "https://gateway.example/prod/trip/init?draft=1");
        assert_eq!(request.body.as_deref(), Some(&b"{\"startLocation\":\"X\"}"[..]));
        assert!(!request.headers.contains_key(header::HOST));
        assert!(!request.headers.contains_key(header::CONTENT_LENGTH));
        assert_eq!(request.headers[header::AUTHORIZATION], "Bearer T");
        Ok(())
    }

    #[test]
    fn serpapi_url_carries_key() -> Result<()> {
        let request = UpstreamRequest::new(
            &serpapi(),
            "search",
            inbound(http::Method::GET, "/serpapi/search?q=test", b"")?,
        );
        assert_eq!(request.url, "https://serpapi.com/search?q=test&api_key=secret123");
        Ok(())
    }

    #[test]
    fn get_and_head_drop_the_body() -> Result<()> {
        for method in [http::Method::GET, http::Method::HEAD] {
            let request = UpstreamRequest::new(&api(), "x", inbound(method, "/api/x", b"ignored")?);
            assert_eq!(request.body, None);
        }
        for method in [http::Method::PUT, http::Method::PATCH, http::Method::DELETE, http::Method::OPTIONS] {
            let request = UpstreamRequest::new(&api(), "x", inbound(method, "/api/x", b"kept")?);
            assert_eq!(request.body.as_deref(), Some(&b"kept"[..]));
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_bad_gateway() -> Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let closed_addr = listener.local_addr()?;
        drop(listener);

        let config = ProxyConfig {
            upstream_base_url: format!("http://{closed_addr}"),
            ..serpapi()
        };
        let response = handle(
            &reqwest::Client::new(),
            &config,
            "search",
            inbound(http::Method::GET, "/serpapi/search?q=test", b"")?,
        )
        .await;

        assert_eq!(response.status(), http::StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["error"], "Proxy error");
        assert!(!body["details"].as_str().unwrap_or_default().contains("secret123"));
        Ok(())
    }
}
