use axum::{
    body::Body,
    http::{self, header, HeaderValue},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::headers;

#[derive(Error, Debug)]
pub(crate) enum ProxyError {
    #[error("no proxy route matches path {0}")]
    RouteNotFound(String),

    #[error("path {0} contains a dot segment")]
    InvalidPath(String),

    #[error("couldn't read client request body")]
    RequestBody(#[source] axum::Error),

    /// Anything that goes wrong between sending the upstream request and
    /// holding its full response body.
    #[error(transparent)]
    Upstream(reqwest::Error),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        // The URL may carry an injected api_key.
        Self::Upstream(err.without_url())
    }
}

impl ProxyError {
    pub(crate) fn status(&self) -> http::StatusCode {
        match self {
            ProxyError::RouteNotFound(_) => http::StatusCode::NOT_FOUND,
            ProxyError::InvalidPath(_) | ProxyError::RequestBody(_) => {
                http::StatusCode::BAD_REQUEST
            }
            ProxyError::Upstream(_) => http::StatusCode::BAD_GATEWAY,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ProxyError::RouteNotFound(_) => "No proxy route",
            ProxyError::InvalidPath(_) => "Invalid request path",
            ProxyError::RequestBody(_) => "Invalid request body",
            ProxyError::Upstream(_) => "Proxy error",
        }
    }

    /// The error and its whole source chain on one line.
    fn details(&self) -> String {
        let mut details = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            details.push_str(": ");
            details.push_str(&err.to_string());
            source = err.source();
        }
        details
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.label(),
            "details": self.details(),
        });

        let mut response = Response::new(Body::from(body.to_string()));
        *response.status_mut() = self.status();
        let response_headers = response.headers_mut();
        response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers::insert_cors(response_headers);
        response
    }
}
