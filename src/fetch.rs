//! HTTP request builder producing uniform [`ApiResponse`] values

use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder,
};
use serde::Serialize;
use url::Url;

use crate::api::{ApiFailure, ApiResponse};
use crate::error::Error;

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, url: Url, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            client,
            url,
            method,
            headers,
            body: None,
        }
    }

    /// Add bearer token authentication to the request
    pub fn bearer_auth(mut self, token: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            self.headers.insert(AUTHORIZATION, value);
        }
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(json);
        Ok(self)
    }

    fn build(self) -> RequestBuilder {
        let mut req = self.client.request(self.method, self.url).headers(self.headers);
        if let Some(body) = self.body {
            req = req.body(body);
        }
        req
    }

    /// Execute the request.
    ///
    /// Never fails: HTTP errors and network errors are both folded into
    /// [`ApiResponse::Failure`], the latter with status 0.
    pub async fn execute(self) -> ApiResponse {
        let label = format!("{} {}", self.method, self.url.path());
        let response = match self.build().send().await {
            Ok(response) => response,
            Err(err) => {
                debug!("{} -> network error: {}", label, err);
                return ApiResponse::Failure(ApiFailure::transport(err));
            }
        };

        let status = response.status();
        let raw = match response.text().await {
            Ok(raw) => raw,
            Err(err) => {
                debug!("{} -> body read error: {}", label, err);
                return ApiResponse::Failure(ApiFailure::transport(err));
            }
        };
        debug!("{} -> {}", label, status.as_u16());

        if status.is_success() {
            ApiResponse::from_body(&raw)
        } else {
            ApiResponse::from_error_body(status.as_u16(), &raw, status.canonical_reason())
        }
    }
}
