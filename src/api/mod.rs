//! Low-level access to the CloudPOS HTTP API

mod response;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

use crate::auth::SessionStore;
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::fetch::FetchBuilder;

pub use response::*;

/// Transport used by the services.
///
/// Implementations never return `Err` for HTTP or network failures; those
/// come back as [`ApiResponse::Failure`]. `Err` is reserved for misuse such
/// as an unusable path or an unserializable body.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Perform one request, attaching the session token when there is one
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<ApiResponse>;

    /// Reach the API root. `Ok` as soon as any HTTP response arrives.
    async fn ping(&self) -> Result<()>;

    async fn get_json(&self, path: &str) -> Result<ApiResponse> {
        self.request(Method::GET, path, None).await
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn put_json(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.request(Method::PUT, path, Some(body)).await
    }

    async fn delete_json(&self, path: &str) -> Result<ApiResponse> {
        self.request(Method::DELETE, path, None).await
    }
}

/// HTTP client for the CloudPOS API
#[derive(Clone)]
pub struct ApiClient {
    /// Base URL, without trailing slash
    base_url: String,

    /// HTTP client used for requests
    http_client: Client,

    /// Tokens shared with [`crate::auth::Auth`]
    session: SessionStore,
}

impl ApiClient {
    /// Create a client with a fresh, empty session
    pub fn new(options: &ClientOptions) -> Result<Self> {
        Self::with_session(options, SessionStore::default())
    }

    /// Create a client sharing an existing session
    pub fn with_session(options: &ClientOptions, session: SessionStore) -> Result<Self> {
        let base_url = options.base_url.trim_end_matches('/').to_string();
        // Reject unusable base URLs up front rather than on the first request.
        Url::parse(&base_url)?;

        let http_client = Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            base_url,
            http_client,
            session,
        })
    }

    /// The API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session whose token is attached to requests
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Ok(Url::parse(&url)?)
    }

    /// Perform a request with an explicit bearer token instead of the session token
    pub async fn request_with_token(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<ApiResponse> {
        let mut fetch = FetchBuilder::new(&self.http_client, self.url(path)?, method);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            fetch = fetch.bearer_auth(token);
        }
        if let Some(body) = body {
            fetch = fetch.json(body)?;
        }
        Ok(fetch.execute().await)
    }
}

#[async_trait]
impl ApiTransport for ApiClient {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<ApiResponse> {
        let token = self.session.access_token();
        self.request_with_token(method, path, body.as_ref(), token.as_deref())
            .await
    }

    async fn ping(&self) -> Result<()> {
        match self.request_with_token(Method::GET, "/", None, None).await? {
            ApiResponse::Failure(failure) if failure.status == 0 => {
                Err(Error::api(0, failure.message()))
            }
            _ => Ok(()),
        }
    }
}
