use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiError, Result};
use crate::model::Event;

pub const LOGIN_PATH: &str = "/login";
pub const EVENTS_PATH: &str = "/api/events";

const REALTIME_PARAM: (&str, &str) = ("realtime", "true");
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Receives the login location when the backend rejects the session.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &Url);
}

/// Navigator that only records the redirect in the log.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, location: &Url) {
        warn!(%location, "Session rejected, login required");
    }
}

/// Whether a request asks the backend to bypass its cached event source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Freshness {
    #[default]
    Cached,
    Realtime,
}

#[derive(Clone)]
struct BasicAuth {
    username: String,
    password: String,
}

/// HTTP client for the event backend.
///
/// Session cookies set by the backend are kept and replayed automatically.
/// Cloning is cheap and clones share the cookie store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<BasicAuth>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::network(e.to_string()))?;
        Self::with_http_client(base_url, http)
    }

    pub fn with_http_client(base_url: &str, http: reqwest::Client) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)?;
        Ok(Self {
            http,
            base_url,
            auth: None,
            navigator: Arc::new(LogNavigator),
        })
    }

    /// Attach Basic credentials; the backend answers them with a session cookie.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!("{}{LOGIN_PATH}", self.base_url))?)
    }

    /// Absolute URL for `path` with `params` appended in order.
    pub fn endpoint(&self, path: &str, params: &[(&str, String)], freshness: Freshness) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        if !params.is_empty() || freshness == Freshness::Realtime {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            if freshness == Freshness::Realtime {
                pairs.append_pair(REALTIME_PARAM.0, REALTIME_PARAM.1);
            }
        }
        Ok(url)
    }

    /// GET `path` and return the JSON body verbatim.
    pub async fn call(&self, path: &str, params: &[(&str, String)], freshness: Freshness) -> Result<Value> {
        let url = self.endpoint(path, params, freshness)?;
        self.get(url).await
    }

    /// GET `path` and decode the body into `T`.
    pub async fn get_json<T>(&self, path: &str, params: &[(&str, String)], freshness: Freshness) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self.call(path, params, freshness).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get_event(&self, id: &str) -> Result<Event> {
        let mut url = self.endpoint(EVENTS_PATH, &[], Freshness::Cached)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .push(id);
        let value = self.get(url).await?;
        Ok(Event::from_value(value))
    }

    /// Stream the body of `path` into `writer` and return the byte count.
    ///
    /// This is a plain download: a non-success status is reported with its raw
    /// body and no JSON error handling or login redirect takes place.
    pub async fn download<W>(&self, path: &str, params: &[(&str, String)], writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let url = self.endpoint(path, params, Freshness::Cached)?;
        debug!(%url, "Downloading");
        let mut resp = self.request(url).send().await.map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::http(status.as_u16(), body));
        }

        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await.map_err(network_error)? {
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| ApiError::Io(e.to_string()))?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(|e| ApiError::Io(e.to_string()))?;
        Ok(written)
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let req = self.http.get(url);
        match &self.auth {
            Some(auth) => req.basic_auth(&auth.username, Some(&auth.password)),
            None => req,
        }
    }

    async fn get(&self, url: Url) -> Result<Value> {
        debug!(%url, "GET");
        let resp = self
            .request(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(network_error)?;
        self.handle_response(resp).await
    }

    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            self.redirect_to_login();
            return Err(ApiError::AuthRequired);
        }

        let body = resp.text().await.map_err(network_error)?;
        if !status.is_success() {
            let err = error_from_body(status.as_u16(), body);
            warn!(status = status.as_u16(), error = %err, "API call failed");
            return Err(err);
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        if let Some(message) = error_field(&value) {
            return Err(ApiError::backend(status.as_u16(), message));
        }
        Ok(value)
    }

    fn redirect_to_login(&self) {
        match self.login_url() {
            Ok(location) => self.navigator.navigate(&location),
            Err(e) => warn!(error = %e, "Cannot build login URL"),
        }
    }
}

fn network_error(e: reqwest::Error) -> ApiError {
    warn!(error = %e, "API call error");
    ApiError::network(e.to_string())
}

fn error_field(value: &Value) -> Option<&str> {
    value
        .get("error")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
}

/// Error for a non-success response that is not a 401.
fn error_from_body(status: u16, body: String) -> ApiError {
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => {
            let message = error_field(&json)
                .map(str::to_owned)
                .unwrap_or_else(|| format!("HTTP {status}"));
            ApiError::backend(status, message)
        }
        Err(_) => ApiError::http(status, body),
    }
}
