//! qTrade REST API client.

use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::auth::Credentials;
use super::types::{Envelope, ErrorBody};
use crate::error::ExchangeError;

/// Production API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.qtrade.io";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking qTrade REST client. Signs requests when credentials are set.
pub struct QtradeClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl QtradeClient {
    /// Client for authenticated endpoints.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, ExchangeError> {
        Self::build(base_url, Some(credentials))
    }

    /// Client for public endpoints only.
    pub fn public(base_url: &str) -> Result<Self, ExchangeError> {
        Self::build(base_url, None)
    }

    fn build(base_url: &str, credentials: Option<Credentials>) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Connection(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// GET `path` with optional query parameters, unwrapping the `data` envelope.
    pub fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{}{path}", self.base_url);
        let request = self.client.get(&url).query(query);
        let request = self.sign(request, "GET", path, None)?;
        debug!("GET {path} {query:?}");
        let resp = request
            .send()
            .map_err(|e| ExchangeError::Connection(format!("GET {path} failed: {e}")))?;
        Self::unwrap_envelope(path, resp)
    }

    /// POST a JSON body to `path`, unwrapping the `data` envelope.
    pub fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ExchangeError> {
        let body = serde_json::to_string(body)
            .map_err(|e| ExchangeError::Other(format!("failed to encode {path} body: {e}")))?;
        let url = format!("{}{path}", self.base_url);
        let request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body.clone());
        let request = self.sign(request, "POST", path, Some(&body))?;
        debug!("POST {path} {body}");
        let resp = request
            .send()
            .map_err(|e| ExchangeError::Connection(format!("POST {path} failed: {e}")))?;
        Self::unwrap_envelope(path, resp)
    }

    /// POST where the response carries no data worth parsing.
    pub fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ExchangeError> {
        self.post::<B, serde_json::Value>(path, body).map(|_| ())
    }

    fn sign(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<RequestBuilder, ExchangeError> {
        let Some(creds) = &self.credentials else {
            return Ok(request);
        };
        let timestamp = chrono::Utc::now().timestamp();
        let signature = creds.sign(method, path, timestamp, body);
        Ok(request
            .header("Authorization", creds.authorization(&signature))
            .header("HMAC-Timestamp", timestamp.to_string()))
    }

    fn unwrap_envelope<T: DeserializeOwned>(
        path: &str,
        resp: Response,
    ) -> Result<T, ExchangeError> {
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| ExchangeError::Connection(format!("{path}: failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }

        serde_json::from_str::<Envelope<T>>(&text)
            .map(|env| env.data)
            .map_err(|e| ExchangeError::Parse(format!("{path}: {e}")))
    }
}

/// Map a non-success response to an error, keeping the API's error codes.
pub fn api_error(status: u16, body: &str) -> ExchangeError {
    if status == 401 || status == 403 {
        return ExchangeError::Auth(format!("{status}: {body}"));
    }
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.errors.is_empty() {
        body.to_string()
    } else {
        parsed
            .errors
            .iter()
            .map(|e| {
                if e.title.is_empty() {
                    e.code.clone()
                } else {
                    format!("{}: {}", e.code, e.title)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    };
    ExchangeError::Api {
        code: status,
        message,
    }
}
