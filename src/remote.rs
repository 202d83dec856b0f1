use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::Config;
use crate::errors::{truncate_chars, RelayError};
use crate::mcp::rpc::{normalize_response, request_id, unwrap_envelope};

/// How much of a failed response body goes into the diagnostic log line.
const LOGGED_BODY_LIMIT: usize = 200;

#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Relays one request and always yields a JSON-RPC response, mapping
    /// transport failures to error objects.
    async fn forward(&self, request: &Value) -> Value;
}

#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    endpoint_url: String,
    server_url: String,
    authorization: String,
}

impl HttpRemote {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url(),
            server_url: config.server_url.clone(),
            authorization: config.authorization_header(),
        })
    }

    async fn send(&self, request: &Value, id: Option<&Value>) -> Result<Value, RelayError> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .header(header::AUTHORIZATION, &self.authorization)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| self.classify_error(err))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .map_err(|err| self.classify_error(err))?;
            error!(
                status = status.as_u16(),
                body = %truncate_chars(&body, LOGGED_BODY_LIMIT),
                "remote returned non-success status"
            );
            return Err(RelayError::http_status(status.as_u16(), &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| self.classify_error(err))?;
        Ok(normalize_response(unwrap_envelope(body), id))
    }

    fn classify_error(&self, err: reqwest::Error) -> RelayError {
        if err.is_timeout() {
            error!(url = %self.endpoint_url, "request timed out");
            RelayError::Timeout
        } else if err.is_connect() {
            error!(url = %self.server_url, error = %err, "cannot connect to remote");
            RelayError::ConnectionFailed {
                target: self.server_url.clone(),
            }
        } else {
            error!(error = %err, "request failed");
            RelayError::internal(err.to_string())
        }
    }
}

#[async_trait]
impl RemoteEndpoint for HttpRemote {
    async fn forward(&self, request: &Value) -> Value {
        let id = request_id(request);
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let shown_id = id.clone().unwrap_or(Value::Null);
        debug!(method, id = %shown_id, ">> forwarding request");

        match self.send(request, id.as_ref()).await {
            Ok(response) => response,
            Err(err) => err.into_json_rpc(id),
        }
    }
}
