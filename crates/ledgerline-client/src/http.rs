use async_trait::async_trait;
use ledgerline_platform::{ApiErrorBody, ClientConfig};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::backend::{ApiRequest, LedgerBackend, Method};
use crate::error::ActionError;

/// [`LedgerBackend`] over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ActionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ActionError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl LedgerBackend for HttpBackend {
    async fn send(&self, request: ApiRequest) -> Result<Value, ActionError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        debug!("{method} {}", request.path);

        let mut builder = self.client.request(method, self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ActionError::Transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ActionError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
                .ok()
                .and_then(|body| body.text().map(str::to_string));
            return Err(ActionError::Http {
                status: status.as_u16(),
                message,
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}
