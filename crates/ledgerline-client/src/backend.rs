use async_trait::async_trait;
use serde_json::Value;

use crate::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>, query: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query,
            body: None,
        }
    }

    pub fn with_body(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }
}

/// The REST collaborator. Implementations return the decoded JSON body of a
/// 2xx response and map everything else to [`ActionError`].
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ActionError>;
}
