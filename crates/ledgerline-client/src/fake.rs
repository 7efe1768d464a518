use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{ApiRequest, LedgerBackend, Method};
use crate::error::ActionError;

enum Reply {
    Json(Value),
    Status(u16, Option<String>),
}

/// Scripted backend that records every request it receives.
#[derive(Default)]
pub(crate) struct FakeBackend {
    replies: Mutex<HashMap<(Method, String), Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, method: Method, path: &str, body: Value) {
        self.replies
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Reply::Json(body));
    }

    pub(crate) fn fail(&self, method: Method, path: &str, status: u16, message: Option<&str>) {
        self.replies.lock().unwrap().insert(
            (method, path.to_string()),
            Reply::Status(status, message.map(str::to_string)),
        );
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub(crate) fn last_body(&self, method: Method, path: &str) -> Option<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|request| request.method == method && request.path == path)
            .and_then(|request| request.body.clone())
    }
}

#[async_trait]
impl LedgerBackend for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<Value, ActionError> {
        let key = (request.method, request.path.clone());
        self.requests.lock().unwrap().push(request);

        match self.replies.lock().unwrap().get(&key) {
            Some(Reply::Json(body)) => Ok(body.clone()),
            Some(Reply::Status(status, message)) => Err(ActionError::Http {
                status: *status,
                message: message.clone(),
            }),
            None => Err(ActionError::Http {
                status: 404,
                message: Some(format!("no reply scripted for {:?} {}", key.0, key.1)),
            }),
        }
    }
}
