use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use auto_check::{FormData, Transport, TransportError};

/// A request seen by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub url: String,
    pub body: FormData,
}

impl RecordedRequest {
    pub fn value(&self) -> Option<&str> {
        self.body.get("value")
    }
}

/// What the next request receives.
#[derive(Clone, Debug)]
pub enum Reply {
    Respond(Result<String, TransportError>),
    /// Never settle; the request only ends when aborted.
    Stall,
}

/// Mock transport answering requests from a script, in order.
///
/// Requests beyond the script receive an empty 200.
pub struct ScriptedTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    script: Mutex<VecDeque<Reply>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn respond_ok(&self, body: &str) {
        self.push(Reply::Respond(Ok(body.to_string())));
    }

    pub fn respond_status(&self, status: u16, body: &str, content_type: &str) {
        self.push(Reply::Respond(Err(TransportError::status(
            status,
            body,
            content_type,
        ))));
    }

    pub fn stall(&self) {
        self.push(Reply::Stall);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, url: &str, body: &FormData) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            body: body.clone(),
        });

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Respond(Ok(String::new())));

        match reply {
            Reply::Respond(result) => result,
            Reply::Stall => std::future::pending().await,
        }
    }
}
