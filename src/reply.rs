use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endpoint used when neither the CLI, the environment nor the config file set one
pub const DEFAULT_ENDPOINT: &str = "https://plivo-app.onrender.com/chat";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: String,
}

/// Why a reply could not be obtained.
///
/// The conversation collapses every variant into the same warning turn; the
/// distinction only shows up in the log.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reply service returned status {0}")]
    Status(StatusCode),
    #[error("malformed reply body: {0}")]
    Malformed(String),
    #[error("reply task failed: {0}")]
    TaskFailed(String),
}

/// Something that turns one user message into one bot reply
#[async_trait]
pub trait ReplyService: Send + Sync {
    async fn reply(&self, message: &str) -> Result<String, ReplyError>;
}

#[derive(Clone)]
pub struct HttpReplyClient {
    client: Client,
    endpoint: String,
}

impl HttpReplyClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl ReplyService for HttpReplyClient {
    async fn reply(&self, message: &str) -> Result<String, ReplyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&ChatRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReplyError::Status(response.status()));
        }

        let body = response.text().await?;
        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ReplyError::Malformed(e.to_string()))?;
        Ok(chat_response.reply)
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted reply service for controller and UI tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns queued outcomes in order and records every message it receives
    pub struct MockReplyService {
        outcomes: Mutex<VecDeque<Result<String, ReplyError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockReplyService {
        pub fn new() -> Self {
            Self {
                outcomes: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_reply(self, reply: &str) -> Self {
            self.outcomes.lock().unwrap().push_back(Ok(reply.to_string()));
            self
        }

        pub fn with_error(self, error: ReplyError) -> Self {
            self.outcomes.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn recorded_requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReplyService for MockReplyService {
        async fn reply(&self, message: &str) -> Result<String, ReplyError> {
            self.requests.lock().unwrap().push(message.to_string());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ReplyError::Malformed("no mock reply queued".to_string())))
        }
    }

    /// Panics inside the reply task instead of answering
    pub struct PanickingReplyService;

    #[async_trait]
    impl ReplyService for PanickingReplyService {
        async fn reply(&self, _message: &str) -> Result<String, ReplyError> {
            panic!("reply service crashed");
        }
    }

    /// A real connection failure: a request to a loopback port nobody listens on
    pub async fn transport_error() -> ReplyError {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let err = client
            .post(format!("http://{}/chat", addr))
            .send()
            .await
            .unwrap_err();
        ReplyError::from(err)
    }
}
