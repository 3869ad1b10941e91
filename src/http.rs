use crate::config::ReleaseConfig;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::time::Duration;

pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What a request is for; decides headers and timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Index,
    Download,
}

/// Trait for issuing GET requests - allows mocking in tests
pub trait HttpClient: Send + Sync {
    fn get<'a>(&'a self, url: &'a str, kind: RequestKind) -> BoxFuture<'a, Result<HttpResponse>>;
}

/// Real HTTP client backed by reqwest
pub struct ReqwestClient {
    client: reqwest::Client,
    token: Option<String>,
    index_timeout: Duration,
    download_timeout: Duration,
}

impl ReqwestClient {
    pub fn new(config: &ReleaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            token: config.token.clone(),
            index_timeout: config.index_timeout(),
            download_timeout: config.download_timeout(),
        })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str, kind: RequestKind) -> BoxFuture<'a, Result<HttpResponse>> {
        Box::pin(async move {
            let request = match kind {
                RequestKind::Index => {
                    let request = self
                        .client
                        .get(url)
                        .timeout(self.index_timeout)
                        .header(reqwest::header::ACCEPT, "application/vnd.github+json");
                    match &self.token {
                        Some(token) => request.bearer_auth(token),
                        None => request,
                    }
                }
                RequestKind::Download => self.client.get(url).timeout(self.download_timeout),
            };

            let response = request
                .send()
                .await
                .with_context(|| format!("request to {} failed", url))?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .with_context(|| format!("reading body from {} failed", url))?;

            log::debug!("GET {} -> {} ({} bytes)", url, status, body.len());

            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        })
    }
}

/// Mock HTTP client for testing
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum MockReply {
        Status(u16, Vec<u8>),
        Transport(String),
    }

    pub struct MockHttpClient {
        replies: Mutex<HashMap<String, MockReply>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self {
                replies: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn respond(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
            let mut replies = self.replies.lock().unwrap();
            replies.insert(url.to_string(), MockReply::Status(status, body.into()));
        }

        pub fn fail(&self, url: &str, message: &str) {
            let mut replies = self.replies.lock().unwrap();
            replies.insert(url.to_string(), MockReply::Transport(message.to_string()));
        }

        /// URLs requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Default for MockHttpClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get<'a>(
            &'a self,
            url: &'a str,
            _kind: RequestKind,
        ) -> BoxFuture<'a, Result<HttpResponse>> {
            Box::pin(async move {
                self.requests.lock().unwrap().push(url.to_string());

                let replies = self.replies.lock().unwrap();
                match replies.get(url) {
                    Some(MockReply::Status(status, body)) => Ok(HttpResponse {
                        status: *status,
                        body: body.clone(),
                    }),
                    Some(MockReply::Transport(message)) => anyhow::bail!("{}", message),
                    None => anyhow::bail!("Unexpected request: {}", url),
                }
            })
        }
    }
}
