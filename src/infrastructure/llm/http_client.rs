use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{DomainError, ProviderErrorKind};

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    /// POST a JSON body and decode a JSON response.
    ///
    /// Failures are reported as provider errors attributed to `provider` and
    /// classified by transport failure or HTTP status.
    async fn post_json(
        &self,
        provider: &'static str,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_send_error(e: &reqwest::Error) -> ProviderErrorKind {
    if e.is_builder() {
        ProviderErrorKind::InvalidRequest
    } else if let Some(status) = e.status() {
        ProviderErrorKind::from_status(status.as_u16())
    } else {
        ProviderErrorKind::Transport
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        provider: &'static str,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.json(body).send().await.map_err(|e| {
            DomainError::provider(
                provider,
                classify_send_error(&e),
                format!("Request failed: {}", e),
            )
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::provider(
                provider,
                ProviderErrorKind::from_status(status.as_u16()),
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| DomainError::malformed(provider, format!("Failed to parse response: {}", e)))
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// A request observed by the mock
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: serde_json::Value,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Scripted HTTP client.
    ///
    /// Per URL, queued outcomes are consumed first; after that the fixed
    /// error or response for the URL applies.
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        responses: Mutex<HashMap<String, serde_json::Value>>,
        errors: Mutex<HashMap<String, (ProviderErrorKind, String)>>,
        queued: Mutex<HashMap<String, VecDeque<Result<serde_json::Value, DomainError>>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, url: impl Into<String>, response: serde_json::Value) -> Self {
            self.responses.lock().unwrap().insert(url.into(), response);
            self
        }

        pub fn with_error(
            self,
            url: impl Into<String>,
            kind: ProviderErrorKind,
            error: impl Into<String>,
        ) -> Self {
            self.errors
                .lock()
                .unwrap()
                .insert(url.into(), (kind, error.into()));
            self
        }

        /// Queue `count` failures of `kind` ahead of the fixed outcome
        pub fn with_failures(self, url: impl Into<String>, count: usize, kind: ProviderErrorKind) -> Self {
            let url = url.into();
            {
                let mut queued = self.queued.lock().unwrap();
                let queue = queued.entry(url).or_default();
                for n in 0..count {
                    queue.push_back(Err(DomainError::provider(
                        "mock",
                        kind,
                        format!("scripted failure {}", n + 1),
                    )));
                }
            }
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_body(&self) -> Option<serde_json::Value> {
            self.requests.lock().unwrap().last().map(|r| r.body.clone())
        }
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn post_json(
            &self,
            provider: &'static str,
            url: &str,
            headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
        ) -> Result<serde_json::Value, DomainError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.clone(),
            });

            if let Some(outcome) = self
                .queued
                .lock()
                .unwrap()
                .get_mut(url)
                .and_then(VecDeque::pop_front)
            {
                return outcome;
            }

            if let Some((kind, error)) = self.errors.lock().unwrap().get(url) {
                return Err(DomainError::provider(provider, *kind, error.clone()));
            }

            self.responses.lock().unwrap().get(url).cloned().ok_or_else(|| {
                DomainError::provider(
                    provider,
                    ProviderErrorKind::InvalidRequest,
                    format!("No mock response for {}", url),
                )
            })
        }
    }
}
