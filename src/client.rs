//! Chat request client
//!
//! This module delivers one user message to the chat backend and returns
//! its reply, including:
//! - JSON payload construction and the `x-site-key` header
//! - Retry through `reqwest-retry` middleware, with capped exponential
//!   backoff and jitter, for transport failures and HTTP 502/503/504
//! - Classification of terminal failures into user-facing messages
//!
//! Retryable failures never reach the caller; only the final outcome of a
//! [`ChatClient::send`] does.

use crate::{config::Config, Error, Result};
use rand::Rng;
use reqwest::{StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryDecision, RetryTransientMiddleware, Retryable, RetryableStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Upper bound for a single HTTP exchange
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry/backoff parameters
///
/// Attempt `n` (0-indexed) waits `min(base * 2^n + jitter, cap)` before the
/// next attempt, where jitter is uniform in `[0, jitter_ratio * base * 2^n]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Jitter as a fraction of the exponential term
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            max_retries: 3,
            jitter_ratio: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (0-indexed)
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exponential = self.base_delay.as_millis() as f64 * 2f64.powi(attempt as i32);
        let jitter_max = exponential * self.jitter_ratio;
        let jitter = if jitter_max > 0.0 {
            rng.gen_range(0.0..=jitter_max)
        } else {
            0.0
        };
        let capped = (exponential + jitter).min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.round() as u64)
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl reqwest_retry::RetryPolicy for RetryPolicy {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            return RetryDecision::DoNotRetry;
        }

        let delay = self.delay_for(n_past_retries, &mut rand::thread_rng());
        warn!(
            "Chat request failed, retrying in {}ms (retry {}/{})",
            delay.as_millis(),
            n_past_retries + 1,
            self.max_retries
        );
        RetryDecision::Retry {
            execute_after: SystemTime::now() + delay,
        }
    }
}

/// Terminal outcome of a failed chat request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    /// The request never completed (connection, DNS, timeout)
    #[error("Request failed after {attempts} attempt(s): {message}")]
    Transport {
        /// Underlying error description
        message: String,
        /// Attempts made
        attempts: u32,
    },

    /// HTTP 502/503/504 that persisted through every retry
    #[error("Server returned HTTP {status} after {attempts} attempt(s)")]
    ServerTransient {
        /// HTTP status code
        status: u16,
        /// Attempts made
        attempts: u32,
    },

    /// Non-retryable HTTP status
    #[error("Server returned HTTP {status}")]
    ServerPermanent {
        /// HTTP status code
        status: u16,
        /// Attempts made
        attempts: u32,
    },

    /// Successful status with a body lacking a string `content`
    #[error("Invalid response format from server: {message}")]
    Protocol {
        /// What was wrong with the body
        message: String,
        /// Attempts made
        attempts: u32,
    },
}

impl ChatError {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            ChatError::Transport { attempts, .. }
            | ChatError::ServerTransient { attempts, .. }
            | ChatError::ServerPermanent { attempts, .. }
            | ChatError::Protocol { attempts, .. } => *attempts,
        }
    }

    /// HTTP status, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::ServerTransient { status, .. } | ChatError::ServerPermanent { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether this kind of failure is retried by [`ChatClient::send`]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatError::Transport { .. } | ChatError::ServerTransient { .. }
        )
    }

    /// Text to show the visitor
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::Transport { .. } => "Service temporarily unavailable. Please try again.",
            ChatError::Protocol { .. } => "An unexpected error occurred. Please try again.",
            ChatError::ServerTransient { status, .. } | ChatError::ServerPermanent { status, .. } => {
                match status {
                    401 | 403 => "Access denied. This domain is not authorized to use this service.",
                    429 => "Too many requests. Please wait a moment and try again.",
                    400..=499 => "Invalid request. Please check your configuration.",
                    500..=599 => "Service temporarily unavailable. Please try again.",
                    _ => "An unexpected error occurred. Please try again.",
                }
            }
        }
    }
}

/// Whether an HTTP status is worth retrying
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Request body posted to the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Browser session id
    pub session_id: String,
    /// Tenant client id
    pub client_id: String,
    /// User message
    pub content: String,
    /// Always `"message"`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Successful reply from the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    /// Bot answer
    pub content: String,
    /// Whether the backend captured a lead from this exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_saved: Option<bool>,
    /// Free-form backend metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Reply {
    /// Extract a reply from a JSON body, requiring a string `content`
    pub fn from_body(body: &[u8]) -> std::result::Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| format!("body is not JSON: {}", e))?;

        let content = value
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| "missing string field 'content'".to_string())?;

        Ok(Self {
            content: content.to_string(),
            lead_saved: value.get("lead_saved").and_then(|v| v.as_bool()),
            metadata: value.get("metadata").filter(|m| m.is_object()).cloned(),
        })
    }
}

/// Outcome of a send once the retry middleware has given up
enum SendFailure {
    Transport(String),
    Status(StatusCode),
    Protocol(String),
}

impl SendFailure {
    fn into_chat_error(self, attempts: u32) -> ChatError {
        match self {
            SendFailure::Transport(message) => ChatError::Transport { message, attempts },
            SendFailure::Status(status) if is_transient_status(status) => {
                ChatError::ServerTransient {
                    status: status.as_u16(),
                    attempts,
                }
            }
            SendFailure::Status(status) => ChatError::ServerPermanent {
                status: status.as_u16(),
                attempts,
            },
            SendFailure::Protocol(message) => ChatError::Protocol { message, attempts },
        }
    }
}

/// Retry classification for chat requests
///
/// Transport failures and 502/503/504 are transient; every other response
/// ends the send. Each call is one attempt, so the counter doubles as the
/// attempt count reported in [`ChatError`].
struct ChatRetryStrategy {
    attempts: Arc<AtomicU32>,
}

impl RetryableStrategy for ChatRetryStrategy {
    fn handle(
        &self,
        res: &std::result::Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match res {
            Ok(response) if is_transient_status(response.status()) => Some(Retryable::Transient),
            Ok(response) if response.status().is_success() => None,
            Ok(_) => Some(Retryable::Fatal),
            Err(_) => Some(Retryable::Transient),
        }
    }
}

/// HTTP client for the chat endpoint of one widget
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: Url,
    client_id: String,
    site_key: String,
    session_id: String,
    policy: RetryPolicy,
}

impl ChatClient {
    /// Create a client for a validated configuration and session
    pub fn new(config: &Config, session_id: impl Into<String>) -> Result<Self> {
        if config.client_id.is_empty() || config.site_key.is_empty() {
            return Err(Error::Config(
                "clientId and siteKey must be set before sending".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.api_endpoint.clone(),
            client_id: config.client_id.clone(),
            site_key: config.site_key.clone(),
            session_id: session_id.into(),
            policy: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Session id sent with every message
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Build the payload for a message
    pub fn request_for(&self, message: &str) -> ChatRequest {
        ChatRequest {
            session_id: self.session_id.clone(),
            client_id: self.client_id.clone(),
            content: message.to_string(),
            kind: "message".to_string(),
        }
    }

    /// Send a message and wait for the reply
    ///
    /// Transport failures and 502/503/504 are retried per the policy with
    /// non-blocking sleeps; dropping the returned future abandons any
    /// pending retry.
    pub async fn send(&self, message: &str) -> std::result::Result<Reply, ChatError> {
        let payload = self.request_for(message);
        let attempts = Arc::new(AtomicU32::new(0));
        let client = self.retrying_client(attempts.clone());

        let outcome = self.exchange(&client, &payload).await;
        let attempts = attempts.load(Ordering::SeqCst).max(1);

        match outcome {
            Ok(reply) => {
                info!("Chat reply received after {} attempt(s)", attempts);
                Ok(reply)
            }
            Err(failure) => {
                let err = failure.into_chat_error(attempts);
                error!("Chat request failed: {}", err);
                Err(err)
            }
        }
    }

    fn retrying_client(&self, attempts: Arc<AtomicU32>) -> ClientWithMiddleware {
        ClientBuilder::new(self.http.clone())
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                self.policy,
                ChatRetryStrategy { attempts },
            ))
            .build()
    }

    async fn exchange(
        &self,
        client: &ClientWithMiddleware,
        payload: &ChatRequest,
    ) -> std::result::Result<Reply, SendFailure> {
        debug!("POST {} (session {})", self.endpoint, self.session_id);

        let response = client
            .post(self.endpoint.clone())
            .header("Accept", "application/json")
            .header("x-site-key", &self.site_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| SendFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendFailure::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SendFailure::Transport(format!("Failed to read response: {}", e)))?;

        Reply::from_body(&body).map_err(SendFailure::Protocol)
    }
}
