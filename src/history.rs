//! Conversation history retrieval
//!
//! Fetches the messages a session already exchanged with the backend so a
//! host can re-inject them after a page load. Failures are logged and turn
//! into an empty history; the widget works without it.

use crate::{
    config::{Config, InitOptions},
    conversation::HistoryEntry,
    session::session_id_for,
    store::StateStore,
    Error, Result,
};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRequest<'a> {
    session_id: &'a str,
    client_id: &'a str,
}

/// Derive the history endpoint from the chat endpoint
///
/// A trailing `/chat` segment is replaced: `https://host/chat` becomes
/// `https://host/get-session-history`.
pub fn history_endpoint(api_endpoint: &Url) -> Result<Url> {
    if api_endpoint.cannot_be_a_base() {
        return Err(Error::Config(format!(
            "Invalid history endpoint base: {}",
            api_endpoint
        )));
    }

    let path = api_endpoint.path().trim_end_matches('/');
    let base = path.strip_suffix("/chat").unwrap_or(path);
    let mut endpoint = api_endpoint.clone();
    endpoint.set_path(&format!("{}/get-session-history", base));
    endpoint.set_query(None);
    Ok(endpoint)
}

/// Client for the session history endpoint
#[derive(Debug, Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    endpoint: Url,
    client_id: String,
    site_key: String,
    session_id: String,
}

impl HistoryClient {
    /// Create a client for a configuration and session
    pub fn new(config: &Config, session_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: history_endpoint(&config.api_endpoint)?,
            client_id: config.client_id.clone(),
            site_key: config.site_key.clone(),
            session_id: session_id.into(),
        })
    }

    /// Endpoint this client posts to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch the history, returning an empty list on any failure
    pub async fn fetch(&self) -> Vec<HistoryEntry> {
        match self.try_fetch().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to fetch conversation history: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self) -> Result<Vec<HistoryEntry>> {
        debug!("Fetching conversation history for session {}", self.session_id);

        let response = self
            .http
            .post(self.endpoint.clone())
            .header("Accept", "application/json")
            .header("x-site-key", &self.site_key)
            .json(&HistoryRequest {
                session_id: &self.session_id,
                client_id: &self.client_id,
            })
            .send()
            .await
            .map_err(|e| Error::Widget(format!("History request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!("No conversation history found for session (404)");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Error::Widget(format!("History request returned HTTP {}", status.as_u16())));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Widget(format!("Failed to read history: {}", e)))?;

        let serde_json::Value::Array(items) = body else {
            warn!("Expected an array of history entries");
            return Ok(Vec::new());
        };

        let entries: Vec<HistoryEntry> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        info!("Loaded {} messages from conversation history", entries.len());
        Ok(entries)
    }
}

/// Fill `options.history` from the backend when the host supplied none
///
/// Runs before `init` so restored messages take the greeting's place. The
/// session id used for the lookup is pinned into the options.
pub async fn preload_history(options: &mut InitOptions, session_store: &dyn StateStore) -> Result<()> {
    if options.history.is_some() {
        return Ok(());
    }

    let config = Config::from_options(options)?;
    let session_id = match &config.session_id {
        Some(id) => id.clone(),
        None => session_id_for(session_store, &config.site_key),
    };

    let history = HistoryClient::new(&config, session_id.clone())?.fetch().await;
    options.session_id = Some(session_id);
    if !history.is_empty() {
        options.history = Some(history);
    }
    Ok(())
}
