//! Widget configuration
//!
//! Hosts hand over loosely-typed [`InitOptions`] (every field optional, as
//! they come from a script tag or a settings page). [`Config::from_options`]
//! validates them and fills in defaults; the resulting [`Config`] is
//! immutable for the lifetime of a widget instance.

use crate::{
    conversation::HistoryEntry,
    lifecycle::{MobileStatePolicy, TransitionRules, VisualState},
    Error, Result,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chat endpoint used when the host doesn't provide one
pub const DEFAULT_API_ENDPOINT: &str = "https://leadgate-backend-production.up.railway.app/chat";

/// Greeting shown on an empty conversation
pub const DEFAULT_GREETING: &str = "Hi, how can I help you?";

/// Container id of the floating widget
pub const FLOATING_CONTAINER_ID: &str = "#chatbot-widget-container";

/// Colour theme of the widget
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Theme {
    /// Light palette
    #[default]
    Light,
    /// Dark palette
    Dark,
    /// Palette derived from a hex primary colour (`#rgb` or `#rrggbb`)
    Custom(String),
}

impl Theme {
    /// Parse `light`, `dark` or a hex colour
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            hex if is_hex_colour(hex) => Ok(Theme::Custom(hex.to_lowercase())),
            other => Err(Error::Config(format!(
                "theme must be \"light\", \"dark\" or a hex colour, got \"{}\"",
                other
            ))),
        }
    }
}

fn is_hex_colour(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Light/dark base for custom themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light base
    Light,
    /// Dark base
    Dark,
}

/// Viewport corner of the floating widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// Bottom right corner
    #[default]
    BottomRight,
    /// Bottom left corner
    BottomLeft,
    /// Top right corner
    TopRight,
    /// Top left corner
    TopLeft,
}

/// Raw options as supplied by the host page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitOptions {
    /// Tenant client id
    pub client_id: Option<String>,
    /// Per-site credential sent as `x-site-key`
    pub site_key: Option<String>,
    /// Explicit session id; generated when absent
    pub session_id: Option<String>,
    /// Container id; absent means the floating container
    pub container: Option<String>,
    /// Chat endpoint URL
    pub api_endpoint: Option<String>,
    /// `light`, `dark` or hex colour
    pub theme: Option<String>,
    /// Base for custom themes
    pub theme_mode: Option<String>,
    /// UI locale
    pub locale: Option<String>,
    /// First bot message
    pub greeting_message: Option<String>,
    /// Floating widget corner
    pub position: Option<Position>,
    /// State on a first visit
    pub floating_default_state: Option<VisualState>,
    /// Force floating or embedded mode
    pub is_floating: Option<bool>,
    /// Mobile override for the initial state
    pub mobile_state_policy: Option<MobileStatePolicy>,
    /// Whether the launcher may be closed entirely
    pub allow_floating_button_close: Option<bool>,
    /// Suppress the greeting
    pub skip_greeting: Option<bool>,
    /// Prior messages to show instead of the greeting
    pub history: Option<Vec<HistoryEntry>>,
}

impl InitOptions {
    /// Options with just the two required fields set
    pub fn new(client_id: impl Into<String>, site_key: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            site_key: Some(site_key.into()),
            ..Self::default()
        }
    }

    /// Parse options from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from a JSON file
    ///
    /// Returns default (empty) options if the file doesn't exist or is empty;
    /// validation happens later in [`Config::from_options`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&data).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Validated, immutable widget configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Tenant client id (non-empty)
    pub client_id: String,
    /// Site key (non-empty)
    pub site_key: String,
    /// Session id, if the host provided one
    pub session_id: Option<String>,
    /// Container id
    pub container: String,
    /// Chat endpoint
    pub api_endpoint: Url,
    /// Colour theme
    pub theme: Theme,
    /// Base for custom themes
    pub theme_mode: Option<ThemeMode>,
    /// UI locale
    pub locale: String,
    /// Greeting, if any
    pub greeting_message: Option<String>,
    /// Floating widget corner
    pub position: Position,
    /// State on a first visit
    pub floating_default_state: VisualState,
    /// Floating (launcher) or embedded mode
    pub is_floating: bool,
    /// Mobile override for the initial state
    pub mobile_state_policy: MobileStatePolicy,
    /// Whether Close may fully hide the widget
    pub allow_floating_button_close: bool,
    /// Suppress the greeting
    pub skip_greeting: bool,
}

impl Config {
    /// Validate raw options and apply defaults
    pub fn from_options(options: &InitOptions) -> Result<Self> {
        let client_id = required(options.client_id.as_deref(), "clientId is required")?;
        let site_key = required(
            options.site_key.as_deref(),
            "siteKey is required. Provide it in the config or as the site-key attribute",
        )?;

        let endpoint = options.api_endpoint.as_deref().unwrap_or(DEFAULT_API_ENDPOINT);
        let api_endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("Invalid apiEndpoint \"{}\": {}", endpoint, e)))?;

        let theme = match options.theme.as_deref() {
            Some(theme) => Theme::parse(theme)?,
            None => Theme::default(),
        };

        let theme_mode = match options.theme_mode.as_deref() {
            None => None,
            Some("light") => Some(ThemeMode::Light),
            Some("dark") => Some(ThemeMode::Dark),
            Some(_) => {
                return Err(Error::Config(
                    "themeMode must be either \"light\" or \"dark\"".to_string(),
                ));
            }
        };

        let container = options
            .container
            .clone()
            .unwrap_or_else(|| FLOATING_CONTAINER_ID.to_string());
        let is_floating = options
            .is_floating
            .unwrap_or(container == FLOATING_CONTAINER_ID);

        let greeting_message = match options.greeting_message.as_deref() {
            Some("") => None,
            Some(greeting) => Some(greeting.to_string()),
            None => Some(DEFAULT_GREETING.to_string()),
        };

        let session_id = options
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(Self {
            client_id,
            site_key,
            session_id,
            container,
            api_endpoint,
            theme,
            theme_mode,
            locale: options.locale.clone().unwrap_or_else(|| "en".to_string()),
            greeting_message,
            position: options.position.unwrap_or_default(),
            floating_default_state: options
                .floating_default_state
                .unwrap_or(VisualState::Expanded),
            is_floating,
            mobile_state_policy: options.mobile_state_policy.unwrap_or_default(),
            allow_floating_button_close: options.allow_floating_button_close.unwrap_or(true),
            skip_greeting: options.skip_greeting.unwrap_or(false) || options.history.is_some(),
        })
    }

    /// Transition rules derived from this configuration
    pub fn transition_rules(&self) -> TransitionRules {
        TransitionRules {
            is_floating: self.is_floating,
            allow_close: self.allow_floating_button_close,
        }
    }
}

fn required(value: Option<&str>, message: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::Config(message.to_string())),
    }
}
