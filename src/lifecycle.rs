//! Widget visibility lifecycle
//!
//! This module decides which of expanded / collapsed / closed the widget
//! shows and keeps the persisted value in sync with user actions:
//! - Initial state resolution from the stored value, the configured default
//!   and the mobile policy
//! - Transitions for expand / collapse / close
//! - Persistence through an injected [`StateStore`], degrading to
//!   in-memory-only on store failure

use crate::{store::StateStore, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Visual state of the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualState {
    /// Chat panel open
    Expanded,
    /// Only the launcher button is visible
    Collapsed,
    /// Nothing is visible
    Closed,
}

impl VisualState {
    /// Literal string used in the persisted store
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualState::Expanded => "expanded",
            VisualState::Collapsed => "collapsed",
            VisualState::Closed => "closed",
        }
    }
}

impl fmt::Display for VisualState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "expanded" => Ok(VisualState::Expanded),
            "collapsed" => Ok(VisualState::Collapsed),
            "closed" => Ok(VisualState::Closed),
            other => Err(Error::Config(format!("Unknown widget state: {}", other))),
        }
    }
}

/// How the initial state is chosen on mobile viewports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MobileStatePolicy {
    /// Saved or default state, but never fully closed
    #[default]
    Auto,
    /// Saved or default state as-is
    RespectSaved,
    /// Always collapsed
    ForceCollapsed,
    /// Always closed
    ForceClosed,
}

impl FromStr for MobileStatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(MobileStatePolicy::Auto),
            "respect-saved" => Ok(MobileStatePolicy::RespectSaved),
            "force-collapsed" => Ok(MobileStatePolicy::ForceCollapsed),
            "force-closed" => Ok(MobileStatePolicy::ForceClosed),
            other => Err(Error::Config(format!("Unknown mobile state policy: {}", other))),
        }
    }
}

/// User-initiated visibility change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Open the chat panel
    Expand,
    /// Minimize to the launcher button
    Collapse,
    /// Hide everything
    Close,
}

/// Site-owner rules that shape transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRules {
    /// Floating widgets have a launcher; embedded ones have no collapsed visual
    pub is_floating: bool,
    /// When false, Close is treated as Collapse
    pub allow_close: bool,
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self {
            is_floating: true,
            allow_close: true,
        }
    }
}

/// Outcome of initial state resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// State to display
    pub state: VisualState,
    /// True when a mobile force policy picked the state
    pub forced: bool,
}

/// Resolve the initial visual state
///
/// Pure function: no store access. Forced mobile policies ignore both the
/// stored value and the default; `Auto` on mobile downgrades a stored
/// `Closed` to `Collapsed` but keeps a configured default of `Closed`.
pub fn resolve_initial_state(
    stored: Option<VisualState>,
    default: VisualState,
    is_mobile: bool,
    policy: MobileStatePolicy,
) -> Resolution {
    let saved_or_default = stored.unwrap_or(default);

    if !is_mobile {
        return Resolution {
            state: saved_or_default,
            forced: false,
        };
    }

    match policy {
        MobileStatePolicy::RespectSaved => Resolution {
            state: saved_or_default,
            forced: false,
        },
        MobileStatePolicy::ForceCollapsed => Resolution {
            state: VisualState::Collapsed,
            forced: true,
        },
        MobileStatePolicy::ForceClosed => Resolution {
            state: VisualState::Closed,
            forced: true,
        },
        MobileStatePolicy::Auto => {
            let state = match stored {
                Some(VisualState::Closed) => VisualState::Collapsed,
                _ => saved_or_default,
            };
            Resolution {
                state,
                forced: false,
            }
        }
    }
}

/// Apply a transition to the current state
pub fn next_state(current: VisualState, action: Transition, rules: TransitionRules) -> VisualState {
    match action {
        Transition::Expand => VisualState::Expanded,
        Transition::Collapse if !rules.is_floating => current,
        Transition::Collapse => VisualState::Collapsed,
        Transition::Close if !rules.allow_close => VisualState::Collapsed,
        Transition::Close => VisualState::Closed,
    }
}

/// Storage key for the persisted visual state
pub fn state_key(site_key: &str, domain: &str) -> String {
    format!("widget-state-{}-{}", site_key, domain)
}

/// Visibility lifecycle of one widget instance
pub struct WidgetLifecycle {
    store: Arc<dyn StateStore>,
    key: String,
    rules: TransitionRules,
    current: Option<VisualState>,
    /// Set after a store failure; the rest of the page view stays in memory
    memory_only: bool,
}

impl WidgetLifecycle {
    /// Create a lifecycle persisting under `widget-state-{site_key}-{domain}`
    pub fn new(
        store: Arc<dyn StateStore>,
        site_key: &str,
        domain: &str,
        rules: TransitionRules,
    ) -> Self {
        Self {
            store,
            key: state_key(site_key, domain),
            rules,
            current: None,
            memory_only: false,
        }
    }

    /// Storage key this lifecycle writes to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current state, if resolved
    pub fn current(&self) -> Option<VisualState> {
        self.current
    }

    /// Whether a store failure forced in-memory-only operation
    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    /// Resolve the initial state against the store
    ///
    /// A first visit (nothing stored) makes the resolved value sticky by
    /// writing it back. Forced mobile values are display-only and leave the
    /// store untouched so the saved value survives for desktop.
    pub fn resolve(
        &mut self,
        default: VisualState,
        is_mobile: bool,
        policy: MobileStatePolicy,
    ) -> VisualState {
        let stored = self.load();
        let resolution = resolve_initial_state(stored, default, is_mobile, policy);

        if stored.is_none() && !resolution.forced {
            self.persist(resolution.state);
        }

        debug!(
            "Resolved widget state {} (stored: {:?}, forced: {})",
            resolution.state, stored, resolution.forced
        );
        self.current = Some(resolution.state);
        resolution.state
    }

    /// Apply a user action and persist the result
    pub fn transition(&mut self, action: Transition) -> VisualState {
        let current = self.current.unwrap_or(VisualState::Expanded);
        let next = next_state(current, action, self.rules);
        self.persist(next);
        self.current = Some(next);
        next
    }

    fn load(&mut self) -> Option<VisualState> {
        if self.memory_only {
            return self.current;
        }

        match self.store.get(&self.key) {
            Ok(Some(raw)) => match raw.parse() {
                Ok(state) => Some(state),
                Err(_) => {
                    warn!("Ignoring unrecognized stored widget state '{}'", raw);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to load widget state, continuing in memory: {}", e);
                self.memory_only = true;
                None
            }
        }
    }

    fn persist(&mut self, state: VisualState) {
        if self.memory_only {
            return;
        }

        if let Err(e) = self.store.set(&self.key, state.as_str()) {
            warn!("Failed to save widget state, continuing in memory: {}", e);
            self.memory_only = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_string_roundtrip() {
        for state in [VisualState::Expanded, VisualState::Collapsed, VisualState::Closed] {
            assert_eq!(state.as_str().parse::<VisualState>().unwrap(), state);
        }
        assert!("minimized".parse::<VisualState>().is_err());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("auto".parse::<MobileStatePolicy>().unwrap(), MobileStatePolicy::Auto);
        assert_eq!(
            "force-closed".parse::<MobileStatePolicy>().unwrap(),
            MobileStatePolicy::ForceClosed
        );
        assert!("sometimes".parse::<MobileStatePolicy>().is_err());
    }

    #[test]
    fn test_state_key_format() {
        assert_eq!(state_key("s1", "example.com"), "widget-state-s1-example.com");
    }
}
