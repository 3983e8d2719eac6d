//! Widget controller
//!
//! This module is the host-facing surface of the crate:
//! - A registry of widget instances keyed by container id
//! - `init` / `send` / `unmount` / `inject_history` entry points
//! - Dispatch of UI [`Action`]s to lifecycle transitions and chat requests
//!
//! The registry lock is never held while a chat request is in flight, so
//! other widgets (and other operations on the same widget) stay responsive.
//! Each mounted instance carries a generation number; a reply arriving for
//! an instance that was unmounted or replaced meanwhile is dropped without
//! touching any renderer.

use crate::{
    client::{ChatClient, Reply, RetryPolicy},
    config::{Config, InitOptions},
    conversation::{Conversation, HistoryEntry, Message},
    lifecycle::{Transition, VisualState, WidgetLifecycle},
    renderer::Renderer,
    session::session_id_for,
    store::{MemoryStore, StateStore},
    Error, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Longest message a visitor may send, in characters
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// UI event routed to a widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Visitor submitted a message
    SendMessage(String),
    /// Launcher clicked
    Expand,
    /// Minimize button clicked
    Collapse,
    /// Close button on the launcher clicked
    Close,
    /// Focus the input control
    FocusInput,
}

/// One mounted widget
struct Widget {
    generation: u64,
    config: Config,
    session_id: String,
    client: ChatClient,
    lifecycle: WidgetLifecycle,
    conversation: Conversation,
    renderer: Box<dyn Renderer>,
    sending: bool,
}

impl Widget {
    fn show(&mut self, state: VisualState) {
        let sheet = self.config.is_floating
            && state == VisualState::Expanded
            && self.renderer.is_mobile_viewport();
        self.renderer.show_state(state, sheet);
    }

    fn append_bot(&mut self, content: &str) {
        let index = self.conversation.push_bot(content);
        self.renderer
            .append_message(index, &self.conversation.messages()[index]);
    }

    fn teardown(&mut self) {
        self.conversation.clear();
        self.renderer.teardown();
    }
}

#[derive(Default)]
struct Registry {
    widgets: HashMap<String, Widget>,
    /// Mount order; the first entry is the default target
    order: Vec<String>,
}

impl Registry {
    fn target(&self, container: Option<&str>) -> Result<String> {
        match container {
            Some(id) if self.widgets.contains_key(id) => Ok(id.to_string()),
            Some(id) => Err(Error::NotInitialized(format!("No widget mounted in {}", id))),
            None => self
                .order
                .first()
                .cloned()
                .ok_or_else(|| Error::NotInitialized("No widget instances found".to_string())),
        }
    }

    fn widget_mut(&mut self, container: Option<&str>) -> Result<&mut Widget> {
        let id = self.target(container)?;
        self.widgets
            .get_mut(&id)
            .ok_or_else(|| Error::NotInitialized(format!("No widget mounted in {}", id)))
    }

    fn insert(&mut self, id: String, widget: Widget) {
        self.order.retain(|existing| existing != &id);
        self.order.push(id.clone());
        self.widgets.insert(id, widget);
    }

    fn remove(&mut self, id: &str) -> Option<Widget> {
        self.order.retain(|existing| existing != id);
        self.widgets.remove(id)
    }

    /// Undo the pending part of a send whose caller went away
    fn abandon_send(&mut self, id: &str, generation: u64) {
        let Some(widget) = self.widgets.get_mut(id) else {
            return;
        };
        if widget.generation != generation || !widget.sending {
            return;
        }

        if let Some(index) = widget.conversation.fail_reply() {
            widget.renderer.remove_message(index);
        }
        widget.sending = false;
        widget.renderer.set_input_enabled(true);
        debug!("Send abandoned for widget {}", id);
    }
}

/// Restores a widget when a send future is dropped before its outcome is
/// applied
struct SendGuard {
    registry: Arc<Mutex<Registry>>,
    id: String,
    generation: u64,
    armed: bool,
}

impl SendGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        if let Ok(mut registry) = self.registry.try_lock() {
            registry.abandon_send(&self.id, self.generation);
            return;
        }

        let registry = self.registry.clone();
        let id = std::mem::take(&mut self.id);
        let generation = self.generation;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    registry.lock().await.abandon_send(&id, generation);
                });
            }
            Err(_) => warn!("Send for widget {} abandoned outside a runtime", id),
        }
    }
}

/// Owner of all widget instances on a page
///
/// Cheap to clone; clones share the same registry.
///
/// # Example
/// ```rust,no_run
/// use chat_widget::{Controller, InitOptions};
/// use chat_widget::store::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example(renderer: Box<dyn chat_widget::renderer::Renderer>) -> chat_widget::Result<()> {
/// let controller = Controller::new("example.com", Arc::new(MemoryStore::new()));
/// let widget = controller.init(InitOptions::new("c1", "s1"), renderer).await?;
///
/// let reply = controller.send(Some(&widget), "Hello").await?;
/// println!("Bot: {}", reply.content);
///
/// controller.unmount(Some(&widget)).await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Controller {
    registry: Arc<Mutex<Registry>>,
    store: Arc<dyn StateStore>,
    session_store: Arc<dyn StateStore>,
    domain: Arc<String>,
    retry_policy: RetryPolicy,
    next_generation: Arc<AtomicU64>,
}

impl Controller {
    /// Create a controller for a host domain, persisting widget state in
    /// `store`
    pub fn new(domain: impl Into<String>, store: Arc<dyn StateStore>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            store,
            session_store: Arc::new(MemoryStore::new()),
            domain: Arc::new(domain.into()),
            retry_policy: RetryPolicy::default(),
            next_generation: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Use a separate store for session ids
    pub fn with_session_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.session_store = store;
        self
    }

    /// Retry policy for chat clients created by later `init` calls
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Host domain used in persisted keys
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Mount a widget
    ///
    /// Fails synchronously on invalid configuration, before anything is
    /// registered or drawn. An existing widget in the same container is
    /// unmounted first.
    pub async fn init(&self, options: InitOptions, mut renderer: Box<dyn Renderer>) -> Result<String> {
        let config = Config::from_options(&options)?;

        let session_id = match &config.session_id {
            Some(id) => id.clone(),
            None => session_id_for(self.session_store.as_ref(), &config.site_key),
        };
        let client = ChatClient::new(&config, session_id.clone())?.with_policy(self.retry_policy);
        let mut lifecycle = WidgetLifecycle::new(
            self.store.clone(),
            &config.site_key,
            &self.domain,
            config.transition_rules(),
        );

        let mut registry = self.registry.lock().await;

        if let Some(mut previous) = registry.remove(&config.container) {
            warn!(
                "Widget already exists for container {}, unmounting previous instance",
                config.container
            );
            previous.teardown();
        }

        renderer.mount(&config);
        // The mobile policy only applies to the floating launcher
        let is_mobile = config.is_floating && renderer.is_mobile_viewport();
        let state = lifecycle.resolve(
            config.floating_default_state,
            is_mobile,
            config.mobile_state_policy,
        );

        let container = config.container.clone();
        let mut widget = Widget {
            generation: self.next_generation.fetch_add(1, Ordering::SeqCst),
            config,
            session_id,
            client,
            lifecycle,
            conversation: Conversation::new(),
            renderer,
            sending: false,
        };

        widget.show(state);

        if !widget.config.skip_greeting {
            if let Some(greeting) = widget.config.greeting_message.clone() {
                widget.append_bot(&greeting);
            }
        }

        if let Some(history) = &options.history {
            let added = widget.conversation.inject_history(history)?;
            for index in added {
                widget
                    .renderer
                    .append_message(index, &widget.conversation.messages()[index]);
            }
        }

        info!(
            "Widget initialized in {} with state {} and session {}",
            container, state, widget.session_id
        );
        registry.insert(container.clone(), widget);
        Ok(container)
    }

    /// Send a visitor message and render the reply
    ///
    /// Without a container the first mounted widget is used. A second send
    /// while one is pending on the same widget is rejected, not queued.
    /// Dropping the returned future cancels the request and removes the
    /// placeholder, leaving the widget ready for the next send.
    pub async fn send(&self, container: Option<&str>, message: &str) -> Result<Reply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidMessage("Message must be a non-empty string".to_string()));
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(Error::InvalidMessage(format!(
                "Message exceeds {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        let (id, generation, client) = {
            let mut registry = self.registry.lock().await;
            let id = registry.target(container)?;
            let widget = registry.widget_mut(Some(&id))?;

            if widget.sending {
                return Err(Error::SendInProgress);
            }

            let user_index = widget.conversation.push_user(message)?;
            widget
                .renderer
                .append_message(user_index, &widget.conversation.messages()[user_index]);
            let loading_index = widget.conversation.begin_reply()?;
            widget
                .renderer
                .append_message(loading_index, &widget.conversation.messages()[loading_index]);

            widget.renderer.set_input_enabled(false);
            widget.sending = true;
            (id, widget.generation, widget.client.clone())
        };

        let mut guard = SendGuard {
            registry: self.registry.clone(),
            id: id.clone(),
            generation,
            armed: true,
        };

        let outcome = client.send(message).await;

        let mut registry = self.registry.lock().await;
        guard.disarm();
        let widget = match registry.widgets.get_mut(&id) {
            Some(widget) if widget.generation == generation => widget,
            _ => {
                debug!("Discarding chat outcome for unmounted widget {}", id);
                return Err(Error::NotInitialized(format!("Widget in {} was unmounted", id)));
            }
        };

        let result = match outcome {
            Ok(reply) => {
                if let Some(index) = widget.conversation.complete_reply(reply.content.clone()) {
                    widget
                        .renderer
                        .update_message(index, &widget.conversation.messages()[index]);
                }
                Ok(reply)
            }
            Err(e) => {
                if let Some(index) = widget.conversation.fail_reply() {
                    widget.renderer.remove_message(index);
                }
                widget.renderer.show_error(e.user_message());
                Err(Error::Request(e))
            }
        };

        widget.sending = false;
        widget.renderer.set_input_enabled(true);
        widget.renderer.focus_input();
        result
    }

    /// Route a UI action
    pub async fn dispatch(&self, container: Option<&str>, action: Action) -> Result<()> {
        match action {
            Action::SendMessage(message) => self.send(container, &message).await.map(|_| ()),
            Action::Expand => self.transition(container, Transition::Expand).await.map(|_| ()),
            Action::Collapse => self.transition(container, Transition::Collapse).await.map(|_| ()),
            Action::Close => self.transition(container, Transition::Close).await.map(|_| ()),
            Action::FocusInput => {
                let mut registry = self.registry.lock().await;
                registry.widget_mut(container)?.renderer.focus_input();
                Ok(())
            }
        }
    }

    /// Apply a visibility transition, persist it and redraw
    pub async fn transition(&self, container: Option<&str>, action: Transition) -> Result<VisualState> {
        let mut registry = self.registry.lock().await;
        let widget = registry.widget_mut(container)?;

        let state = widget.lifecycle.transition(action);
        widget.show(state);
        debug!("Widget {} transitioned to {} via {:?}", widget.config.container, state, action);
        Ok(state)
    }

    /// Append history entries to a widget's conversation
    pub async fn inject_history(&self, container: Option<&str>, entries: &[HistoryEntry]) -> Result<usize> {
        let mut registry = self.registry.lock().await;
        let widget = registry.widget_mut(container)?;

        let added = widget.conversation.inject_history(entries)?;
        for &index in &added {
            widget
                .renderer
                .append_message(index, &widget.conversation.messages()[index]);
        }
        Ok(added.len())
    }

    /// Unmount one widget, or all of them when no container is given
    ///
    /// Returns how many widgets were unmounted.
    pub async fn unmount(&self, container: Option<&str>) -> usize {
        let mut registry = self.registry.lock().await;

        let ids: Vec<String> = match container {
            Some(id) => vec![id.to_string()],
            None => registry.order.clone(),
        };

        let mut count = 0;
        for id in ids {
            if let Some(mut widget) = registry.remove(&id) {
                widget.teardown();
                info!("Widget in {} unmounted", id);
                count += 1;
            }
        }
        count
    }

    /// Whether a widget is mounted in the container
    pub async fn is_mounted(&self, container: &str) -> bool {
        self.registry.lock().await.widgets.contains_key(container)
    }

    /// Mounted containers in mount order
    pub async fn containers(&self) -> Vec<String> {
        self.registry.lock().await.order.clone()
    }

    /// Current visual state of a widget
    pub async fn visual_state(&self, container: Option<&str>) -> Result<VisualState> {
        let mut registry = self.registry.lock().await;
        let widget = registry.widget_mut(container)?;
        widget
            .lifecycle
            .current()
            .ok_or_else(|| Error::Widget("Widget state not resolved".to_string()))
    }

    /// Snapshot of a widget's messages
    pub async fn messages(&self, container: Option<&str>) -> Result<Vec<Message>> {
        let mut registry = self.registry.lock().await;
        Ok(registry.widget_mut(container)?.conversation.messages().to_vec())
    }

    /// Session id of a widget
    pub async fn session_id(&self, container: Option<&str>) -> Result<String> {
        let mut registry = self.registry.lock().await;
        Ok(registry.widget_mut(container)?.session_id.clone())
    }

    /// Configuration of a widget
    pub async fn config(&self, container: Option<&str>) -> Result<Config> {
        let mut registry = self.registry.lock().await;
        Ok(registry.widget_mut(container)?.config.clone())
    }
}
