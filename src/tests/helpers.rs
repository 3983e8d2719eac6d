// Shared test doubles: a renderer that records calls and a store that fails

use crate::{
    Error, Result,
    client::RetryPolicy,
    config::Config,
    conversation::Message,
    lifecycle::VisualState,
    renderer::Renderer,
    store::StateStore,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One call made on a renderer
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Mount(String),
    Show(VisualState, bool),
    Append(usize, Message),
    Update(usize, Message),
    Remove(usize),
    InputEnabled(bool),
    Focus,
    Error(String),
    Teardown,
}

/// Renderer recording every call into a shared log
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    mobile: bool,
}

impl RecordingRenderer {
    pub fn new() -> (Box<dyn Renderer>, Arc<Mutex<Vec<RenderCall>>>) {
        Self::with_viewport(false)
    }

    pub fn mobile() -> (Box<dyn Renderer>, Arc<Mutex<Vec<RenderCall>>>) {
        Self::with_viewport(true)
    }

    fn with_viewport(mobile: bool) -> (Box<dyn Renderer>, Arc<Mutex<Vec<RenderCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let renderer = Self {
            calls: calls.clone(),
            mobile,
        };
        (Box::new(renderer), calls)
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().expect("render log poisoned").push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn mount(&mut self, config: &Config) {
        self.record(RenderCall::Mount(config.container.clone()));
    }

    fn is_mobile_viewport(&self) -> bool {
        self.mobile
    }

    fn show_state(&mut self, state: VisualState, sheet: bool) {
        self.record(RenderCall::Show(state, sheet));
    }

    fn append_message(&mut self, index: usize, message: &Message) {
        self.record(RenderCall::Append(index, message.clone()));
    }

    fn update_message(&mut self, index: usize, message: &Message) {
        self.record(RenderCall::Update(index, message.clone()));
    }

    fn remove_message(&mut self, index: usize) {
        self.record(RenderCall::Remove(index));
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.record(RenderCall::InputEnabled(enabled));
    }

    fn focus_input(&mut self) {
        self.record(RenderCall::Focus);
    }

    fn show_error(&mut self, message: &str) {
        self.record(RenderCall::Error(message.to_string()));
    }

    fn teardown(&mut self) {
        self.record(RenderCall::Teardown);
    }
}

/// Snapshot of a render log
pub fn calls(log: &Arc<Mutex<Vec<RenderCall>>>) -> Vec<RenderCall> {
    log.lock().expect("render log poisoned").clone()
}

/// Store whose every operation fails, like blocked browser storage
pub struct FailingStore;

impl StateStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Error::Storage("storage unavailable".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::Storage("storage unavailable".to_string()))
    }
}

/// Retry policy with millisecond delays so retry tests run quickly
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        ..RetryPolicy::default()
    }
}
